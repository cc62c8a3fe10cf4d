//! File-backed session store
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/sessions_index.json
//! <data_dir>/<session_id>/document_v{N}.json
//! <data_dir>/<session_id>/reviews_v{N}.json
//! <data_dir>/<session_id>/roundtable_config.json
//! <data_dir>/<session_id>/convergence_report.json
//! <data_dir>/<session_id>/convergence_report_superseded_{K}.json
//! ```
//!
//! Records are pretty-printed JSON, written to a temporary file and renamed
//! into place. Existing records are never overwritten; the one exception is the
//! convergence report of an extended run, whose predecessor is archived first.

use super::{is_valid_session_id, new_session_id};
use async_trait::async_trait;
use roundtable_application::ports::session_store::{SessionStore, StorageError};
use roundtable_application::use_cases::session_registry::SessionRegistry;
use roundtable_domain::{ConvergenceReport, Document, Review, RoundtableSnapshot, SessionEntry};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

const INDEX_FILE: &str = "sessions_index.json";
const CONFIG_FILE: &str = "roundtable_config.json";
const REPORT_FILE: &str = "convergence_report.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionIndex {
    #[serde(default)]
    sessions: Vec<SessionEntry>,
}

/// Session store writing JSON records under a data directory
pub struct FileSessionStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles of the index file
    index_lock: Mutex<()>,
    registry: Option<SessionRegistry>,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_lock: Mutex::new(()),
            registry: None,
        }
    }

    /// Reject deletes of sessions that are active in `registry`
    pub fn with_registry(mut self, registry: SessionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_session_id(session_id) {
            return Err(StorageError::NotFound(format!("session {}", session_id)));
        }
        Ok(self.root.join(session_id))
    }

    /// Directory of an existing session
    async fn existing_session_dir(&self, session_id: &str) -> Result<PathBuf, StorageError> {
        let dir = self.session_dir(session_id)?;
        if !fs::try_exists(&dir).await? {
            return Err(StorageError::NotFound(format!("session {}", session_id)));
        }
        Ok(dir)
    }

    async fn read_index(&self) -> Result<SessionIndex, StorageError> {
        Ok(read_json(&self.root.join(INDEX_FILE))
            .await?
            .unwrap_or_default())
    }

    async fn write_index(&self, index: &SessionIndex) -> Result<(), StorageError> {
        write_atomic(&self.root.join(INDEX_FILE), index).await
    }
}

fn document_file(version: u32) -> String {
    format!("document_v{}.json", version)
}

fn reviews_file(version: u32) -> String {
    format!("reviews_v{}.json", version)
}

fn superseded_report_file(k: usize) -> String {
    format!("convergence_report_superseded_{}.json", k)
}

/// Parse `document_v{N}.json` into `N`
fn document_version(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("document_v")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// `None` when the file does not exist
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write via a sibling temporary file and rename, replacing any existing file
async fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&tmp, &bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Write a record that must not exist yet
async fn write_once<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if fs::try_exists(path).await? {
        return Err(StorageError::AlreadyExists(path.display().to_string()));
    }
    write_atomic(path, value).await
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create_session(&self, title: &str) -> Result<String, StorageError> {
        let entry = SessionEntry::new(new_session_id(), title);
        fs::create_dir_all(self.session_dir(&entry.session_id)?).await?;

        let _lock = self.index_lock.lock().await;
        let mut index = self.read_index().await?;
        index.sessions.push(entry.clone());
        self.write_index(&index).await?;

        info!(session_id = %entry.session_id, title, "Session created");
        Ok(entry.session_id)
    }

    async fn save_document(
        &self,
        session_id: &str,
        document: &Document,
    ) -> Result<(), StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        write_once(&dir.join(document_file(document.version)), document).await?;
        debug!(session_id, version = document.version, "Document saved");
        Ok(())
    }

    async fn load_document(
        &self,
        session_id: &str,
        version: u32,
    ) -> Result<Document, StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        read_json(&dir.join(document_file(version)))
            .await?
            .ok_or_else(|| {
                StorageError::NotFound(format!("session {} version {}", session_id, version))
            })
    }

    async fn save_reviews(
        &self,
        session_id: &str,
        version: u32,
        reviews: &[Review],
    ) -> Result<(), StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        write_once(&dir.join(reviews_file(version)), reviews).await?;
        debug!(session_id, version, count = reviews.len(), "Reviews saved");
        Ok(())
    }

    async fn load_reviews(
        &self,
        session_id: &str,
        version: u32,
    ) -> Result<Vec<Review>, StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        Ok(read_json(&dir.join(reviews_file(version)))
            .await?
            .unwrap_or_default())
    }

    async fn save_config(
        &self,
        session_id: &str,
        snapshot: &RoundtableSnapshot,
    ) -> Result<(), StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        write_once(&dir.join(CONFIG_FILE), snapshot).await
    }

    async fn load_config(
        &self,
        session_id: &str,
    ) -> Result<Option<RoundtableSnapshot>, StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        read_json(&dir.join(CONFIG_FILE)).await
    }

    async fn save_report(
        &self,
        session_id: &str,
        report: &ConvergenceReport,
    ) -> Result<(), StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        write_once(&dir.join(REPORT_FILE), report).await?;
        debug!(session_id, "Convergence report saved");
        Ok(())
    }

    async fn supersede_report(
        &self,
        session_id: &str,
        report: &ConvergenceReport,
    ) -> Result<(), StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        let current_path = dir.join(REPORT_FILE);
        let current: ConvergenceReport = read_json(&current_path).await?.ok_or_else(|| {
            StorageError::NotFound(format!("session {} convergence report", session_id))
        })?;

        let mut k = 1;
        while fs::try_exists(dir.join(superseded_report_file(k))).await? {
            k += 1;
        }
        write_once(&dir.join(superseded_report_file(k)), &current).await?;
        write_atomic(&current_path, report).await?;
        info!(session_id, archived = k, "Convergence report superseded");
        Ok(())
    }

    async fn load_report(
        &self,
        session_id: &str,
    ) -> Result<Option<ConvergenceReport>, StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        read_json(&dir.join(REPORT_FILE)).await
    }

    async fn load_superseded_reports(
        &self,
        session_id: &str,
    ) -> Result<Vec<ConvergenceReport>, StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        let mut reports = Vec::new();
        loop {
            let path = dir.join(superseded_report_file(reports.len() + 1));
            match read_json(&path).await? {
                Some(report) => reports.push(report),
                None => return Ok(reports),
            }
        }
    }

    async fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<SessionEntry>, StorageError> {
        let index = self.read_index().await?;
        // newest first; later index entries win ties
        let mut sessions: Vec<_> = index.sessions.into_iter().rev().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    async fn session_entry(&self, session_id: &str) -> Result<Option<SessionEntry>, StorageError> {
        let index = self.read_index().await?;
        Ok(index
            .sessions
            .into_iter()
            .find(|s| s.session_id == session_id))
    }

    async fn exists(&self, session_id: &str) -> Result<bool, StorageError> {
        if !is_valid_session_id(session_id) {
            return Ok(false);
        }
        Ok(fs::try_exists(self.root.join(session_id)).await?)
    }

    async fn latest_version(&self, session_id: &str) -> Result<Option<u32>, StorageError> {
        let dir = self.existing_session_dir(session_id).await?;
        let mut entries = fs::read_dir(&dir).await?;
        let mut latest = None;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(version) = document_version(&entry.file_name().to_string_lossy()) {
                latest = latest.max(Some(version));
            }
        }
        Ok(latest)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), StorageError> {
        if let Some(registry) = &self.registry
            && registry.is_active(session_id)
        {
            return Err(StorageError::SessionActive(session_id.to_string()));
        }

        let dir = self.existing_session_dir(session_id).await?;
        fs::remove_dir_all(&dir).await?;

        let _lock = self.index_lock.lock().await;
        let mut index = self.read_index().await?;
        index.sessions.retain(|s| s.session_id != session_id);
        self.write_index(&index).await?;

        info!(session_id, "Session deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use roundtable_domain::{
        Issue, Persona, Severity, SeverityCounts, StoppedBy, TokenUsage, UsageLedger,
    };
    use serde_json::json;
    use std::collections::BTreeMap;

    fn snapshot() -> RoundtableSnapshot {
        RoundtableSnapshot::new(
            vec![Persona::new("Security", "Threats", "Find exploits.").with_expertise("OWASP")],
            "Fix High issues",
        )
    }

    #[tokio::test]
    async fn test_document_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = store.create_session("Payments PRD").await.unwrap();

        let mut metadata = BTreeMap::new();
        metadata.insert("team".to_string(), json!("payments"));
        let v1 = Document::initial("Payments PRD", "# Payments\n\nüñí ✓", "prd")
            .with_metadata(metadata);
        store.save_document(&id, &v1).await.unwrap();

        let loaded = store.load_document(&id, 1).await.unwrap();
        assert_eq!(loaded, v1);
        assert!(dir.path().join(&id).join("document_v1.json").exists());
    }

    #[tokio::test]
    async fn test_records_are_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = store.create_session("T").await.unwrap();
        let doc = Document::initial("T", "body", "document");

        store.save_document(&id, &doc).await.unwrap();
        let err = store.save_document(&id, &doc).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        store.save_reviews(&id, 1, &[]).await.unwrap();
        assert!(matches!(
            store.save_reviews(&id, 1, &[]).await,
            Err(StorageError::AlreadyExists(_))
        ));

        store.save_config(&id, &snapshot()).await.unwrap();
        assert!(matches!(
            store.save_config(&id, &snapshot()).await,
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = store.create_session("T").await.unwrap();

        assert!(matches!(
            store.load_document(&id, 7).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(store.load_reviews(&id, 1).await.unwrap().is_empty());
        assert!(store.load_config(&id).await.unwrap().is_none());
        assert!(store.load_report(&id).await.unwrap().is_none());
        assert_eq!(store.latest_version(&id).await.unwrap(), None);

        assert!(matches!(
            store.load_document("session_missing", 1).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store
                .save_document("../escape", &Document::initial("T", "", "document"))
                .await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reviews_and_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = store.create_session("T").await.unwrap();

        let reviews = vec![
            Review::new(
                "Security",
                vec![
                    Issue::new("Auth", "No MFA", Severity::High, "Security")
                        .with_suggested_fix("Require TOTP"),
                ],
                "Risky",
            )
            .with_usage(TokenUsage::new(100, 40)),
        ];
        store.save_reviews(&id, 1, &reviews).await.unwrap();
        store.save_config(&id, &snapshot()).await.unwrap();

        assert_eq!(store.load_reviews(&id, 1).await.unwrap(), reviews);
        assert_eq!(store.load_config(&id).await.unwrap(), Some(snapshot()));
    }

    #[tokio::test]
    async fn test_latest_version_scans_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = store.create_session("T").await.unwrap();

        let v1 = Document::initial("T", "one", "document");
        let v2 = v1.next_version("two");
        let v3 = v2.next_version("three");
        for doc in [&v1, &v2, &v3] {
            store.save_document(&id, doc).await.unwrap();
        }
        store.save_reviews(&id, 3, &[]).await.unwrap();

        assert_eq!(store.latest_version(&id).await.unwrap(), Some(3));
        assert_eq!(document_version("document_v12.json"), Some(12));
        assert_eq!(document_version("reviews_v12.json"), None);
    }

    #[tokio::test]
    async fn test_list_sessions_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let first = store.create_session("First").await.unwrap();
        let second = store.create_session("Second").await.unwrap();
        let third = store.create_session("Third").await.unwrap();

        let listed: Vec<_> = store
            .list_sessions(None)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(listed, vec![third.clone(), second, first.clone()]);

        let limited = store.list_sessions(Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].session_id, third);

        let entry = store.session_entry(&first).await.unwrap().unwrap();
        assert_eq!(entry.title, "First");
    }

    fn report(session_id: &str, iterations: u32) -> ConvergenceReport {
        ConvergenceReport {
            session_id: session_id.to_string(),
            title: "T".to_string(),
            document_type: "document".to_string(),
            initial_version: 1,
            final_version: iterations,
            iteration_count: iterations,
            converged: false,
            convergence_reason: format!("Reached maximum iterations ({})", iterations),
            stopped_by: StoppedBy::MaxIterations,
            total_issues_identified: 0,
            final_issue_count: SeverityCounts::default(),
            token_usage: UsageLedger::new(),
            total_tokens: 0,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            participants: vec![],
            moderator_focus: "Fix High issues".to_string(),
            convergence_criteria: None,
            continued_from_iteration: None,
            history: vec![],
        }
    }

    #[tokio::test]
    async fn test_supersede_report_archives_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = store.create_session("T").await.unwrap();

        assert!(matches!(
            store.supersede_report(&id, &report(&id, 2)).await,
            Err(StorageError::NotFound(_))
        ));

        store.save_report(&id, &report(&id, 2)).await.unwrap();
        assert!(matches!(
            store.save_report(&id, &report(&id, 3)).await,
            Err(StorageError::AlreadyExists(_))
        ));

        store.supersede_report(&id, &report(&id, 5)).await.unwrap();
        store.supersede_report(&id, &report(&id, 7)).await.unwrap();

        let current = store.load_report(&id).await.unwrap().unwrap();
        assert_eq!(current.iteration_count, 7);
        let archived: Vec<_> = store
            .load_superseded_reports(&id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.iteration_count)
            .collect();
        assert_eq!(archived, vec![2, 5]);
        assert!(
            dir.path()
                .join(&id)
                .join("convergence_report_superseded_1.json")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_delete_session() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let store = FileSessionStore::new(dir.path()).with_registry(registry.clone());
        let id = store.create_session("Doomed").await.unwrap();
        store
            .save_document(&id, &Document::initial("Doomed", "x", "document"))
            .await
            .unwrap();

        let guard = registry.try_activate(&id).unwrap();
        assert!(matches!(
            store.delete_session(&id).await,
            Err(StorageError::SessionActive(_))
        ));
        assert!(store.exists(&id).await.unwrap());
        drop(guard);

        store.delete_session(&id).await.unwrap();
        assert!(!store.exists(&id).await.unwrap());
        assert!(store.list_sessions(None).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_session(&id).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_index_survives_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let id = FileSessionStore::new(dir.path())
            .create_session("Persisted")
            .await
            .unwrap();

        let reopened = FileSessionStore::new(dir.path());
        assert!(reopened.exists(&id).await.unwrap());
        assert_eq!(reopened.list_sessions(None).await.unwrap().len(), 1);
    }
}
