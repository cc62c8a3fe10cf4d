//! In-memory session store
//!
//! Same write-once semantics as the file store, without touching the disk.
//! Used for dry runs and tests.

use super::new_session_id;
use async_trait::async_trait;
use roundtable_application::ports::session_store::{SessionStore, StorageError};
use roundtable_application::use_cases::session_registry::SessionRegistry;
use roundtable_domain::{ConvergenceReport, Document, Review, RoundtableSnapshot, SessionEntry};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct SessionRecords {
    entry: Option<SessionEntry>,
    documents: BTreeMap<u32, Document>,
    reviews: BTreeMap<u32, Vec<Review>>,
    config: Option<RoundtableSnapshot>,
    report: Option<ConvergenceReport>,
    superseded: Vec<ConvergenceReport>,
}

#[derive(Debug, Default)]
struct State {
    sessions: HashMap<String, SessionRecords>,
    /// Session ids in creation order
    order: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: Mutex<State>,
    registry: Option<SessionRegistry>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: SessionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }
}

fn not_found(session_id: &str) -> StorageError {
    StorageError::NotFound(format!("session {}", session_id))
}

impl State {
    fn records(&mut self, session_id: &str) -> Result<&mut SessionRecords, StorageError> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| not_found(session_id))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, title: &str) -> Result<String, StorageError> {
        let entry = SessionEntry::new(new_session_id(), title);
        let id = entry.session_id.clone();
        let mut state = self.state.lock().await;
        state.sessions.insert(
            id.clone(),
            SessionRecords {
                entry: Some(entry),
                ..Default::default()
            },
        );
        state.order.push(id.clone());
        Ok(id)
    }

    async fn save_document(
        &self,
        session_id: &str,
        document: &Document,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let records = state.records(session_id)?;
        if records.documents.contains_key(&document.version) {
            return Err(StorageError::AlreadyExists(format!(
                "session {} document v{}",
                session_id, document.version
            )));
        }
        records.documents.insert(document.version, document.clone());
        Ok(())
    }

    async fn load_document(
        &self,
        session_id: &str,
        version: u32,
    ) -> Result<Document, StorageError> {
        let mut state = self.state.lock().await;
        state
            .records(session_id)?
            .documents
            .get(&version)
            .cloned()
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
        let mut state = self.state.lock().await;
        let records = state.records(session_id)?;
        if records.reviews.contains_key(&version) {
            return Err(StorageError::AlreadyExists(format!(
                "session {} reviews v{}",
                session_id, version
            )));
        }
        records.reviews.insert(version, reviews.to_vec());
        Ok(())
    }

    async fn load_reviews(
        &self,
        session_id: &str,
        version: u32,
    ) -> Result<Vec<Review>, StorageError> {
        let mut state = self.state.lock().await;
        Ok(state
            .records(session_id)?
            .reviews
            .get(&version)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_config(
        &self,
        session_id: &str,
        snapshot: &RoundtableSnapshot,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let records = state.records(session_id)?;
        if records.config.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "session {} roundtable config",
                session_id
            )));
        }
        records.config = Some(snapshot.clone());
        Ok(())
    }

    async fn load_config(
        &self,
        session_id: &str,
    ) -> Result<Option<RoundtableSnapshot>, StorageError> {
        let mut state = self.state.lock().await;
        Ok(state.records(session_id)?.config.clone())
    }

    async fn save_report(
        &self,
        session_id: &str,
        report: &ConvergenceReport,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let records = state.records(session_id)?;
        if records.report.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "session {} convergence report",
                session_id
            )));
        }
        records.report = Some(report.clone());
        Ok(())
    }

    async fn supersede_report(
        &self,
        session_id: &str,
        report: &ConvergenceReport,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let records = state.records(session_id)?;
        let Some(previous) = records.report.take() else {
            return Err(StorageError::NotFound(format!(
                "session {} convergence report",
                session_id
            )));
        };
        records.superseded.push(previous);
        records.report = Some(report.clone());
        Ok(())
    }

    async fn load_report(
        &self,
        session_id: &str,
    ) -> Result<Option<ConvergenceReport>, StorageError> {
        let mut state = self.state.lock().await;
        Ok(state.records(session_id)?.report.clone())
    }

    async fn load_superseded_reports(
        &self,
        session_id: &str,
    ) -> Result<Vec<ConvergenceReport>, StorageError> {
        let mut state = self.state.lock().await;
        Ok(state.records(session_id)?.superseded.clone())
    }

    async fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<SessionEntry>, StorageError> {
        let state = self.state.lock().await;
        let mut sessions: Vec<SessionEntry> = state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.sessions.get(id)?.entry.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    async fn session_entry(&self, session_id: &str) -> Result<Option<SessionEntry>, StorageError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .get(session_id)
            .and_then(|records| records.entry.clone()))
    }

    async fn exists(&self, session_id: &str) -> Result<bool, StorageError> {
        Ok(self.state.lock().await.sessions.contains_key(session_id))
    }

    async fn latest_version(&self, session_id: &str) -> Result<Option<u32>, StorageError> {
        let mut state = self.state.lock().await;
        Ok(state
            .records(session_id)?
            .documents
            .keys()
            .next_back()
            .copied())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), StorageError> {
        if let Some(registry) = &self.registry
            && registry.is_active(session_id)
        {
            return Err(StorageError::SessionActive(session_id.to_string()));
        }
        let mut state = self.state.lock().await;
        if state.sessions.remove(session_id).is_none() {
            return Err(not_found(session_id));
        }
        state.order.retain(|id| id != session_id);
        Ok(())
    }
}
