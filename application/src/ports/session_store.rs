//! Session store port
//!
//! Append-only persistence of a session's document versions, reviews,
//! roster snapshot and convergence report.
//!
//! | Record | Key | Written |
//! |--------|-----|---------|
//! | Index entry | session | at `create_session` |
//! | Document | (session, version) | once per version |
//! | Reviews | (session, version) | once per reviewed version |
//! | Roster snapshot | session | once |
//! | Convergence report | session | when a run terminates |
//!
//! Every write is write-once: saving a record that already exists fails with
//! [`StorageError::AlreadyExists`]. The one exception is
//! [`SessionStore::supersede_report`], which a continued run uses to replace
//! the report of the run it extended; the replaced report is kept.

use async_trait::async_trait;
use roundtable_domain::{ConvergenceReport, Document, Review, RoundtableSnapshot, SessionEntry};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Session {0} is active")]
    SessionActive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register a new session and return its id
    async fn create_session(&self, title: &str) -> Result<String, StorageError>;

    async fn save_document(
        &self,
        session_id: &str,
        document: &Document,
    ) -> Result<(), StorageError>;

    /// Fails with [`StorageError::NotFound`] if the version was never saved
    async fn load_document(
        &self,
        session_id: &str,
        version: u32,
    ) -> Result<Document, StorageError>;

    async fn save_reviews(
        &self,
        session_id: &str,
        version: u32,
        reviews: &[Review],
    ) -> Result<(), StorageError>;

    /// Reviews of `version`, empty if that version was never reviewed
    async fn load_reviews(
        &self,
        session_id: &str,
        version: u32,
    ) -> Result<Vec<Review>, StorageError>;

    async fn save_config(
        &self,
        session_id: &str,
        snapshot: &RoundtableSnapshot,
    ) -> Result<(), StorageError>;

    async fn load_config(
        &self,
        session_id: &str,
    ) -> Result<Option<RoundtableSnapshot>, StorageError>;

    async fn save_report(
        &self,
        session_id: &str,
        report: &ConvergenceReport,
    ) -> Result<(), StorageError>;

    /// Replace the report of a finished session
    ///
    /// Fails with [`StorageError::NotFound`] if the session has no report.
    /// The previous report stays available through
    /// [`SessionStore::load_superseded_reports`].
    async fn supersede_report(
        &self,
        session_id: &str,
        report: &ConvergenceReport,
    ) -> Result<(), StorageError>;

    /// Reports replaced by continued runs, oldest first
    async fn load_superseded_reports(
        &self,
        session_id: &str,
    ) -> Result<Vec<ConvergenceReport>, StorageError>;

    /// `None` when the run never finished
    async fn load_report(
        &self,
        session_id: &str,
    ) -> Result<Option<ConvergenceReport>, StorageError>;

    /// Index entries, newest first
    async fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<SessionEntry>, StorageError>;

    async fn session_entry(&self, session_id: &str) -> Result<Option<SessionEntry>, StorageError>;

    async fn exists(&self, session_id: &str) -> Result<bool, StorageError>;

    /// Highest persisted document version, `None` if the session has none
    async fn latest_version(&self, session_id: &str) -> Result<Option<u32>, StorageError>;

    /// Remove the session and all its records
    ///
    /// Fails with [`StorageError::SessionActive`] while a run owns the session.
    async fn delete_session(&self, session_id: &str) -> Result<(), StorageError>;
}
