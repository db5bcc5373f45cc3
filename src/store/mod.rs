//! Document, generated-content, and audit-log entities plus the repository seam.
//!
//! The relational database is an external collaborator; the pipeline only
//! depends on the [`Repository`] trait. [`MemoryStore`] provides the
//! in-process implementation used by the server and the test suite.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced row does not exist.
    #[error("Record not found: {0}")]
    NotFound(Uuid),
}

/// Processing status of an uploaded document.
///
/// A document starts at `processing` and is moved exactly once to a terminal
/// state by the pipeline; repositories must never overwrite a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Primary pipeline has been enqueued but has not finished.
    Processing,
    /// Primary pipeline finished successfully.
    Completed,
    /// Primary pipeline aborted; see the audit log for the cause.
    Failed,
}

impl DocumentStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Metadata record for one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Opaque unique identifier, immutable.
    pub id: Uuid,
    /// Owning user reference.
    pub user_id: Uuid,
    /// Display filename as uploaded.
    pub filename: String,
    /// Storage key for the raw bytes.
    pub filepath: String,
    /// Declared file type: lowercase extension without the leading dot.
    pub file_type: String,
    /// Size of the uploaded payload in bytes.
    pub size: usize,
    /// Creation timestamp (RFC3339), set once.
    pub upload_date: String,
    /// Current processing status.
    pub status: DocumentStatus,
    /// Informational version counter, starts at 1.
    pub version: u32,
}

impl Document {
    /// Build a new document in the initial `processing` state.
    pub fn new(user_id: Uuid, filename: String, file_type: String, size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            filename,
            filepath: String::new(),
            file_type,
            size,
            upload_date: now_rfc3339(),
            status: DocumentStatus::Processing,
            version: 1,
        }
    }
}

/// Kind of AI-produced artifact tied to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Canonical structured Markdown extraction of the document.
    Notes,
    /// Markdown prose summary regenerated from the notes.
    Summary,
    /// Structured quiz object regenerated from the notes.
    Quiz,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Notes => "notes",
            Self::Summary => "summary",
            Self::Quiz => "quiz",
        };
        f.write_str(name)
    }
}

/// One AI-produced artifact tied to a document. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning document reference.
    pub document_id: Uuid,
    /// Artifact kind.
    pub content_type: ContentKind,
    /// Artifact payload: `{"markdown_text": ...}` for notes and summaries,
    /// the quiz object for quizzes.
    pub content_data: Value,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
}

impl GeneratedContent {
    /// Build a markdown-bearing artifact (notes or summary).
    pub fn markdown(document_id: Uuid, kind: ContentKind, markdown_text: String) -> Self {
        Self::with_payload(document_id, kind, json!({ "markdown_text": markdown_text }))
    }

    /// Build an artifact carrying an arbitrary structured payload.
    pub fn with_payload(document_id: Uuid, kind: ContentKind, content_data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content_type: kind,
            content_data,
            created_at: now_rfc3339(),
        }
    }

    /// Extract the markdown body, when present and non-empty.
    pub fn markdown_text(&self) -> Option<&str> {
        self.content_data
            .get("markdown_text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    }
}

/// Severity of an audit-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Successful outcome worth recording.
    Info,
    /// Degraded but non-fatal outcome.
    Warn,
    /// Failed outcome; the message carries the cause.
    Error,
}

/// Append-only audit record tied to a user and optionally a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique identifier.
    pub id: Uuid,
    /// Acting user reference.
    pub user_id: Uuid,
    /// Referenced document, if one could be resolved. Nulled when the
    /// document is later deleted.
    pub document_id: Option<Uuid>,
    /// Severity level.
    pub level: LogLevel,
    /// Free-text message.
    pub message: String,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
}

impl LogEntry {
    /// Build a new audit record.
    pub fn new(user_id: Uuid, document_id: Option<Uuid>, level: LogLevel, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            document_id,
            level,
            message,
            created_at: now_rfc3339(),
        }
    }
}

/// CRUD seam over documents, generated content, and audit logs.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persist a new document.
    async fn insert_document(&self, document: Document) -> Result<Document, StoreError>;

    /// Fetch a document by id.
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// List a user's documents, newest first.
    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>, StoreError>;

    /// Move a document to a new status. Terminal states are never
    /// overwritten; the stored document is returned either way.
    async fn set_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
    ) -> Result<Option<Document>, StoreError>;

    /// Delete a document, cascading its generated content and detaching any
    /// audit-log references. Returns the removed document.
    async fn delete_document(&self, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Persist a generated artifact. Notes are canonical: inserting a notes
    /// record replaces any prior notes for the same document, while summary
    /// and quiz records accumulate.
    async fn insert_content(
        &self,
        content: GeneratedContent,
    ) -> Result<GeneratedContent, StoreError>;

    /// Fetch the newest artifact of the given kind for a document.
    async fn find_content(
        &self,
        document_id: Uuid,
        kind: ContentKind,
    ) -> Result<Option<GeneratedContent>, StoreError>;

    /// List all artifacts for a document in creation order.
    async fn list_content(&self, document_id: Uuid) -> Result<Vec<GeneratedContent>, StoreError>;

    /// Append an audit record.
    async fn append_log(&self, entry: LogEntry) -> Result<(), StoreError>;

    /// List a user's audit records in creation order.
    async fn list_logs(&self, user_id: Uuid) -> Result<Vec<LogEntry>, StoreError>;
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn markdown_text_rejects_empty_body() {
        let doc_id = Uuid::new_v4();
        let content = GeneratedContent::markdown(doc_id, ContentKind::Notes, String::new());
        assert!(content.markdown_text().is_none());

        let content = GeneratedContent::markdown(doc_id, ContentKind::Notes, "## Heading".into());
        assert_eq!(content.markdown_text(), Some("## Heading"));
    }

    #[test]
    fn status_terminality() {
        assert!(!DocumentStatus::Processing.is_terminal());
        assert!(DocumentStatus::Completed.is_terminal());
        assert!(DocumentStatus::Failed.is_terminal());
    }

    #[test]
    fn document_serializes_with_camel_case_keys() {
        let doc = Document::new(Uuid::new_v4(), "paper.pdf".into(), "pdf".into(), 42);
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(value["fileType"], "pdf");
        assert_eq!(value["status"], "processing");
        assert_eq!(value["version"], 1);
        assert!(value["uploadDate"].is_string());
    }
}
