//! Pipeline orchestrator coordinating extraction, generation, embedding, and
//! the similarity index.
//!
//! Each public entry point is one unit of work dispatched by the job queue.
//! Within a unit the steps run strictly in sequence; failures never propagate
//! to the original caller. The only observable signals are the document's
//! status and the audit-log trail.

use crate::{
    config::get_config,
    extract::extract_text,
    pipeline::types::PipelineError,
    services::ServiceHandles,
    storage::FileStorage,
    store::{
        ContentKind, Document, DocumentStatus, GeneratedContent, LogEntry, LogLevel, Repository,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Coordinates the primary pipeline, the on-demand regeneration flows, and
/// semantic search. Construct once near process start and share through an
/// `Arc`; the service owns the long-lived external-service handles.
pub struct PipelineService {
    repo: Arc<dyn Repository>,
    storage: FileStorage,
    handles: ServiceHandles,
}

impl PipelineService {
    /// Build a new pipeline service over the given collaborators.
    pub fn new(repo: Arc<dyn Repository>, storage: FileStorage, handles: ServiceHandles) -> Self {
        Self {
            repo,
            storage,
            handles,
        }
    }

    /// Access the shared repository.
    pub fn repo(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    /// Run the primary pipeline for an uploaded document: extract text,
    /// generate notes, embed, and upsert into the index. On success the
    /// document becomes `completed` with an INFO audit entry; on any failure
    /// it becomes `failed` with an ERROR entry naming the file and cause.
    /// A missing document aborts without any mutation.
    pub async fn process_document(&self, document_id: Uuid) {
        let doc = match self.repo.get_document(document_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::warn!(%document_id, "Document not found; nothing to process");
                return;
            }
            Err(error) => {
                tracing::error!(%document_id, error = %error, "Failed to load document");
                return;
            }
        };

        tracing::info!(%document_id, filename = %doc.filename, "Processing document");
        match self.run_primary(&doc).await {
            Ok(()) => {
                self.mark(doc.id, DocumentStatus::Completed).await;
                self.record(
                    doc.user_id,
                    Some(doc.id),
                    LogLevel::Info,
                    format!("Document \"{}\" processed successfully.", doc.filename),
                )
                .await;
                tracing::info!(%document_id, "Document processing completed");
            }
            Err(error) => {
                self.mark(doc.id, DocumentStatus::Failed).await;
                self.record(
                    doc.user_id,
                    Some(doc.id),
                    LogLevel::Error,
                    format!("Processing failed for \"{}\": {error}", doc.filename),
                )
                .await;
                tracing::error!(%document_id, error = %error, "Document processing failed");
            }
        }
    }

    async fn run_primary(&self, doc: &Document) -> Result<(), PipelineError> {
        let text = self.extract(doc).await?;
        tracing::debug!(document_id = %doc.id, chars = text.len(), "Text extracted");

        let adapter = self
            .handles
            .adapter()
            .ok_or(PipelineError::ServiceUnavailable("generative adapter"))?;
        let notes = adapter.generate_notes(&text).await?;
        self.repo
            .insert_content(GeneratedContent::markdown(
                doc.id,
                ContentKind::Notes,
                notes,
            ))
            .await?;
        tracing::debug!(document_id = %doc.id, "Notes persisted");

        let embedder = self
            .handles
            .embedder()
            .ok_or(PipelineError::ServiceUnavailable("embedding client"))?;
        let vector = embedder.embed(&text).await?;

        let index = self
            .handles
            .index()
            .ok_or(PipelineError::ServiceUnavailable("similarity index"))?;
        let config = get_config();
        index
            .upsert_document(
                &config.qdrant_collection_name,
                doc.id,
                vector,
                doc.user_id,
            )
            .await?;

        Ok(())
    }

    /// Regenerate a summary from the document's existing notes. Missing
    /// document or notes aborts with a trace only; other failures append an
    /// ERROR audit entry. `Document.status` is never touched.
    pub async fn generate_summary_from_notes(&self, document_id: Uuid) {
        let Some((doc, notes_text)) = self.load_notes(document_id).await else {
            return;
        };
        tracing::info!(%document_id, filename = %doc.filename, "Generating summary from notes");
        match self.run_summary(&doc, &notes_text).await {
            Ok(()) => {
                self.record(
                    doc.user_id,
                    Some(doc.id),
                    LogLevel::Info,
                    "Summary generated successfully.".to_string(),
                )
                .await;
            }
            Err(error) => {
                self.record(
                    doc.user_id,
                    Some(doc.id),
                    LogLevel::Error,
                    format!("Summary generation failed: {error}"),
                )
                .await;
                tracing::error!(%document_id, error = %error, "Summary generation failed");
            }
        }
    }

    async fn run_summary(&self, doc: &Document, notes_text: &str) -> Result<(), PipelineError> {
        let adapter = self
            .handles
            .adapter()
            .ok_or(PipelineError::ServiceUnavailable("generative adapter"))?;
        let summary = adapter.generate_summary(notes_text).await?;
        self.repo
            .insert_content(GeneratedContent::markdown(
                doc.id,
                ContentKind::Summary,
                summary,
            ))
            .await?;
        Ok(())
    }

    /// Regenerate a quiz from the document's existing notes. Same failure
    /// semantics as [`Self::generate_summary_from_notes`].
    pub async fn generate_quiz_from_notes(&self, document_id: Uuid) {
        let Some((doc, notes_text)) = self.load_notes(document_id).await else {
            return;
        };
        tracing::info!(%document_id, filename = %doc.filename, "Generating quiz from notes");
        match self.run_quiz(&doc, &notes_text).await {
            Ok(()) => {
                self.record(
                    doc.user_id,
                    Some(doc.id),
                    LogLevel::Info,
                    "Quiz generated successfully.".to_string(),
                )
                .await;
            }
            Err(error) => {
                self.record(
                    doc.user_id,
                    Some(doc.id),
                    LogLevel::Error,
                    format!("Quiz generation failed: {error}"),
                )
                .await;
                tracing::error!(%document_id, error = %error, "Quiz generation failed");
            }
        }
    }

    async fn run_quiz(&self, doc: &Document, notes_text: &str) -> Result<(), PipelineError> {
        let adapter = self
            .handles
            .adapter()
            .ok_or(PipelineError::ServiceUnavailable("generative adapter"))?;
        let quiz = adapter.generate_quiz(notes_text).await?;
        let payload = serde_json::to_value(&quiz).map_err(|error| {
            PipelineError::Generation(crate::generate::AdapterError::InvalidResponse(
                error.to_string(),
            ))
        })?;
        self.repo
            .insert_content(GeneratedContent::with_payload(
                doc.id,
                ContentKind::Quiz,
                payload,
            ))
            .await?;
        Ok(())
    }

    /// Embed a query and return the caller's documents in the index's ranked
    /// order. Hits that no longer resolve, or that are not owned by the
    /// caller, are dropped.
    pub async fn search_documents(
        &self,
        user_id: Uuid,
        query: &str,
    ) -> Result<Vec<Document>, PipelineError> {
        let embedder = self
            .handles
            .embedder()
            .ok_or(PipelineError::ServiceUnavailable("embedding client"))?;
        let vector = embedder.embed(query).await?;

        let index = self
            .handles
            .index()
            .ok_or(PipelineError::ServiceUnavailable("similarity index"))?;
        let config = get_config();
        let hits = index
            .search_documents(
                &config.qdrant_collection_name,
                vector,
                user_id,
                config.search_top_k,
            )
            .await?;

        let mut documents = Vec::with_capacity(hits.len());
        for hit in hits {
            let Ok(id) = Uuid::parse_str(&hit.id) else {
                tracing::warn!(id = %hit.id, "Skipping search hit with non-UUID id");
                continue;
            };
            if let Some(doc) = self.repo.get_document(id).await?
                && doc.user_id == user_id
            {
                documents.push(doc);
            }
        }
        Ok(documents)
    }

    /// Delete a document owned by the caller: repository row (cascading its
    /// content), stored bytes, and the index vector. Returns `false` when
    /// the document does not exist or belongs to someone else. Blob and
    /// index cleanup are best effort.
    pub async fn delete_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> Result<bool, PipelineError> {
        let Some(doc) = self.repo.get_document(document_id).await? else {
            return Ok(false);
        };
        if doc.user_id != user_id {
            return Ok(false);
        }

        self.repo.delete_document(document_id).await?;
        if let Err(error) = self.storage.delete(&doc.filepath).await {
            tracing::warn!(%document_id, error = %error, "Failed to remove stored bytes");
        }
        if let Some(index) = self.handles.index() {
            let config = get_config();
            if let Err(error) = index
                .delete_document(&config.qdrant_collection_name, document_id)
                .await
            {
                tracing::warn!(%document_id, error = %error, "Failed to remove index vector");
            }
        }
        tracing::info!(%document_id, "Document deleted");
        Ok(true)
    }

    async fn extract(&self, doc: &Document) -> Result<String, PipelineError> {
        let file_type = doc.file_type.clone();
        let path = PathBuf::from(&doc.filepath);
        let text = tokio::task::spawn_blocking(move || extract_text(&file_type, &path))
            .await
            .map_err(|error| {
                crate::extract::ExtractError::Parse(format!("extraction task failed: {error}"))
            })??;
        Ok(text)
    }

    async fn load_notes(&self, document_id: Uuid) -> Option<(Document, String)> {
        let doc = match self.repo.get_document(document_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::warn!(%document_id, "Document not found for on-demand generation");
                return None;
            }
            Err(error) => {
                tracing::error!(%document_id, error = %error, "Failed to load document");
                return None;
            }
        };
        let notes = match self.repo.find_content(document_id, ContentKind::Notes).await {
            Ok(Some(notes)) => notes,
            Ok(None) => {
                tracing::warn!(%document_id, "No notes found for on-demand generation");
                return None;
            }
            Err(error) => {
                tracing::error!(%document_id, error = %error, "Failed to load notes");
                return None;
            }
        };
        let Some(text) = notes.markdown_text() else {
            tracing::warn!(%document_id, "Notes record carries no markdown text");
            return None;
        };
        Some((doc, text.to_string()))
    }

    async fn mark(&self, document_id: Uuid, status: DocumentStatus) {
        if let Err(error) = self.repo.set_status(document_id, status).await {
            tracing::error!(%document_id, error = %error, "Failed to update document status");
        }
    }

    /// Append an audit record; append failures are traced, never fatal.
    async fn record(
        &self,
        user_id: Uuid,
        document_id: Option<Uuid>,
        level: LogLevel,
        message: String,
    ) {
        let entry = LogEntry::new(user_id, document_id, level, message);
        if let Err(error) = self.repo.append_log(entry).await {
            tracing::warn!(error = %error, "Failed to append audit log entry");
        }
    }
}
