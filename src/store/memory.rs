//! In-process repository backed by hash maps behind an async lock.

use super::{
    ContentKind, Document, DocumentStatus, GeneratedContent, LogEntry, Repository, StoreError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    documents: HashMap<Uuid, Document>,
    content: Vec<GeneratedContent>,
    logs: Vec<LogEntry>,
}

/// In-memory [`Repository`] implementation.
///
/// Each method takes the lock once, mirroring the row-level atomicity of the
/// relational collaborator: one write per call, no cross-call transactions.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn insert_document(&self, document: Document) -> Result<Document, StoreError> {
        let mut tables = self.tables.write().await;
        tables.documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.documents.get(&id).cloned())
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>, StoreError> {
        let tables = self.tables.read().await;
        let mut documents: Vec<Document> = tables
            .documents
            .values()
            .filter(|doc| doc.user_id == user_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(documents)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
    ) -> Result<Option<Document>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(doc) = tables.documents.get_mut(&id) else {
            return Ok(None);
        };
        if doc.status.is_terminal() {
            tracing::warn!(
                document_id = %id,
                current = ?doc.status,
                requested = ?status,
                "Refusing to leave terminal status"
            );
            return Ok(Some(doc.clone()));
        }
        doc.status = status;
        Ok(Some(doc.clone()))
    }

    async fn delete_document(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        let mut tables = self.tables.write().await;
        let removed = tables.documents.remove(&id);
        if removed.is_some() {
            tables.content.retain(|content| content.document_id != id);
            for log in tables
                .logs
                .iter_mut()
                .filter(|log| log.document_id == Some(id))
            {
                log.document_id = None;
            }
        }
        Ok(removed)
    }

    async fn insert_content(
        &self,
        content: GeneratedContent,
    ) -> Result<GeneratedContent, StoreError> {
        let mut tables = self.tables.write().await;
        if content.content_type == ContentKind::Notes {
            // Notes are the canonical source for regeneration; keep one row.
            tables.content.retain(|existing| {
                existing.document_id != content.document_id
                    || existing.content_type != ContentKind::Notes
            });
        }
        tables.content.push(content.clone());
        Ok(content)
    }

    async fn find_content(
        &self,
        document_id: Uuid,
        kind: ContentKind,
    ) -> Result<Option<GeneratedContent>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .content
            .iter()
            .rev()
            .find(|content| content.document_id == document_id && content.content_type == kind)
            .cloned())
    }

    async fn list_content(&self, document_id: Uuid) -> Result<Vec<GeneratedContent>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .content
            .iter()
            .filter(|content| content.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn append_log(&self, entry: LogEntry) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.logs.push(entry);
        Ok(())
    }

    async fn list_logs(&self, user_id: Uuid) -> Result<Vec<LogEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .logs
            .iter()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LogLevel;
    use serde_json::json;

    fn document(user_id: Uuid) -> Document {
        Document::new(user_id, "notes.txt".into(), "txt".into(), 12)
    }

    #[tokio::test]
    async fn terminal_status_is_never_overwritten() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let doc = store
            .insert_document(document(user))
            .await
            .expect("insert");

        let doc = store
            .set_status(doc.id, DocumentStatus::Completed)
            .await
            .expect("set status")
            .expect("document present");
        assert_eq!(doc.status, DocumentStatus::Completed);

        let doc = store
            .set_status(doc.id, DocumentStatus::Failed)
            .await
            .expect("set status")
            .expect("document present");
        assert_eq!(doc.status, DocumentStatus::Completed);
    }

    #[tokio::test]
    async fn notes_insert_replaces_prior_notes() {
        let store = MemoryStore::new();
        let doc_id = Uuid::new_v4();

        store
            .insert_content(GeneratedContent::markdown(
                doc_id,
                ContentKind::Notes,
                "first".into(),
            ))
            .await
            .expect("insert");
        store
            .insert_content(GeneratedContent::markdown(
                doc_id,
                ContentKind::Notes,
                "second".into(),
            ))
            .await
            .expect("insert");

        let all = store.list_content(doc_id).await.expect("list");
        assert_eq!(all.len(), 1);
        let notes = store
            .find_content(doc_id, ContentKind::Notes)
            .await
            .expect("find")
            .expect("notes present");
        assert_eq!(notes.markdown_text(), Some("second"));
    }

    #[tokio::test]
    async fn summaries_accumulate() {
        let store = MemoryStore::new();
        let doc_id = Uuid::new_v4();

        for body in ["one", "two"] {
            store
                .insert_content(GeneratedContent::markdown(
                    doc_id,
                    ContentKind::Summary,
                    body.into(),
                ))
                .await
                .expect("insert");
        }

        let all = store.list_content(doc_id).await.expect("list");
        assert_eq!(all.len(), 2);
        let newest = store
            .find_content(doc_id, ContentKind::Summary)
            .await
            .expect("find")
            .expect("summary present");
        assert_eq!(newest.markdown_text(), Some("two"));
    }

    #[tokio::test]
    async fn delete_cascades_content_and_detaches_logs() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let doc = store
            .insert_document(document(user))
            .await
            .expect("insert");
        store
            .insert_content(GeneratedContent::with_payload(
                doc.id,
                ContentKind::Quiz,
                json!({"multiple_choice": []}),
            ))
            .await
            .expect("insert content");
        store
            .append_log(LogEntry::new(
                user,
                Some(doc.id),
                LogLevel::Info,
                "processed".into(),
            ))
            .await
            .expect("append log");

        let removed = store.delete_document(doc.id).await.expect("delete");
        assert!(removed.is_some());
        assert!(store.list_content(doc.id).await.expect("list").is_empty());

        let logs = store.list_logs(user).await.expect("logs");
        assert_eq!(logs.len(), 1);
        assert!(logs[0].document_id.is_none());
    }

    #[tokio::test]
    async fn documents_list_newest_first_per_user() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut first = document(user);
        first.upload_date = "2026-01-01T00:00:00Z".into();
        let mut second = document(user);
        second.upload_date = "2026-02-01T00:00:00Z".into();
        let stranger = document(other);

        for doc in [first.clone(), second.clone(), stranger] {
            store.insert_document(doc).await.expect("insert");
        }

        let docs = store.list_documents(user).await.expect("list");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, second.id);
        assert_eq!(docs[1].id, first.id);
    }
}
