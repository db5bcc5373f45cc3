//! HTTP surface for studydesk.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /documents` – Accept a multipart upload, create the document in
//!   `processing` state, store the raw bytes, and enqueue the primary pipeline.
//! - `GET /documents` – List the caller's documents, newest first.
//! - `GET /documents/{id}` – One document plus its generated content records.
//! - `DELETE /documents/{id}` – Remove a document, its content, stored bytes,
//!   and index vector.
//! - `POST /documents/{id}/generate` – Enqueue an on-demand summary or quiz
//!   regeneration from the document's existing notes; responds `202 Accepted`.
//! - `GET /search?q=` – Semantic search over the caller's documents.
//! - `GET /logs` – The caller's audit trail.
//!
//! Authentication is an external collaborator; the owning user is taken from
//! the `X-User-Id` header. Pipeline outcomes never surface here — callers
//! observe them through document status and the audit log.

use crate::pipeline::{PipelineError, PipelineService};
use crate::queue::{Job, JobKind, JobQueue};
use crate::storage::FileStorage;
use crate::store::{ContentKind, Document, GeneratedContent, LogEntry, Repository};
use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared state handed to every handler.
pub struct AppState {
    /// Document/content/log repository.
    pub repo: Arc<dyn Repository>,
    /// Blob store for uploaded bytes.
    pub storage: FileStorage,
    /// Fire-and-forget job dispatch.
    pub queue: JobQueue,
    /// Pipeline service for the synchronous search path.
    pub pipeline: Arc<PipelineService>,
}

/// Build the HTTP router exposing the document API surface.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/documents", post(upload_document).get(list_documents))
        .route(
            "/documents/:id",
            get(get_document).delete(delete_document),
        )
        .route("/documents/:id/generate", post(generate_content))
        .route("/search", get(search_documents))
        .route("/logs", get(list_logs))
        .with_state(state)
}

/// Response body for `GET /documents/{id}`.
#[derive(Serialize)]
struct DocumentDetailResponse {
    #[serde(flatten)]
    document: Document,
    generated_content: Vec<GeneratedContent>,
}

/// Request body for `POST /documents/{id}/generate`.
#[derive(Deserialize)]
struct GenerateRequest {
    /// Requested artifact kind: `summary` or `quiz`.
    #[serde(rename = "type")]
    kind: String,
}

/// Query parameters for `GET /search`.
#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

/// Accept a raw file upload and enqueue the primary pipeline.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let user_id = owner_id(&headers)?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::Validation(format!("malformed multipart body: {error}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(ToString::to_string)
                .ok_or_else(|| ApiError::Validation("uploaded file needs a filename".into()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|error| ApiError::Validation(format!("failed to read upload: {error}")))?;
            upload = Some((filename, bytes.to_vec()));
        }
    }
    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::Validation("no file provided".into()))?;

    // The declared type is the lowercased extension, without the leading dot.
    let file_type = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let mut document = Document::new(user_id, filename, file_type, bytes.len());
    document.filepath = state
        .storage
        .save(document.id, &document.file_type, &bytes)
        .await
        .map_err(PipelineError::from)?;
    let document = state.repo.insert_document(document).await?;

    state
        .queue
        .dispatch(Job {
            kind: JobKind::Process,
            document_id: document.id,
        })
        .await;
    tracing::info!(
        document_id = %document.id,
        filename = %document.filename,
        size = document.size,
        "Upload accepted"
    );

    Ok((StatusCode::CREATED, Json(document)))
}

/// List the caller's documents, newest first.
async fn list_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Document>>, ApiError> {
    let user_id = owner_id(&headers)?;
    let documents = state.repo.list_documents(user_id).await?;
    Ok(Json(documents))
}

/// Fetch one document with its generated content.
async fn get_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentDetailResponse>, ApiError> {
    let user_id = owner_id(&headers)?;
    let document = load_owned(&state, user_id, id).await?;
    let generated_content = state.repo.list_content(id).await?;
    Ok(Json(DocumentDetailResponse {
        document,
        generated_content,
    }))
}

/// Delete a document along with its content, stored bytes, and index vector.
async fn delete_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = owner_id(&headers)?;
    let removed = state.pipeline.delete_document(user_id, id).await?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("document {id} not found")))
    }
}

/// Enqueue an on-demand regeneration, gated on existing notes.
async fn generate_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let user_id = owner_id(&headers)?;

    let kind = match request.kind.as_str() {
        "summary" => JobKind::Summary,
        "quiz" => JobKind::Quiz,
        other => {
            return Err(ApiError::Validation(format!(
                "invalid content type \"{other}\"; expected \"summary\" or \"quiz\""
            )));
        }
    };

    load_owned(&state, user_id, id).await?;
    let notes = state.repo.find_content(id, ContentKind::Notes).await?;
    if notes.and_then(|n| n.markdown_text().map(ToString::to_string)).is_none() {
        return Err(ApiError::Validation(
            "document has no notes to generate from".into(),
        ));
    }

    state
        .queue
        .dispatch(Job {
            kind,
            document_id: id,
        })
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "accepted", "type": request.kind })),
    ))
}

/// Semantic search over the caller's documents, in index-ranked order.
async fn search_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let user_id = owner_id(&headers)?;
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::Validation("query parameter \"q\" is required".into()))?;

    let documents = state.pipeline.search_documents(user_id, query).await?;
    Ok(Json(documents))
}

/// The caller's audit trail in creation order.
async fn list_logs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let user_id = owner_id(&headers)?;
    let logs = state.repo.list_logs(user_id).await?;
    Ok(Json(logs))
}

async fn load_owned(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
) -> Result<Document, ApiError> {
    let document = state
        .repo
        .get_document(id)
        .await?
        .filter(|doc| doc.user_id == user_id)
        .ok_or_else(|| ApiError::NotFound(format!("document {id} not found")))?;
    Ok(document)
}

fn owner_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| ApiError::Validation("missing or invalid X-User-Id header".into()))
}

/// Client-facing error mapping for the synchronous API boundary.
enum ApiError {
    Validation(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Unavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::ServiceUnavailable(_) => Self::Unavailable(error.to_string()),
            _ => Self::Internal(error.to_string()),
        }
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(error: crate::store::StoreError) -> Self {
        Self::Internal(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ensure_test_config;
    use crate::services::ServiceHandles;
    use crate::store::{DocumentStatus, MemoryStore};
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use tower::ServiceExt;

    fn test_state() -> (Arc<AppState>, Arc<MemoryStore>, tempfile::TempDir) {
        ensure_test_config();
        let repo = Arc::new(MemoryStore::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().to_path_buf()).expect("storage");
        let pipeline = Arc::new(PipelineService::new(
            repo.clone(),
            storage.clone(),
            ServiceHandles::from_parts(None, None, None),
        ));
        let queue = JobQueue::start(pipeline.clone());
        (
            Arc::new(AppState {
                repo: repo.clone(),
                storage,
                queue,
                pipeline,
            }),
            repo,
            dir,
        )
    }

    fn multipart_body(filename: &str, content: &str) -> (String, Vec<u8>) {
        let boundary = "studydesk-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        (
            format!("multipart/form-data; boundary={boundary}"),
            body.into_bytes(),
        )
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn upload_creates_processing_document() {
        let (state, repo, _dir) = test_state();
        let app = create_router(state);
        let user = Uuid::new_v4();
        let (content_type, body) = multipart_body("lecture.TXT", "alpha\nbeta\ngamma");

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/documents")
                    .header("x-user-id", user.to_string())
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = response_json(response).await;
        assert_eq!(json["filename"], "lecture.TXT");
        assert_eq!(json["fileType"], "txt");
        assert_eq!(json["status"], "processing");
        assert_eq!(json["size"], 16);
        assert_eq!(json["version"], 1);

        let id = Uuid::parse_str(json["id"].as_str().expect("id")).expect("uuid");
        let stored = repo
            .get_document(id)
            .await
            .expect("get")
            .expect("document persisted");
        assert_eq!(stored.user_id, user);
        assert!(std::path::Path::new(&stored.filepath).exists());
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let (state, _repo, _dir) = test_state();
        let app = create_router(state);
        let boundary = "studydesk-test-boundary";
        let body = format!("--{boundary}--\r\n");

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/documents")
                    .header("x-user-id", Uuid::new_v4().to_string())
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_user_header_is_rejected() {
        let (state, _repo, _dir) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/documents")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_rejects_invalid_kind() {
        let (state, repo, _dir) = test_state();
        let user = Uuid::new_v4();
        let doc = repo
            .insert_document(Document::new(user, "f.txt".into(), "txt".into(), 1))
            .await
            .expect("insert");
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/documents/{}/generate", doc.id))
                    .header("x-user-id", user.to_string())
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "type": "poem" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_requires_existing_document_and_notes() {
        let (state, repo, _dir) = test_state();
        let user = Uuid::new_v4();
        let app = create_router(state);

        // Unknown document id.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/documents/{}/generate", Uuid::new_v4()))
                    .header("x-user-id", user.to_string())
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "type": "summary" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Document present, notes missing.
        let doc = repo
            .insert_document(Document::new(user, "f.txt".into(), "txt".into(), 1))
            .await
            .expect("insert");
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/documents/{}/generate", doc.id))
                    .header("x-user-id", user.to_string())
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "type": "summary" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_accepts_when_notes_exist() {
        let (state, repo, _dir) = test_state();
        let user = Uuid::new_v4();
        let doc = repo
            .insert_document(Document::new(user, "f.txt".into(), "txt".into(), 1))
            .await
            .expect("insert");
        repo.insert_content(GeneratedContent::markdown(
            doc.id,
            ContentKind::Notes,
            "## Notes".into(),
        ))
        .await
        .expect("seed notes");
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/documents/{}/generate", doc.id))
                    .header("x-user-id", user.to_string())
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "type": "quiz" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = response_json(response).await;
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["type"], "quiz");
    }

    #[tokio::test]
    async fn documents_are_scoped_to_their_owner() {
        let (state, repo, _dir) = test_state();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let doc = repo
            .insert_document(Document::new(owner, "f.txt".into(), "txt".into(), 1))
            .await
            .expect("insert");
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri(format!("/documents/{}", doc.id))
                    .header("x-user-id", stranger.to_string())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_requires_a_query() {
        let (state, _repo, _dir) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/search")
                    .header("x-user-id", Uuid::new_v4().to_string())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_without_embedder_is_unavailable() {
        let (state, _repo, _dir) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/search?q=photosynthesis")
                    .header("x-user-id", Uuid::new_v4().to_string())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn detail_includes_generated_content() {
        let (state, repo, _dir) = test_state();
        let user = Uuid::new_v4();
        let doc = repo
            .insert_document(Document::new(user, "f.txt".into(), "txt".into(), 1))
            .await
            .expect("insert");
        repo.set_status(doc.id, DocumentStatus::Completed)
            .await
            .expect("status");
        repo.insert_content(GeneratedContent::markdown(
            doc.id,
            ContentKind::Notes,
            "## Glossary".into(),
        ))
        .await
        .expect("seed notes");
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri(format!("/documents/{}", doc.id))
                    .header("x-user-id", user.to_string())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "completed");
        let content = json["generated_content"].as_array().expect("content");
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["contentType"], "notes");
    }
}
