//! Request handlers.
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use super::state::AppState;
use crate::agent::{AgentContext, AgentMode, AgentOutput};
use crate::error::Error;
use crate::extract::extract_text;

/// An error body `{"error": ...}` with its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(msg) | Error::InvalidArgument(msg) => Self::bad_request(msg),
            Error::NotFound(msg) => Self::not_found(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        Self::from(Error::from(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult = std::result::Result<Json<Value>, ApiError>;

pub async fn home() -> Json<Value> {
    Json(json!({ "message": "StudyMate AI backend running" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /upload: multipart `user_id` + `file` (PDF, DOCX or TXT).
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult {
    let mut user_id = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read user_id: {e}")))?;
                user_id = Some(value);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
                file = Some((filename, bytes));
            }
            _ => {}
        }
    }

    let user_id = user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("user_id is required"))?;
    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("file is required"))?;

    let text = {
        let filename = filename.clone();
        tokio::task::spawn_blocking(move || extract_text(&filename, &bytes))
            .await
            .map_err(|e| ApiError::internal(format!("Upload failed: {e}")))??
    };
    if text.trim().is_empty() {
        return Err(ApiError::bad_request(
            "Could not extract text from document.",
        ));
    }

    let document_id = Uuid::new_v4().to_string();
    {
        let db = state.db().lock().await;
        db.insert_document(&document_id, &user_id, &filename, &text)?;
    }
    info!("Stored {filename} as {document_id} for user {user_id}");

    if state.config().build_index_on_upload {
        // a failed eager build is retried lazily on the first chat question
        if let Err(e) = state.retriever().ensure_index(&document_id, &text).await {
            warn!("Index build for {document_id} failed: {e}");
        }
    }

    Ok(Json(json!({
        "message": "Document uploaded successfully",
        "document_id": document_id,
        "filename": filename,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub user_id: Option<String>,
    pub document_id: Option<String>,
    pub agent_type: Option<String>,
    pub user_query: Option<String>,
}

/// POST /agent: run one agent mode.
pub async fn run_agent(
    State(state): State<AppState>,
    Json(request): Json<AgentRequest>,
) -> ApiResult {
    let user_id = non_blank(request.user_id)
        .ok_or_else(|| ApiError::bad_request("user_id is required"))?;
    let agent_type = non_blank(request.agent_type)
        .ok_or_else(|| ApiError::bad_request("agent_type is required"))?;
    let mode: AgentMode = agent_type.parse()?;
    let document_id = non_blank(request.document_id);

    let (document_text, chat_history) = {
        let db = state.db().lock().await;

        let document_text = match (&document_id, mode.requires_document()) {
            (None, true) => return Err(ApiError::bad_request("document_id is required")),
            (Some(id), true) => db
                .get_document(&user_id, id)?
                .map(|doc| doc.text)
                .ok_or_else(|| {
                    ApiError::not_found("Document not found. Please upload document first.")
                })?,
            (_, false) => String::new(),
        };

        let chat_history = match &document_id {
            Some(id) => db
                .get_history(&user_id, id)?
                .iter()
                .map(|turn| turn.history_line())
                .collect(),
            None => Vec::new(),
        };
        (document_text, chat_history)
    };

    let ctx = AgentContext {
        user_id,
        document_id,
        document_text,
        query: request.user_query.unwrap_or_default(),
        chat_history,
    };

    match state.dispatcher().dispatch(mode.as_str(), &ctx).await {
        AgentOutput::Failure(message) => Err(ApiError::internal(message)),
        output => Ok(Json(json!({ "result": output }))),
    }
}

/// GET /documents/:user_id
pub async fn list_documents(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult {
    let documents = {
        let db = state.db().lock().await;
        db.list_user_documents(&user_id)?
    };
    Ok(Json(json!({ "documents": documents })))
}

/// GET /history/:user_id/:document_id
pub async fn document_history(
    State(state): State<AppState>,
    Path((user_id, document_id)): Path<(String, String)>,
) -> ApiResult {
    let history = {
        let db = state.db().lock().await;
        db.get_history(&user_id, &document_id)?
    };
    Ok(Json(json!({ "history": history })))
}

/// DELETE /documents/:user_id/:document_id
pub async fn delete_document(
    State(state): State<AppState>,
    Path((user_id, document_id)): Path<(String, String)>,
) -> ApiResult {
    let deleted = {
        let mut db = state.db().lock().await;
        db.delete_document(&user_id, &document_id)?
    };
    if !deleted {
        return Err(ApiError::not_found("Document not found"));
    }

    if let Err(e) = state.retriever().forget(&document_id).await {
        warn!("Failed to drop index for {document_id}: {e}");
    }
    info!("Deleted document {document_id} for user {user_id}");
    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
