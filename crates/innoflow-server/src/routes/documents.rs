use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{delete, get},
    Json, Router,
};
use innoflow_core::document::Document;

use super::{error, to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/process-instances/{id}/documents",
            get(list_documents).post(upload_document),
        )
        .route("/api/documents/{id}/download", get(download_document))
        .route("/api/documents/{id}", delete(delete_document))
}

async fn list_documents(
    State(state): State<AppState>,
    Path(process_instance_id): Path<String>,
) -> Json<Vec<Document>> {
    Json(state.store().documents_for(&process_instance_id))
}

/// Expects a single multipart field named `file`.
async fn upload_document(
    State(state): State<AppState>,
    Path(process_instance_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, String), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let file_type = field.content_type().map(String::from);
        let content = field
            .bytes()
            .await
            .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;
        let doc = state
            .store()
            .add_document(&process_instance_id, &file_name, file_type, content)
            .map_err(to_error)?;
        tracing::info!(id = doc.id, pid = %process_instance_id, "document stored");
        return Ok((
            StatusCode::CREATED,
            format!("File uploaded successfully: {}", doc.file_name),
        ));
    }
    Err(error(StatusCode::BAD_REQUEST, "missing file field"))
}

async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let (doc, content) = state.store().document_content(id).map_err(to_error)?;
    Response::builder()
        .header(
            header::CONTENT_TYPE,
            doc.file_type.as_deref().unwrap_or("application/octet-stream"),
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", doc.display_name()),
        )
        .body(Body::from(content))
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_document(id).map_err(to_error)?;
    Ok(StatusCode::NO_CONTENT)
}
