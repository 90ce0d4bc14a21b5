//! Upload, chunked upload, delete and download routes.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use harbor_staging::sanitize_file_name;
use tracing::info;

use super::AppState;
use super::schemas::{
    ChunkResponse, CompleteUploadRequest, FileIdQuery, TokenQuery, UploadResponse,
};
use crate::error::ServerError;

fn multipart_error(e: &axum::extract::multipart::MultipartError) -> ServerError {
    ServerError::BadRequest(e.body_text())
}

/// Text fields and the single file part of a multipart form.
#[derive(Default)]
struct Form {
    fields: Vec<(String, String)>,
    file: Option<(String, Bytes)>,
}

impl Form {
    async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ServerError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(&e))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            if name == file_field {
                let file_name = field.file_name().unwrap_or("upload.bin").to_owned();
                let data = field.bytes().await.map_err(|e| multipart_error(&e))?;
                form.file = Some((file_name, data));
            } else {
                let value = field.text().await.map_err(|e| multipart_error(&e))?;
                form.fields.push((name, value));
            }
        }
        Ok(form)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn required(&self, name: &str) -> Result<&str, ServerError> {
        self.text(name)
            .ok_or_else(|| ServerError::BadRequest(format!("missing form field `{name}`")))
    }

    fn number(&self, name: &str) -> Result<u32, ServerError> {
        self.required(name)?
            .trim()
            .parse()
            .map_err(|_| ServerError::BadRequest(format!("form field `{name}` must be a number")))
    }
}

/// `POST /api/upload` -- stage a single file (multipart field `file`).
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let form = Form::read(multipart, "file").await?;
    let (file_name, data) = form
        .file
        .ok_or_else(|| ServerError::BadRequest("no file uploaded".into()))?;
    let upload = state.uploads.put(&file_name, data).await?;
    Ok(Json(UploadResponse::from(upload)))
}

/// `POST /api/upload-chunk` -- accept one chunk of a multi-part upload.
///
/// Form fields: `uploadId`, `chunkIndex`, `totalChunks`, `fileName` and the
/// `chunk` file part.
pub async fn upload_chunk(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let form = Form::read(multipart, "chunk").await?;
    let upload_id = form.required("uploadId")?.to_owned();
    let index = form.number("chunkIndex")?;
    let total = form.number("totalChunks")?;
    let (part_name, data) = form
        .file
        .clone()
        .ok_or_else(|| ServerError::BadRequest("missing chunk data".into()))?;
    let file_name = form.text("fileName").map_or(part_name, str::to_owned);

    let progress = state
        .chunks
        .add_chunk(&upload_id, index, total, &file_name, data)
        .await?;
    Ok(Json(ChunkResponse::new(upload_id, progress)))
}

/// `POST /api/complete-upload` -- assemble the chunks into a pending upload.
pub async fn complete_upload(
    State(state): State<AppState>,
    Json(body): Json<CompleteUploadRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let upload = state
        .chunks
        .complete(&body.upload_id, &state.uploads)
        .await?;
    Ok(Json(UploadResponse::from(upload)))
}

/// `DELETE /api/delete?fileId=` -- discard a pending upload.
pub async fn delete_upload(
    State(state): State<AppState>,
    Query(query): Query<FileIdQuery>,
) -> Result<impl IntoResponse, ServerError> {
    if state.uploads.remove(&query.file_id).await {
        Ok(Json(serde_json::json!({ "success": true, "fileId": query.file_id })))
    } else {
        Err(ServerError::NotFound(format!("file {}", query.file_id)))
    }
}

/// `GET /api/download?token=` -- serve a staged file once.
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, ServerError> {
    let file = state.downloads.redeem(&query.token).await?;
    info!(file_name = %file.file_name, size = file.data.len(), "download served");
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_file_name(&file.file_name)
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(file.data),
    )
        .into_response())
}
