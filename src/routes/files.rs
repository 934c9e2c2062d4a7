use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, Path, Request, State, multipart::Field},
    response::Response,
    routing::{get, post},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{
    dto::files::{FileCheck, StoredFile, StoredFiles},
    error::{AppError, AppResult},
    response::ApiResponse,
    services::file_service::MAX_UPLOAD_REQUEST,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/upload-multiple", post(upload_files))
        .route("/check/{filename}", get(check_file))
        .route("/{filename}", get(download_file).delete(delete_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_REQUEST))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

struct Upload {
    original_name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

async fn read_field(field: Field<'_>) -> AppResult<Upload> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;
    Ok(Upload {
        original_name,
        content_type,
        bytes,
    })
}

async fn store_upload(state: &AppState, upload: Upload) -> AppResult<StoredFile> {
    state
        .storage
        .store(&upload.original_name, upload.content_type, &upload.bytes)
        .await
}

#[utoipa::path(
    post,
    path = "/api/files/upload",
    request_body(content_type = "multipart/form-data", description = "Single image in the `file` field"),
    responses(
        (status = 200, description = "File stored", body = ApiResponse<StoredFile>),
        (status = 400, description = "Empty, oversized or non-image file")
    ),
    tag = "Files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<StoredFile>>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            let stored = store_upload(&state, read_field(field).await?).await?;
            return Ok(Json(ApiResponse::success("File uploaded successfully", stored)));
        }
    }
    Err(AppError::BadRequest("Missing file field".into()))
}

#[utoipa::path(
    post,
    path = "/api/files/upload-multiple",
    request_body(content_type = "multipart/form-data", description = "Images in repeated `files` fields"),
    responses(
        (status = 200, description = "Files stored", body = ApiResponse<StoredFiles>),
        (status = 400, description = "One of the files was rejected; nothing was stored")
    ),
    tag = "Files"
)]
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<StoredFiles>>> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("files") {
            uploads.push(read_field(field).await?);
        }
    }
    if uploads.is_empty() {
        return Err(AppError::BadRequest("Missing files field".into()));
    }
    // All or nothing: one bad file rejects the batch before anything is written.
    for upload in &uploads {
        state
            .storage
            .check_upload(&upload.original_name, upload.bytes.len())?;
    }

    let mut files = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match store_upload(&state, upload).await {
            Ok(stored) => files.push(stored),
            Err(err) => {
                discard(&state, &files).await;
                return Err(err);
            }
        }
    }

    let data = StoredFiles {
        count: files.len(),
        files,
    };
    Ok(Json(ApiResponse::success("Files uploaded successfully", data)))
}

async fn discard(state: &AppState, files: &[StoredFile]) {
    for file in files {
        if let Err(err) = state.storage.delete(&file.filename).await {
            tracing::warn!(filename = %file.filename, error = %err, "failed to remove partial upload");
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/files/{filename}",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "File not found")
    ),
    tag = "Files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let path = state.storage.resolve(&filename)?;
    if !state.storage.exists(&filename).await {
        return Err(AppError::NotFound(format!("File not found: {filename}")));
    }

    let response = ServeFile::new(path)
        .oneshot(request)
        .await
        .unwrap_or_else(|err| match err {});
    Ok(response.map(Body::new))
}

#[utoipa::path(
    delete,
    path = "/api/files/{filename}",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "File deleted"),
        (status = 404, description = "File not found")
    ),
    tag = "Files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.storage.delete(&filename).await?;
    Ok(Json(ApiResponse::empty("File deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/files/check/{filename}",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "Whether the file exists", body = ApiResponse<FileCheck>)
    ),
    tag = "Files"
)]
pub async fn check_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Json<ApiResponse<FileCheck>> {
    let exists = state.storage.exists(&filename).await;
    Json(ApiResponse::success("File check", FileCheck { exists }))
}
