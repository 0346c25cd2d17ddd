//! Item handlers for Web API.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::file::{FileStorage, StagedFile};
use crate::item::{normalize_parent_id, ItemKind, RelativePath};
use crate::web::dto::{
    CreateItemRequest, FolderUploadResponse, ItemResponse, MessageResponse, StorageResponse,
    UploadFields, ValidatedJson,
};
use crate::web::error::{ApiError, INSUFFICIENT_STORAGE};
use crate::web::handlers::AppState;
use crate::StowageError;

/// Multipart field names carrying file content.
const FILE_FIELDS: &[&str] = &["file", "files", "files[]"];

/// Read a multipart upload form, staging every file part to disk.
///
/// Staged files are removed if reading fails part-way.
pub async fn read_upload_form(
    mut multipart: Multipart,
    storage: &FileStorage,
) -> Result<(UploadFields, Vec<StagedFile>), ApiError> {
    let mut fields = UploadFields::default();
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        if FILE_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or("").to_string();
            if file_name.is_empty() {
                continue;
            }
            let content_type = field.content_type().map(str::to_string);

            let mut staged = storage
                .stage(file_name, content_type.as_deref())
                .await
                .map_err(ApiError::from)?;

            while let Some(chunk) = field.chunk().await.map_err(|e| {
                tracing::warn!("Failed to read file content: {}", e);
                ApiError::bad_request("Failed to read file")
            })? {
                staged.write_chunk(&chunk).await.map_err(ApiError::from)?;
            }
            staged.finish().await.map_err(ApiError::from)?;

            tracing::debug!(
                file = %staged.original_name(),
                size = staged.size(),
                "Staged uploaded file"
            );
            files.push(staged);
            continue;
        }

        let value = field.text().await.map_err(|e| {
            tracing::warn!("Failed to read form field {}: {}", name, e);
            ApiError::bad_request("Invalid form field")
        })?;

        match name.as_str() {
            "type" => fields.kind = Some(value),
            "name" => fields.name = Some(value),
            "parentId" => fields.parent_id = Some(value),
            _ => {}
        }
    }

    Ok((fields, files))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

fn parse_kind(kind: Option<&str>, default: ItemKind) -> Result<ItemKind, ApiError> {
    match kind.map(str::trim) {
        None | Some("") => Ok(default),
        Some(kind) => kind.parse().map_err(ApiError::from),
    }
}

/// POST /items - Create a folder, or upload one or more files.
///
/// Accepts a JSON folder request or a multipart form with `type`, `name`,
/// `parentId` and `file`/`files` parts.
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    if !is_multipart(&request) {
        let ValidatedJson(req) =
            ValidatedJson::<CreateItemRequest>::from_request(request, &()).await?;

        return match parse_kind(req.kind.as_deref(), ItemKind::Folder)? {
            ItemKind::Folder => {
                let parent_id = normalize_parent_id(req.parent_id.as_deref());
                let folder = state.items.create_folder(&req.name, parent_id).await?;
                Ok((StatusCode::CREATED, Json(ItemResponse::from(folder))).into_response())
            }
            ItemKind::File => Err(ApiError::bad_request("File required")),
        };
    }

    let multipart = Multipart::from_request(request, &())
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart data"))?;
    let (fields, files) = read_upload_form(multipart, state.items.storage()).await?;
    let parent_id = normalize_parent_id(fields.parent_id.as_deref());

    match parse_kind(fields.kind.as_deref(), ItemKind::File)? {
        ItemKind::Folder => {
            let name = fields.name.as_deref().unwrap_or("");
            let folder = state.items.create_folder(name, parent_id).await?;
            Ok((StatusCode::CREATED, Json(ItemResponse::from(folder))).into_response())
        }
        ItemKind::File => {
            if files.is_empty() {
                return Err(ApiError::bad_request("File required"));
            }

            let mut items: Vec<ItemResponse> = state
                .items
                .submit(files, parent_id)
                .await?
                .into_iter()
                .map(ItemResponse::from)
                .collect();

            if items.len() == 1 {
                if let Some(item) = items.pop() {
                    return Ok((StatusCode::CREATED, Json(item)).into_response());
                }
            }
            Ok((StatusCode::CREATED, Json(items)).into_response())
        }
    }
}

/// POST /items/folder-upload - Upload a folder tree.
///
/// Each file part's filename is its path relative to the uploaded folder.
/// The `name` field falls back to the first path segment.
pub async fn upload_folder(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FolderUploadResponse>), ApiError> {
    let (fields, files) = read_upload_form(multipart, state.items.storage()).await?;

    if files.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }

    let folder_name = fields
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            files
                .first()
                .and_then(|f| RelativePath::parse(f.original_name(), ""))
                .and_then(|p| p.dirs().first().cloned())
        })
        .ok_or_else(|| ApiError::bad_request("Folder name is required"))?;
    let parent_id = normalize_parent_id(fields.parent_id.as_deref());

    let summary = state
        .items
        .submit_folder(files, &folder_name, parent_id)
        .await
        .map_err(|e| match e {
            StowageError::QuotaExceeded(shortfall) => {
                ApiError::quota_exceeded(INSUFFICIENT_STORAGE, &shortfall)
            }
            other => ApiError::from(other),
        })?;

    Ok((StatusCode::CREATED, Json(FolderUploadResponse::from(summary))))
}

/// GET /items/storage - Used and maximum bytes.
pub async fn storage_usage(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StorageResponse>, ApiError> {
    let usage = state.items.storage_usage().await?;
    Ok(Json(StorageResponse::from(usage)))
}

/// GET /items/:id - List the children of a folder, or of the top level for `root`.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Path(parent_id): Path<String>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = state
        .items
        .list_children(normalize_parent_id(Some(&parent_id)))
        .await?;

    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// DELETE /items/:id - Delete an item and everything beneath it.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.items.delete_subtree(&id).await?;
    Ok(Json(MessageResponse::new("Item deleted successfully")))
}
