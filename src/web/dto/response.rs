//! Response DTOs for Web API.

use serde::Serialize;

use crate::item::{FailedFile, FolderUploadSummary, Item, SkippedFile, UploadedFile};
use crate::quota::StorageUsage;

/// Item as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    /// `"file"` or `"folder"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Parent folder ID, null at the top level.
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
            kind: item.kind.as_str(),
            parent_id: item.parent_id,
            url: item.url,
            size: item.size,
            mime_type: item.mime_type,
            content_hash: item.content_hash,
            created_at: item.created_at.to_rfc3339(),
        }
    }
}

/// `GET /items/storage` response.
#[derive(Debug, Serialize)]
pub struct StorageResponse {
    /// Bytes consumed by file items.
    pub used: u64,
    /// Configured ceiling in bytes.
    pub max: u64,
}

impl From<StorageUsage> for StorageResponse {
    fn from(usage: StorageUsage) -> Self {
        Self {
            used: usage.used,
            max: usage.max,
        }
    }
}

/// Plain message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Destination folder of a folder-tree upload.
#[derive(Debug, Serialize)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedEntry {
    pub name: String,
    pub size: u64,
    pub path: String,
}

impl From<UploadedFile> for UploadedEntry {
    fn from(file: UploadedFile) -> Self {
        Self {
            name: file.name,
            size: file.size,
            path: file.path,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SkippedEntry {
    pub name: String,
    pub size: u64,
    pub reason: String,
}

impl From<SkippedFile> for SkippedEntry {
    fn from(file: SkippedFile) -> Self {
        Self {
            name: file.name,
            size: file.size,
            reason: file.reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FailedEntry {
    pub name: String,
    pub error: String,
}

impl From<FailedFile> for FailedEntry {
    fn from(file: FailedFile) -> Self {
        Self {
            name: file.name,
            error: file.error,
        }
    }
}

/// Per-file outcome lists of a folder-tree upload.
#[derive(Debug, Serialize)]
pub struct FolderUploadDetails {
    pub uploaded: Vec<UploadedEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub failed: Vec<FailedEntry>,
}

/// `POST /items/folder-upload` response.
#[derive(Debug, Serialize)]
pub struct FolderUploadResponse {
    pub message: String,
    pub folder: FolderRef,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub details: FolderUploadDetails,
}

impl From<FolderUploadSummary> for FolderUploadResponse {
    fn from(summary: FolderUploadSummary) -> Self {
        Self {
            message: "Folder upload completed".to_string(),
            folder: FolderRef {
                id: summary.folder.id,
                name: summary.folder.name,
            },
            uploaded: summary.uploaded.len(),
            skipped: summary.skipped.len(),
            failed: summary.failed.len(),
            details: FolderUploadDetails {
                uploaded: summary.uploaded.into_iter().map(Into::into).collect(),
                skipped: summary.skipped.into_iter().map(Into::into).collect(),
                failed: summary.failed.into_iter().map(Into::into).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use chrono::Utc;

    fn folder(name: &str) -> Item {
        Item {
            id: format!("{name}-id"),
            name: name.to_string(),
            kind: ItemKind::Folder,
            parent_id: None,
            url: None,
            size: None,
            mime_type: None,
            content_hash: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_folder_item_response_omits_file_fields() {
        let json = serde_json::to_value(ItemResponse::from(folder("Docs"))).unwrap();

        assert_eq!(json["type"], "folder");
        assert_eq!(json["name"], "Docs");
        assert!(json["parentId"].is_null());
        assert!(json.get("url").is_none());
        assert!(json.get("size").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_file_item_response() {
        let item = Item {
            kind: ItemKind::File,
            parent_id: Some("p".to_string()),
            url: Some("/uploads/ab/abc.txt".to_string()),
            size: Some(3),
            mime_type: Some("text/plain".to_string()),
            content_hash: Some("00".to_string()),
            ..folder("a.txt")
        };
        let json = serde_json::to_value(ItemResponse::from(item)).unwrap();

        assert_eq!(json["type"], "file");
        assert_eq!(json["parentId"], "p");
        assert_eq!(json["size"], 3);
        assert_eq!(json["mimeType"], "text/plain");
        assert_eq!(json["contentHash"], "00");
    }

    #[test]
    fn test_folder_upload_response() {
        let summary = FolderUploadSummary {
            folder: folder("Photos"),
            uploaded: vec![],
            skipped: vec![SkippedFile {
                name: "a.jpg".to_string(),
                size: 10,
                reason: "Already exists".to_string(),
            }],
            failed: vec![],
        };
        let json = serde_json::to_value(FolderUploadResponse::from(summary)).unwrap();

        assert_eq!(json["message"], "Folder upload completed");
        assert_eq!(json["folder"]["name"], "Photos");
        assert_eq!(json["uploaded"], 0);
        assert_eq!(json["skipped"], 1);
        assert_eq!(json["details"]["skipped"][0]["reason"], "Already exists");
    }
}
