//! Hierarchical item store for Stowage.
//!
//! Files and folders share one table. This module provides:
//! - Item types and record validation
//! - The item repository (lookup, listing, dedup lookup)
//! - The item service: folder creation, subtree deletion and uploads

mod repository;
mod service;
mod types;
mod upload;

pub use repository::ItemRepository;
pub use service::ItemService;
pub use types::{Item, ItemKind, NewItem};
pub use upload::{
    FailedFile, FolderUploadSummary, RelativePath, SkippedFile, UploadedFile,
    SKIP_ALREADY_EXISTS, SKIP_DUPLICATE_IN_UPLOAD,
};

/// Client-facing sentinel for the top level.
pub const ROOT_SENTINEL: &str = "root";

/// Map a client-supplied parent reference to the internal form.
///
/// Missing, empty, `"root"`, `"null"` and `"undefined"` all mean the top level.
pub fn normalize_parent_id(raw: Option<&str>) -> Option<&str> {
    match raw.map(str::trim) {
        None | Some("") | Some(ROOT_SENTINEL) | Some("null") | Some("undefined") => None,
        Some(id) => Some(id),
    }
}
