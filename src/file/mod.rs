//! File content handling for Stowage.
//!
//! This module provides the byte-level side of the store:
//! - Staging of incoming uploads and UUID-named durable storage
//! - Content digests for deduplication
//! - MIME type detection

mod hash;
mod storage;

pub use hash::{hash_bytes, hash_file, hash_reader, DIGEST_HEX_LEN};
pub use storage::{FileStorage, StagedFile};

/// Fallback MIME type for unknown content.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Pick the MIME type for an upload.
///
/// A declared content type wins unless it is missing or the generic
/// octet-stream; otherwise the type is guessed from the file name.
pub fn detect_mime_type(file_name: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(declared) if !declared.is_empty() && declared != OCTET_STREAM => declared.to_string(),
        _ => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string(),
    }
}
