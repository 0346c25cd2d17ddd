//! On-disk content storage.
//!
//! Content is received into a staging directory and moved into the upload
//! directory only once its item record exists:
//! ```text
//! {staging_dir}/
//! └── .stage-XXXXXX          (in-flight uploads)
//! {upload_dir}/
//! ├── ab/
//! │   └── ab12cd34-5678-90ab-cdef-123456789012.txt
//! └── ...
//! ```
//! A staged file that is dropped without being persisted is removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::detect_mime_type;
use crate::config::StorageConfig;
use crate::Result;

const STAGE_PREFIX: &str = ".stage-";

/// Content received for an upload but not yet committed.
#[derive(Debug)]
pub struct StagedFile {
    temp: NamedTempFile,
    writer: tokio::fs::File,
    original_name: String,
    content_type: Option<String>,
    size: u64,
}

impl StagedFile {
    /// Append a chunk of content.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.writer.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flush buffered content to disk.
    ///
    /// Must be called before the file is hashed or persisted.
    pub async fn finish(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of the staged content.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Name (or relative path) the client sent for this file.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// MIME type from the declared content type or the file name.
    pub fn mime_type(&self) -> String {
        detect_mime_type(&self.original_name, self.content_type.as_deref())
    }
}

/// File storage service for managing stored content.
#[derive(Debug, Clone)]
pub struct FileStorage {
    upload_dir: PathBuf,
    staging_dir: PathBuf,
    url_prefix: String,
}

impl FileStorage {
    /// Create a new FileStorage.
    ///
    /// Both directories are created if they don't exist. They must be on the
    /// same volume so that persisting is a rename.
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
    ) -> Result<Self> {
        let upload_dir = upload_dir.into();
        let staging_dir = staging_dir.into();
        fs::create_dir_all(&upload_dir)?;
        fs::create_dir_all(&staging_dir)?;

        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();

        Ok(Self {
            upload_dir,
            staging_dir,
            url_prefix,
        })
    }

    /// Create storage from the `[storage]` configuration section.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new(
            &config.upload_path,
            &config.staging_path,
            config.url_prefix.as_str(),
        )
    }

    /// Directory holding committed content.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Directory holding in-flight uploads.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// URL prefix committed content is served under.
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Open a new staged file for an incoming upload.
    pub async fn stage(
        &self,
        original_name: impl Into<String>,
        content_type: Option<&str>,
    ) -> Result<StagedFile> {
        let temp = tempfile::Builder::new()
            .prefix(STAGE_PREFIX)
            .tempfile_in(&self.staging_dir)?;
        let writer = tokio::fs::File::from_std(temp.as_file().try_clone()?);

        Ok(StagedFile {
            temp,
            writer,
            original_name: original_name.into(),
            content_type: content_type.map(str::to_string),
            size: 0,
        })
    }

    /// Stage a complete in-memory buffer.
    pub async fn stage_bytes(
        &self,
        original_name: impl Into<String>,
        content_type: Option<&str>,
        content: &[u8],
    ) -> Result<StagedFile> {
        let mut staged = self.stage(original_name, content_type).await?;
        staged.write_chunk(content).await?;
        staged.finish().await?;
        Ok(staged)
    }

    /// Move staged content to its durable location under `stored_name`.
    ///
    /// On failure the staged content is removed.
    pub fn persist(&self, staged: StagedFile, stored_name: &str) -> Result<PathBuf> {
        let file_path = self.get_file_path(stored_name);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let StagedFile { temp, writer, .. } = staged;
        drop(writer);
        temp.persist(&file_path).map_err(|e| e.error)?;

        debug!(stored_name = %stored_name, "Persisted staged content");
        Ok(file_path)
    }

    /// Delete committed content.
    ///
    /// Returns `false` if it didn't exist.
    pub fn delete(&self, stored_name: &str) -> Result<bool> {
        let file_path = self.get_file_path(stored_name);

        match fs::remove_file(&file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the content an item URL points at.
    ///
    /// Returns `false` if the content was already gone or the URL does not
    /// point into this storage.
    pub fn delete_url(&self, url: &str) -> Result<bool> {
        match self.stored_name_from_url(url) {
            Some(stored_name) => self.delete(stored_name),
            None => {
                warn!(url = %url, "Item URL does not reference stored content");
                Ok(false)
            }
        }
    }

    /// Check if committed content exists.
    pub fn exists(&self, stored_name: &str) -> bool {
        self.get_file_path(stored_name).exists()
    }

    /// Public URL for a stored name.
    pub fn url_for(&self, stored_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.url_prefix,
            Self::get_shard(stored_name),
            stored_name
        )
    }

    /// Recover the stored name from an item URL.
    pub fn stored_name_from_url<'u>(&self, url: &'u str) -> Option<&'u str> {
        let rest = url.strip_prefix(self.url_prefix.as_str())?;
        let stored_name = rest.rsplit('/').next()?;

        if stored_name.is_empty()
            || stored_name == "."
            || stored_name == ".."
            || stored_name.contains('\\')
        {
            return None;
        }
        Some(stored_name)
    }

    /// Get the full file path for a stored name.
    ///
    /// The path is constructed as: {upload_dir}/{shard}/{stored_name}
    pub fn get_file_path(&self, stored_name: &str) -> PathBuf {
        self.upload_dir
            .join(Self::get_shard(stored_name))
            .join(stored_name)
    }

    /// First 2 characters of the stored name (UUID prefix).
    fn get_shard(stored_name: &str) -> &str {
        stored_name.get(..2).unwrap_or(stored_name)
    }

    /// Extract the file extension from a filename.
    ///
    /// Returns "bin" if no extension is found.
    fn extract_extension(filename: &str) -> &str {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("bin")
    }

    /// Generate a new UUID-based stored name keeping the original extension.
    pub fn generate_stored_name(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(original_name);
        format!("{uuid}.{ext}")
    }

    /// Remove staged content left behind by an earlier process.
    ///
    /// Only call this before the server starts accepting uploads.
    pub fn sweep_staging(&self) -> Result<usize> {
        let mut removed = 0;

        for entry in fs::read_dir(&self.staging_dir)?.flatten() {
            let path = entry.path();
            let is_stage = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(STAGE_PREFIX));

            if is_stage && path.is_file() {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = ?path, error = %e, "Failed to remove stale staged file"),
                }
            }
        }

        if removed > 0 {
            info!(removed, "Removed stale staged uploads");
        }
        Ok(removed)
    }

    /// Remove empty shard directories.
    pub fn cleanup_empty_dirs(&self) -> Result<usize> {
        let mut removed = 0;

        for entry in fs::read_dir(&self.upload_dir)?.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if let Ok(mut dir_entries) = fs::read_dir(&path) {
                    if dir_entries.next().is_none() && fs::remove_dir(&path).is_ok() {
                        removed += 1;
                    }
                }
            }
        }

        Ok(removed)
    }
}
