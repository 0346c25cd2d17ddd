//! Upload orchestration.
//!
//! Two entry points:
//! - [`ItemService::submit`] stores a flat batch of files under one parent.
//! - [`ItemService::submit_folder`] rebuilds a folder tree from relative
//!   paths, skipping files already stored with the same name, size and
//!   digest.
//!
//! Both admit a batch only if the whole batch fits the quota. Staged content
//! that does not end up behind a committed item is removed when it drops.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::service::ItemService;
use super::types::{Item, ItemKind};
use crate::file::{hash_file, StagedFile};
use crate::{Result, StowageError};

/// Reason recorded for files already present in the destination.
pub const SKIP_ALREADY_EXISTS: &str = "Already exists";

/// Reason recorded for files repeated within the same upload.
pub const SKIP_DUPLICATE_IN_UPLOAD: &str = "Duplicate in upload";

/// Location of an uploaded file relative to the destination folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativePath {
    dirs: Vec<String>,
    file_name: String,
}

impl RelativePath {
    /// Parse a client-supplied relative path such as `Photos/2024/a.jpg`.
    ///
    /// Both `/` and `\` separate segments. Empty, `.` and `..` segments are
    /// dropped. A leading segment equal to `folder_name` is dropped when more
    /// segments follow it. Returns `None` when no file name remains.
    pub fn parse(raw: &str, folder_name: &str) -> Option<Self> {
        let mut segments: Vec<String> = raw
            .split(['/', '\\'])
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .map(str::to_string)
            .collect();

        if segments.len() > 1 && segments[0] == folder_name.trim() {
            segments.remove(0);
        }

        let file_name = segments.pop()?;
        Some(Self {
            dirs: segments,
            file_name,
        })
    }

    /// Subfolder names between the destination and the file.
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    /// Final segment.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Subfolder chain joined with `/`, empty for files at the top level.
    pub fn dir_key(&self) -> String {
        self.dirs.join("/")
    }

    /// Full path joined with `/`.
    pub fn display(&self) -> String {
        if self.dirs.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.dir_key(), self.file_name)
        }
    }
}

/// File stored by a folder-tree upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    /// Path relative to the destination folder.
    pub path: String,
    pub item: Item,
}

/// File left out of a folder-tree upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub size: u64,
    pub reason: String,
}

/// File whose commit failed during a folder-tree upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub name: String,
    pub error: String,
}

/// Outcome of a folder-tree upload.
#[derive(Debug, Clone)]
pub struct FolderUploadSummary {
    /// Destination folder.
    pub folder: Item,
    pub uploaded: Vec<UploadedFile>,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
}

struct Candidate {
    staged: StagedFile,
    path: RelativePath,
    content_hash: String,
}

/// Final path segment of a client-supplied file name.
fn base_name(raw: &str) -> Option<&str> {
    raw.rsplit(['/', '\\'])
        .map(str::trim)
        .find(|s| !s.is_empty() && *s != "." && *s != "..")
}

fn total_size(files: &[StagedFile]) -> u64 {
    files.iter().map(StagedFile::size).sum()
}

impl ItemService {
    /// Store a flat batch of files under `parent_id` (None for root).
    ///
    /// The batch is admitted only if all of it fits the quota. If any file
    /// fails to commit, files already committed from the batch are removed
    /// and the error is returned.
    pub async fn submit(
        &self,
        files: Vec<StagedFile>,
        parent_id: Option<&str>,
    ) -> Result<Vec<Item>> {
        if files.is_empty() {
            return Err(StowageError::Validation("File required".to_string()));
        }

        let _guard = self.lock_writes().await;
        let parent = self.resolve_parent(parent_id).await?;
        let parent_id = parent.as_ref().map(|p| p.id.as_str());

        let required = total_size(&files);
        self.quota().ensure_fits(required, 0).await?;

        let mut committed = Vec::with_capacity(files.len());
        for staged in files {
            match self.commit_one(staged, parent_id).await {
                Ok(item) => committed.push(item),
                Err(e) => {
                    warn!(error = %e, "Upload failed, rolling back batch");
                    self.rollback(&committed).await;
                    self.quota().invalidate().await;
                    return Err(e);
                }
            }
        }

        self.quota().invalidate().await;
        info!(count = committed.len(), bytes = required, "Stored uploaded files");
        Ok(committed)
    }

    async fn commit_one(&self, staged: StagedFile, parent_id: Option<&str>) -> Result<Item> {
        let name = base_name(staged.original_name())
            .map(str::to_string)
            .ok_or_else(|| StowageError::Validation("File name is required".to_string()))?;
        let content_hash = hash_file(staged.path()).await?;
        self.commit_staged(staged, &name, parent_id, content_hash)
            .await
    }

    /// Store a folder tree under `folder_name` within `parent_id`.
    ///
    /// Each staged file's original name is its path relative to the uploaded
    /// folder. The destination folder and any subfolders are found or
    /// created only once the batch has passed the quota check.
    pub async fn submit_folder(
        &self,
        files: Vec<StagedFile>,
        folder_name: &str,
        parent_id: Option<&str>,
    ) -> Result<FolderUploadSummary> {
        let folder_name = folder_name.trim();
        if folder_name.is_empty() {
            return Err(StowageError::Validation(
                "Folder name is required".to_string(),
            ));
        }
        if files.is_empty() {
            return Err(StowageError::Validation("No files uploaded".to_string()));
        }

        let _guard = self.lock_writes().await;
        let parent = self.resolve_parent(parent_id).await?;
        let parent_id = parent.as_ref().map(|p| p.id.as_str());

        let repo = self.repo();
        let existing_root = repo.find_folder(folder_name, parent_id).await?;

        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        let mut candidates = Vec::with_capacity(files.len());
        let mut seen = HashSet::new();
        let mut existing_dirs: HashMap<String, Option<String>> = HashMap::new();

        for staged in files {
            let Some(path) = RelativePath::parse(staged.original_name(), folder_name) else {
                failed.push(FailedFile {
                    name: staged.original_name().to_string(),
                    error: "Invalid file path".to_string(),
                });
                continue;
            };

            let content_hash = hash_file(staged.path()).await?;
            let size = staged.size();

            if !seen.insert((path.display(), size, content_hash.clone())) {
                debug!(path = %path.display(), "Skipping file repeated in upload");
                skipped.push(SkippedFile {
                    name: path.file_name().to_string(),
                    size,
                    reason: SKIP_DUPLICATE_IN_UPLOAD.to_string(),
                });
                continue;
            }

            let dir_key = path.dir_key();
            let folder_id = match existing_dirs.get(&dir_key) {
                Some(folder_id) => folder_id.clone(),
                None => {
                    let folder_id = self
                        .find_existing_path(existing_root.as_ref(), path.dirs())
                        .await?;
                    existing_dirs.insert(dir_key, folder_id.clone());
                    folder_id
                }
            };

            if let Some(folder_id) = folder_id {
                let existing = repo
                    .find_existing(
                        path.file_name(),
                        Some(&folder_id),
                        ItemKind::File,
                        Some(size),
                        Some(&content_hash),
                    )
                    .await?;

                if existing.is_some() {
                    debug!(path = %path.display(), "Skipping file already stored");
                    skipped.push(SkippedFile {
                        name: path.file_name().to_string(),
                        size,
                        reason: SKIP_ALREADY_EXISTS.to_string(),
                    });
                    continue;
                }
            }

            candidates.push(Candidate {
                staged,
                path,
                content_hash,
            });
        }

        let new_files_size: u64 = candidates.iter().map(|c| c.staged.size()).sum();
        self.quota()
            .ensure_fits(new_files_size, skipped.len())
            .await?;

        let folder = match existing_root {
            Some(folder) => folder,
            None => self.find_or_create_folder(folder_name, parent_id).await?,
        };

        let mut created_dirs: HashMap<String, String> = HashMap::new();
        let mut uploaded = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let Candidate {
                staged,
                path,
                content_hash,
            } = candidate;
            let size = staged.size();

            let result = match self.ensure_path(&folder, &path, &mut created_dirs).await {
                Ok(folder_id) => {
                    self.commit_staged(staged, path.file_name(), Some(&folder_id), content_hash)
                        .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(item) => uploaded.push(UploadedFile {
                    name: path.file_name().to_string(),
                    size,
                    path: path.display(),
                    item,
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to store uploaded file");
                    failed.push(FailedFile {
                        name: path.file_name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.quota().invalidate().await;
        info!(
            folder = %folder.name,
            uploaded = uploaded.len(),
            skipped = skipped.len(),
            failed = failed.len(),
            "Folder upload completed"
        );

        Ok(FolderUploadSummary {
            folder,
            uploaded,
            skipped,
            failed,
        })
    }

    /// Walk an existing subfolder chain without creating anything.
    async fn find_existing_path(
        &self,
        root: Option<&Item>,
        dirs: &[String],
    ) -> Result<Option<String>> {
        let Some(root) = root else {
            return Ok(None);
        };

        let repo = self.repo();
        let mut current = root.id.clone();
        for dir in dirs {
            match repo.find_folder(dir, Some(&current)).await? {
                Some(folder) => current = folder.id,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Find or create the subfolder chain for `path` beneath `root`.
    async fn ensure_path(
        &self,
        root: &Item,
        path: &RelativePath,
        created: &mut HashMap<String, String>,
    ) -> Result<String> {
        let mut current = root.id.clone();
        let mut key = String::new();

        for dir in path.dirs() {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(dir);

            current = match created.get(&key) {
                Some(id) => id.clone(),
                None => {
                    let folder = self.find_or_create_folder(dir, Some(&current)).await?;
                    created.insert(key.clone(), folder.id.clone());
                    folder.id
                }
            };
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::file::FileStorage;
    use tempfile::TempDir;

    const MB10: u64 = 10_485_760;

    async fn setup(max: u64) -> (TempDir, ItemService) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(
            temp_dir.path().join("uploads"),
            temp_dir.path().join("staging"),
            "/uploads",
        )
        .unwrap();
        let db = Database::open_in_memory().await.unwrap();
        (temp_dir, ItemService::new(db, storage, max))
    }

    async fn stage(service: &ItemService, name: &str, content: &[u8]) -> StagedFile {
        service
            .storage()
            .stage_bytes(name, None, content)
            .await
            .unwrap()
    }

    async fn stage_sized(service: &ItemService, name: &str, size: usize, fill: u8) -> StagedFile {
        stage(service, name, &vec![fill; size]).await
    }

    fn staging_entries(service: &ItemService) -> usize {
        std::fs::read_dir(service.storage().staging_dir())
            .unwrap()
            .count()
    }

    fn stored_files(service: &ItemService) -> usize {
        let mut count = 0;
        for shard in std::fs::read_dir(service.storage().upload_dir()).unwrap() {
            count += std::fs::read_dir(shard.unwrap().path()).unwrap().count();
        }
        count
    }

    #[test]
    fn test_relative_path_strips_folder_name() {
        let path = RelativePath::parse("Photos/2024/a.jpg", "Photos").unwrap();
        assert_eq!(path.dirs(), ["2024".to_string()]);
        assert_eq!(path.file_name(), "a.jpg");
        assert_eq!(path.display(), "2024/a.jpg");
    }

    #[test]
    fn test_relative_path_keeps_other_leading_segment() {
        let path = RelativePath::parse("Other/a.jpg", "Photos").unwrap();
        assert_eq!(path.dir_key(), "Other");
    }

    #[test]
    fn test_relative_path_file_named_like_folder() {
        let path = RelativePath::parse("Photos", "Photos").unwrap();
        assert!(path.dirs().is_empty());
        assert_eq!(path.file_name(), "Photos");
    }

    #[test]
    fn test_relative_path_drops_traversal_segments() {
        let path = RelativePath::parse("Photos\\..\\./x//y\\b.txt", "Photos").unwrap();
        assert_eq!(path.display(), "x/y/b.txt");
        assert!(RelativePath::parse("../..//", "Photos").is_none());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("dir/sub/a.txt"), Some("a.txt"));
        assert_eq!(base_name("C:\\docs\\b.pdf"), Some("b.pdf"));
        assert_eq!(base_name("plain.txt"), Some("plain.txt"));
        assert_eq!(base_name("dir/.."), Some("dir"));
        assert_eq!(base_name("/"), None);
    }

    #[tokio::test]
    async fn test_submit_single_file() {
        let (_dir, service) = setup(MB10).await;

        let staged = stage(&service, "notes.txt", b"hello").await;
        let items = service.submit(vec![staged], None).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "notes.txt");
        assert_eq!(items[0].size, Some(5));
        assert!(items[0].parent_id.is_none());
        assert_eq!(service.quota().used_bytes().await.unwrap(), 5);
        assert_eq!(staging_entries(&service), 0);
    }

    #[tokio::test]
    async fn test_submit_requires_files() {
        let (_dir, service) = setup(MB10).await;

        let result = service.submit(Vec::new(), None).await;
        assert!(matches!(result, Err(StowageError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_into_folder() {
        let (_dir, service) = setup(MB10).await;
        let folder = service.create_folder("Docs", None).await.unwrap();

        let files = vec![
            stage(&service, "a.txt", b"a").await,
            stage(&service, "b.txt", b"bb").await,
        ];
        let items = service.submit(files, Some(&folder.id)).await.unwrap();

        assert_eq!(items.len(), 2);
        let children = service.list_children(Some(&folder.id)).await.unwrap();
        assert_eq!(children.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_unknown_parent_cleans_staging() {
        let (_dir, service) = setup(MB10).await;

        let staged = stage(&service, "a.txt", b"a").await;
        let result = service.submit(vec![staged], Some("missing")).await;

        assert!(matches!(result, Err(StowageError::NotFound(_))));
        assert_eq!(staging_entries(&service), 0);
    }

    #[tokio::test]
    async fn test_submit_does_not_deduplicate() {
        let (_dir, service) = setup(MB10).await;

        for _ in 0..2 {
            let staged = stage(&service, "same.txt", b"same").await;
            service.submit(vec![staged], None).await.unwrap();
        }

        assert_eq!(service.list_children(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_over_quota_rejected() {
        let (_dir, service) = setup(MB10).await;

        let big = stage_sized(&service, "big.bin", 9_000_000, 1).await;
        service.submit(vec![big], None).await.unwrap();

        let extra = stage_sized(&service, "extra.bin", 2_000_000, 2).await;
        let err = service.submit(vec![extra], None).await.unwrap_err();

        match err {
            StowageError::QuotaExceeded(shortfall) => {
                assert_eq!(shortfall.current_used, 9_000_000);
                assert_eq!(shortfall.available, 1_485_760);
                assert_eq!(shortfall.required, 2_000_000);
            }
            other => panic!("Expected QuotaExceeded, got {other:?}"),
        }

        assert_eq!(service.list_children(None).await.unwrap().len(), 1);
        assert_eq!(staging_entries(&service), 0);
        assert_eq!(stored_files(&service), 1);
    }

    #[tokio::test]
    async fn test_submit_batch_checked_as_whole() {
        let (_dir, service) = setup(100).await;

        let files = vec![
            stage_sized(&service, "a.bin", 60, 1).await,
            stage_sized(&service, "b.bin", 60, 2).await,
        ];
        let result = service.submit(files, None).await;

        assert!(matches!(result, Err(StowageError::QuotaExceeded(_))));
        assert!(service.list_children(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_folder_creates_tree() {
        let (_dir, service) = setup(MB10).await;

        let files = vec![
            stage(&service, "Photos/a.jpg", b"aaa").await,
            stage(&service, "Photos/2024/b.jpg", b"bbbb").await,
            stage(&service, "Photos/2024/c.jpg", b"ccccc").await,
        ];
        let summary = service.submit_folder(files, "Photos", None).await.unwrap();

        assert_eq!(summary.folder.name, "Photos");
        assert_eq!(summary.uploaded.len(), 3);
        assert!(summary.skipped.is_empty());
        assert!(summary.failed.is_empty());

        let top = service.list_children(Some(&summary.folder.id)).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "2024");
        assert!(top[0].is_folder());
        assert_eq!(top[1].name, "a.jpg");

        let nested = service.list_children(Some(&top[0].id)).await.unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(service.quota().used_bytes().await.unwrap(), 12);

        let paths: Vec<&str> = summary.uploaded.iter().map(|u| u.path.as_str()).collect();
        assert!(paths.contains(&"2024/b.jpg"));
    }

    #[tokio::test]
    async fn test_submit_folder_skips_existing() {
        let (_dir, service) = setup(MB10).await;

        let first = vec![stage(&service, "Docs/sub/a.txt", b"same").await];
        let first_summary = service.submit_folder(first, "Docs", None).await.unwrap();
        assert_eq!(first_summary.uploaded.len(), 1);

        let second = vec![
            stage(&service, "Docs/sub/a.txt", b"same").await,
            stage(&service, "Docs/sub/b.txt", b"new").await,
        ];
        let summary = service.submit_folder(second, "Docs", None).await.unwrap();

        assert_eq!(summary.folder.id, first_summary.folder.id);
        assert_eq!(summary.uploaded.len(), 1);
        assert_eq!(summary.uploaded[0].name, "b.txt");
        assert_eq!(
            summary.skipped,
            vec![SkippedFile {
                name: "a.txt".to_string(),
                size: 4,
                reason: SKIP_ALREADY_EXISTS.to_string(),
            }]
        );

        assert_eq!(service.list_children(None).await.unwrap().len(), 1);
        let sub = service.list_children(Some(&summary.folder.id)).await.unwrap();
        assert_eq!(sub.len(), 1);
        let files = service.list_children(Some(&sub[0].id)).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(stored_files(&service), 2);
        assert_eq!(staging_entries(&service), 0);
    }

    #[tokio::test]
    async fn test_submit_folder_changed_content_not_skipped() {
        let (_dir, service) = setup(MB10).await;

        let first = vec![stage(&service, "Docs/a.txt", b"v1").await];
        service.submit_folder(first, "Docs", None).await.unwrap();

        let second = vec![stage(&service, "Docs/a.txt", b"v2").await];
        let summary = service.submit_folder(second, "Docs", None).await.unwrap();

        assert_eq!(summary.uploaded.len(), 1);
        assert!(summary.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_submit_folder_rename_is_not_duplicate() {
        let (_dir, service) = setup(MB10).await;

        let first = vec![stage(&service, "Docs/a.txt", b"same").await];
        service.submit_folder(first, "Docs", None).await.unwrap();

        let second = vec![stage(&service, "Docs/renamed.txt", b"same").await];
        let summary = service.submit_folder(second, "Docs", None).await.unwrap();

        assert_eq!(summary.uploaded.len(), 1);
        assert!(summary.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_submit_folder_duplicate_within_batch() {
        let (_dir, service) = setup(MB10).await;

        let files = vec![
            stage(&service, "Docs/a.txt", b"same").await,
            stage(&service, "Docs/a.txt", b"same").await,
        ];
        let summary = service.submit_folder(files, "Docs", None).await.unwrap();

        assert_eq!(summary.uploaded.len(), 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].reason, SKIP_DUPLICATE_IN_UPLOAD);
    }

    #[tokio::test]
    async fn test_submit_folder_quota_is_all_or_nothing() {
        let (_dir, service) = setup(100).await;

        let files = vec![
            stage_sized(&service, "Big/small.bin", 10, 1).await,
            stage_sized(&service, "Big/sub/large.bin", 95, 2).await,
        ];
        let err = service.submit_folder(files, "Big", None).await.unwrap_err();

        match err {
            StowageError::QuotaExceeded(shortfall) => {
                assert_eq!(shortfall.current_used, 0);
                assert_eq!(shortfall.available, 100);
                assert_eq!(shortfall.required, 105);
                assert_eq!(shortfall.skipped, 0);
            }
            other => panic!("Expected QuotaExceeded, got {other:?}"),
        }

        assert!(service.list_children(None).await.unwrap().is_empty());
        assert_eq!(staging_entries(&service), 0);
    }

    #[tokio::test]
    async fn test_submit_folder_dedup_frees_quota() {
        let (_dir, service) = setup(MB10).await;

        let base = vec![
            stage_sized(&service, "Docs/base.bin", 7_000_000, 1).await,
            stage_sized(&service, "Docs/dup.bin", 2_000_000, 2).await,
        ];
        service.submit_folder(base, "Docs", None).await.unwrap();
        assert_eq!(service.quota().used_bytes().await.unwrap(), 9_000_000);

        let batch = vec![
            stage_sized(&service, "Docs/one.bin", 500_000, 3).await,
            stage_sized(&service, "Docs/two.bin", 400_000, 4).await,
            stage_sized(&service, "Docs/dup.bin", 2_000_000, 2).await,
        ];
        let summary = service.submit_folder(batch, "Docs", None).await.unwrap();

        assert_eq!(summary.uploaded.len(), 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].name, "dup.bin");
        assert_eq!(service.quota().used_bytes().await.unwrap(), 9_900_000);
    }

    #[tokio::test]
    async fn test_submit_folder_under_parent() {
        let (_dir, service) = setup(MB10).await;
        let parent = service.create_folder("Parent", None).await.unwrap();

        let files = vec![stage(&service, "Inner/x.txt", b"x").await];
        let summary = service
            .submit_folder(files, "Inner", Some(&parent.id))
            .await
            .unwrap();

        assert_eq!(summary.folder.parent_id.as_deref(), Some(parent.id.as_str()));
        assert_eq!(service.list_children(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_folder_validation() {
        let (_dir, service) = setup(MB10).await;

        let result = service.submit_folder(Vec::new(), "Docs", None).await;
        assert!(matches!(result, Err(StowageError::Validation(_))));

        let files = vec![stage(&service, "a.txt", b"a").await];
        let result = service.submit_folder(files, "  ", None).await;
        assert!(matches!(result, Err(StowageError::Validation(_))));
        assert_eq!(staging_entries(&service), 0);
    }

    #[tokio::test]
    async fn test_submit_folder_invalid_path_reported_as_failed() {
        let (_dir, service) = setup(MB10).await;

        let files = vec![
            stage(&service, "../", b"x").await,
            stage(&service, "Docs/ok.txt", b"ok").await,
        ];
        let summary = service.submit_folder(files, "Docs", None).await.unwrap();

        assert_eq!(summary.uploaded.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(staging_entries(&service), 0);
    }

    /// Occupy every shard directory name with a regular file so `persist` fails.
    fn block_shards(service: &ItemService) {
        let upload_dir = service.storage().upload_dir();
        for shard in 0..=u8::MAX {
            std::fs::write(upload_dir.join(format!("{shard:02x}")), b"").unwrap();
        }
    }

    async fn file_count(service: &ItemService) -> i64 {
        service.repo().count_by_kind(ItemKind::File).await.unwrap()
    }

    #[tokio::test]
    async fn test_submit_rolls_back_batch_on_failure() {
        let (_dir, service) = setup(MB10).await;

        let files = vec![
            stage(&service, "first.txt", b"first").await,
            stage(&service, "second.txt", b"second").await,
            stage(&service, "../", b"bad").await,
        ];
        let result = service.submit(files, None).await;

        assert!(matches!(result, Err(StowageError::Validation(_))));
        assert_eq!(file_count(&service).await, 0);
        assert_eq!(service.quota().used_bytes().await.unwrap(), 0);
        assert_eq!(stored_files(&service), 0);
        assert_eq!(staging_entries(&service), 0);
    }

    #[tokio::test]
    async fn test_submit_persist_failure_leaves_nothing() {
        let (_dir, service) = setup(MB10).await;
        block_shards(&service);

        let files = vec![
            stage(&service, "a.txt", b"alpha").await,
            stage(&service, "b.txt", b"beta").await,
        ];
        let result = service.submit(files, None).await;

        assert!(matches!(result, Err(StowageError::Io(_))));
        assert_eq!(file_count(&service).await, 0);
        assert_eq!(service.quota().used_bytes().await.unwrap(), 0);
        assert_eq!(staging_entries(&service), 0);
    }

    #[tokio::test]
    async fn test_submit_folder_persist_failure_reported_as_failed() {
        let (_dir, service) = setup(MB10).await;
        block_shards(&service);

        let files = vec![
            stage(&service, "Docs/a.txt", b"alpha").await,
            stage(&service, "Docs/sub/b.txt", b"beta").await,
        ];
        let summary = service.submit_folder(files, "Docs", None).await.unwrap();

        assert!(summary.uploaded.is_empty());
        assert!(summary.skipped.is_empty());
        let mut failed: Vec<&str> = summary.failed.iter().map(|f| f.name.as_str()).collect();
        failed.sort_unstable();
        assert_eq!(failed, ["a.txt", "b.txt"]);

        assert_eq!(file_count(&service).await, 0);
        assert_eq!(service.quota().used_bytes().await.unwrap(), 0);
        assert_eq!(staging_entries(&service), 0);

        let children = service.list_children(Some(&summary.folder.id)).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "sub");
        assert!(children[0].is_folder());
    }
}
