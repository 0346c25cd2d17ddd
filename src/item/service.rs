//! Item service: folder creation, listing and subtree deletion.
//!
//! Every operation that writes to the store runs under a single writer lock,
//! so a quota check and the commits it admits are never interleaved with
//! another writer.

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::repository::ItemRepository;
use super::types::{Item, NewItem};
use crate::db::Database;
use crate::file::{FileStorage, StagedFile};
use crate::quota::{QuotaAccountant, StorageUsage};
use crate::{Result, StowageError};

/// Hierarchical item store with quota-bounded uploads.
#[derive(Debug)]
pub struct ItemService {
    db: Database,
    storage: FileStorage,
    quota: QuotaAccountant,
    write_lock: Mutex<()>,
}

impl ItemService {
    /// Create a service enforcing `max_storage_bytes` over all file items.
    pub fn new(db: Database, storage: FileStorage, max_storage_bytes: u64) -> Self {
        let quota = QuotaAccountant::new(db.clone(), max_storage_bytes);
        Self {
            db,
            storage,
            quota,
            write_lock: Mutex::new(()),
        }
    }

    /// Content storage backing file items.
    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Quota accountant for this store.
    pub fn quota(&self) -> &QuotaAccountant {
        &self.quota
    }

    pub(super) fn repo(&self) -> ItemRepository<'_> {
        ItemRepository::new(self.db.pool())
    }

    pub(super) async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Create a folder.
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Item> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StowageError::Validation("Folder name is required".to_string()));
        }

        let _guard = self.lock_writes().await;
        let parent = self.resolve_parent(parent_id).await?;

        let folder = self
            .repo()
            .create(&NewItem::folder(name).with_parent(parent.map(|p| p.id)))
            .await?;

        info!(id = %folder.id, name = %folder.name, "Created folder");
        Ok(folder)
    }

    /// Get an item by ID.
    pub async fn get(&self, id: &str) -> Result<Item> {
        self.repo()
            .get_by_id(id)
            .await?
            .ok_or_else(|| StowageError::NotFound("Item".to_string()))
    }

    /// List direct children of a folder (None for root), folders first.
    pub async fn list_children(&self, parent_id: Option<&str>) -> Result<Vec<Item>> {
        self.repo().list_children(parent_id).await
    }

    /// Used and maximum bytes.
    pub async fn storage_usage(&self) -> Result<StorageUsage> {
        self.quota.usage().await
    }

    /// Delete an item and, for folders, everything beneath it.
    ///
    /// Children are removed before their parent. Content that is already
    /// missing from disk counts as removed. Returns the number of records
    /// deleted.
    pub async fn delete_subtree(&self, id: &str) -> Result<usize> {
        let _guard = self.lock_writes().await;

        let root = self.get(id).await?;
        let result = self.delete_nodes(root).await;
        self.quota.invalidate().await;

        let removed = result?;
        info!(id = %id, removed, "Deleted item subtree");
        Ok(removed)
    }

    async fn delete_nodes(&self, root: Item) -> Result<usize> {
        let repo = self.repo();
        let mut removed = 0;
        let mut stack = vec![(root, false)];

        while let Some((item, expanded)) = stack.pop() {
            if item.is_folder() && !expanded {
                let children = repo.list_children(Some(&item.id)).await?;
                stack.push((item, true));
                stack.extend(children.into_iter().map(|child| (child, false)));
                continue;
            }

            if let Some(url) = item.url.as_deref() {
                if !self.storage.delete_url(url)? {
                    debug!(id = %item.id, url = %url, "Content already missing");
                }
            }

            repo.delete(&item.id).await?;
            removed += 1;
        }

        Ok(removed)
    }

    /// Resolve the folder new items are created under.
    ///
    /// `None` means root. Unknown IDs are `NotFound`; file IDs are rejected.
    pub(super) async fn resolve_parent(&self, parent_id: Option<&str>) -> Result<Option<Item>> {
        let Some(parent_id) = parent_id else {
            return Ok(None);
        };

        let parent = self
            .repo()
            .get_by_id(parent_id)
            .await?
            .ok_or_else(|| StowageError::NotFound("Parent folder".to_string()))?;

        if !parent.is_folder() {
            return Err(StowageError::Validation(
                "Parent must be a folder".to_string(),
            ));
        }

        Ok(Some(parent))
    }

    /// Find a folder by name under a parent, creating it if absent.
    ///
    /// Callers must hold the writer lock.
    pub(super) async fn find_or_create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Item> {
        let repo = self.repo();
        if let Some(folder) = repo.find_folder(name, parent_id).await? {
            return Ok(folder);
        }

        let folder = repo
            .create(&NewItem::folder(name).with_parent(parent_id))
            .await?;
        debug!(id = %folder.id, name = %folder.name, "Created folder for upload");
        Ok(folder)
    }

    /// Create the record for staged content, then move the content into place.
    ///
    /// If the move fails the record is removed again. Staged content is
    /// removed on every failure path.
    pub(super) async fn commit_staged(
        &self,
        staged: StagedFile,
        name: &str,
        parent_id: Option<&str>,
        content_hash: String,
    ) -> Result<Item> {
        let stored_name = FileStorage::generate_stored_name(name);
        let new_item = NewItem::file(
            name,
            self.storage.url_for(&stored_name),
            staged.size(),
            content_hash,
        )
        .with_parent(parent_id)
        .with_mime_type(staged.mime_type());

        let repo = self.repo();
        let item = repo.create(&new_item).await?;

        if let Err(e) = self.storage.persist(staged, &stored_name) {
            if let Err(cleanup) = repo.delete(&item.id).await {
                warn!(
                    id = %item.id,
                    error = %cleanup,
                    "Failed to remove record after persist failure"
                );
            }
            return Err(e);
        }

        debug!(id = %item.id, name = %item.name, size = ?item.size, "Committed file");
        Ok(item)
    }

    /// Remove file items committed earlier in a batch that is being abandoned.
    pub(super) async fn rollback(&self, items: &[Item]) {
        let repo = self.repo();
        for item in items {
            if let Some(url) = item.url.as_deref() {
                if let Err(e) = self.storage.delete_url(url) {
                    warn!(id = %item.id, error = %e, "Failed to remove content during rollback");
                }
            }
            if let Err(e) = repo.delete(&item.id).await {
                warn!(id = %item.id, error = %e, "Failed to remove record during rollback");
            }
        }
    }
}
