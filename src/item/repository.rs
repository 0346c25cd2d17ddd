//! Item repository: persistence for files and folders.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::types::{format_created_at, Item, ItemKind, ItemRow, NewItem};
use crate::{Result, StowageError};

const ITEM_COLUMNS: &str =
    "id, name, kind, parent_id, url, size, mime_type, content_hash, created_at";

/// Repository for item operations.
pub struct ItemRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new ItemRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new item.
    ///
    /// Assigns the ID and creation time and returns the stored form.
    pub async fn create(&self, item: &NewItem) -> Result<Item> {
        item.validate()?;

        let id = Uuid::new_v4().to_string();
        let created_at = format_created_at(&Utc::now());

        sqlx::query(
            "INSERT INTO items (id, name, kind, parent_id, url, size, mime_type, content_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(item.name.trim())
        .bind(item.kind.as_str())
        .bind(&item.parent_id)
        .bind(&item.url)
        .bind(item.size.map(|s| s as i64))
        .bind(&item.mime_type)
        .bind(&item.content_hash)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| StowageError::NotFound("item".to_string()))
    }

    /// Get an item by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Item>> {
        let row: Option<ItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(ItemRow::into_item))
    }

    /// List direct children of a folder, or root items when `parent_id` is None.
    ///
    /// Folders come before files; each group is newest first.
    pub async fn list_children(&self, parent_id: Option<&str>) -> Result<Vec<Item>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE parent_id IS ?
             ORDER BY CASE kind WHEN 'folder' THEN 0 ELSE 1 END, created_at DESC, rowid DESC"
        ))
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ItemRow::into_item).collect())
    }

    /// Find an item matching every field of the dedup key exactly.
    ///
    /// `size` and `content_hash` are None when looking up folders.
    pub async fn find_existing(
        &self,
        name: &str,
        parent_id: Option<&str>,
        kind: ItemKind,
        size: Option<u64>,
        content_hash: Option<&str>,
    ) -> Result<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE name = ? AND parent_id IS ? AND kind = ? AND size IS ? AND content_hash IS ?
             ORDER BY rowid LIMIT 1"
        ))
        .bind(name)
        .bind(parent_id)
        .bind(kind.as_str())
        .bind(size.map(|s| s as i64))
        .bind(content_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ItemRow::into_item))
    }

    /// Find a folder by name under a parent.
    pub async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Option<Item>> {
        self.find_existing(name, parent_id, ItemKind::Folder, None, None)
            .await
    }

    /// Delete a single item record by ID.
    ///
    /// Fails if the item still has children.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sum of `size` over all file items.
    pub async fn total_file_size(&self) -> Result<u64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(size), 0) FROM items WHERE kind = 'file'")
                .fetch_one(self.pool)
                .await?;

        Ok(total.max(0) as u64)
    }

    /// Count items of a kind.
    pub async fn count_by_kind(&self, kind: ItemKind) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
