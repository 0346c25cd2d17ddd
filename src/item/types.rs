//! Item types for the hierarchical store.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{Result, StowageError};

/// Fixed-width timestamp format so lexical order matches chronological order.
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Kind of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Stored byte content.
    File,
    /// Container for other items.
    Folder,
}

impl ItemKind {
    /// Database and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Folder => "folder",
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = StowageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(ItemKind::File),
            "folder" => Ok(ItemKind::Folder),
            other => Err(StowageError::Validation(format!("unknown item type: {other}"))),
        }
    }
}

impl TryFrom<String> for ItemKind {
    type Error = StowageError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// A file or folder record.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Unique item ID (UUID v4).
    pub id: String,
    /// Display name.
    pub name: String,
    /// File or folder.
    pub kind: ItemKind,
    /// Parent folder ID (None for root items).
    pub parent_id: Option<String>,
    /// Location of the stored content (files only).
    pub url: Option<String>,
    /// Content length in bytes (files only).
    pub size: Option<u64>,
    /// MIME type (files only).
    pub mime_type: Option<String>,
    /// Hex digest of the content (files only).
    pub content_hash: Option<String>,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Whether this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }
}

/// Raw row as stored in the `items` table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub id: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: ItemKind,
    pub parent_id: Option<String>,
    pub url: Option<String>,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
    pub content_hash: Option<String>,
    pub created_at: String,
}

impl ItemRow {
    pub(crate) fn into_item(self) -> Item {
        Item {
            id: self.id,
            name: self.name,
            kind: self.kind,
            parent_id: self.parent_id,
            url: self.url,
            size: self.size.map(|s| s.max(0) as u64),
            mime_type: self.mime_type,
            content_hash: self.content_hash,
            created_at: parse_created_at(&self.created_at),
        }
    }
}

/// Format a timestamp for the `created_at` column.
pub(crate) fn format_created_at(dt: &DateTime<Utc>) -> String {
    dt.format(CREATED_AT_FORMAT).to_string()
}

fn parse_created_at(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, CREATED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
        .unwrap_or_else(|e| {
            tracing::warn!(value = s, error = %e, "Unparseable created_at, using current time");
            Utc::now()
        })
}

/// Data for creating a new item.
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Display name.
    pub name: String,
    /// File or folder.
    pub kind: ItemKind,
    /// Parent folder ID (None for root).
    pub parent_id: Option<String>,
    /// Location of the stored content.
    pub url: Option<String>,
    /// Content length in bytes.
    pub size: Option<u64>,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Hex digest of the content.
    pub content_hash: Option<String>,
}

impl NewItem {
    /// A new folder at the root.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ItemKind::Folder,
            parent_id: None,
            url: None,
            size: None,
            mime_type: None,
            content_hash: None,
        }
    }

    /// A new file at the root.
    pub fn file(
        name: impl Into<String>,
        url: impl Into<String>,
        size: u64,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ItemKind::File,
            parent_id: None,
            url: Some(url.into()),
            size: Some(size),
            mime_type: None,
            content_hash: Some(content_hash.into()),
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: Option<impl Into<String>>) -> Self {
        self.parent_id = parent_id.map(Into::into);
        self
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Check that the fields required for the kind are present.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StowageError::Validation("name is required".to_string()));
        }

        match self.kind {
            ItemKind::Folder => {
                if self.url.is_some()
                    || self.size.is_some()
                    || self.mime_type.is_some()
                    || self.content_hash.is_some()
                {
                    return Err(StowageError::Validation(
                        "folders cannot carry file content".to_string(),
                    ));
                }
            }
            ItemKind::File => {
                if self.url.as_deref().map_or(true, str::is_empty) {
                    return Err(StowageError::Validation("file url is required".to_string()));
                }
                if self.size.is_none() {
                    return Err(StowageError::Validation("file size is required".to_string()));
                }
                if self.content_hash.as_deref().map_or(true, str::is_empty) {
                    return Err(StowageError::Validation(
                        "file content hash is required".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
