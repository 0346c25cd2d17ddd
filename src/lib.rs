//! Stowage - quota-bounded file and folder store.
//!
//! A hierarchical item store (files and folders) backed by SQLite and local
//! disk, with a deduplicating upload pipeline that never lets stored content
//! exceed a configured ceiling.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod item;
pub mod logging;
pub mod quota;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{QuotaShortfall, Result, StowageError};
pub use item::{
    FolderUploadSummary, Item, ItemKind, ItemRepository, ItemService, NewItem, RelativePath,
};
pub use quota::{QuotaAccountant, StorageUsage};
