//! API handlers for the item store.

pub mod items;

pub use items::*;

use crate::item::ItemService;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Item store and upload orchestration.
    pub items: ItemService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(items: ItemService) -> Self {
        Self { items }
    }
}
