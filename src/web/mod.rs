//! HTTP API for Stowage.
//!
//! Exposes the item store as JSON endpoints under `/items` and serves stored
//! content under the configured URL prefix.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
