//! Middleware for Web API.

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::{sandbox_stored_content, security_headers};
