//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_item, delete_item, list_items, storage_usage, upload_folder, AppState,
};
use super::middleware::{create_cors_layer, sandbox_stored_content, security_headers};
use crate::config::ServerConfig;

/// Create the main router: item API, stored content and health check.
pub fn create_router(app_state: Arc<AppState>, config: &ServerConfig) -> Router {
    let item_routes = Router::new()
        .route("/", post(create_item))
        .route("/folder-upload", post(upload_folder))
        .route("/storage", get(storage_usage))
        .route("/:id", get(list_items).delete(delete_item));

    let storage = app_state.items.storage();
    let content_routes = Router::new()
        .nest_service(storage.url_prefix(), ServeDir::new(storage.upload_dir()))
        .layer(middleware::from_fn(sandbox_stored_content));

    Router::new()
        .nest("/items", item_routes)
        .merge(content_routes)
        .merge(create_health_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_origins))
                .layer(DefaultBodyLimit::max(config.max_body_bytes))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_router() {
        let router: Router = create_health_router();
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
