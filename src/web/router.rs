//! Router configuration for the HTTP surface.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    get_account, get_post, import_feed, list_posts, sync_feeds, update_feed_settings, AppState,
};
use super::middleware::{jwt_auth, JwtState};

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, jwt_state: Arc<JwtState>) -> Router {
    let feed_routes = Router::new()
        .route("/import", post(import_feed))
        .route("/sync", post(sync_feeds));

    let post_routes = Router::new()
        .route("/", get(list_posts))
        .route("/:id", get(get_post));

    let account_routes = Router::new()
        .route("/", get(get_account))
        .route("/feed", put(update_feed_settings));

    let api_routes = Router::new()
        .nest("/feeds", feed_routes)
        .nest("/posts", post_routes)
        .nest("/account", account_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
