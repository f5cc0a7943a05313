//! Feed pipeline handlers.

use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::feed::{ImportScope, RunReport};
use crate::web::dto::{ApiResponse, ImportFeedRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Header carrying the shared secret for triggered syncs.
pub const SYNC_TOKEN_HEADER: &str = "x-sync-token";

/// POST /api/feeds/import - Import a feed into the caller's account.
pub async fn import_feed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<ImportFeedRequest>,
) -> Result<Json<ApiResponse<RunReport>>, ApiError> {
    let report = state
        .feed_service()
        .run(ImportScope::SingleAccount {
            account_id: auth.account_id(),
            feed_url: req.feed_url,
            item_limit: req.item_limit,
        })
        .await?;

    Ok(Json(ApiResponse::new(report)))
}

/// POST /api/feeds/sync - Sync every configured feed now.
///
/// Requires the `X-Sync-Token` header to match `sync.trigger_token`.
/// Triggering is disabled while the token is empty.
pub async fn sync_feeds(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<RunReport>>, ApiError> {
    let expected = state.config.sync.trigger_token.as_str();
    let provided = headers
        .get(SYNC_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if expected.is_empty() || !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        return Err(ApiError::forbidden("Invalid sync token"));
    }

    let report = state.feed_service().run(ImportScope::AllSubscribed).await?;
    Ok(Json(ApiResponse::new(report)))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
