//! Account feed settings handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::{AccountFeedSettings, AccountRepository};
use crate::web::dto::{AccountResponse, ApiResponse, UpdateFeedSettingsRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/account - Get the caller's account and feed settings.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = AccountRepository::new(state.db.pool())
        .get_by_id(auth.account_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    Ok(Json(ApiResponse::new(AccountResponse::from(account))))
}

/// PUT /api/account/feed - Update the caller's feed settings.
pub async fn update_feed_settings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateFeedSettingsRequest>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let mut settings = AccountFeedSettings::new();
    if let Some(url) = req.feed_url {
        let url = url.trim();
        settings = if url.is_empty() {
            settings.clear_feed_url()
        } else {
            settings.with_feed_url(url)
        };
    }
    if let Some(enabled) = req.auto_publish_from_feed {
        settings = settings.with_auto_publish(enabled);
    }

    let account = AccountRepository::new(state.db.pool())
        .update_feed_settings(auth.account_id(), &settings)
        .await?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    tracing::info!(
        "Feed settings updated for account {} (feed: {})",
        account.id,
        account.feed_url.as_deref().unwrap_or("none")
    );

    Ok(Json(ApiResponse::new(AccountResponse::from(account))))
}
