//! Post listing handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::feed::PostRepository;
use crate::web::dto::{ApiResponse, PaginatedResponse, PaginationQuery, PostResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/posts - List the caller's posts, newest first.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<PostResponse>>, ApiError> {
    let repo = PostRepository::new(state.db.pool());
    let account_id = auth.account_id();

    let total = repo.count_by_account(account_id).await?;
    let posts = repo
        .list_by_account(account_id, query.per_page() as i64, query.offset())
        .await?;

    let data = posts.into_iter().map(PostResponse::from).collect();
    Ok(Json(PaginatedResponse::new(
        data,
        query.page(),
        query.per_page(),
        total as u64,
    )))
}

/// GET /api/posts/:id - Get one of the caller's posts.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResponse<PostResponse>>, ApiError> {
    let post = PostRepository::new(state.db.pool())
        .get_by_id(post_id)
        .await?
        .filter(|p| p.owner_account_id == auth.account_id())
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(ApiResponse::new(PostResponse::from(post))))
}
