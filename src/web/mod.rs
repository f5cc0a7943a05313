//! HTTP surface for feedsync.
//!
//! This module exposes the feed pipeline's on-demand import and triggered
//! sync, plus the imported posts and account feed settings, over a JSON API.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
