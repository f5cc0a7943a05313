//! Middleware for the HTTP surface.

pub mod auth;

pub use auth::{jwt_auth, AuthUser, JwtClaims, JwtState};
