//! Bearer-token authentication
//!
//! Tokens are HS256 JWTs carrying the user id and role. Handlers take
//! `UserContext` (or `Option<UserContext>` on public routes) as an extractor.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::{issue_token, verify_token};
pub use models::{JwtClaims, UserContext};
