//! HTTP handlers, one module per route group.

pub mod admin;
pub mod billing;
pub mod categories;
pub mod gallery;
pub mod generation;
pub mod profile;
pub mod social;

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use serde::Deserialize;
use utoipa::IntoParams;

/// Limit/offset pagination shared by list endpoints
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl PageQuery {
    /// Limit and offset clamped to the accepted range.
    pub fn bounds(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE_LIMIT), self.offset.max(0))
    }
}
