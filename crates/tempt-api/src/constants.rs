//! API constants
//!
//! Every route is mounted under [`API_PREFIX`].

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

/// Versioned prefix for all JSON routes
pub const API_PREFIX: &str = "/api/v1";

/// Header the generation provider sends with status callbacks
pub const CALLBACK_SECRET_HEADER: &str = "X-Callback-Secret";

/// Upper bound on a JSON request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// How often lapsed subscriptions are flipped to expired
pub const SUBSCRIPTION_SWEEP_SECS: u64 = 300;

pub const DEFAULT_PAGE_LIMIT: i64 = 30;
pub const MAX_PAGE_LIMIT: i64 = 100;
