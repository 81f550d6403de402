//! Application errors
//!
//! Every fallible path in the gallery ends in an [`AppError`]. Each variant
//! knows its HTTP status, machine code and how loudly it should be logged
//! through [`ErrorMetadata`], so the HTTP layer renders them uniformly.
//!
//! The `Database` variant wraps `sqlx::Error` only with the `sqlx` feature;
//! client crates get a string instead.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::models::PlanTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes: bad input, missing rows, denied features
    Debug,
    /// Worth noticing but expected: restricted accounts, exhausted quotas
    Warn,
    /// Server-side failures
    Error,
}

/// How an error presents itself to API clients and to the logs.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable code such as `INSUFFICIENT_NUTS`
    fn error_code(&self) -> &'static str;

    /// Retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to return to the caller
    fn client_message(&self) -> String;

    /// Internal details must not leave the server in production
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Account restricted: {0}")]
    AccountRestricted(String),

    #[error("Subscription required: {feature} requires the {required_plan} plan")]
    SubscriptionRequired {
        feature: String,
        required_plan: PlanTier,
    },

    #[error("Usage limit exceeded: {resource} usage {used}/{limit}")]
    UsageLimitExceeded {
        resource: String,
        used: i64,
        limit: i64,
    },

    #[error("Insufficient nuts: {balance} available, {required} required")]
    InsufficientNuts { balance: i64, required: i64 },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => AppError::NotFound("Record not found".to_string()),
            SqlxError::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Record already exists".to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// (status, code, recoverable, suggested action, sensitive, log level)
fn variant_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("Reload the resource and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Sign in again to refresh your session"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::AccountRestricted(_) => (
            403,
            "ACCOUNT_RESTRICTED",
            false,
            Some("Contact support to review the restriction"),
            false,
            LogLevel::Warn,
        ),
        AppError::SubscriptionRequired { .. } => (
            402,
            "SUBSCRIPTION_REQUIRED",
            false,
            Some("Upgrade your plan to access this feature"),
            false,
            LogLevel::Debug,
        ),
        AppError::UsageLimitExceeded { .. } => (
            402,
            "USAGE_LIMIT_EXCEEDED",
            false,
            Some("Upgrade plan or wait for limit reset"),
            false,
            LogLevel::Warn,
        ),
        AppError::InsufficientNuts { .. } => (
            402,
            "INSUFFICIENT_NUTS",
            false,
            Some("Top up your balance or reduce the request size"),
            false,
            LogLevel::Debug,
        ),
    }
}

impl AppError {
    /// Variant name, included in development error bodies
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::AccountRestricted(_) => "AccountRestricted",
            AppError::SubscriptionRequired { .. } => "SubscriptionRequired",
            AppError::UsageLimitExceeded { .. } => "UsageLimitExceeded",
            AppError::InsufficientNuts { .. } => "InsufficientNuts",
        }
    }

    /// Display text followed by up to five levels of source errors.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut chain = vec![self.to_string()];
        let mut source = self.source();
        while let Some(err) = source {
            if chain.len() > 5 {
                chain.push("...".to_string());
                break;
            }
            chain.push(format!("caused by: {}", err));
            source = err.source();
        }
        chain.join("\n  ")
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        variant_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        variant_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        variant_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        variant_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        variant_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        variant_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::InvalidInput(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::AccountRestricted(msg) => msg.clone(),
            AppError::SubscriptionRequired {
                feature,
                required_plan,
            } => format!("{} requires the {} plan or higher", feature, required_plan),
            AppError::UsageLimitExceeded {
                resource,
                used,
                limit,
            } => format!("{} limit reached for this period ({}/{})", resource, used, limit),
            AppError::InsufficientNuts { balance, required } => format!(
                "Not enough nuts: {} available, {} required",
                balance, required
            ),
        }
    }
}
