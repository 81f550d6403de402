//! Tempt Core Library
//!
//! This crate provides core domain models, error types, configuration and the
//! pure business rules (feature access, quotas, gallery layout) shared across
//! all Tempt components.

pub mod access;
pub mod config;
pub mod error;
pub mod layout;
pub mod models;
pub mod quota;

// Re-export commonly used types
pub use access::{check_feature_access, DenialReason, Feature, FeatureAccess, SubscriptionState};
pub use config::{BaseConfig, Config, GalleryConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use layout::{LayoutItem, LayoutResult, MasonryLayout, Placement};
pub use quota::{CostInput, QuotaCheck};
