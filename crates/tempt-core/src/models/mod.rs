//! Data models for the application
//!
//! This module contains all data structures used throughout the application,
//! organized by domain. Each sub-module represents a specific feature area.

mod category;
mod generation;
mod nuts;
mod plan;
mod social;
mod subscription;
mod usage;
mod user;

// Re-export all models for convenient imports
pub use category::*;
pub use generation::*;
pub use nuts::*;
pub use plan::*;
pub use social::*;
pub use subscription::*;
pub use usage::*;
pub use user::*;
