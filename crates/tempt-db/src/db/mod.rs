//! Database repositories for data access layer
//!
//! Each repository owns a pool handle and is responsible for one entity.
//! Methods ending in `_tx` run on a caller-supplied transaction so handlers
//! can compose several writes atomically.
//
// Accounts and billing
pub mod nuts;
pub mod plan;
pub mod subscription;
pub mod usage;
pub mod user;
//
// Gallery and social
pub mod category;
pub mod comment;
pub mod image;
pub mod video;
pub mod vote;
//
// Transaction utilities
pub mod transaction;

pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use image::{ImageRepository, NewImage};
pub use nuts::NutsRepository;
pub use plan::PlanRepository;
pub use subscription::SubscriptionRepository;
pub use transaction::Tx;
pub use usage::UsageRepository;
pub use user::UserRepository;
pub use video::{NewVideo, VideoRepository};
pub use vote::VoteRepository;
