//! Tempt background work
//!
//! The generation-status poller used by clients waiting on queued jobs, and
//! (with the `sweeper` feature) the periodic job that expires lapsed
//! subscriptions.

pub mod poller;
pub mod source;
#[cfg(feature = "sweeper")]
pub mod sweeper;

pub use poller::{
    CompletedTask, FailedTask, FailureReason, GenerationTracker, PollError, PollEvent,
    PollSummary, Poller, PollerConfig,
};
pub use source::StatusSource;
#[cfg(feature = "sweeper")]
pub use sweeper::SubscriptionSweeper;
