//! Business operations that span several repositories.
//!
//! Handlers stay thin: they extract and authorize, then call one of these
//! services, which own the transactions.

pub mod account;
pub mod billing;
pub mod generation;
pub mod social;

pub use account::AccountService;
pub use billing::BillingService;
pub use generation::GenerationService;
pub use social::{is_visible, SocialService};
