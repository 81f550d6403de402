//! Tempt database layer
//!
//! sqlx/Postgres repositories for every persisted entity plus transaction helpers.

pub mod db;

pub use db::*;
