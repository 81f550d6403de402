//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tempt_core::Config;

/// Connect, migrate, build state and routes. Background jobs are started
/// separately with [`services::spawn_background_jobs`].
pub async fn initialize_app(config: &Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;
    tracing::info!(environment = config.environment(), "Configuration loaded and validated");

    let pool = database::setup_database(config).await?;
    let state = services::initialize_services(config, pool);
    let router = routes::setup_routes(config, state.clone())?;

    Ok((state, router))
}
