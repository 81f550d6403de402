//! Service and repository wiring

use crate::constants::SUBSCRIPTION_SWEEP_SECS;
use crate::services::{AccountService, BillingService, GenerationService, SocialService};
use crate::state::{AppState, DbState, Repositories, SecurityConfig};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tempt_core::Config;
use tempt_worker::SubscriptionSweeper;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Build the shared state. Does not touch the database, so a lazily
/// connected pool works too.
pub fn initialize_services(config: &Config, pool: PgPool) -> Arc<AppState> {
    let repos = Repositories::new(pool.clone());

    Arc::new(AppState {
        generation: GenerationService::new(pool.clone(), repos.clone()),
        billing: BillingService::new(pool.clone(), repos.clone()),
        social: SocialService::new(pool.clone(), repos.clone()),
        accounts: AccountService::new(pool.clone(), repos.clone(), config.signup_bonus_nuts()),
        db: DbState { pool },
        repos,
        security: SecurityConfig {
            jwt_secret: config.jwt_secret().to_string(),
            callback_secret: config.callback_secret().to_string(),
        },
        shutdown: CancellationToken::new(),
    })
}

/// Start loops that run for the life of the server; they stop when
/// `state.shutdown` is cancelled.
pub fn spawn_background_jobs(state: &AppState) -> Vec<JoinHandle<()>> {
    let sweeper = SubscriptionSweeper::new(
        state.repos.subscriptions.clone(),
        Duration::from_secs(SUBSCRIPTION_SWEEP_SECS),
    );

    vec![sweeper.spawn(state.shutdown.clone())]
}
