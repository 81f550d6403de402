//! Subscription expiry sweeper
//!
//! Flips subscriptions whose billing period ended to `expired` on a fixed
//! interval. Active and trialing subscriptions keep their plan until this
//! sweep catches them.

use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use tempt_db::SubscriptionRepository;

pub struct SubscriptionSweeper {
    repository: SubscriptionRepository,
    interval: Duration,
}

impl SubscriptionSweeper {
    pub fn new(repository: SubscriptionRepository, interval: Duration) -> Self {
        Self {
            repository,
            interval,
        }
    }

    /// Run until `shutdown` fires.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval_secs = self.interval.as_secs(), "Subscription sweeper started");
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        match self.repository.expire_lapsed(Utc::now()).await {
                            Ok(0) => {}
                            Ok(expired) => tracing::info!(expired, "Expired lapsed subscriptions"),
                            Err(e) => tracing::error!(error = %e, "Subscription sweep failed"),
                        }
                    }
                }
            }

            tracing::info!("Subscription sweeper stopped");
        })
    }
}
