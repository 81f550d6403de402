//! Application state shared by all handlers.

use crate::services::{AccountService, BillingService, GenerationService, SocialService};
use sqlx::PgPool;
use tempt_db::{
    CategoryRepository, CommentRepository, ImageRepository, NutsRepository, PlanRepository,
    SubscriptionRepository, UsageRepository, UserRepository, VideoRepository, VoteRepository,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
}

/// One handle per table group; every repository clones cheaply (pool handle).
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepository,
    pub plans: PlanRepository,
    pub subscriptions: SubscriptionRepository,
    pub usage: UsageRepository,
    pub nuts: NutsRepository,
    pub categories: CategoryRepository,
    pub images: ImageRepository,
    pub videos: VideoRepository,
    pub votes: VoteRepository,
    pub comments: CommentRepository,
}

impl Repositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            plans: PlanRepository::new(pool.clone()),
            subscriptions: SubscriptionRepository::new(pool.clone()),
            usage: UsageRepository::new(pool.clone()),
            nuts: NutsRepository::new(pool.clone()),
            categories: CategoryRepository::new(pool.clone()),
            images: ImageRepository::new(pool.clone()),
            videos: VideoRepository::new(pool.clone()),
            votes: VoteRepository::new(pool.clone()),
            comments: CommentRepository::new(pool),
        }
    }
}

/// Secrets used by request authentication
#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub callback_secret: String,
}

pub struct AppState {
    pub db: DbState,
    pub repos: Repositories,
    pub security: SecurityConfig,
    pub generation: GenerationService,
    pub billing: BillingService,
    pub social: SocialService,
    pub accounts: AccountService,
    /// Cancelled on shutdown; background loops watch it
    pub shutdown: CancellationToken,
}
