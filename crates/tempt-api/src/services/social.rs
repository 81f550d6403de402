//! Votes and comments

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tempt_core::access::{check_feature_access, Feature, SubscriptionState};
use tempt_core::models::{
    CastVoteRequest, CommentResponse, CreateCommentRequest, GenerationStatus, Image, PublicUser,
    VoteChange, VoteOutcome,
};
use tempt_core::AppError;
use tempt_db::transaction::{begin, commit};
use tempt_db::Tx;
use uuid::Uuid;
use validator::Validate;

use crate::auth::UserContext;
use crate::state::Repositories;

/// Public completed images are visible to everyone; anything else only to
/// its owner and moderators.
pub fn is_visible(image: &Image, viewer: Option<&UserContext>) -> bool {
    if image.is_public && image.status == GenerationStatus::Completed {
        return true;
    }
    viewer.is_some_and(|ctx| ctx.can_manage(image.user_id))
}

#[derive(Clone)]
pub struct SocialService {
    pool: PgPool,
    repos: Repositories,
}

impl SocialService {
    pub fn new(pool: PgPool, repos: Repositories) -> Self {
        Self { pool, repos }
    }

    /// Lock the caller and check they may interact socially.
    async fn ensure_can_interact(
        &self,
        tx: &mut Tx,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let user = self.repos.users.lock_tx(tx, user_id).await?;
        let subscription = self
            .repos
            .subscriptions
            .get_for_user_tx(tx, user_id)
            .await?;
        let state = SubscriptionState::from_user(&user, subscription.as_ref());
        check_feature_access(&state, Feature::SocialInteraction, now).into_result()
    }

    async fn lock_visible_image(
        &self,
        tx: &mut Tx,
        ctx: &UserContext,
        image_id: Uuid,
    ) -> Result<Image, AppError> {
        self.repos
            .images
            .lock_tx(tx, image_id)
            .await?
            .filter(|image| is_visible(image, Some(ctx)))
            .ok_or_else(|| AppError::NotFound("Image not found".to_string()))
    }

    /// Cast, change or retract a vote. Repeating the current vote retracts it.
    #[tracing::instrument(skip(self, req), fields(user_id = %ctx.user_id, image_id = %image_id))]
    pub async fn vote(
        &self,
        ctx: &UserContext,
        image_id: Uuid,
        req: CastVoteRequest,
        now: DateTime<Utc>,
    ) -> Result<VoteOutcome, AppError> {
        req.check()?;

        let mut tx = begin(&self.pool).await?;
        // Image row lock serializes concurrent votes on the same image
        self.lock_visible_image(&mut tx, ctx, image_id).await?;
        self.ensure_can_interact(&mut tx, ctx.user_id, now).await?;

        let existing = self
            .repos
            .votes
            .lock_value_tx(&mut tx, ctx.user_id, image_id)
            .await?;
        let change = VoteChange::resolve(existing, req.value);
        self.repos
            .votes
            .apply_tx(&mut tx, ctx.user_id, image_id, change)
            .await?;
        let vote_score = self
            .repos
            .images
            .add_vote_score_tx(&mut tx, image_id, change.score_delta(existing))
            .await?;
        commit(tx).await?;

        Ok(VoteOutcome {
            image_id,
            vote_score,
            user_vote: change.resulting_vote(),
        })
    }

    pub async fn comments(
        &self,
        viewer: Option<&UserContext>,
        image_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentResponse>, AppError> {
        let visible = self
            .repos
            .images
            .get(image_id)
            .await?
            .is_some_and(|image| is_visible(&image, viewer));
        if !visible {
            return Err(AppError::NotFound("Image not found".to_string()));
        }

        let rows = self
            .repos
            .comments
            .list_for_image(image_id, limit, offset)
            .await?;
        Ok(rows.into_iter().map(CommentResponse::from).collect())
    }

    #[tracing::instrument(skip(self, req), fields(user_id = %ctx.user_id, image_id = %image_id))]
    pub async fn add_comment(
        &self,
        ctx: &UserContext,
        image_id: Uuid,
        req: CreateCommentRequest,
        now: DateTime<Utc>,
    ) -> Result<CommentResponse, AppError> {
        req.validate()?;
        let body = req.body.trim();
        if body.is_empty() {
            return Err(AppError::InvalidInput("comment must not be blank".to_string()));
        }

        let mut tx = begin(&self.pool).await?;
        self.lock_visible_image(&mut tx, ctx, image_id).await?;
        self.ensure_can_interact(&mut tx, ctx.user_id, now).await?;

        let comment = self
            .repos
            .comments
            .create_tx(&mut tx, ctx.user_id, image_id, body)
            .await?;
        self.repos
            .images
            .add_comment_count_tx(&mut tx, image_id, 1)
            .await?;
        let author = self.repos.users.lock_tx(&mut tx, ctx.user_id).await?;
        commit(tx).await?;

        Ok(CommentResponse {
            id: comment.id,
            image_id,
            body: comment.body,
            author: PublicUser::from(&author),
            created_at: comment.created_at,
        })
    }

    /// Authors delete their own comments; moderators delete any.
    #[tracing::instrument(skip(self), fields(user_id = %ctx.user_id, comment_id = %comment_id))]
    pub async fn delete_comment(&self, ctx: &UserContext, comment_id: Uuid) -> Result<(), AppError> {
        let mut tx = begin(&self.pool).await?;
        let comment = self
            .repos
            .comments
            .lock_tx(&mut tx, comment_id)
            .await?
            .filter(|c| ctx.can_manage(c.user_id))
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        self.repos.images.lock_tx(&mut tx, comment.image_id).await?;
        self.repos.comments.delete_tx(&mut tx, comment.id).await?;
        if !comment.is_hidden {
            self.repos
                .images
                .add_comment_count_tx(&mut tx, comment.image_id, -1)
                .await?;
        }
        commit(tx).await?;
        Ok(())
    }

    /// Hide a comment from listings. Hiding twice is a no-op.
    #[tracing::instrument(skip(self), fields(moderator_id = %ctx.user_id, comment_id = %comment_id))]
    pub async fn hide_comment(&self, ctx: &UserContext, comment_id: Uuid) -> Result<(), AppError> {
        if !ctx.role.can_moderate() {
            return Err(AppError::Forbidden("Insufficient permissions".to_string()));
        }

        let mut tx = begin(&self.pool).await?;
        let comment = self
            .repos
            .comments
            .lock_tx(&mut tx, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if !comment.is_hidden {
            self.repos.images.lock_tx(&mut tx, comment.image_id).await?;
            self.repos.comments.hide_tx(&mut tx, comment.id).await?;
            self.repos
                .images
                .add_comment_count_tx(&mut tx, comment.image_id, -1)
                .await?;
            tracing::info!(comment_id = %comment.id, "Comment hidden");
        }
        commit(tx).await?;
        Ok(())
    }
}
