//! Generation requests and provider status updates
//!
//! Queuing a generation is one transaction: the user row is locked, access,
//! quota and balance are checked against fresh data, then the debit, ledger
//! row, usage bump and queued artifacts are written together. A failed
//! generation is refunded exactly once.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tempt_core::access::{check_feature_access, Feature, SubscriptionState};
use tempt_core::models::{
    GenerationAccepted, GenerationCallback, GenerationKind, GenerationStatus, Image,
    ImageGenerationRequest, NutsTransactionKind, PlanTier, Subscription, TaskStatusReport, Video,
    VideoGenerationRequest,
};
use tempt_core::quota::{
    self, check_quota, ensure_balance, generation_cost, CostInput, HIGH_RESOLUTION_THRESHOLD,
};
use tempt_core::AppError;
use tempt_db::transaction::{begin, commit};
use tempt_db::{NewImage, NewVideo, Tx};
use uuid::Uuid;
use validator::Validate;

use crate::auth::UserContext;
use crate::state::Repositories;

/// Features an image request needs, cheapest check first.
pub fn image_features(req: &ImageGenerationRequest) -> Vec<Feature> {
    let mut features = vec![Feature::ImageGeneration];
    if req.advanced.is_some() {
        features.push(Feature::AdvancedGeneration);
    }
    if req.longest_side() > HIGH_RESOLUTION_THRESHOLD {
        features.push(Feature::HighResolution);
    }
    if req.count > 1 {
        features.push(Feature::BatchGeneration);
    }
    if !req.is_public {
        features.push(Feature::PrivateGallery);
    }
    features
}

pub fn video_features(req: &VideoGenerationRequest) -> Vec<Feature> {
    let mut features = vec![Feature::VideoGeneration];
    if !req.is_public {
        features.push(Feature::PrivateGallery);
    }
    features
}

/// Usage period for quota accounting: the paid billing period while it is in
/// force, otherwise the calendar month.
pub fn usage_period(
    subscription: Option<&Subscription>,
    effective_plan: PlanTier,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    match subscription {
        Some(sub)
            if effective_plan.is_paid()
                && sub.plan == effective_plan
                && sub.current_period_start <= now
                && now < sub.current_period_end =>
        {
            Ok((sub.current_period_start, sub.current_period_end))
        }
        _ => quota::calendar_month(now),
    }
}

/// Whether a provider update changes the stored status.
///
/// Repeated deliveries of the current status are ignored; anything that
/// would move a job backwards or out of a terminal state is a conflict.
pub fn resolve_transition(
    current: GenerationStatus,
    next: GenerationStatus,
) -> Result<bool, AppError> {
    if current == next {
        return Ok(false);
    }
    if current.can_transition_to(next) {
        return Ok(true);
    }
    Err(AppError::Conflict(format!(
        "Cannot move task from {} to {}",
        current, next
    )))
}

fn new_task_id(kind: GenerationKind) -> String {
    let prefix = match kind {
        GenerationKind::Image => "img",
        GenerationKind::Video => "vid",
    };
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Outcome of the admission checks, carried into the charge step
struct Admission {
    usage_id: Uuid,
}

/// What a failed artifact was charged, for its refund
struct Charge {
    artifact_id: Uuid,
    user_id: Uuid,
    usage_record_id: Option<Uuid>,
    nuts_cost: i64,
    kind: GenerationKind,
}

#[derive(Clone)]
pub struct GenerationService {
    pool: PgPool,
    repos: Repositories,
}

impl GenerationService {
    pub fn new(pool: PgPool, repos: Repositories) -> Self {
        Self { pool, repos }
    }

    /// Lock the user and run every admission check inside `tx`.
    #[allow(clippy::too_many_arguments)]
    async fn admit(
        &self,
        tx: &mut Tx,
        user_id: Uuid,
        features: &[Feature],
        kind: GenerationKind,
        count: u32,
        longest_side: Option<u32>,
        cost: i64,
        now: DateTime<Utc>,
    ) -> Result<Admission, AppError> {
        let user = self.repos.users.lock_tx(tx, user_id).await?;
        let subscription = self.repos.subscriptions.get_for_user_tx(tx, user_id).await?;
        let state = SubscriptionState::from_user(&user, subscription.as_ref());

        for feature in features {
            check_feature_access(&state, *feature, now).into_result()?;
        }

        let effective = state.effective_plan(now);
        let plan = self.repos.plans.get_tx(tx, effective).await?;
        if let Some(side) = longest_side {
            if i64::from(side) > i64::from(plan.max_resolution) {
                return Err(AppError::InvalidInput(format!(
                    "The {} plan allows images up to {}px",
                    plan.tier, plan.max_resolution
                )));
            }
        }

        let (period_start, period_end) = usage_period(subscription.as_ref(), effective, now)?;
        let usage = self
            .repos
            .usage
            .get_or_create_tx(tx, user_id, period_start, period_end)
            .await?;
        check_quota(&plan, Some(&usage), kind, count).into_result(kind)?;
        ensure_balance(user.nuts_balance, cost)?;

        Ok(Admission { usage_id: usage.id })
    }

    /// Debit, record usage and bump lifetime counters for an admitted request.
    async fn charge(
        &self,
        tx: &mut Tx,
        user_id: Uuid,
        admission: &Admission,
        kind: GenerationKind,
        count: u32,
        cost: i64,
    ) -> Result<i64, AppError> {
        let count = i32::try_from(count)
            .map_err(|_| AppError::InvalidInput("count is out of range".to_string()))?;
        let (images, videos) = match kind {
            GenerationKind::Image => (count, 0),
            GenerationKind::Video => (0, count),
        };

        let batch_id = Uuid::new_v4();
        let note = format!("{} generation", kind);
        let entry = self
            .repos
            .nuts
            .apply_tx(
                tx,
                user_id,
                NutsTransactionKind::Generation,
                -cost,
                Some(batch_id),
                Some(note.as_str()),
            )
            .await?;

        self.repos
            .usage
            .record_tx(tx, admission.usage_id, images, videos, cost)
            .await?;
        self.repos
            .users
            .add_generated_tx(tx, user_id, images, videos)
            .await?;

        Ok(entry.balance_after)
    }

    #[tracing::instrument(skip(self, req), fields(user_id = %user_id, count = req.count, model = %req.model))]
    pub async fn queue_images(
        &self,
        user_id: Uuid,
        req: ImageGenerationRequest,
        now: DateTime<Utc>,
    ) -> Result<GenerationAccepted, AppError> {
        req.check()?;
        if let Some(category_id) = req.category_id {
            if !self.repos.categories.exists(category_id).await? {
                return Err(AppError::NotFound("Category not found".to_string()));
            }
        }

        let features = image_features(&req);
        let cost = generation_cost(&CostInput::image(&req));
        let per_item = cost / i64::from(req.count.max(1));

        let mut tx = begin(&self.pool).await?;
        let admission = self
            .admit(
                &mut tx,
                user_id,
                &features,
                GenerationKind::Image,
                req.count,
                Some(req.longest_side()),
                cost,
                now,
            )
            .await?;
        let balance = self
            .charge(&mut tx, user_id, &admission, GenerationKind::Image, req.count, cost)
            .await?;

        let mut task_ids = Vec::with_capacity(req.count as usize);
        for _ in 0..req.count {
            let new = NewImage {
                user_id,
                task_id: new_task_id(GenerationKind::Image),
                prompt: req.prompt.clone(),
                negative_prompt: req.negative_prompt.clone(),
                model: req.model.clone(),
                width: req.width as i32,
                height: req.height as i32,
                nuts_cost: per_item,
                usage_record_id: admission.usage_id,
                category_id: req.category_id,
                is_public: req.is_public,
            };
            let image = self.repos.images.create_queued_tx(&mut tx, &new).await?;
            task_ids.push(image.task_id);
        }
        commit(tx).await?;

        tracing::info!(
            user_id = %user_id,
            tasks = task_ids.len(),
            nuts_charged = cost,
            "Image generation queued"
        );

        Ok(GenerationAccepted {
            kind: GenerationKind::Image,
            task_ids,
            nuts_charged: cost,
            nuts_balance: balance,
        })
    }

    #[tracing::instrument(skip(self, req), fields(user_id = %user_id, duration = req.duration_seconds, model = %req.model))]
    pub async fn queue_video(
        &self,
        user_id: Uuid,
        req: VideoGenerationRequest,
        now: DateTime<Utc>,
    ) -> Result<GenerationAccepted, AppError> {
        req.validate()?;
        if let Some(source_id) = req.source_image_id {
            let source = self
                .repos
                .images
                .get(source_id)
                .await?
                .filter(|img| img.user_id == user_id)
                .ok_or_else(|| AppError::NotFound("Source image not found".to_string()))?;
            if source.status != GenerationStatus::Completed {
                return Err(AppError::InvalidInput(
                    "Source image has not finished generating".to_string(),
                ));
            }
        }

        let features = video_features(&req);
        let cost = generation_cost(&CostInput::video(&req));

        let mut tx = begin(&self.pool).await?;
        let admission = self
            .admit(
                &mut tx,
                user_id,
                &features,
                GenerationKind::Video,
                1,
                None,
                cost,
                now,
            )
            .await?;
        let balance = self
            .charge(&mut tx, user_id, &admission, GenerationKind::Video, 1, cost)
            .await?;

        let new = NewVideo {
            user_id,
            task_id: new_task_id(GenerationKind::Video),
            prompt: req.prompt,
            model: req.model,
            duration_seconds: req.duration_seconds as i32,
            source_image_id: req.source_image_id,
            nuts_cost: cost,
            usage_record_id: admission.usage_id,
            is_public: req.is_public,
        };
        let video = self.repos.videos.create_queued_tx(&mut tx, &new).await?;
        commit(tx).await?;

        tracing::info!(user_id = %user_id, task_id = %video.task_id, nuts_charged = cost, "Video generation queued");

        Ok(GenerationAccepted {
            kind: GenerationKind::Video,
            task_ids: vec![video.task_id],
            nuts_charged: cost,
            nuts_balance: balance,
        })
    }

    /// Status of a task owned by the caller (moderators see all).
    pub async fn task_status(
        &self,
        viewer: &UserContext,
        task_id: &str,
    ) -> Result<TaskStatusReport, AppError> {
        if let Some(image) = self.repos.images.get_by_task(task_id).await? {
            if viewer.can_manage(image.user_id) {
                return Ok(TaskStatusReport::from(&image));
            }
        } else if let Some(video) = self.repos.videos.get_by_task(task_id).await? {
            if viewer.can_manage(video.user_id) {
                return Ok(TaskStatusReport::from(&video));
            }
        }
        Err(AppError::NotFound("Task not found".to_string()))
    }

    /// Apply a provider status update.
    #[tracing::instrument(skip(self, callback), fields(task_id = %callback.task_id, status = %callback.status))]
    pub async fn apply_callback(
        &self,
        callback: GenerationCallback,
        now: DateTime<Utc>,
    ) -> Result<TaskStatusReport, AppError> {
        callback.validate()?;
        let mut tx = begin(&self.pool).await?;

        let report = if let Some(image) = self
            .repos
            .images
            .lock_by_task_tx(&mut tx, &callback.task_id)
            .await?
        {
            self.update_image(&mut tx, image, &callback, now).await?
        } else if let Some(video) = self
            .repos
            .videos
            .lock_by_task_tx(&mut tx, &callback.task_id)
            .await?
        {
            self.update_video(&mut tx, video, &callback, now).await?
        } else {
            return Err(AppError::NotFound("Task not found".to_string()));
        };

        commit(tx).await?;
        Ok(report)
    }

    async fn update_image(
        &self,
        tx: &mut Tx,
        image: Image,
        callback: &GenerationCallback,
        now: DateTime<Utc>,
    ) -> Result<TaskStatusReport, AppError> {
        if !resolve_transition(image.status, callback.status)? {
            return Ok(TaskStatusReport::from(&image));
        }

        let completed_at = callback.status.is_terminal().then_some(now);
        let updated = self
            .repos
            .images
            .set_status_tx(
                tx,
                image.id,
                callback.status,
                callback.url.as_deref(),
                callback.error.as_deref(),
                completed_at,
            )
            .await?;

        if updated.status == GenerationStatus::Failed {
            let charge = Charge {
                artifact_id: updated.id,
                user_id: updated.user_id,
                usage_record_id: updated.usage_record_id,
                nuts_cost: updated.nuts_cost,
                kind: GenerationKind::Image,
            };
            self.refund(tx, &charge).await?;
        }
        Ok(TaskStatusReport::from(&updated))
    }

    async fn update_video(
        &self,
        tx: &mut Tx,
        video: Video,
        callback: &GenerationCallback,
        now: DateTime<Utc>,
    ) -> Result<TaskStatusReport, AppError> {
        if !resolve_transition(video.status, callback.status)? {
            return Ok(TaskStatusReport::from(&video));
        }

        let completed_at = callback.status.is_terminal().then_some(now);
        let updated = self
            .repos
            .videos
            .set_status_tx(
                tx,
                video.id,
                callback.status,
                callback.url.as_deref(),
                callback.thumbnail_url.as_deref(),
                callback.error.as_deref(),
                completed_at,
            )
            .await?;

        if updated.status == GenerationStatus::Failed {
            let charge = Charge {
                artifact_id: updated.id,
                user_id: updated.user_id,
                usage_record_id: updated.usage_record_id,
                nuts_cost: updated.nuts_cost,
                kind: GenerationKind::Video,
            };
            self.refund(tx, &charge).await?;
        }
        Ok(TaskStatusReport::from(&updated))
    }

    /// Return the nuts and the quota slot of a failed artifact, at most once.
    async fn refund(&self, tx: &mut Tx, charge: &Charge) -> Result<(), AppError> {
        let artifact_id = charge.artifact_id;
        if self.repos.nuts.refund_exists_tx(tx, artifact_id).await? {
            tracing::debug!(artifact_id = %artifact_id, "Refund already issued");
            return Ok(());
        }

        if charge.nuts_cost > 0 {
            let note = format!("failed {} generation", charge.kind);
            self.repos
                .nuts
                .apply_tx(
                    tx,
                    charge.user_id,
                    NutsTransactionKind::Refund,
                    charge.nuts_cost,
                    Some(artifact_id),
                    Some(note.as_str()),
                )
                .await?;
        }

        let (images, videos) = match charge.kind {
            GenerationKind::Image => (1, 0),
            GenerationKind::Video => (0, 1),
        };
        match charge.usage_record_id {
            Some(usage_id) => {
                self.repos
                    .usage
                    .release_tx(tx, usage_id, images, videos, charge.nuts_cost)
                    .await?
            }
            None => tracing::warn!(artifact_id = %artifact_id, "No usage row to release"),
        }

        tracing::info!(artifact_id = %artifact_id, user_id = %charge.user_id, nuts = charge.nuts_cost, "Refunded failed generation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempt_core::models::{AdvancedOptions, BillingCycle, SubscriptionStatus};

    fn request() -> ImageGenerationRequest {
        ImageGenerationRequest {
            prompt: "a fox in the snow".to_string(),
            negative_prompt: None,
            model: "sdxl".to_string(),
            width: 1024,
            height: 1024,
            count: 1,
            advanced: None,
            category_id: None,
            is_public: true,
        }
    }

    fn subscription(plan: PlanTier, start: DateTime<Utc>, end: DateTime<Utc>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan,
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Active,
            started_at: start,
            current_period_start: start,
            current_period_end: end,
            cancel_at_period_end: false,
            canceled_at: None,
            payment_reference: Some("pay_1".to_string()),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn plain_request_needs_only_image_generation() {
        assert_eq!(image_features(&request()), vec![Feature::ImageGeneration]);
    }

    #[test]
    fn request_options_add_features() {
        let mut req = request();
        req.width = 1536;
        req.count = 2;
        req.is_public = false;
        req.advanced = Some(AdvancedOptions {
            steps: 30,
            guidance_scale: 7.0,
            seed: None,
        });
        assert_eq!(
            image_features(&req),
            vec![
                Feature::ImageGeneration,
                Feature::AdvancedGeneration,
                Feature::HighResolution,
                Feature::BatchGeneration,
                Feature::PrivateGallery,
            ]
        );
    }

    #[test]
    fn private_video_needs_private_gallery() {
        let req = VideoGenerationRequest {
            prompt: "waves".to_string(),
            model: "svd".to_string(),
            duration_seconds: 5,
            source_image_id: None,
            is_public: false,
        };
        assert_eq!(
            video_features(&req),
            vec![Feature::VideoGeneration, Feature::PrivateGallery]
        );
    }

    #[test]
    fn paid_period_is_used_while_in_force() {
        let now = Utc::now();
        let sub = subscription(PlanTier::Pro, now - Duration::days(3), now + Duration::days(27));
        let (start, end) = usage_period(Some(&sub), PlanTier::Pro, now).unwrap();
        assert_eq!(start, sub.current_period_start);
        assert_eq!(end, sub.current_period_end);
    }

    #[test]
    fn lapsed_subscription_falls_back_to_calendar_month() {
        let now = Utc::now();
        let sub = subscription(PlanTier::Pro, now - Duration::days(40), now - Duration::days(10));
        let (start, end) = usage_period(Some(&sub), PlanTier::Free, now).unwrap();
        assert_eq!((start, end), quota::calendar_month(now).unwrap());
        assert!(start <= now && now < end);
    }

    #[test]
    fn transitions_are_forward_only() {
        use GenerationStatus::*;
        assert!(resolve_transition(Queued, Processing).unwrap());
        assert!(resolve_transition(Processing, Completed).unwrap());
        assert!(!resolve_transition(Failed, Failed).unwrap());
        assert!(matches!(
            resolve_transition(Completed, Failed),
            Err(AppError::Conflict(_))
        ));
        assert!(resolve_transition(Processing, Queued).is_err());
    }

    #[test]
    fn task_ids_are_prefixed_by_kind() {
        assert!(new_task_id(GenerationKind::Image).starts_with("img_"));
        assert!(new_task_id(GenerationKind::Video).starts_with("vid_"));
        assert_ne!(
            new_task_id(GenerationKind::Image),
            new_task_id(GenerationKind::Image)
        );
    }
}
