//! Domain methods for the Tempt API client.
//!
//! Request and response types come from `tempt_core::models`.

use anyhow::Result;
use uuid::Uuid;

use crate::ApiClient;
use tempt_core::models::{
    CastVoteRequest, Category, CommentResponse, CreateCommentRequest, GalleryQuery,
    GenerationAccepted, ImageGenerationRequest, ImageResponse, NutsTransaction, PlanResponse,
    SubscriptionOverview, TaskStatusReport, VideoGenerationRequest, VideoResponse, VoteOutcome,
};
use tempt_core::{Feature, FeatureAccess};

impl ApiClient {
    /// Queue image generation; returns one task id per image.
    pub async fn generate_images(&self, req: &ImageGenerationRequest) -> Result<GenerationAccepted> {
        self.post_json("/generations/images", req).await
    }

    pub async fn generate_video(&self, req: &VideoGenerationRequest) -> Result<GenerationAccepted> {
        self.post_json("/generations/videos", req).await
    }

    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport> {
        self.get(&format!("/generations/{}/status", task_id), &[])
            .await
    }

    /// Public gallery page
    pub async fn list_gallery(&self, query: &GalleryQuery) -> Result<Vec<ImageResponse>> {
        let mut params = vec![
            ("sort", query.sort.as_str().to_string()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        self.get("/images", &params).await
    }

    pub async fn get_image(&self, id: Uuid) -> Result<ImageResponse> {
        self.get(&format!("/images/{}", id), &[]).await
    }

    pub async fn my_images(&self, limit: i64, offset: i64) -> Result<Vec<ImageResponse>> {
        let query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        self.get("/me/images", &query).await
    }

    pub async fn my_videos(&self, limit: i64, offset: i64) -> Result<Vec<VideoResponse>> {
        let query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        self.get("/me/videos", &query).await
    }

    pub async fn delete_image(&self, id: Uuid) -> Result<()> {
        self.delete(&format!("/images/{}", id)).await
    }

    /// Casting the same value twice retracts the vote.
    pub async fn vote(&self, image_id: Uuid, value: i16) -> Result<VoteOutcome> {
        self.post_json(
            &format!("/images/{}/vote", image_id),
            &CastVoteRequest { value },
        )
        .await
    }

    pub async fn comments(&self, image_id: Uuid) -> Result<Vec<CommentResponse>> {
        self.get(&format!("/images/{}/comments", image_id), &[])
            .await
    }

    pub async fn add_comment(&self, image_id: Uuid, body: &str) -> Result<CommentResponse> {
        self.post_json(
            &format!("/images/{}/comments", image_id),
            &CreateCommentRequest {
                body: body.to_string(),
            },
        )
        .await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.get("/categories", &[]).await
    }

    pub async fn plans(&self) -> Result<Vec<PlanResponse>> {
        self.get("/plans", &[]).await
    }

    pub async fn my_subscription(&self) -> Result<SubscriptionOverview> {
        self.get("/me/subscription", &[]).await
    }

    pub async fn nuts_history(&self, limit: i64) -> Result<Vec<NutsTransaction>> {
        self.get("/me/nuts", &[("limit", limit.to_string())]).await
    }

    pub async fn check_feature(&self, feature: Feature) -> Result<FeatureAccess> {
        self.get(&format!("/features/{}", feature), &[]).await
    }
}
