use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

use super::PublicUser;

/// Lifecycle of a generation artifact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "generation_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    /// Completed and failed jobs never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }

    /// Whether a provider update may move a job from `self` to `next`.
    pub fn can_transition_to(&self, next: GenerationStatus) -> bool {
        match (self, next) {
            (GenerationStatus::Queued, GenerationStatus::Processing) => true,
            (GenerationStatus::Queued | GenerationStatus::Processing, n) => n.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStatus::Queued => write!(f, "queued"),
            GenerationStatus::Processing => write!(f, "processing"),
            GenerationStatus::Completed => write!(f, "completed"),
            GenerationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What a generation job produces
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Image,
    Video,
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationKind::Image => write!(f, "image"),
            GenerationKind::Video => write!(f, "video"),
        }
    }
}

/// Generated image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Image {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub model: String,
    pub width: i32,
    pub height: i32,
    pub status: GenerationStatus,
    pub url: Option<String>,
    pub error_message: Option<String>,
    pub nuts_cost: i64,
    /// Usage row charged at queue time, released on refund
    #[serde(skip)]
    pub usage_record_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_public: bool,
    pub vote_score: i32,
    pub comment_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Generated video
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: String,
    pub prompt: String,
    pub model: String,
    pub duration_seconds: i32,
    pub source_image_id: Option<Uuid>,
    pub status: GenerationStatus,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error_message: Option<String>,
    pub nuts_cost: i64,
    #[serde(skip)]
    pub usage_record_id: Option<Uuid>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Image as shown in the gallery
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    pub id: Uuid,
    pub task_id: String,
    pub prompt: String,
    pub model: String,
    pub width: i32,
    pub height: i32,
    pub status: GenerationStatus,
    pub url: Option<String>,
    pub error_message: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_public: bool,
    pub vote_score: i32,
    pub comment_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<PublicUser>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Image> for ImageResponse {
    fn from(image: Image) -> Self {
        ImageResponse {
            id: image.id,
            task_id: image.task_id,
            prompt: image.prompt,
            model: image.model,
            width: image.width,
            height: image.height,
            status: image.status,
            url: image.url,
            error_message: image.error_message,
            category_id: image.category_id,
            is_public: image.is_public,
            vote_score: image.vote_score,
            comment_count: image.comment_count,
            author: None,
            created_at: image.created_at,
            completed_at: image.completed_at,
        }
    }
}

impl ImageResponse {
    pub fn with_author(mut self, author: PublicUser) -> Self {
        self.author = Some(author);
        self
    }
}

/// Video as shown in the gallery
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VideoResponse {
    pub id: Uuid,
    pub task_id: String,
    pub prompt: String,
    pub model: String,
    pub duration_seconds: i32,
    pub status: GenerationStatus,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error_message: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id,
            task_id: video.task_id,
            prompt: video.prompt,
            model: video.model,
            duration_seconds: video.duration_seconds,
            status: video.status,
            url: video.url,
            thumbnail_url: video.thumbnail_url,
            error_message: video.error_message,
            is_public: video.is_public,
            created_at: video.created_at,
            completed_at: video.completed_at,
        }
    }
}

/// Sampler settings only available in advanced mode
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct AdvancedOptions {
    #[validate(range(min = 1, max = 150, message = "steps must be between 1 and 150"))]
    pub steps: u32,
    #[validate(range(min = 1.0, max = 30.0, message = "guidance_scale must be between 1 and 30"))]
    pub guidance_scale: f32,
    #[serde(default)]
    pub seed: Option<i64>,
}

/// Request DTO for image generation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ImageGenerationRequest {
    #[validate(length(min = 1, max = 2000, message = "prompt must be between 1 and 2000 characters"))]
    pub prompt: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "negative_prompt must be at most 2000 characters"))]
    pub negative_prompt: Option<String>,
    #[validate(length(min = 1, max = 100, message = "model must be between 1 and 100 characters"))]
    pub model: String,
    #[serde(default = "default_dimension")]
    #[validate(range(min = 256, max = 2048, message = "width must be between 256 and 2048"))]
    pub width: u32,
    #[serde(default = "default_dimension")]
    #[validate(range(min = 256, max = 2048, message = "height must be between 256 and 2048"))]
    pub height: u32,
    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 4, message = "count must be between 1 and 4"))]
    pub count: u32,
    #[serde(default)]
    #[validate(nested)]
    pub advanced: Option<AdvancedOptions>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

impl ImageGenerationRequest {
    /// Field validation plus the cross-field rules the derive cannot express.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.width % 64 != 0 || self.height % 64 != 0 {
            return Err(AppError::InvalidInput(
                "width and height must be multiples of 64".to_string(),
            ));
        }
        Ok(())
    }

    /// Longest requested side in pixels.
    pub fn longest_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

fn default_dimension() -> u32 {
    1024
}

fn default_count() -> u32 {
    1
}

fn default_public() -> bool {
    true
}

/// Request DTO for video generation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct VideoGenerationRequest {
    #[validate(length(min = 1, max = 2000, message = "prompt must be between 1 and 2000 characters"))]
    pub prompt: String,
    #[validate(length(min = 1, max = 100, message = "model must be between 1 and 100 characters"))]
    pub model: String,
    #[serde(default = "default_duration")]
    #[validate(range(min = 1, max = 30, message = "duration_seconds must be between 1 and 30"))]
    pub duration_seconds: u32,
    /// Animate an existing image owned by the caller
    #[serde(default)]
    pub source_image_id: Option<Uuid>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_duration() -> u32 {
    5
}

/// Response after generation jobs were queued
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerationAccepted {
    pub kind: GenerationKind,
    pub task_ids: Vec<String>,
    pub nuts_charged: i64,
    pub nuts_balance: i64,
}

/// Status of one generation job, as returned by the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TaskStatusReport {
    pub task_id: String,
    pub kind: GenerationKind,
    pub status: GenerationStatus,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<&Image> for TaskStatusReport {
    fn from(image: &Image) -> Self {
        TaskStatusReport {
            task_id: image.task_id.clone(),
            kind: GenerationKind::Image,
            status: image.status,
            url: image.url.clone(),
            error: image.error_message.clone(),
        }
    }
}

impl From<&Video> for TaskStatusReport {
    fn from(video: &Video) -> Self {
        TaskStatusReport {
            task_id: video.task_id.clone(),
            kind: GenerationKind::Video,
            status: video.status,
            url: video.url.clone(),
            error: video.error_message.clone(),
        }
    }
}

/// Status update pushed by the generation provider
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct GenerationCallback {
    #[validate(length(min = 1, max = 128, message = "task_id must be between 1 and 128 characters"))]
    pub task_id: String,
    pub status: GenerationStatus,
    #[serde(default)]
    #[validate(url(message = "url must be a valid URL"))]
    pub url: Option<String>,
    #[serde(default)]
    #[validate(url(message = "thumbnail_url must be a valid URL"))]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "error must be at most 1000 characters"))]
    pub error: Option<String>,
}

/// Gallery ordering
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GallerySort {
    #[default]
    Newest,
    Top,
}

impl GallerySort {
    pub fn as_str(&self) -> &'static str {
        match self {
            GallerySort::Newest => "newest",
            GallerySort::Top => "top",
        }
    }
}

/// Query parameters for the public gallery
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GalleryQuery {
    /// Category slug
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: GallerySort,
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_page_limit() -> i64 {
    30
}

/// Owner edits to an image
#[derive(Debug, Deserialize)]
pub struct UpdateImageRequest {
    #[serde(default)]
    pub is_public: Option<bool>,
    /// `Some(None)` clears the category
    #[serde(default, with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
