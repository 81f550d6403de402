use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{
    models::{GenerationStatus, Video},
    AppError,
};
use uuid::Uuid;

/// Fields for a freshly queued video
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: Uuid,
    pub task_id: String,
    pub prompt: String,
    pub model: String,
    pub duration_seconds: i32,
    pub source_image_id: Option<Uuid>,
    pub nuts_cost: i64,
    pub usage_record_id: Uuid,
    pub is_public: bool,
}

/// Repository for generated videos
#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, tx, new), fields(db.table = "videos", db.operation = "insert", task_id = %new.task_id))]
    pub async fn create_queued_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new: &NewVideo,
    ) -> Result<Video, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            r#"
            INSERT INTO videos (
                user_id, task_id, prompt, model, duration_seconds,
                source_image_id, status, nuts_cost, usage_record_id, is_public
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'queued', $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(&new.task_id)
        .bind(&new.prompt)
        .bind(&new.model)
        .bind(new.duration_seconds)
        .bind(new.source_image_id)
        .bind(new.nuts_cost)
        .bind(new.usage_record_id)
        .bind(new.is_public)
        .fetch_one(&mut **tx)
        .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>("SELECT * FROM videos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn get_by_task(&self, task_id: &str) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>("SELECT * FROM videos WHERE task_id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "videos", db.operation = "select_for_update"))]
    pub async fn lock_by_task_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        task_id: &str,
    ) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            "SELECT * FROM videos WHERE task_id = $1 FOR UPDATE",
        )
        .bind(task_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Video>, AppError> {
        let videos = sqlx::query_as::<Postgres, Video>(
            r#"
            SELECT * FROM videos
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit.clamp(1, 100))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }

    #[tracing::instrument(skip(self, tx, url, thumbnail_url, error), fields(db.table = "videos", db.operation = "update", db.record_id = %id))]
    #[allow(clippy::too_many_arguments)]
    pub async fn set_status_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: GenerationStatus,
        url: Option<&str>,
        thumbnail_url: Option<&str>,
        error: Option<&str>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Video, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            r#"
            UPDATE videos
            SET status = $2,
                url = COALESCE($3, url),
                thumbnail_url = COALESCE($4, thumbnail_url),
                error_message = $5,
                completed_at = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(url)
        .bind(thumbnail_url)
        .bind(error)
        .bind(completed_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(video)
    }
}
