use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{
    models::{GalleryQuery, GallerySort, GenerationStatus, Image, PublicUser},
    AppError,
};
use uuid::Uuid;

const MAX_PAGE: i64 = 100;

/// Fields for a freshly queued image
#[derive(Debug, Clone)]
pub struct NewImage {
    pub user_id: Uuid,
    pub task_id: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub model: String,
    pub width: i32,
    pub height: i32,
    pub nuts_cost: i64,
    pub usage_record_id: Uuid,
    pub category_id: Option<Uuid>,
    pub is_public: bool,
}

#[derive(sqlx::FromRow)]
struct ImageWithAuthorRow {
    #[sqlx(flatten)]
    image: Image,
    author_username: String,
    author_avatar_url: Option<String>,
}

impl ImageWithAuthorRow {
    fn into_parts(self) -> (Image, PublicUser) {
        let author = PublicUser {
            id: self.image.user_id,
            username: self.author_username,
            avatar_url: self.author_avatar_url,
        };
        (self.image, author)
    }
}

/// Repository for generated images
#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, tx, new), fields(db.table = "images", db.operation = "insert", task_id = %new.task_id))]
    pub async fn create_queued_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new: &NewImage,
    ) -> Result<Image, AppError> {
        let image = sqlx::query_as::<Postgres, Image>(
            r#"
            INSERT INTO images (
                user_id, task_id, prompt, negative_prompt, model,
                width, height, status, nuts_cost, usage_record_id, category_id, is_public
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'queued', $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(&new.task_id)
        .bind(&new.prompt)
        .bind(&new.negative_prompt)
        .bind(&new.model)
        .bind(new.width)
        .bind(new.height)
        .bind(new.nuts_cost)
        .bind(new.usage_record_id)
        .bind(new.category_id)
        .bind(new.is_public)
        .fetch_one(&mut **tx)
        .await?;

        Ok(image)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<Postgres, Image>("SELECT * FROM images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(image)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    pub async fn get_with_author(&self, id: Uuid) -> Result<Option<(Image, PublicUser)>, AppError> {
        let row = sqlx::query_as::<Postgres, ImageWithAuthorRow>(
            r#"
            SELECT i.*, u.username AS author_username, u.avatar_url AS author_avatar_url
            FROM images i
            JOIN users u ON u.id = i.user_id
            WHERE i.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ImageWithAuthorRow::into_parts))
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn get_by_task(&self, task_id: &str) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<Postgres, Image>("SELECT * FROM images WHERE task_id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(image)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "images", db.operation = "select_for_update"))]
    pub async fn lock_by_task_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        task_id: &str,
    ) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<Postgres, Image>(
            "SELECT * FROM images WHERE task_id = $1 FOR UPDATE",
        )
        .bind(task_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(image)
    }

    /// Completed public images, optionally filtered by category id
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn list_public(
        &self,
        query: &GalleryQuery,
        category_id: Option<Uuid>,
    ) -> Result<Vec<(Image, PublicUser)>, AppError> {
        let order = match query.sort {
            GallerySort::Newest => "i.created_at DESC",
            GallerySort::Top => "i.vote_score DESC, i.created_at DESC",
        };
        let sql = format!(
            r#"
            SELECT i.*, u.username AS author_username, u.avatar_url AS author_avatar_url
            FROM images i
            JOIN users u ON u.id = i.user_id
            WHERE i.is_public AND i.status = 'completed' AND NOT u.is_banned
              AND ($1::uuid IS NULL OR i.category_id = $1)
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            order
        );

        let rows = sqlx::query_as::<Postgres, ImageWithAuthorRow>(&sql)
            .bind(category_id)
            .bind(query.limit.clamp(1, MAX_PAGE))
            .bind(query.offset.max(0))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ImageWithAuthorRow::into_parts).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<Postgres, Image>(
            r#"
            SELECT * FROM images
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit.clamp(1, MAX_PAGE))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    /// Change visibility and/or category; `Some(None)` clears the category
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        is_public: Option<bool>,
        category_id: Option<Option<Uuid>>,
    ) -> Result<Image, AppError> {
        sqlx::query_as::<Postgres, Image>(
            r#"
            UPDATE images
            SET is_public = COALESCE($2, is_public),
                category_id = CASE WHEN $3 THEN $4 ELSE category_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_public)
        .bind(category_id.is_some())
        .bind(category_id.flatten())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a provider status update
    #[tracing::instrument(skip(self, tx, url, error), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    pub async fn set_status_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: GenerationStatus,
        url: Option<&str>,
        error: Option<&str>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Image, AppError> {
        let image = sqlx::query_as::<Postgres, Image>(
            r#"
            UPDATE images
            SET status = $2,
                url = COALESCE($3, url),
                error_message = $4,
                completed_at = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(url)
        .bind(error)
        .bind(completed_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(image)
    }

    /// Lock an image before changing its counters
    #[tracing::instrument(skip(self, tx), fields(db.table = "images", db.operation = "select_for_update", db.record_id = %id))]
    pub async fn lock_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<Postgres, Image>(
            "SELECT * FROM images WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(image)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    pub async fn add_vote_score_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        delta: i32,
    ) -> Result<i32, AppError> {
        let score = sqlx::query_scalar::<Postgres, i32>(
            "UPDATE images SET vote_score = vote_score + $2 WHERE id = $1 RETURNING vote_score",
        )
        .bind(id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await?;

        Ok(score)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    pub async fn add_comment_count_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        delta: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE images SET comment_count = GREATEST(comment_count + $2, 0) WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
