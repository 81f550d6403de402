use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{
    models::{Comment, CommentWithAuthor},
    AppError,
};
use uuid::Uuid;

/// Repository for image comments
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Visible comments on an image, oldest first
    #[tracing::instrument(skip(self), fields(db.table = "comments", db.operation = "select"))]
    pub async fn list_for_image(
        &self,
        image_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentWithAuthor>, AppError> {
        let comments = sqlx::query_as::<Postgres, CommentWithAuthor>(
            r#"
            SELECT c.id, c.image_id, c.body, c.created_at, c.user_id, u.username, u.avatar_url
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.image_id = $1 AND NOT c.is_hidden
            ORDER BY c.created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(image_id)
        .bind(limit.clamp(1, 200))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    #[tracing::instrument(skip(self, tx, body), fields(db.table = "comments", db.operation = "insert"))]
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        image_id: Uuid,
        body: &str,
    ) -> Result<Comment, AppError> {
        let comment = sqlx::query_as::<Postgres, Comment>(
            r#"
            INSERT INTO comments (user_id, image_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(image_id)
        .bind(body)
        .fetch_one(&mut **tx)
        .await?;

        Ok(comment)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "comments", db.operation = "select_for_update", db.record_id = %id))]
    pub async fn lock_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<Postgres, Comment>(
            "SELECT * FROM comments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(comment)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "comments", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "comments", db.operation = "update", db.record_id = %id))]
    pub async fn hide_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Comment, AppError> {
        let comment = sqlx::query_as::<Postgres, Comment>(
            "UPDATE comments SET is_hidden = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(comment)
    }
}
