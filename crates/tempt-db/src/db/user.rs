use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{
    models::{AdminUserQuery, User},
    AppError,
};
use uuid::Uuid;

use super::transaction::conflict_on_unique;

const MAX_PAGE: i64 = 200;

/// Repository for user accounts and moderation flags
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the profile for an authenticated subject
    #[tracing::instrument(skip(self, tx), fields(db.table = "users", db.operation = "insert", db.record_id = %id))]
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        email: &str,
        username: &str,
    ) -> Result<User, AppError> {
        sqlx::query_as::<Postgres, User>(
            r#"
            INSERT INTO users (id, email, username)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(username)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| conflict_on_unique(e, "A profile with this email or username already exists"))
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Load and row-lock a user for a balance change
    #[tracing::instrument(skip(self, tx), fields(db.table = "users", db.operation = "select_for_update", db.record_id = %id))]
    pub async fn lock_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<User, AppError> {
        sqlx::query_as::<Postgres, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Admin listing, newest first
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn list(&self, query: &AdminUserQuery) -> Result<Vec<User>, AppError> {
        let pattern = query
            .search
            .as_deref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let users = sqlx::query_as::<Postgres, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1)
              AND (NOT $2 OR is_banned)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(pattern)
        .bind(query.banned_only)
        .bind(query.limit.clamp(1, MAX_PAGE))
        .bind(query.offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    pub async fn set_ban(
        &self,
        id: Uuid,
        banned: bool,
        reason: Option<&str>,
    ) -> Result<User, AppError> {
        sqlx::query_as::<Postgres, User>(
            r#"
            UPDATE users
            SET is_banned = $2, ban_reason = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(banned)
        .bind(if banned { reason } else { None })
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Suspend until `until` (indefinitely when `None`), or lift the suspension
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    pub async fn set_suspension(
        &self,
        id: Uuid,
        suspended: bool,
        until: Option<DateTime<Utc>>,
    ) -> Result<User, AppError> {
        sqlx::query_as::<Postgres, User>(
            r#"
            UPDATE users
            SET is_suspended = $2, suspended_until = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(suspended)
        .bind(if suspended { until } else { None })
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Bump lifetime generation counters
    #[tracing::instrument(skip(self, tx), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    pub async fn add_generated_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        images: i32,
        videos: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET images_generated = images_generated + $2,
                videos_generated = videos_generated + $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(images)
        .bind(videos)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
