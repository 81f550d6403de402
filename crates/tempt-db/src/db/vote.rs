use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{models::VoteChange, AppError};
use uuid::Uuid;

/// Repository for image votes
#[derive(Clone)]
pub struct VoteRepository {
    pool: PgPool,
}

impl VoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The caller's current vote on an image, if any
    #[tracing::instrument(skip(self), fields(db.table = "votes", db.operation = "select"))]
    pub async fn get_value(&self, user_id: Uuid, image_id: Uuid) -> Result<Option<i16>, AppError> {
        let value = sqlx::query_scalar::<Postgres, i16>(
            "SELECT value FROM votes WHERE user_id = $1 AND image_id = $2",
        )
        .bind(user_id)
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "votes", db.operation = "select_for_update"))]
    pub async fn lock_value_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        image_id: Uuid,
    ) -> Result<Option<i16>, AppError> {
        let value = sqlx::query_scalar::<Postgres, i16>(
            "SELECT value FROM votes WHERE user_id = $1 AND image_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(image_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(value)
    }

    /// Persist a resolved vote change
    #[tracing::instrument(skip(self, tx), fields(db.table = "votes", db.operation = "write"))]
    pub async fn apply_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        image_id: Uuid,
        change: VoteChange,
    ) -> Result<(), AppError> {
        match change {
            VoteChange::Insert(value) => {
                sqlx::query("INSERT INTO votes (user_id, image_id, value) VALUES ($1, $2, $3)")
                    .bind(user_id)
                    .bind(image_id)
                    .bind(value)
                    .execute(&mut **tx)
                    .await?;
            }
            VoteChange::Update(value) => {
                sqlx::query(
                    "UPDATE votes SET value = $3, updated_at = NOW() WHERE user_id = $1 AND image_id = $2",
                )
                .bind(user_id)
                .bind(image_id)
                .bind(value)
                .execute(&mut **tx)
                .await?;
            }
            VoteChange::Retract => {
                sqlx::query("DELETE FROM votes WHERE user_id = $1 AND image_id = $2")
                    .bind(user_id)
                    .bind(image_id)
                    .execute(&mut **tx)
                    .await?;
            }
        }

        Ok(())
    }
}
