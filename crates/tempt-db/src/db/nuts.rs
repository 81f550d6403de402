use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{
    models::{NutsTransaction, NutsTransactionKind},
    AppError,
};
use uuid::Uuid;

/// Repository for the nuts balance and its ledger.
///
/// Balance and ledger are always written together; callers pass the
/// transaction that holds the user row lock.
#[derive(Clone)]
pub struct NutsRepository {
    pool: PgPool,
}

impl NutsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add `amount` (negative to debit) to the balance and record a ledger row.
    #[tracing::instrument(skip(self, tx, note), fields(db.table = "nuts_transactions", db.operation = "insert"))]
    pub async fn apply_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        kind: NutsTransactionKind,
        amount: i64,
        reference_id: Option<Uuid>,
        note: Option<&str>,
    ) -> Result<NutsTransaction, AppError> {
        let balance_after = sqlx::query_scalar::<Postgres, i64>(
            r#"
            UPDATE users
            SET nuts_balance = nuts_balance + $2, updated_at = NOW()
            WHERE id = $1 AND nuts_balance + $2 >= 0
            RETURNING nuts_balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(balance_after) = balance_after else {
            let balance = sqlx::query_scalar::<Postgres, i64>(
                "SELECT nuts_balance FROM users WHERE id = $1",
            )
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
            return Err(AppError::InsufficientNuts {
                balance,
                required: -amount,
            });
        };

        let entry = sqlx::query_as::<Postgres, NutsTransaction>(
            r#"
            INSERT INTO nuts_transactions (user_id, kind, amount, balance_after, reference_id, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(amount)
        .bind(balance_after)
        .bind(reference_id)
        .bind(note)
        .fetch_one(&mut **tx)
        .await?;

        tracing::debug!(
            user_id = %user_id,
            kind = ?kind,
            amount = amount,
            balance_after = balance_after,
            "Nuts balance changed"
        );

        Ok(entry)
    }

    /// Whether a refund was already issued for a generation
    #[tracing::instrument(skip(self, tx), fields(db.table = "nuts_transactions", db.operation = "select"))]
    pub async fn refund_exists_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reference_id: Uuid,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM nuts_transactions WHERE reference_id = $1 AND kind = 'refund')",
        )
        .bind(reference_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(exists)
    }

    /// Ledger for one user, newest first
    #[tracing::instrument(skip(self), fields(db.table = "nuts_transactions", db.operation = "select"))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NutsTransaction>, AppError> {
        let rows = sqlx::query_as::<Postgres, NutsTransaction>(
            r#"
            SELECT * FROM nuts_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit.clamp(1, 200))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
