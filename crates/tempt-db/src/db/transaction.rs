//! Database transaction utilities
//!
//! Every request that mutates more than one row runs inside a single
//! transaction. A `Transaction` dropped without `commit` rolls back.

use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::AppError;

pub type Tx = Transaction<'static, Postgres>;

/// Begin a new database transaction
pub async fn begin(pool: &PgPool) -> Result<Tx, AppError> {
    pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to begin transaction");
        AppError::Database(e)
    })
}

/// Commit the transaction
pub async fn commit(tx: Tx) -> Result<(), AppError> {
    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to commit transaction");
        AppError::Database(e)
    })
}

/// Map a unique-constraint violation to `Conflict`, everything else through `From`.
pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    let is_unique = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505");
    if is_unique {
        AppError::Conflict(message.to_string())
    } else {
        AppError::from(err)
    }
}
