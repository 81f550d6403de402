use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Reason for a balance change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "nuts_transaction_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum NutsTransactionKind {
    Generation,
    Refund,
    SubscriptionGrant,
    AdminGrant,
    SignupBonus,
}

/// Ledger entry; `amount` is negative for debits
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct NutsTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NutsTransactionKind,
    pub amount: i64,
    pub balance_after: i64,
    pub reference_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
