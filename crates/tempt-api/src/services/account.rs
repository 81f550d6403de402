//! Profiles and nuts balance changes outside generation

use sqlx::PgPool;
use tempt_core::models::{CreateProfileRequest, NutsTransaction, NutsTransactionKind, User};
use tempt_core::AppError;
use tempt_db::transaction::{begin, commit};
use uuid::Uuid;
use validator::Validate;

use crate::state::Repositories;

#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
    repos: Repositories,
    signup_bonus_nuts: i64,
}

impl AccountService {
    pub fn new(pool: PgPool, repos: Repositories, signup_bonus_nuts: i64) -> Self {
        Self {
            pool,
            repos,
            signup_bonus_nuts,
        }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, AppError> {
        self.repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    /// Create the profile for a new subject and credit the signup bonus.
    #[tracing::instrument(skip(self, req), fields(user_id = %user_id))]
    pub async fn create_profile(
        &self,
        user_id: Uuid,
        req: CreateProfileRequest,
    ) -> Result<User, AppError> {
        req.validate()?;

        let mut tx = begin(&self.pool).await?;
        let mut user = self
            .repos
            .users
            .create_tx(&mut tx, user_id, req.email.trim(), req.username.trim())
            .await?;

        if self.signup_bonus_nuts > 0 {
            let entry = self
                .repos
                .nuts
                .apply_tx(
                    &mut tx,
                    user_id,
                    NutsTransactionKind::SignupBonus,
                    self.signup_bonus_nuts,
                    None,
                    Some("signup bonus"),
                )
                .await?;
            user.nuts_balance = entry.balance_after;
        }
        commit(tx).await?;

        tracing::info!(user_id = %user_id, "Profile created");
        Ok(user)
    }

    pub async fn nuts_history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NutsTransaction>, AppError> {
        self.repos.nuts.list_for_user(user_id, limit, offset).await
    }

    /// Admin credit. Recorded with the granting admin in the note.
    #[tracing::instrument(skip(self, note), fields(user_id = %user_id, admin_id = %admin_id))]
    pub async fn grant_nuts(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        amount: i64,
        note: Option<&str>,
    ) -> Result<NutsTransaction, AppError> {
        let note = match note {
            Some(text) => format!("{} (by {})", text, admin_id),
            None => format!("granted by {}", admin_id),
        };

        let mut tx = begin(&self.pool).await?;
        self.repos.users.lock_tx(&mut tx, user_id).await?;
        let entry = self
            .repos
            .nuts
            .apply_tx(
                &mut tx,
                user_id,
                NutsTransactionKind::AdminGrant,
                amount,
                None,
                Some(note.as_str()),
            )
            .await?;
        commit(tx).await?;

        tracing::info!(user_id = %user_id, amount, balance = entry.balance_after, "Nuts granted");
        Ok(entry)
    }
}
