use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::PublicUser;
use crate::error::AppError;

/// A user's up- or down-vote on an image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Vote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_id: Uuid,
    /// +1 or -1
    pub value: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CastVoteRequest {
    pub value: i16,
}

impl CastVoteRequest {
    pub fn check(&self) -> Result<(), AppError> {
        match self.value {
            1 | -1 => Ok(()),
            _ => Err(AppError::InvalidInput(
                "vote value must be 1 or -1".to_string(),
            )),
        }
    }
}

/// Result of casting a vote. Casting the same value twice retracts it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct VoteOutcome {
    pub image_id: Uuid,
    pub vote_score: i32,
    /// The caller's vote after the change; `None` once retracted
    pub user_vote: Option<i16>,
}

/// What a vote request does to the existing vote and the score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    Insert(i16),
    Update(i16),
    Retract,
}

impl VoteChange {
    /// Decide the change given the caller's existing vote.
    pub fn resolve(existing: Option<i16>, requested: i16) -> Self {
        match existing {
            None => VoteChange::Insert(requested),
            Some(current) if current == requested => VoteChange::Retract,
            Some(_) => VoteChange::Update(requested),
        }
    }

    /// Amount to add to the image's score.
    pub fn score_delta(&self, existing: Option<i16>) -> i32 {
        let before = i32::from(existing.unwrap_or(0));
        let after = match self {
            VoteChange::Insert(v) | VoteChange::Update(v) => i32::from(*v),
            VoteChange::Retract => 0,
        };
        after - before
    }

    pub fn resulting_vote(&self) -> Option<i16> {
        match self {
            VoteChange::Insert(v) | VoteChange::Update(v) => Some(*v),
            VoteChange::Retract => None,
        }
    }
}

/// Comment on an image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_id: Uuid,
    pub body: String,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment joined with its author
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub image_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub image_id: Uuid,
    pub body: String,
    pub author: PublicUser,
    pub created_at: DateTime<Utc>,
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(row: CommentWithAuthor) -> Self {
        CommentResponse {
            id: row.id,
            image_id: row.image_id,
            body: row.body,
            author: PublicUser {
                id: row.user_id,
                username: row.username,
                avatar_url: row.avatar_url,
            },
            created_at: row.created_at,
        }
    }
}

/// Request DTO for posting a comment
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "comment must be between 1 and 1000 characters"))]
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_value_must_be_unit() {
        assert!(CastVoteRequest { value: 1 }.check().is_ok());
        assert!(CastVoteRequest { value: -1 }.check().is_ok());
        assert!(CastVoteRequest { value: 0 }.check().is_err());
        assert!(CastVoteRequest { value: 2 }.check().is_err());
    }

    #[test]
    fn first_vote_inserts() {
        let change = VoteChange::resolve(None, 1);
        assert_eq!(change, VoteChange::Insert(1));
        assert_eq!(change.score_delta(None), 1);
        assert_eq!(change.resulting_vote(), Some(1));
    }

    #[test]
    fn repeating_a_vote_retracts_it() {
        let change = VoteChange::resolve(Some(-1), -1);
        assert_eq!(change, VoteChange::Retract);
        assert_eq!(change.score_delta(Some(-1)), 1);
        assert_eq!(change.resulting_vote(), None);
    }

    #[test]
    fn flipping_a_vote_moves_score_by_two() {
        let change = VoteChange::resolve(Some(1), -1);
        assert_eq!(change, VoteChange::Update(-1));
        assert_eq!(change.score_delta(Some(1)), -2);
    }
}
