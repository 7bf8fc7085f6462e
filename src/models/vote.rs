use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vote_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteType {
    Up,
    Down,
}

/// At most one row exists per (save_uuid, user_uuid); the unique constraint
/// in the schema is what enforces this under concurrent votes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SaveVote {
    pub uuid: Uuid,
    pub save_uuid: Uuid,
    pub user_uuid: Uuid,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
