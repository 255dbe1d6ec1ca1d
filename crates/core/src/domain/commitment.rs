use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::next_updated_at;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitmentId(pub String);

impl CommitmentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    Pending,
    Kept,
    Missed,
}

impl CommitmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Kept => "kept",
            Self::Missed => "missed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "kept" => Some(Self::Kept),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }
}

/// A short-horizon accountability item the Co-Founder agent follows up on,
/// distinct from a goal by having a hard due date and a binary outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoFounderCommitment {
    pub id: CommitmentId,
    pub owner_id: UserId,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: CommitmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CommitmentPatch {
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<CommitmentStatus>,
}

impl CoFounderCommitment {
    pub fn new(owner_id: UserId, description: String, due_date: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: CommitmentId::generate(),
            owner_id,
            description,
            due_date,
            status: CommitmentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, next: CommitmentStatus) -> bool {
        matches!(
            (self.status, next),
            (CommitmentStatus::Pending, CommitmentStatus::Kept)
                | (CommitmentStatus::Pending, CommitmentStatus::Missed)
                | (CommitmentStatus::Pending, CommitmentStatus::Pending)
        )
    }

    pub fn apply(&mut self, patch: CommitmentPatch) -> Result<(), DomainError> {
        if let Some(status) = patch.status {
            if !self.can_transition_to(status) {
                return Err(DomainError::InvalidCommitmentTransition {
                    from: self.status,
                    to: status,
                });
            }
            self.status = status;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        self.updated_at = next_updated_at(self.updated_at);
        Ok(())
    }
}
