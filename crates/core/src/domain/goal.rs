use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::next_updated_at;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(pub String);

impl GoalId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Abandoned,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

/// A goal tracked by the Co-Founder coaching agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoFounderGoal {
    pub id: GoalId,
    pub owner_id: UserId,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub status: GoalStatus,
    pub progress_pct: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GoalPatch {
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<GoalStatus>,
}

impl CoFounderGoal {
    pub fn new(owner_id: UserId, description: String, due_date: Option<DateTime<Utc>>) -> Self {
        let now = Utc::now();
        Self {
            id: GoalId::generate(),
            owner_id,
            description,
            due_date,
            status: GoalStatus::Active,
            progress_pct: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, next: GoalStatus) -> bool {
        matches!(
            (self.status, next),
            (GoalStatus::Active, GoalStatus::Completed)
                | (GoalStatus::Active, GoalStatus::Abandoned)
                | (GoalStatus::Active, GoalStatus::Active)
        )
    }

    pub fn apply(&mut self, patch: GoalPatch) -> Result<(), DomainError> {
        if let Some(status) = patch.status {
            if !self.can_transition_to(status) {
                return Err(DomainError::InvalidGoalTransition { from: self.status, to: status });
            }
            self.status = status;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
        self.updated_at = next_updated_at(self.updated_at);
        Ok(())
    }

    pub fn set_progress(&mut self, progress_pct: u8) -> Result<(), DomainError> {
        if progress_pct > 100 {
            return Err(DomainError::InvariantViolation(format!(
                "goal progress must be 0..=100, got {progress_pct}"
            )));
        }
        if self.status != GoalStatus::Active {
            return Err(DomainError::InvariantViolation(
                "progress can only change on an active goal".to_string(),
            ));
        }
        self.progress_pct = progress_pct;
        self.updated_at = next_updated_at(self.updated_at);
        Ok(())
    }
}
