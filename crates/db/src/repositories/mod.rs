use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use cofoundry_core::domain::business_plan::{BusinessPlan, BusinessPlanId, BusinessPlanPatch};
use cofoundry_core::domain::commitment::{CoFounderCommitment, CommitmentId, CommitmentPatch};
use cofoundry_core::domain::goal::{CoFounderGoal, GoalId, GoalPatch};
use cofoundry_core::domain::message::AgentMessage;
use cofoundry_core::domain::organization::{Organization, OrganizationId, OrganizationPatch};
use cofoundry_core::domain::session::Session;
use cofoundry_core::domain::user::{User, UserId, UserPatch};
use cofoundry_core::errors::DomainError;

pub mod business_plan;
pub mod commitment;
pub mod goal;
pub mod memory;
pub mod message;
pub mod organization;
pub mod session;
pub mod user;

pub use business_plan::SqlBusinessPlanRepository;
pub use commitment::SqlCommitmentRepository;
pub use goal::SqlGoalRepository;
pub use memory::{InMemoryGoalRepository, InMemoryMessageRepository, InMemoryUserRepository};
pub use message::SqlMessageRepository;
pub use organization::SqlOrganizationRepository;
pub use session::SqlSessionRepository;
pub use user::SqlUserRepository;

/// Domains the API names but the platform does not store. Kept as data so a
/// request for one of them maps to an explicit unsupported result instead of
/// an empty list.
pub const UNSUPPORTED_DOMAINS: &[&str] = &["loans", "portfolios", "mentorships"];

pub fn unsupported_domain(domain: &str) -> Option<RepositoryError> {
    UNSUPPORTED_DOMAINS
        .iter()
        .copied()
        .find(|candidate| *candidate == domain)
        .map(|domain| RepositoryError::UnsupportedDomain { domain })
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("the `{domain}` domain has no storage backing")]
    UnsupportedDomain { domain: &'static str },
}

pub(crate) fn decode_datetime(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("column `{column}`: {error}")))
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn update(&self, id: &UserId, patch: UserPatch)
        -> Result<Option<User>, RepositoryError>;
    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create(&self, organization: Organization) -> Result<(), RepositoryError>;
    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError>;
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Organization>, RepositoryError>;
    async fn list_for_owner(&self, owner_id: &UserId)
        -> Result<Vec<Organization>, RepositoryError>;
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Organization>, RepositoryError>;
    async fn update(
        &self,
        id: &OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, RepositoryError>;
    async fn delete(&self, id: &OrganizationId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait BusinessPlanRepository: Send + Sync {
    async fn create(&self, plan: BusinessPlan) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &BusinessPlanId)
        -> Result<Option<BusinessPlan>, RepositoryError>;
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<BusinessPlan>, RepositoryError>;
    async fn list_for_owner(&self, owner_id: &UserId)
        -> Result<Vec<BusinessPlan>, RepositoryError>;
    async fn update(
        &self,
        id: &BusinessPlanId,
        patch: BusinessPlanPatch,
    ) -> Result<Option<BusinessPlan>, RepositoryError>;
    async fn delete(&self, id: &BusinessPlanId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn create(&self, goal: CoFounderGoal) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &GoalId) -> Result<Option<CoFounderGoal>, RepositoryError>;
    async fn list_for_owner(&self, owner_id: &UserId)
        -> Result<Vec<CoFounderGoal>, RepositoryError>;
    async fn update(
        &self,
        id: &GoalId,
        patch: GoalPatch,
    ) -> Result<Option<CoFounderGoal>, RepositoryError>;
    /// Read-modify-write inside one transaction; two racing callers serialize
    /// and the loser overwrites the winner whole.
    async fn set_progress(
        &self,
        id: &GoalId,
        progress_pct: u8,
    ) -> Result<Option<CoFounderGoal>, RepositoryError>;
    async fn delete(&self, id: &GoalId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait CommitmentRepository: Send + Sync {
    async fn create(&self, commitment: CoFounderCommitment) -> Result<(), RepositoryError>;
    async fn find_by_id(
        &self,
        id: &CommitmentId,
    ) -> Result<Option<CoFounderCommitment>, RepositoryError>;
    async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<CoFounderCommitment>, RepositoryError>;
    async fn update(
        &self,
        id: &CommitmentId,
        patch: CommitmentPatch,
    ) -> Result<Option<CoFounderCommitment>, RepositoryError>;
    async fn delete(&self, id: &CommitmentId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: AgentMessage) -> Result<(), RepositoryError>;
    /// The newest `limit` messages for the user, oldest first.
    async fn recent_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AgentMessage>, RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: Session) -> Result<(), RepositoryError>;
    async fn find_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepositoryError>;
    async fn delete(&self, token: &str) -> Result<bool, RepositoryError>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}
