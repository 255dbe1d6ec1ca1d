pub mod config;
pub mod domain;
pub mod errors;
pub mod permissions;
pub mod signing;

pub use domain::business_plan::{
    BusinessPlan, BusinessPlanId, BusinessPlanPatch, PlanStage, Visibility,
};
pub use domain::commitment::{
    CoFounderCommitment, CommitmentId, CommitmentPatch, CommitmentStatus,
};
pub use domain::goal::{CoFounderGoal, GoalId, GoalPatch, GoalStatus};
pub use domain::message::{AgentMessage, MessageId, MessageRole, Sentiment};
pub use domain::organization::{Organization, OrganizationId, OrganizationPatch};
pub use domain::session::Session;
pub use domain::user::{User, UserId, UserPatch, UserType};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use permissions::{has_permission, permissions_for};
pub use signing::{generate_token, StateSigner};
