//! In-memory repository doubles for tests and offline tooling.

use std::collections::HashMap;

use tokio::sync::RwLock;

use cofoundry_core::domain::goal::{CoFounderGoal, GoalId, GoalPatch};
use cofoundry_core::domain::message::AgentMessage;
use cofoundry_core::domain::user::{User, UserId, UserPatch};

use super::{GoalRepository, MessageRepository, RepositoryError, UserRepository};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.0.clone(), user);
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn update(
        &self,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id.0) else {
            return Ok(None);
        };
        user.apply(patch);
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        let mut users = self.users.write().await;
        Ok(users.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryGoalRepository {
    goals: RwLock<HashMap<String, CoFounderGoal>>,
}

#[async_trait::async_trait]
impl GoalRepository for InMemoryGoalRepository {
    async fn create(&self, goal: CoFounderGoal) -> Result<(), RepositoryError> {
        let mut goals = self.goals.write().await;
        goals.insert(goal.id.0.clone(), goal);
        Ok(())
    }

    async fn find_by_id(&self, id: &GoalId) -> Result<Option<CoFounderGoal>, RepositoryError> {
        let goals = self.goals.read().await;
        Ok(goals.get(&id.0).cloned())
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<CoFounderGoal>, RepositoryError> {
        let goals = self.goals.read().await;
        let mut owned = goals
            .values()
            .filter(|goal| &goal.owner_id == owner_id)
            .cloned()
            .collect::<Vec<_>>();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update(
        &self,
        id: &GoalId,
        patch: GoalPatch,
    ) -> Result<Option<CoFounderGoal>, RepositoryError> {
        let mut goals = self.goals.write().await;
        let Some(goal) = goals.get_mut(&id.0) else {
            return Ok(None);
        };
        goal.apply(patch)?;
        Ok(Some(goal.clone()))
    }

    async fn set_progress(
        &self,
        id: &GoalId,
        progress_pct: u8,
    ) -> Result<Option<CoFounderGoal>, RepositoryError> {
        let mut goals = self.goals.write().await;
        let Some(goal) = goals.get_mut(&id.0) else {
            return Ok(None);
        };
        goal.set_progress(progress_pct)?;
        Ok(Some(goal.clone()))
    }

    async fn delete(&self, id: &GoalId) -> Result<bool, RepositoryError> {
        let mut goals = self.goals.write().await;
        Ok(goals.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<AgentMessage>>,
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: AgentMessage) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        messages.push(message);
        Ok(())
    }

    async fn recent_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AgentMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        let owned = messages
            .iter()
            .filter(|message| &message.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        let skip = owned.len().saturating_sub(limit as usize);
        Ok(owned.into_iter().skip(skip).collect())
    }
}
