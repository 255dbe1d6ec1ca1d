use anyhow::Result;
use async_trait::async_trait;

use cofoundry_core::domain::message::AgentMessage;
use cofoundry_core::domain::user::{User, UserId, UserType};
use cofoundry_core::permissions;

/// Size of the conversation slice carried into each request.
pub const RECENT_MESSAGE_LIMIT: u32 = 10;

/// Read access the context builder needs. The server adapts its repositories
/// onto this seam; tests plug in fixtures.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn load_user(&self, id: &UserId) -> Result<Option<User>>;
    async fn recent_messages(&self, id: &UserId, limit: u32) -> Result<Vec<AgentMessage>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversationContext {
    pub user: Option<User>,
    /// Oldest first; at most [`RECENT_MESSAGE_LIMIT`] entries.
    pub recent_messages: Vec<AgentMessage>,
    pub permissions: &'static [&'static str],
}

impl ConversationContext {
    pub fn display_name(&self) -> &str {
        self.user.as_ref().map(|user| user.display_name.as_str()).unwrap_or("founder")
    }

    pub fn empty(user_type: UserType) -> Self {
        Self {
            user: None,
            recent_messages: Vec::new(),
            permissions: permissions::permissions_for(user_type),
        }
    }
}

/// Assembles the per-request context: current user record, the newest
/// message slice, and the static permission list for the role. Builds a
/// best-effort context; a failing read degrades to the empty slice rather
/// than failing the chat request.
pub struct ContextBuilder<'a> {
    source: &'a dyn ContextSource,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(source: &'a dyn ContextSource) -> Self {
        Self { source }
    }

    pub async fn build(&self, user_id: &UserId, user_type: UserType) -> ConversationContext {
        let user = match self.source.load_user(user_id).await {
            Ok(user) => user,
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.context.user_read_failed",
                    user_id = %user_id.0,
                    error = %error,
                    "building context without a user record"
                );
                None
            }
        };

        let recent_messages =
            match self.source.recent_messages(user_id, RECENT_MESSAGE_LIMIT).await {
                Ok(messages) => messages,
                Err(error) => {
                    tracing::warn!(
                        event_name = "agent.context.history_read_failed",
                        user_id = %user_id.0,
                        error = %error,
                        "building context without conversation history"
                    );
                    Vec::new()
                }
            };

        let effective_type = user.as_ref().map(|user| user.user_type).unwrap_or(user_type);

        ConversationContext {
            user,
            recent_messages,
            permissions: permissions::permissions_for(effective_type),
        }
    }
}
