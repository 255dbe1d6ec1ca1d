//! Fallback advisor for admins and anything without a better match.

use crate::context::ConversationContext;
use crate::dispatch::{AgentAction, AgentRequest, AgentResponse};

const CONFIDENCE: f32 = 0.50;

pub(crate) async fn execute(
    request: &AgentRequest,
    context: &ConversationContext,
) -> AgentResponse {
    let _ = &request.message;
    AgentResponse {
        content: format!(
            "Welcome, {}. I can route you to the right place: organizations, profiles, \
             business plans, or the Co-Founder coach. Ask for any of them by name.",
            context.display_name()
        ),
        suggestions: vec![
            "Open the Co-Founder coach".to_string(),
            "List organizations".to_string(),
            "Show platform health".to_string(),
        ],
        actions: vec![AgentAction::new("organizations.browse", "Browse organizations")],
        insights: Vec::new(),
        confidence: CONFIDENCE,
    }
}
