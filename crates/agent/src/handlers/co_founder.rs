//! The Co-Founder coaching agent: accountability over goals and
//! commitments, reachable from any role via a `co_founder` task type.

use crate::context::ConversationContext;
use crate::dispatch::{AgentAction, AgentRequest, AgentResponse};
use crate::llm::LlmClient;

use super::enrich;

const CONFIDENCE: f32 = 0.72;

const SYSTEM_PROMPT: &str = "You are a pragmatic startup co-founder coaching the user. \
    You hold them accountable to their goals and commitments, push for one concrete next \
    step, and keep answers under 150 words. You never invent platform data.";

pub(crate) async fn execute(
    request: &AgentRequest,
    context: &ConversationContext,
    llm: Option<&dyn LlmClient>,
) -> AgentResponse {
    enrich(llm, SYSTEM_PROMPT, request, context, canned(context)).await
}

fn canned(context: &ConversationContext) -> AgentResponse {
    let mut actions = Vec::new();
    if context.permissions.contains(&cofoundry_core::permissions::GOALS) {
        actions.push(AgentAction::new("goals.create", "Set a goal"));
    }
    if context.permissions.contains(&cofoundry_core::permissions::COMMITMENTS) {
        actions.push(AgentAction::new("commitments.create", "Log a commitment"));
    }

    AgentResponse {
        content: format!(
            "Let's keep it concrete, {}. Pick the single outcome that matters most this week, \
             write it down as a goal, and commit to the first step with a date. I'll check in \
             on it next time we talk.",
            context.display_name()
        ),
        suggestions: vec![
            "Review my open goals".to_string(),
            "What did I commit to last week?".to_string(),
            "Help me break this goal into steps".to_string(),
        ],
        actions,
        insights: vec![
            "Founders who track weekly commitments ship follow-ups twice as often.".to_string()
        ],
        confidence: CONFIDENCE,
    }
}
