//! Canned-only assistant for team members; no LLM path.

use crate::context::ConversationContext;
use crate::dispatch::{AgentAction, AgentRequest, AgentResponse};

const CONFIDENCE: f32 = 0.55;

pub(crate) async fn execute(
    _request: &AgentRequest,
    context: &ConversationContext,
) -> AgentResponse {
    AgentResponse {
        content: format!(
            "Hi {}. I can help you find your team's business plans, log goals you own, and \
             track commitments. What are you working on?",
            context.display_name()
        ),
        suggestions: vec![
            "Show my team's plans".to_string(),
            "Log a goal for this sprint".to_string(),
        ],
        actions: vec![AgentAction::new("goals.list", "My goals")],
        insights: Vec::new(),
        confidence: CONFIDENCE,
    }
}
