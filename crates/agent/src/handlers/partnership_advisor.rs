use crate::context::ConversationContext;
use crate::dispatch::{AgentAction, AgentRequest, AgentResponse};
use crate::llm::LlmClient;

use super::enrich;

const CONFIDENCE: f32 = 0.60;

const SYSTEM_PROMPT: &str = "You advise on commercial partnerships between startups and \
    established organizations. Focus on mutual value, pilot scoping, and clear success \
    criteria. Keep answers under 150 words.";

pub(crate) async fn execute(
    request: &AgentRequest,
    context: &ConversationContext,
    llm: Option<&dyn LlmClient>,
) -> AgentResponse {
    enrich(llm, SYSTEM_PROMPT, request, context, canned()).await
}

fn canned() -> AgentResponse {
    AgentResponse {
        content: "Strong partnerships start narrow: one use case, one owner on each side, and \
                  success criteria both teams can measure in a quarter. Describe the partner \
                  you have in mind and I'll help scope the first pilot."
            .to_string(),
        suggestions: vec![
            "Scope a 90-day pilot".to_string(),
            "What should a partnership one-pager include?".to_string(),
        ],
        actions: vec![AgentAction::new("organizations.browse", "Browse organizations")],
        insights: Vec::new(),
        confidence: CONFIDENCE,
    }
}
