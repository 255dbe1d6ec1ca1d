//! Default advisor for entrepreneurs.

use crate::context::ConversationContext;
use crate::dispatch::{AgentAction, AgentRequest, AgentResponse};
use crate::llm::LlmClient;

use super::enrich;

const CONFIDENCE: f32 = 0.65;

const SYSTEM_PROMPT: &str = "You are a startup advisor for an early-stage founder. Focus on \
    business-plan quality, customer discovery, and fundraising readiness. Be direct and \
    specific; keep answers under 150 words.";

pub(crate) async fn execute(
    request: &AgentRequest,
    context: &ConversationContext,
    llm: Option<&dyn LlmClient>,
) -> AgentResponse {
    enrich(llm, SYSTEM_PROMPT, request, context, canned(context)).await
}

fn canned(context: &ConversationContext) -> AgentResponse {
    AgentResponse {
        content: format!(
            "Good question, {}. Start from your business plan: is the problem statement backed \
             by conversations with real customers? Sharpen that section first, then revisit \
             your funding target against the next 12 months of milestones.",
            context.display_name()
        ),
        suggestions: vec![
            "Review my business plan".to_string(),
            "What should my funding target be?".to_string(),
            "How do I find design partners?".to_string(),
        ],
        actions: vec![AgentAction::new("business_plans.open", "Open my business plan")],
        insights: vec![
            "Plans with a quantified problem statement get materially more investor replies."
                .to_string(),
        ],
        confidence: CONFIDENCE,
    }
}
