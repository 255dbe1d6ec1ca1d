use crate::context::ConversationContext;
use crate::dispatch::{AgentAction, AgentRequest, AgentResponse};
use crate::llm::LlmClient;

use super::enrich;

const CONFIDENCE: f32 = 0.64;

const SYSTEM_PROMPT: &str = "You advise a grant-making organization. Assess applications on \
    mission fit, measurable outcomes, and organizational capacity to deliver. Keep answers \
    under 150 words.";

pub(crate) async fn execute(
    request: &AgentRequest,
    context: &ConversationContext,
    llm: Option<&dyn LlmClient>,
) -> AgentResponse {
    enrich(llm, SYSTEM_PROMPT, request, context, canned()).await
}

fn canned() -> AgentResponse {
    AgentResponse {
        content: "When reviewing an application, weigh three things: how directly the work \
                  advances your program's mission, whether outcomes are measurable within the \
                  grant period, and whether the team has delivered at this scale before. Tell \
                  me about the applicant and I'll apply that frame."
            .to_string(),
        suggestions: vec![
            "Draft outcome metrics for this grant".to_string(),
            "What reporting cadence is reasonable?".to_string(),
        ],
        actions: vec![AgentAction::new("business_plans.browse", "Review applicant plans")],
        insights: Vec::new(),
        confidence: CONFIDENCE,
    }
}
