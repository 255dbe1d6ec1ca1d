//! Deal analysis for investors.

use crate::context::ConversationContext;
use crate::dispatch::{AgentAction, AgentRequest, AgentResponse};
use crate::llm::LlmClient;

use super::enrich;

const CONFIDENCE: f32 = 0.68;

const SYSTEM_PROMPT: &str = "You are a deal analyst for a seed-stage investor. Evaluate \
    opportunities on team, market size, traction, and capital efficiency. Flag missing \
    information explicitly instead of guessing. Keep answers under 150 words.";

pub(crate) async fn execute(
    request: &AgentRequest,
    context: &ConversationContext,
    llm: Option<&dyn LlmClient>,
) -> AgentResponse {
    enrich(llm, SYSTEM_PROMPT, request, context, canned()).await
}

fn canned() -> AgentResponse {
    AgentResponse {
        content: "To analyze a deal I look at four axes: team, market, traction, and capital \
                  efficiency. Share the company's plan or paste the key numbers (stage, \
                  revenue, burn, round size) and I'll structure the assessment."
            .to_string(),
        suggestions: vec![
            "Show me network business plans".to_string(),
            "What diligence questions should I ask?".to_string(),
            "Compare this round's terms to market".to_string(),
        ],
        actions: vec![AgentAction::new("business_plans.browse", "Browse shared plans")],
        insights: vec![
            "Most seed passes trace back to unclear wedge, not market size.".to_string(),
        ],
        confidence: CONFIDENCE,
    }
}
