//! Credit assessment for lenders. Every lender request lands here
//! regardless of task type.

use crate::context::ConversationContext;
use crate::dispatch::{AgentAction, AgentRequest, AgentResponse};
use crate::llm::LlmClient;

use super::enrich;

const CONFIDENCE: f32 = 0.70;

const SYSTEM_PROMPT: &str = "You are a credit analyst supporting a small-business lender. \
    Reason about repayment capacity, collateral, cash-flow stability, and covenant design. \
    Never quote a rate or approve credit; recommend what to verify next. Keep answers under \
    150 words.";

pub(crate) async fn execute(
    request: &AgentRequest,
    context: &ConversationContext,
    llm: Option<&dyn LlmClient>,
) -> AgentResponse {
    enrich(llm, SYSTEM_PROMPT, request, context, canned()).await
}

fn canned() -> AgentResponse {
    AgentResponse {
        content: "For a credit view I need the basics: trailing 12-month revenue, monthly burn \
                  or EBITDA, existing debt, and what secures the facility. With those I can \
                  outline repayment capacity and the covenants worth asking for."
            .to_string(),
        suggestions: vec![
            "What documents should I request?".to_string(),
            "Outline a covenant package for a working-capital line".to_string(),
            "How do I size a facility against seasonal revenue?".to_string(),
        ],
        actions: vec![AgentAction::new("business_plans.browse", "Review applicant plans")],
        insights: vec![
            "Seasonal borrowers fail covenants most often in their second quarter, not their \
             first."
                .to_string(),
        ],
        confidence: CONFIDENCE,
    }
}
