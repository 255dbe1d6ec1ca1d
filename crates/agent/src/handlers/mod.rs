use serde::Deserialize;

use crate::context::ConversationContext;
use crate::dispatch::{AgentRequest, AgentResponse};
use crate::llm::{extract_json_block, CompletionRequest, LlmClient};

pub mod co_founder;
pub mod concierge;
pub mod credit_analyst;
pub mod deal_analyzer;
pub mod grant_advisor;
pub mod partnership_advisor;
pub mod team_assistant;
pub mod venture_coach;

#[derive(Debug, Deserialize)]
struct LlmPayload {
    content: String,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    insights: Vec<String>,
    confidence: Option<f32>,
}

const RESPONSE_FORMAT_INSTRUCTION: &str = "Respond with a single JSON object: \
    {\"content\": string, \"suggestions\": [string], \"insights\": [string], \
    \"confidence\": number between 0 and 1}. No prose outside the JSON.";

fn transcript(context: &ConversationContext) -> String {
    let mut lines = String::new();
    for message in &context.recent_messages {
        lines.push_str(message.role.as_str());
        lines.push_str(": ");
        lines.push_str(&message.content);
        lines.push('\n');
    }
    lines
}

/// Runs the handler's prompt through the LLM and reshapes the JSON reply.
/// Any failure, transient or permanent, degrades to the canned fallback;
/// the fallback's actions always survive because the model never invents
/// platform actions.
async fn enrich(
    llm: Option<&dyn LlmClient>,
    system: &str,
    request: &AgentRequest,
    context: &ConversationContext,
    fallback: AgentResponse,
) -> AgentResponse {
    let Some(client) = llm else {
        return fallback;
    };

    let history = transcript(context);
    let user_prompt = format!(
        "Conversation so far:\n{history}\nLatest message from {name}:\n{message}\n\n{format}",
        name = context.display_name(),
        message = request.message,
        format = RESPONSE_FORMAT_INSTRUCTION,
    );

    let completion = CompletionRequest::new(system, user_prompt);
    let raw = match client.complete(&completion).await {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                event_name = "agent.handler.llm_degraded",
                user_id = %request.user_id.0,
                error = %error,
                "llm call failed, returning canned response"
            );
            return fallback;
        }
    };

    let Some(block) = extract_json_block(&raw) else {
        tracing::warn!(
            event_name = "agent.handler.llm_unparseable",
            user_id = %request.user_id.0,
            "completion carried no JSON object, returning canned response"
        );
        return fallback;
    };

    match serde_json::from_str::<LlmPayload>(block) {
        Ok(payload) if !payload.content.trim().is_empty() => AgentResponse {
            content: payload.content,
            suggestions: if payload.suggestions.is_empty() {
                fallback.suggestions
            } else {
                payload.suggestions
            },
            actions: fallback.actions,
            insights: if payload.insights.is_empty() {
                fallback.insights
            } else {
                payload.insights
            },
            confidence: payload
                .confidence
                .filter(|value| (0.0..=1.0).contains(value))
                .unwrap_or(fallback.confidence),
        },
        Ok(_) | Err(_) => {
            tracing::warn!(
                event_name = "agent.handler.llm_unparseable",
                user_id = %request.user_id.0,
                "completion JSON did not match the response shape, returning canned response"
            );
            fallback
        }
    }
}
