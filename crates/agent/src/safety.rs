//! Content-safety and sentiment tagging. Both prefer the LLM and fall back
//! to deterministic keyword checks so the chat path keeps working through a
//! provider outage.

use serde::Deserialize;

use cofoundry_core::domain::message::Sentiment;

use crate::llm::{extract_json_block, CompletionRequest, LlmClient};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl SafetyVerdict {
    pub fn allowed() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()) }
    }
}

const SAFETY_SYSTEM_PROMPT: &str = "You are a content-safety filter for a professional \
    startup-ecosystem platform. Block harassment, credible threats, doxxing, and requests \
    for clearly illegal activity; allow ordinary business talk including blunt criticism. \
    Respond with a single JSON object {\"allowed\": boolean, \"reason\": string|null}.";

const SENTIMENT_SYSTEM_PROMPT: &str = "Classify the emotional tone of the user's message as \
    it relates to their own venture. Respond with a single JSON object \
    {\"sentiment\": \"positive\"|\"neutral\"|\"negative\"}.";

const BLOCKLIST: &[&str] = &["kill you", "burn down", "home address of", "hurt them"];

const NEGATIVE_MARKERS: &[&str] =
    &["lost", "failing", "worried", "churn", "ran out", "shutting down", "stressed"];
const POSITIVE_MARKERS: &[&str] =
    &["closed", "won", "signed", "grew", "milestone", "excited", "shipped"];

#[derive(Debug, Deserialize)]
struct SafetyPayload {
    allowed: bool,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentimentPayload {
    sentiment: String,
}

pub async fn check_content_safety(llm: Option<&dyn LlmClient>, text: &str) -> SafetyVerdict {
    if let Some(client) = llm {
        let request = CompletionRequest::new(SAFETY_SYSTEM_PROMPT, text);
        if let Ok(raw) = client.complete(&request).await {
            if let Some(block) = extract_json_block(&raw) {
                if let Ok(payload) = serde_json::from_str::<SafetyPayload>(block) {
                    return SafetyVerdict { allowed: payload.allowed, reason: payload.reason };
                }
            }
        }
        tracing::warn!(
            event_name = "agent.safety.llm_degraded",
            "safety check degraded to keyword filter"
        );
    }

    keyword_safety(text)
}

pub async fn tag_sentiment(llm: Option<&dyn LlmClient>, text: &str) -> Sentiment {
    if let Some(client) = llm {
        let request = CompletionRequest::new(SENTIMENT_SYSTEM_PROMPT, text);
        if let Ok(raw) = client.complete(&request).await {
            if let Some(block) = extract_json_block(&raw) {
                if let Ok(payload) = serde_json::from_str::<SentimentPayload>(block) {
                    if let Some(sentiment) = Sentiment::parse(&payload.sentiment) {
                        return sentiment;
                    }
                }
            }
        }
    }

    keyword_sentiment(text)
}

fn keyword_safety(text: &str) -> SafetyVerdict {
    let normalized = text.to_ascii_lowercase();
    for phrase in BLOCKLIST {
        if normalized.contains(phrase) {
            return SafetyVerdict::blocked("message matched the static safety blocklist");
        }
    }
    SafetyVerdict::allowed()
}

fn keyword_sentiment(text: &str) -> Sentiment {
    let normalized = text.to_ascii_lowercase();
    let negative = NEGATIVE_MARKERS.iter().filter(|m| normalized.contains(**m)).count();
    let positive = POSITIVE_MARKERS.iter().filter(|m| normalized.contains(**m)).count();

    match negative.cmp(&positive) {
        std::cmp::Ordering::Greater => Sentiment::Negative,
        std::cmp::Ordering::Less => Sentiment::Positive,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}
