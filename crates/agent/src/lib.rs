//! Agent runtime - role-routed advisory chat over the platform's data.
//!
//! This crate is the "brain" of cofoundry: it routes a chat request to one of
//! a closed set of advisor kinds, assembles per-request conversation context,
//! and optionally enriches the canned advisory content through an
//! OpenAI-compatible completion endpoint.
//!
//! # Architecture
//!
//! 1. **Routing** (`dispatch`) - `AgentKind::resolve` maps user type + task
//!    type to exactly one advisor; the mapping is exhaustively matched.
//! 2. **Context** (`context`) - user record, recent conversation slice, and
//!    the static permission list for the role.
//! 3. **Handlers** (`handlers`) - one module per advisor kind producing
//!    `AgentResponse`; each degrades to its canned body on any LLM failure.
//! 4. **LLM boundary** (`llm`) - typed transient/permanent failures and a
//!    bounded-retry decorator around the provider client.
//!
//! # Safety principle
//!
//! The LLM only rewrites advisory prose. Routing, permissions, and every
//! stored mutation are deterministic and happen outside this crate's LLM
//! path.

pub mod context;
pub mod dispatch;
pub mod handlers;
pub mod llm;
pub mod safety;

pub use context::{ContextBuilder, ContextSource, ConversationContext, RECENT_MESSAGE_LIMIT};
pub use dispatch::{dispatch, AgentAction, AgentKind, AgentRequest, AgentResponse};
pub use llm::{
    extract_json_block, CompletionRequest, LlmClient, LlmError, OpenAiClient, RetryPolicy,
    RetryingClient,
};
pub use safety::{check_content_safety, tag_sentiment, SafetyVerdict};
