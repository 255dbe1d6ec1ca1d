use serde::{Deserialize, Serialize};

use cofoundry_core::domain::user::{UserId, UserType};

use crate::context::ConversationContext;
use crate::handlers;
use crate::llm::LlmClient;

/// The closed set of advisors. Routing is exhaustively matched; adding a
/// kind without wiring a handler is a compile error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    CoFounder,
    VentureCoach,
    DealAnalyzer,
    CreditAnalyst,
    GrantAdvisor,
    PartnershipAdvisor,
    TeamAssistant,
    Concierge,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoFounder => "co_founder",
            Self::VentureCoach => "venture_coach",
            Self::DealAnalyzer => "deal_analyzer",
            Self::CreditAnalyst => "credit_analyst",
            Self::GrantAdvisor => "grant_advisor",
            Self::PartnershipAdvisor => "partnership_advisor",
            Self::TeamAssistant => "team_assistant",
            Self::Concierge => "concierge",
        }
    }

    /// Total routing function. A task type containing `co_founder` always
    /// wins; otherwise the user type picks the advisor.
    pub fn resolve(user_type: UserType, task_type: Option<&str>) -> Self {
        if task_type.is_some_and(|task| task.contains("co_founder")) {
            return Self::CoFounder;
        }

        match user_type {
            UserType::Entrepreneur => Self::VentureCoach,
            UserType::Investor => Self::DealAnalyzer,
            UserType::Lender => Self::CreditAnalyst,
            UserType::Grantor => Self::GrantAdvisor,
            UserType::Partner => Self::PartnershipAdvisor,
            UserType::TeamMember => Self::TeamAssistant,
            UserType::Admin => Self::Concierge,
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AgentRequest {
    pub user_id: UserId,
    pub user_type: UserType,
    pub message: String,
    pub task_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub action: String,
    pub label: String,
}

impl AgentAction {
    pub fn new(action: impl Into<String>, label: impl Into<String>) -> Self {
        Self { action: action.into(), label: label.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub actions: Vec<AgentAction>,
    #[serde(default)]
    pub insights: Vec<String>,
    /// Canned responses carry a fixed per-handler constant describing how
    /// specific the template is; LLM-backed responses pass the model's own
    /// figure through when its JSON provides one.
    pub confidence: f32,
}

/// Single entry point: run the resolved advisor against the request.
pub async fn dispatch(
    kind: AgentKind,
    request: &AgentRequest,
    context: &ConversationContext,
    llm: Option<&dyn LlmClient>,
) -> AgentResponse {
    tracing::debug!(
        event_name = "agent.dispatch",
        agent_kind = kind.as_str(),
        user_id = %request.user_id.0,
        task_type = request.task_type.as_deref().unwrap_or("none"),
        "dispatching agent request"
    );

    match kind {
        AgentKind::CoFounder => handlers::co_founder::execute(request, context, llm).await,
        AgentKind::VentureCoach => handlers::venture_coach::execute(request, context, llm).await,
        AgentKind::DealAnalyzer => handlers::deal_analyzer::execute(request, context, llm).await,
        AgentKind::CreditAnalyst => handlers::credit_analyst::execute(request, context, llm).await,
        AgentKind::GrantAdvisor => handlers::grant_advisor::execute(request, context, llm).await,
        AgentKind::PartnershipAdvisor => {
            handlers::partnership_advisor::execute(request, context, llm).await
        }
        AgentKind::TeamAssistant => handlers::team_assistant::execute(request, context).await,
        AgentKind::Concierge => handlers::concierge::execute(request, context).await,
    }
}

#[cfg(test)]
mod tests {
    use cofoundry_core::domain::user::{UserId, UserType};

    use crate::context::ConversationContext;

    use super::{dispatch, AgentKind, AgentRequest};

    #[test]
    fn lenders_always_reach_the_credit_analyst() {
        let task_types =
            [None, Some("chat"), Some("loan_review"), Some("portfolio"), Some("anything_else")];
        for task_type in task_types {
            assert_eq!(
                AgentKind::resolve(UserType::Lender, task_type),
                AgentKind::CreditAnalyst,
                "task_type {task_type:?} must not reroute a lender"
            );
        }
    }

    #[test]
    fn co_founder_task_overrides_every_user_type() {
        for user_type in UserType::ALL {
            for task_type in ["co_founder", "co_founder_goal", "weekly_co_founder_checkin"] {
                assert_eq!(
                    AgentKind::resolve(user_type, Some(task_type)),
                    AgentKind::CoFounder,
                    "{user_type} with task {task_type} must route to the co-founder"
                );
            }
        }
    }

    #[test]
    fn every_user_type_has_a_default_advisor() {
        let expectations = [
            (UserType::Entrepreneur, AgentKind::VentureCoach),
            (UserType::Investor, AgentKind::DealAnalyzer),
            (UserType::Lender, AgentKind::CreditAnalyst),
            (UserType::Grantor, AgentKind::GrantAdvisor),
            (UserType::Partner, AgentKind::PartnershipAdvisor),
            (UserType::TeamMember, AgentKind::TeamAssistant),
            (UserType::Admin, AgentKind::Concierge),
        ];
        for (user_type, expected) in expectations {
            assert_eq!(AgentKind::resolve(user_type, None), expected);
        }
    }

    #[tokio::test]
    async fn dispatch_without_llm_returns_canned_content_for_every_kind() {
        let kinds = [
            AgentKind::CoFounder,
            AgentKind::VentureCoach,
            AgentKind::DealAnalyzer,
            AgentKind::CreditAnalyst,
            AgentKind::GrantAdvisor,
            AgentKind::PartnershipAdvisor,
            AgentKind::TeamAssistant,
            AgentKind::Concierge,
        ];

        for kind in kinds {
            let request = AgentRequest {
                user_id: UserId("user-1".to_string()),
                user_type: UserType::Entrepreneur,
                message: "Where should I focus this week?".to_string(),
                task_type: None,
            };
            let context = ConversationContext::empty(UserType::Entrepreneur);

            let response = dispatch(kind, &request, &context, None).await;
            assert!(!response.content.is_empty(), "{kind} must produce content");
            assert!(
                response.confidence > 0.0 && response.confidence <= 1.0,
                "{kind} confidence out of range"
            );
        }
    }
}
