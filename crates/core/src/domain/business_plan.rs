use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::next_updated_at;
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessPlanId(pub String);

impl BusinessPlanId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStage {
    Idea,
    Prototype,
    Launched,
    Scaling,
}

impl PlanStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::Prototype => "prototype",
            Self::Launched => "launched",
            Self::Scaling => "scaling",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "idea" => Some(Self::Idea),
            "prototype" => Some(Self::Prototype),
            "launched" => Some(Self::Launched),
            "scaling" => Some(Self::Scaling),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Network,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Network => "network",
            Self::Public => "public",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "private" => Some(Self::Private),
            "network" => Some(Self::Network),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessPlan {
    pub id: BusinessPlanId,
    pub owner_id: UserId,
    pub title: String,
    pub content: String,
    pub industry: String,
    pub stage: PlanStage,
    pub funding_target: Decimal,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BusinessPlanPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub industry: Option<String>,
    pub stage: Option<PlanStage>,
    pub funding_target: Option<Decimal>,
    pub visibility: Option<Visibility>,
}

impl BusinessPlan {
    pub fn new(owner_id: UserId, title: String, industry: String) -> Self {
        let now = Utc::now();
        Self {
            id: BusinessPlanId::generate(),
            owner_id,
            title,
            content: String::new(),
            industry,
            stage: PlanStage::Idea,
            funding_target: Decimal::ZERO,
            visibility: Visibility::Private,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: BusinessPlanPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(industry) = patch.industry {
            self.industry = industry;
        }
        if let Some(stage) = patch.stage {
            self.stage = stage;
        }
        if let Some(funding_target) = patch.funding_target {
            self.funding_target = funding_target;
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
        self.updated_at = next_updated_at(self.updated_at);
    }

    /// `viewer` is `None` for anonymous requests.
    pub fn can_view(&self, viewer: Option<&UserId>) -> bool {
        if viewer == Some(&self.owner_id) {
            return true;
        }
        match self.visibility {
            Visibility::Public => true,
            Visibility::Network => viewer.is_some(),
            Visibility::Private => false,
        }
    }
}
