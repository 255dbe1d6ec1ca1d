use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::next_updated_at;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Ecosystem role. Organizations reuse the same enum for their own type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Entrepreneur,
    Investor,
    Lender,
    Grantor,
    Partner,
    TeamMember,
    Admin,
}

impl UserType {
    pub const ALL: [UserType; 7] = [
        Self::Entrepreneur,
        Self::Investor,
        Self::Lender,
        Self::Grantor,
        Self::Partner,
        Self::TeamMember,
        Self::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entrepreneur => "entrepreneur",
            Self::Investor => "investor",
            Self::Lender => "lender",
            Self::Grantor => "grantor",
            Self::Partner => "partner",
            Self::TeamMember => "team_member",
            Self::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "entrepreneur" => Some(Self::Entrepreneur),
            "investor" => Some(Self::Investor),
            "lender" => Some(Self::Lender),
            "grantor" => Some(Self::Grantor),
            "partner" => Some(Self::Partner),
            "team_member" => Some(Self::TeamMember),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub user_type: UserType,
    /// Free-form client-owned blob; the server never inspects it.
    pub preferences: Value,
    /// Free-form engagement counters; the server never inspects it.
    pub metrics: Value,
    pub email_verified: bool,
    pub profile_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub user_type: Option<UserType>,
    pub preferences: Option<Value>,
    pub metrics: Option<Value>,
    pub email_verified: Option<bool>,
    pub profile_complete: Option<bool>,
}

impl User {
    pub fn new(email: String, display_name: String, user_type: UserType) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email,
            display_name,
            user_type,
            preferences: Value::Object(serde_json::Map::new()),
            metrics: Value::Object(serde_json::Map::new()),
            email_verified: false,
            profile_complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges only the supplied fields and advances `updated_at`.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(display_name) = patch.display_name {
            self.display_name = display_name;
        }
        if let Some(user_type) = patch.user_type {
            self.user_type = user_type;
        }
        if let Some(preferences) = patch.preferences {
            self.preferences = preferences;
        }
        if let Some(metrics) = patch.metrics {
            self.metrics = metrics;
        }
        if let Some(email_verified) = patch.email_verified {
            self.email_verified = email_verified;
        }
        if let Some(profile_complete) = patch.profile_complete {
            self.profile_complete = profile_complete;
        }
        self.updated_at = next_updated_at(self.updated_at);
    }
}
