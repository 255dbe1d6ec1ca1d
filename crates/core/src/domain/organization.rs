use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::next_updated_at;
use crate::domain::user::{UserId, UserType};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub organization_type: UserType,
    pub owner_id: UserId,
    pub description: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub organization_type: Option<UserType>,
    pub description: Option<String>,
    pub website: Option<String>,
}

impl Organization {
    pub fn new(name: String, organization_type: UserType, owner_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: OrganizationId::generate(),
            name,
            organization_type,
            owner_id,
            description: None,
            website: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: OrganizationPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(organization_type) = patch.organization_type {
            self.organization_type = organization_type;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(website) = patch.website {
            self.website = Some(website);
        }
        self.updated_at = next_updated_at(self.updated_at);
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}
