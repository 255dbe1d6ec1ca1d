//! Static permission table keyed by user type.
//!
//! The context builder attaches this list to every agent request; route
//! handlers consult it for coarse capability checks. The table is data, not
//! policy evaluation: each role maps to a fixed slice.

use crate::domain::user::UserType;

pub const CHAT: &str = "agent.chat";
pub const GOALS: &str = "agent.goals";
pub const COMMITMENTS: &str = "agent.commitments";
pub const ORGANIZATIONS_MANAGE: &str = "organizations.manage";
pub const PLANS_MANAGE: &str = "business_plans.manage";
pub const PLANS_REVIEW: &str = "business_plans.review";
pub const DEAL_FLOW: &str = "deal_flow.review";
pub const CREDIT_REVIEW: &str = "credit.review";
pub const GRANTS_REVIEW: &str = "grants.review";
pub const PARTNERSHIPS: &str = "partnerships.manage";
pub const ADMIN_ALL: &str = "admin.all";

pub fn permissions_for(user_type: UserType) -> &'static [&'static str] {
    match user_type {
        UserType::Entrepreneur => {
            &[CHAT, GOALS, COMMITMENTS, ORGANIZATIONS_MANAGE, PLANS_MANAGE]
        }
        UserType::Investor => &[CHAT, GOALS, ORGANIZATIONS_MANAGE, PLANS_REVIEW, DEAL_FLOW],
        UserType::Lender => &[CHAT, ORGANIZATIONS_MANAGE, PLANS_REVIEW, CREDIT_REVIEW],
        UserType::Grantor => &[CHAT, ORGANIZATIONS_MANAGE, PLANS_REVIEW, GRANTS_REVIEW],
        UserType::Partner => &[CHAT, ORGANIZATIONS_MANAGE, PARTNERSHIPS],
        UserType::TeamMember => &[CHAT, GOALS, COMMITMENTS, PLANS_MANAGE],
        UserType::Admin => {
            &[CHAT, GOALS, COMMITMENTS, ORGANIZATIONS_MANAGE, PLANS_MANAGE, ADMIN_ALL]
        }
    }
}

pub fn has_permission(user_type: UserType, permission: &str) -> bool {
    let granted = permissions_for(user_type);
    granted.contains(&permission) || granted.contains(&ADMIN_ALL)
}

#[cfg(test)]
mod tests {
    use super::{has_permission, permissions_for, CHAT, CREDIT_REVIEW, PLANS_MANAGE};
    use crate::domain::user::UserType;

    #[test]
    fn every_role_can_chat() {
        for user_type in UserType::ALL {
            assert!(has_permission(user_type, CHAT), "{user_type} should be able to chat");
        }
    }

    #[test]
    fn lenders_review_credit_but_do_not_edit_plans() {
        assert!(has_permission(UserType::Lender, CREDIT_REVIEW));
        assert!(!has_permission(UserType::Lender, PLANS_MANAGE));
    }

    #[test]
    fn admin_wildcard_covers_unlisted_permissions() {
        assert!(has_permission(UserType::Admin, CREDIT_REVIEW));
        assert!(!permissions_for(UserType::Admin).contains(&CREDIT_REVIEW));
    }
}
