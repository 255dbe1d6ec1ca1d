use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::signing::generate_token;

pub const SESSION_TOKEN_LEN: usize = 48;

/// Browser session backing the `cofoundry_session` cookie.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn issue(user_id: UserId, ttl_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            token: generate_token(SESSION_TOKEN_LEN),
            user_id,
            created_at: now,
            expires_at: now + Duration::hours(ttl_hours as i64),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::Session;
    use crate::domain::user::UserId;

    #[test]
    fn issued_session_is_valid_until_ttl() {
        let session = Session::issue(UserId("u-1".to_string()), 12);
        assert!(!session.is_expired(Utc::now()));
        assert!(session.is_expired(Utc::now() + Duration::hours(13)));
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let a = Session::issue(UserId("u-1".to_string()), 1);
        let b = Session::issue(UserId("u-1".to_string()), 1);
        assert_ne!(a.token, b.token);
    }
}
