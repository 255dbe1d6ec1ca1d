use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use cofoundry_core::domain::session::Session;
use cofoundry_core::domain::user::UserId;

use super::{decode_datetime, RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_session(row: &SqliteRow) -> Result<Session, RepositoryError> {
    Ok(Session {
        token: row.get::<String, _>("token"),
        user_id: UserId(row.get::<String, _>("user_id")),
        created_at: decode_datetime("created_at", &row.get::<String, _>("created_at"))?,
        expires_at: decode_datetime("expires_at", &row.get::<String, _>("expires_at"))?,
    })
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn create(&self, session: Session) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&session.token)
        .bind(&session.user_id.0)
        .bind(session.created_at.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at, expires_at FROM sessions \
             WHERE token = ?1 AND expires_at > ?2",
        )
        .bind(token)
        .bind(now.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(decode_session).transpose()
    }

    async fn delete(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use cofoundry_core::domain::session::Session;
    use cofoundry_core::domain::user::{User, UserId, UserType};

    use crate::repositories::{
        SessionRepository, SqlSessionRepository, SqlUserRepository, UserRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, UserId) {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let user = User::new(
            "founder@example.com".to_string(),
            "Dana".to_string(),
            UserType::Entrepreneur,
        );
        let user_id = user.id.clone();
        SqlUserRepository::new(pool.clone()).create(user).await.expect("create user");
        (pool, user_id)
    }

    #[tokio::test]
    async fn valid_session_is_found_until_it_expires() {
        let (pool, user_id) = setup().await;
        let repo = SqlSessionRepository::new(pool);

        let session = Session::issue(user_id, 1);
        repo.create(session.clone()).await.expect("create session");

        let found = repo.find_valid(&session.token, Utc::now()).await.expect("lookup");
        assert_eq!(found, Some(session.clone()));

        let later = Utc::now() + Duration::hours(2);
        let expired = repo.find_valid(&session.token, later).await.expect("lookup");
        assert!(expired.is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let (pool, user_id) = setup().await;
        let repo = SqlSessionRepository::new(pool);

        let live = Session::issue(user_id.clone(), 10);
        let mut dead = Session::issue(user_id, 10);
        dead.expires_at = Utc::now() - Duration::hours(1);

        repo.create(live.clone()).await.expect("create live");
        repo.create(dead.clone()).await.expect("create dead");

        let purged = repo.purge_expired(Utc::now()).await.expect("purge");
        assert_eq!(purged, 1);

        assert!(repo.find_valid(&live.token, Utc::now()).await.expect("lookup").is_some());
        assert!(!repo.delete(&dead.token).await.expect("delete"));
    }
}
