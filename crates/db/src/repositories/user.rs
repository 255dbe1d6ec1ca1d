use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row};

use cofoundry_core::domain::user::{User, UserId, UserPatch, UserType};

use super::{decode_datetime, RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_USER: &str = "SELECT id, email, display_name, user_type, preferences, metrics, \
     email_verified, profile_complete, created_at, updated_at FROM users";

pub(crate) fn decode_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    let user_type_raw = row.get::<String, _>("user_type");
    let user_type = UserType::parse(&user_type_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown user_type `{user_type_raw}`"))
    })?;

    let preferences = serde_json::from_str(&row.get::<String, _>("preferences"))
        .map_err(|error| RepositoryError::Decode(format!("column `preferences`: {error}")))?;
    let metrics = serde_json::from_str(&row.get::<String, _>("metrics"))
        .map_err(|error| RepositoryError::Decode(format!("column `metrics`: {error}")))?;

    Ok(User {
        id: UserId(row.get::<String, _>("id")),
        email: row.get::<String, _>("email"),
        display_name: row.get::<String, _>("display_name"),
        user_type,
        preferences,
        metrics,
        email_verified: row.get::<i64, _>("email_verified") != 0,
        profile_complete: row.get::<i64, _>("profile_complete") != 0,
        created_at: decode_datetime("created_at", &row.get::<String, _>("created_at"))?,
        updated_at: decode_datetime("updated_at", &row.get::<String, _>("updated_at"))?,
    })
}

async fn persist_user<'e, E>(user: &User, executor: E) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO users (id, email, display_name, user_type, preferences, metrics, \
         email_verified, profile_complete, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
         ON CONFLICT (id) DO UPDATE SET \
         email = excluded.email, display_name = excluded.display_name, \
         user_type = excluded.user_type, preferences = excluded.preferences, \
         metrics = excluded.metrics, email_verified = excluded.email_verified, \
         profile_complete = excluded.profile_complete, updated_at = excluded.updated_at",
    )
    .bind(&user.id.0)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(user.user_type.as_str())
    .bind(user.preferences.to_string())
    .bind(user.metrics.to_string())
    .bind(user.email_verified as i64)
    .bind(user.profile_complete as i64)
    .bind(user.created_at.to_rfc3339())
    .bind(user.updated_at.to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn create(&self, user: User) -> Result<(), RepositoryError> {
        persist_user(&user, &self.pool).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE email = ?1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_user).transpose()
    }

    async fn update(
        &self,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut user = decode_user(&row)?;
        user.apply(patch);
        persist_user(&user, &mut *tx).await?;
        tx.commit().await?;

        Ok(Some(user))
    }

    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM users WHERE id = ?1").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
