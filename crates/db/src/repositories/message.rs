use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use cofoundry_core::domain::message::{AgentMessage, MessageId, MessageRole, Sentiment};
use cofoundry_core::domain::user::UserId;

use super::{decode_datetime, MessageRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMessageRepository {
    pool: DbPool,
}

impl SqlMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_message(row: &SqliteRow) -> Result<AgentMessage, RepositoryError> {
    let role_raw = row.get::<String, _>("role");
    let role = MessageRole::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown message role `{role_raw}`")))?;

    let sentiment = row
        .get::<Option<String>, _>("sentiment")
        .map(|raw| {
            Sentiment::parse(&raw)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown sentiment `{raw}`")))
        })
        .transpose()?;

    Ok(AgentMessage {
        id: MessageId(row.get::<String, _>("id")),
        user_id: UserId(row.get::<String, _>("user_id")),
        role,
        content: row.get::<String, _>("content"),
        sentiment,
        created_at: decode_datetime("created_at", &row.get::<String, _>("created_at"))?,
    })
}

#[async_trait::async_trait]
impl MessageRepository for SqlMessageRepository {
    async fn append(&self, message: AgentMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO agent_messages (id, user_id, role, content, sentiment, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&message.id.0)
        .bind(&message.user_id.0)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.sentiment.map(|value| value.as_str()))
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AgentMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, role, content, sentiment, created_at FROM agent_messages \
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
        )
        .bind(&user_id.0)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages =
            rows.iter().map(decode_message).collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}
