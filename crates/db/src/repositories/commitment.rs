use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row};

use cofoundry_core::domain::commitment::{
    CoFounderCommitment, CommitmentId, CommitmentPatch, CommitmentStatus,
};
use cofoundry_core::domain::user::UserId;

use super::{decode_datetime, CommitmentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCommitmentRepository {
    pool: DbPool,
}

impl SqlCommitmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COMMITMENT: &str = "SELECT id, owner_id, description, due_date, status, created_at, \
     updated_at FROM cofounder_commitments";

fn decode_commitment(row: &SqliteRow) -> Result<CoFounderCommitment, RepositoryError> {
    let status_raw = row.get::<String, _>("status");
    let status = CommitmentStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown commitment status `{status_raw}`"))
    })?;

    Ok(CoFounderCommitment {
        id: CommitmentId(row.get::<String, _>("id")),
        owner_id: UserId(row.get::<String, _>("owner_id")),
        description: row.get::<String, _>("description"),
        due_date: decode_datetime("due_date", &row.get::<String, _>("due_date"))?,
        status,
        created_at: decode_datetime("created_at", &row.get::<String, _>("created_at"))?,
        updated_at: decode_datetime("updated_at", &row.get::<String, _>("updated_at"))?,
    })
}

async fn persist_commitment<'e, E>(
    commitment: &CoFounderCommitment,
    executor: E,
) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO cofounder_commitments (id, owner_id, description, due_date, status, \
         created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT (id) DO UPDATE SET \
         description = excluded.description, due_date = excluded.due_date, \
         status = excluded.status, updated_at = excluded.updated_at",
    )
    .bind(&commitment.id.0)
    .bind(&commitment.owner_id.0)
    .bind(&commitment.description)
    .bind(commitment.due_date.to_rfc3339())
    .bind(commitment.status.as_str())
    .bind(commitment.created_at.to_rfc3339())
    .bind(commitment.updated_at.to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl CommitmentRepository for SqlCommitmentRepository {
    async fn create(&self, commitment: CoFounderCommitment) -> Result<(), RepositoryError> {
        persist_commitment(&commitment, &self.pool).await
    }

    async fn find_by_id(
        &self,
        id: &CommitmentId,
    ) -> Result<Option<CoFounderCommitment>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COMMITMENT} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_commitment).transpose()
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<CoFounderCommitment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COMMITMENT} WHERE owner_id = ?1 ORDER BY due_date, id"
        ))
        .bind(&owner_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_commitment).collect()
    }

    async fn update(
        &self,
        id: &CommitmentId,
        patch: CommitmentPatch,
    ) -> Result<Option<CoFounderCommitment>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query(&format!("{SELECT_COMMITMENT} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut commitment = decode_commitment(&row)?;
        commitment.apply(patch)?;
        persist_commitment(&commitment, &mut *tx).await?;
        tx.commit().await?;

        Ok(Some(commitment))
    }

    async fn delete(&self, id: &CommitmentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cofounder_commitments WHERE id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
