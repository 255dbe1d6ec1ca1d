use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row};

use cofoundry_core::domain::goal::{CoFounderGoal, GoalId, GoalPatch, GoalStatus};
use cofoundry_core::domain::user::UserId;

use super::{decode_datetime, GoalRepository, RepositoryError};
use crate::DbPool;

pub struct SqlGoalRepository {
    pool: DbPool,
}

impl SqlGoalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_GOAL: &str = "SELECT id, owner_id, description, due_date, status, progress_pct, \
     created_at, updated_at FROM cofounder_goals";

fn decode_goal(row: &SqliteRow) -> Result<CoFounderGoal, RepositoryError> {
    let status_raw = row.get::<String, _>("status");
    let status = GoalStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown goal status `{status_raw}`")))?;

    let due_date = row
        .get::<Option<String>, _>("due_date")
        .map(|raw| decode_datetime("due_date", &raw))
        .transpose()?;

    let progress = row.get::<i64, _>("progress_pct");
    let progress_pct = u8::try_from(progress)
        .map_err(|_| RepositoryError::Decode(format!("progress_pct out of range: {progress}")))?;

    Ok(CoFounderGoal {
        id: GoalId(row.get::<String, _>("id")),
        owner_id: UserId(row.get::<String, _>("owner_id")),
        description: row.get::<String, _>("description"),
        due_date,
        status,
        progress_pct,
        created_at: decode_datetime("created_at", &row.get::<String, _>("created_at"))?,
        updated_at: decode_datetime("updated_at", &row.get::<String, _>("updated_at"))?,
    })
}

async fn persist_goal<'e, E>(goal: &CoFounderGoal, executor: E) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO cofounder_goals (id, owner_id, description, due_date, status, progress_pct, \
         created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
         ON CONFLICT (id) DO UPDATE SET \
         description = excluded.description, due_date = excluded.due_date, \
         status = excluded.status, progress_pct = excluded.progress_pct, \
         updated_at = excluded.updated_at",
    )
    .bind(&goal.id.0)
    .bind(&goal.owner_id.0)
    .bind(&goal.description)
    .bind(goal.due_date.map(|value| value.to_rfc3339()))
    .bind(goal.status.as_str())
    .bind(goal.progress_pct as i64)
    .bind(goal.created_at.to_rfc3339())
    .bind(goal.updated_at.to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl GoalRepository for SqlGoalRepository {
    async fn create(&self, goal: CoFounderGoal) -> Result<(), RepositoryError> {
        persist_goal(&goal, &self.pool).await
    }

    async fn find_by_id(&self, id: &GoalId) -> Result<Option<CoFounderGoal>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_GOAL} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_goal).transpose()
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<CoFounderGoal>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_GOAL} WHERE owner_id = ?1 ORDER BY created_at DESC, id"
        ))
        .bind(&owner_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_goal).collect()
    }

    async fn update(
        &self,
        id: &GoalId,
        patch: GoalPatch,
    ) -> Result<Option<CoFounderGoal>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query(&format!("{SELECT_GOAL} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut goal = decode_goal(&row)?;
        goal.apply(patch)?;
        persist_goal(&goal, &mut *tx).await?;
        tx.commit().await?;

        Ok(Some(goal))
    }

    async fn set_progress(
        &self,
        id: &GoalId,
        progress_pct: u8,
    ) -> Result<Option<CoFounderGoal>, RepositoryError> {
        // IMMEDIATE: two racing progress writes must queue on the write lock
        // instead of failing a deferred lock upgrade after their reads.
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query(&format!("{SELECT_GOAL} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut goal = decode_goal(&row)?;
        goal.set_progress(progress_pct)?;
        persist_goal(&goal, &mut *tx).await?;
        tx.commit().await?;

        Ok(Some(goal))
    }

    async fn delete(&self, id: &GoalId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cofounder_goals WHERE id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use cofoundry_core::domain::goal::{CoFounderGoal, GoalId, GoalStatus};
    use cofoundry_core::domain::user::{User, UserId, UserType};

    use crate::repositories::{GoalRepository, SqlGoalRepository, SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

    async fn setup() -> (DbPool, UserId) {
        // Named shared-memory database so the pool's connections see the same
        // data while tests stay isolated from each other.
        let name = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let url = format!("sqlite://file:goal-test-{name}?mode=memory&cache=shared");
        let pool = connect_with_settings(&url, 4, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let owner = User::new(
            "founder@example.com".to_string(),
            "Dana".to_string(),
            UserType::Entrepreneur,
        );
        let owner_id = owner.id.clone();
        SqlUserRepository::new(pool.clone()).create(owner).await.expect("create owner");
        (pool, owner_id)
    }

    #[tokio::test]
    async fn progress_update_persists_inside_transaction() {
        let (pool, owner_id) = setup().await;
        let repo = SqlGoalRepository::new(pool);

        let goal =
            CoFounderGoal::new(owner_id, "Close three pilot customers".to_string(), None);
        repo.create(goal.clone()).await.expect("create goal");

        let updated = repo
            .set_progress(&goal.id, 45)
            .await
            .expect("set progress")
            .expect("goal exists");
        assert_eq!(updated.progress_pct, 45);
        assert_eq!(updated.status, GoalStatus::Active);
        assert!(updated.updated_at > goal.updated_at);
    }

    #[tokio::test]
    async fn progress_on_missing_goal_is_none_not_an_error() {
        let (pool, _) = setup().await;
        let repo = SqlGoalRepository::new(pool);
        let result = repo.set_progress(&GoalId("missing".to_string()), 10).await.expect("call");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn delete_missing_goal_returns_false() {
        let (pool, _) = setup().await;
        let repo = SqlGoalRepository::new(pool);
        assert!(!repo.delete(&GoalId("missing".to_string())).await.expect("delete"));
    }

    /// Two racing progress writes serialize through the per-update
    /// transaction: the final row equals one of the two writes in full, never
    /// an interleaving.
    #[tokio::test]
    async fn racing_progress_updates_leave_one_winner() {
        let (pool, owner_id) = setup().await;
        let repo = Arc::new(SqlGoalRepository::new(pool));

        let goal = CoFounderGoal::new(owner_id, "Ship the beta".to_string(), None);
        repo.create(goal.clone()).await.expect("create goal");

        let first = {
            let repo = Arc::clone(&repo);
            let id = goal.id.clone();
            tokio::spawn(async move { repo.set_progress(&id, 30).await })
        };
        let second = {
            let repo = Arc::clone(&repo);
            let id = goal.id.clone();
            tokio::spawn(async move { repo.set_progress(&id, 70).await })
        };

        let first = first.await.expect("join").expect("first update");
        let second = second.await.expect("join").expect("second update");
        assert!(first.is_some() && second.is_some());

        let stored = repo
            .find_by_id(&goal.id)
            .await
            .expect("find goal")
            .expect("goal exists");
        assert!(
            stored.progress_pct == 30 || stored.progress_pct == 70,
            "final progress must be one full write, got {}",
            stored.progress_pct
        );
        assert_eq!(stored.description, "Ship the beta");
        assert_eq!(stored.status, GoalStatus::Active);
    }
}
