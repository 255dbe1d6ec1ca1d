use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row};

use cofoundry_core::domain::business_plan::{
    BusinessPlan, BusinessPlanId, BusinessPlanPatch, PlanStage, Visibility,
};
use cofoundry_core::domain::user::UserId;

use super::{decode_datetime, BusinessPlanRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBusinessPlanRepository {
    pool: DbPool,
}

impl SqlBusinessPlanRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_PLAN: &str = "SELECT id, owner_id, title, content, industry, stage, funding_target, \
     visibility, created_at, updated_at FROM business_plans";

fn decode_plan(row: &SqliteRow) -> Result<BusinessPlan, RepositoryError> {
    let stage_raw = row.get::<String, _>("stage");
    let stage = PlanStage::parse(&stage_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown stage `{stage_raw}`")))?;

    let visibility_raw = row.get::<String, _>("visibility");
    let visibility = Visibility::parse(&visibility_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown visibility `{visibility_raw}`"))
    })?;

    let funding_raw = row.get::<String, _>("funding_target");
    let funding_target = funding_raw
        .parse()
        .map_err(|error| RepositoryError::Decode(format!("column `funding_target`: {error}")))?;

    Ok(BusinessPlan {
        id: BusinessPlanId(row.get::<String, _>("id")),
        owner_id: UserId(row.get::<String, _>("owner_id")),
        title: row.get::<String, _>("title"),
        content: row.get::<String, _>("content"),
        industry: row.get::<String, _>("industry"),
        stage,
        funding_target,
        visibility,
        created_at: decode_datetime("created_at", &row.get::<String, _>("created_at"))?,
        updated_at: decode_datetime("updated_at", &row.get::<String, _>("updated_at"))?,
    })
}

async fn persist_plan<'e, E>(plan: &BusinessPlan, executor: E) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO business_plans (id, owner_id, title, content, industry, stage, \
         funding_target, visibility, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
         ON CONFLICT (id) DO UPDATE SET \
         title = excluded.title, content = excluded.content, industry = excluded.industry, \
         stage = excluded.stage, funding_target = excluded.funding_target, \
         visibility = excluded.visibility, updated_at = excluded.updated_at",
    )
    .bind(&plan.id.0)
    .bind(&plan.owner_id.0)
    .bind(&plan.title)
    .bind(&plan.content)
    .bind(&plan.industry)
    .bind(plan.stage.as_str())
    .bind(plan.funding_target.to_string())
    .bind(plan.visibility.as_str())
    .bind(plan.created_at.to_rfc3339())
    .bind(plan.updated_at.to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl BusinessPlanRepository for SqlBusinessPlanRepository {
    async fn create(&self, plan: BusinessPlan) -> Result<(), RepositoryError> {
        persist_plan(&plan, &self.pool).await
    }

    async fn find_by_id(
        &self,
        id: &BusinessPlanId,
    ) -> Result<Option<BusinessPlan>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_PLAN} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_plan).transpose()
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<BusinessPlan>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PLAN} ORDER BY created_at DESC, id LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_plan).collect()
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<BusinessPlan>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PLAN} WHERE owner_id = ?1 ORDER BY created_at DESC, id"
        ))
        .bind(&owner_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_plan).collect()
    }

    async fn update(
        &self,
        id: &BusinessPlanId,
        patch: BusinessPlanPatch,
    ) -> Result<Option<BusinessPlan>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query(&format!("{SELECT_PLAN} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut plan = decode_plan(&row)?;
        plan.apply(patch);
        persist_plan(&plan, &mut *tx).await?;
        tx.commit().await?;

        Ok(Some(plan))
    }

    async fn delete(&self, id: &BusinessPlanId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM business_plans WHERE id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use cofoundry_core::domain::business_plan::{
        BusinessPlan, BusinessPlanPatch, PlanStage, Visibility,
    };
    use cofoundry_core::domain::user::{User, UserId, UserType};

    use crate::repositories::{
        BusinessPlanRepository, SqlBusinessPlanRepository, SqlUserRepository, UserRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, UserId) {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
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
    async fn plan_round_trips_with_decimal_funding_target() {
        let (pool, owner_id) = setup().await;
        let repo = SqlBusinessPlanRepository::new(pool);

        let mut plan = BusinessPlan::new(
            owner_id,
            "Cold-chain logistics".to_string(),
            "logistics".to_string(),
        );
        plan.funding_target = Decimal::new(1_250_000_00, 2);
        plan.stage = PlanStage::Prototype;

        repo.create(plan.clone()).await.expect("create plan");
        let found = repo.find_by_id(&plan.id).await.expect("find plan");

        assert_eq!(found, Some(plan));
    }

    #[tokio::test]
    async fn visibility_patch_does_not_clobber_content() {
        let (pool, owner_id) = setup().await;
        let repo = SqlBusinessPlanRepository::new(pool);

        let plan = BusinessPlan::new(owner_id, "Plan".to_string(), "fintech".to_string());
        repo.create(plan.clone()).await.expect("create plan");

        repo.update(
            &plan.id,
            BusinessPlanPatch {
                content: Some("## Market\nLatAm SMB lending".to_string()),
                ..BusinessPlanPatch::default()
            },
        )
        .await
        .expect("update")
        .expect("plan exists");

        let updated = repo
            .update(
                &plan.id,
                BusinessPlanPatch {
                    visibility: Some(Visibility::Public),
                    ..BusinessPlanPatch::default()
                },
            )
            .await
            .expect("update")
            .expect("plan exists");

        assert_eq!(updated.content, "## Market\nLatAm SMB lending");
        assert_eq!(updated.visibility, Visibility::Public);
    }

    #[tokio::test]
    async fn list_for_owner_is_scoped() {
        let (pool, owner_id) = setup().await;
        let users = SqlUserRepository::new(pool.clone());
        let other =
            User::new("other@example.com".to_string(), "Sam".to_string(), UserType::Entrepreneur);
        let other_id = other.id.clone();
        users.create(other).await.expect("create other");

        let repo = SqlBusinessPlanRepository::new(pool);
        repo.create(BusinessPlan::new(owner_id.clone(), "A".to_string(), "x".to_string()))
            .await
            .expect("create");
        repo.create(BusinessPlan::new(other_id, "B".to_string(), "y".to_string()))
            .await
            .expect("create");

        let owned = repo.list_for_owner(&owner_id).await.expect("list");
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].title, "A");
    }
}
