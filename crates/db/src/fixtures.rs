use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo seeds and their verification contract.
const SEED_USERS: &[SeedUserContract] = &[
    SeedUserContract {
        user_id: "user-entrepreneur-001",
        email: "dana@northwind.example",
        user_type: "entrepreneur",
        description: "founder walking the Co-Founder coaching flow",
    },
    SeedUserContract {
        user_id: "user-investor-001",
        email: "alex@lakeshore.example",
        user_type: "investor",
        description: "investor exercising the deal analyzer",
    },
    SeedUserContract {
        user_id: "user-lender-001",
        email: "priya@harborbank.example",
        user_type: "lender",
        description: "lender routed to the credit analyst",
    },
    SeedUserContract {
        user_id: "user-grantor-001",
        email: "sam@civicfund.example",
        user_type: "grantor",
        description: "grantor routed to the grant advisor",
    },
];

const SEED_ORGANIZATION_IDS: &[&str] = &["org-northwind-001", "org-lakeshore-001"];
const SEED_PLAN_IDS: &[&str] = &["plan-northwind-001", "plan-northwind-002"];
const SEED_GOAL_IDS: &[&str] = &["goal-northwind-001", "goal-northwind-002"];
const SEED_COMMITMENT_IDS: &[&str] = &["commitment-northwind-001"];
const SEED_MESSAGE_IDS: &[&str] = &["message-northwind-001", "message-northwind-002"];

#[derive(Clone, Copy, Debug)]
pub struct SeedUserContract {
    pub user_id: &'static str,
    pub email: &'static str,
    pub user_type: &'static str,
    pub description: &'static str,
}

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub users_seeded: Vec<SeedUserContract>,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Deterministic demo dataset covering one user per exercised role.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo seed data.
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    pub fn contract() -> &'static [SeedUserContract] {
        SEED_USERS
    }

    /// Load the demo dataset. Idempotent: rows are upserted by fixed ids.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult { users_seeded: SEED_USERS.to_vec() })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for user in SEED_USERS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1 AND email = ?2 \
                 AND user_type = ?3)",
            )
            .bind(user.user_id)
            .bind(user.email)
            .bind(user.user_type)
            .fetch_one(pool)
            .await?;
            checks.push((user.user_id, present == 1));
        }

        checks.push((
            "organizations",
            count_by_ids(pool, "organizations", SEED_ORGANIZATION_IDS).await?
                == SEED_ORGANIZATION_IDS.len() as i64,
        ));
        checks.push((
            "business_plans",
            count_by_ids(pool, "business_plans", SEED_PLAN_IDS).await?
                == SEED_PLAN_IDS.len() as i64,
        ));
        checks.push((
            "cofounder_goals",
            count_by_ids(pool, "cofounder_goals", SEED_GOAL_IDS).await?
                == SEED_GOAL_IDS.len() as i64,
        ));
        checks.push((
            "cofounder_commitments",
            count_by_ids(pool, "cofounder_commitments", SEED_COMMITMENT_IDS).await?
                == SEED_COMMITMENT_IDS.len() as i64,
        ));
        checks.push((
            "agent_messages",
            count_by_ids(pool, "agent_messages", SEED_MESSAGE_IDS).await?
                == SEED_MESSAGE_IDS.len() as i64,
        ));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }
}

async fn count_by_ids(
    pool: &DbPool,
    table: &str,
    ids: &[&str],
) -> Result<i64, RepositoryError> {
    let quoted = ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
    let count: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE id IN ({quoted})"))
            .fetch_one(pool)
            .await?;
    Ok(count)
}
