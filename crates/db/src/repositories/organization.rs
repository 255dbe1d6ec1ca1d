use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row};

use cofoundry_core::domain::organization::{Organization, OrganizationId, OrganizationPatch};
use cofoundry_core::domain::user::{UserId, UserType};

use super::{decode_datetime, OrganizationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrganizationRepository {
    pool: DbPool,
}

impl SqlOrganizationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_ORGANIZATION: &str = "SELECT id, name, organization_type, owner_id, description, \
     website, created_at, updated_at FROM organizations";

fn decode_organization(row: &SqliteRow) -> Result<Organization, RepositoryError> {
    let type_raw = row.get::<String, _>("organization_type");
    let organization_type = UserType::parse(&type_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown organization_type `{type_raw}`"))
    })?;

    Ok(Organization {
        id: OrganizationId(row.get::<String, _>("id")),
        name: row.get::<String, _>("name"),
        organization_type,
        owner_id: UserId(row.get::<String, _>("owner_id")),
        description: row.get::<Option<String>, _>("description"),
        website: row.get::<Option<String>, _>("website"),
        created_at: decode_datetime("created_at", &row.get::<String, _>("created_at"))?,
        updated_at: decode_datetime("updated_at", &row.get::<String, _>("updated_at"))?,
    })
}

async fn persist_organization<'e, E>(
    organization: &Organization,
    executor: E,
) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO organizations (id, name, organization_type, owner_id, description, website, \
         created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
         ON CONFLICT (id) DO UPDATE SET \
         name = excluded.name, organization_type = excluded.organization_type, \
         description = excluded.description, website = excluded.website, \
         updated_at = excluded.updated_at",
    )
    .bind(&organization.id.0)
    .bind(&organization.name)
    .bind(organization.organization_type.as_str())
    .bind(&organization.owner_id.0)
    .bind(&organization.description)
    .bind(&organization.website)
    .bind(organization.created_at.to_rfc3339())
    .bind(organization.updated_at.to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

fn escape_like(query: &str) -> String {
    query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[async_trait::async_trait]
impl OrganizationRepository for SqlOrganizationRepository {
    async fn create(&self, organization: Organization) -> Result<(), RepositoryError> {
        persist_organization(&organization, &self.pool).await
    }

    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_ORGANIZATION} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_organization).transpose()
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Organization>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORGANIZATION} ORDER BY created_at DESC, id LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_organization).collect()
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<Organization>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORGANIZATION} WHERE owner_id = ?1 ORDER BY created_at DESC, id"
        ))
        .bind(&owner_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_organization).collect()
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Organization>, RepositoryError> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query(&format!(
            "{SELECT_ORGANIZATION} WHERE name LIKE ?1 ESCAPE '\\' \
             OR IFNULL(description, '') LIKE ?1 ESCAPE '\\' \
             ORDER BY name, id LIMIT ?2"
        ))
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_organization).collect()
    }

    async fn update(
        &self,
        id: &OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Option<Organization>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query(&format!("{SELECT_ORGANIZATION} WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut organization = decode_organization(&row)?;
        organization.apply(patch);
        persist_organization(&organization, &mut *tx).await?;
        tx.commit().await?;

        Ok(Some(organization))
    }

    async fn delete(&self, id: &OrganizationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use cofoundry_core::domain::organization::{Organization, OrganizationId, OrganizationPatch};
    use cofoundry_core::domain::user::{User, UserId, UserType};

    use crate::repositories::{
        OrganizationRepository, SqlOrganizationRepository, SqlUserRepository, UserRepository,
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
    async fn create_then_fetch_round_trips_field_values() {
        let (pool, owner_id) = setup().await;
        let repo = SqlOrganizationRepository::new(pool);

        let mut organization =
            Organization::new("Northwind Labs".to_string(), UserType::Entrepreneur, owner_id);
        organization.description = Some("Cold-chain logistics startup".to_string());
        organization.website = Some("https://northwind.example".to_string());

        repo.create(organization.clone()).await.expect("create organization");
        let found = repo.find_by_id(&organization.id).await.expect("find organization");

        assert_eq!(found, Some(organization));
    }

    #[tokio::test]
    async fn update_merges_supplied_fields_and_advances_updated_at() {
        let (pool, owner_id) = setup().await;
        let repo = SqlOrganizationRepository::new(pool);

        let organization =
            Organization::new("Northwind Labs".to_string(), UserType::Entrepreneur, owner_id);
        repo.create(organization.clone()).await.expect("create organization");

        let updated = repo
            .update(
                &organization.id,
                OrganizationPatch {
                    description: Some("Series A logistics platform".to_string()),
                    ..OrganizationPatch::default()
                },
            )
            .await
            .expect("update organization")
            .expect("organization exists");

        assert_eq!(updated.name, "Northwind Labs");
        assert_eq!(updated.description.as_deref(), Some("Series A logistics platform"));
        assert!(updated.updated_at > organization.updated_at);
    }

    #[tokio::test]
    async fn delete_of_missing_organization_returns_false() {
        let (pool, _) = setup().await;
        let repo = SqlOrganizationRepository::new(pool);
        let deleted =
            repo.delete(&OrganizationId("missing".to_string())).await.expect("delete call");
        assert!(!deleted);
    }

    #[tokio::test]
    async fn search_matches_name_and_description_substrings() {
        let (pool, owner_id) = setup().await;
        let repo = SqlOrganizationRepository::new(pool);

        let mut logistics = Organization::new(
            "Northwind Labs".to_string(),
            UserType::Entrepreneur,
            owner_id.clone(),
        );
        logistics.description = Some("cold-chain freight".to_string());
        let fintech =
            Organization::new("Lakeshore Capital".to_string(), UserType::Investor, owner_id);

        repo.create(logistics.clone()).await.expect("create");
        repo.create(fintech.clone()).await.expect("create");

        let by_name = repo.search("northwind", 10).await.expect("search");
        assert_eq!(by_name.len(), 1, "ascii LIKE matching is case-insensitive");
        assert_eq!(by_name[0].id, logistics.id);

        let by_fragment = repo.search("wind", 10).await.expect("search");
        assert_eq!(by_fragment.len(), 1);
        assert_eq!(by_fragment[0].id, logistics.id);

        let by_description = repo.search("freight", 10).await.expect("search");
        assert_eq!(by_description.len(), 1);

        let wildcard_literal = repo.search("%", 10).await.expect("search");
        assert!(wildcard_literal.is_empty(), "wildcards must be treated literally");
    }
}
