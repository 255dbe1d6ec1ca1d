//! Organization CRUD and search.
//!
//! - `POST   /api/organizations`
//! - `GET    /api/organizations`
//! - `GET    /api/organizations/search?q=`
//! - `GET    /api/organizations/{id}`
//! - `PATCH  /api/organizations/{id}`
//! - `DELETE /api/organizations/{id}`

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use cofoundry_core::domain::organization::{Organization, OrganizationId, OrganizationPatch};
use cofoundry_core::domain::user::UserType;
use cofoundry_core::permissions;

use cofoundry_db::repositories::{OrganizationRepository, SqlOrganizationRepository};

use crate::auth::{authenticate, AuthedUser};
use crate::bootstrap::AppContext;
use crate::errors::{correlation_id, ApiError};

const MAX_NAME_LEN: usize = 120;
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/organizations", get(list).post(create))
        .route("/api/organizations/search", get(search))
        .route(
            "/api/organizations/{id}",
            get(fetch).patch(update).delete(remove),
        )
        .with_state(ctx)
}

#[derive(Debug, Deserialize)]
struct CreateOrganizationRequest {
    name: Option<String>,
    organization_type: Option<String>,
    description: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateOrganizationRequest {
    name: Option<String>,
    organization_type: Option<String>,
    description: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    limit: Option<u32>,
}

fn page_limit(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

fn can_modify(authed: &AuthedUser, organization: &Organization) -> bool {
    organization.is_owned_by(&authed.user.id)
        || permissions::has_permission(authed.user.user_type, permissions::ADMIN_ALL)
}

async fn create(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;

    let mut fields = BTreeMap::new();
    let name = body.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        fields.insert("name".to_string(), "required".to_string());
    } else if name.len() > MAX_NAME_LEN {
        fields.insert("name".to_string(), format!("must be at most {MAX_NAME_LEN} characters"));
    }

    let organization_type = match body.organization_type.as_deref() {
        None => authed.user.user_type,
        Some(raw) => match UserType::parse(raw) {
            Some(parsed) => parsed,
            None => {
                fields.insert("organization_type".to_string(), "unknown type".to_string());
                authed.user.user_type
            }
        },
    };

    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let mut organization =
        Organization::new(name.to_string(), organization_type, authed.user.id.clone());
    organization.description = body.description.filter(|value| !value.trim().is_empty());
    organization.website = body.website.filter(|value| !value.trim().is_empty());

    SqlOrganizationRepository::new(ctx.db_pool.clone())
        .create(organization.clone())
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?;

    tracing::info!(
        event_name = "api.organizations.created",
        correlation_id = %request_id,
        organization_id = %organization.id.0,
        owner_id = %authed.user.id.0,
        "organization created"
    );

    Ok((StatusCode::CREATED, Json(organization)))
}

async fn list(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Organization>>, ApiError> {
    let request_id = correlation_id();
    authenticate(&ctx, &headers, &request_id).await?;

    let organizations = SqlOrganizationRepository::new(ctx.db_pool.clone())
        .list(page_limit(query.limit), query.offset.unwrap_or(0))
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;
    Ok(Json(organizations))
}

async fn search(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Organization>>, ApiError> {
    let request_id = correlation_id();
    authenticate(&ctx, &headers, &request_id).await?;

    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        let mut fields = BTreeMap::new();
        fields.insert("q".to_string(), "required".to_string());
        return Err(ApiError::validation(fields, request_id));
    }

    let organizations = SqlOrganizationRepository::new(ctx.db_pool.clone())
        .search(term, page_limit(query.limit))
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;
    Ok(Json(organizations))
}

async fn fetch(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Organization>, ApiError> {
    let request_id = correlation_id();
    authenticate(&ctx, &headers, &request_id).await?;

    let organization = SqlOrganizationRepository::new(ctx.db_pool.clone())
        .find_by_id(&OrganizationId(id))
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("organization", request_id))?;
    Ok(Json(organization))
}

async fn update(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateOrganizationRequest>,
) -> Result<Json<Organization>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;

    let repo = SqlOrganizationRepository::new(ctx.db_pool.clone());
    let id = OrganizationId(id);
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("organization", request_id.clone()))?;

    if !can_modify(&authed, &existing) {
        return Err(ApiError::forbidden(
            "only the owner can modify this organization",
            request_id,
        ));
    }

    let mut fields = BTreeMap::new();
    if let Some(name) = body.name.as_deref() {
        if name.trim().is_empty() {
            fields.insert("name".to_string(), "must not be empty".to_string());
        } else if name.len() > MAX_NAME_LEN {
            fields.insert("name".to_string(), format!("must be at most {MAX_NAME_LEN} characters"));
        }
    }
    let organization_type = match body.organization_type.as_deref() {
        None => None,
        Some(raw) => match UserType::parse(raw) {
            Some(parsed) => Some(parsed),
            None => {
                fields.insert("organization_type".to_string(), "unknown type".to_string());
                None
            }
        },
    };
    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let patch = OrganizationPatch {
        name: body.name.map(|value| value.trim().to_string()),
        organization_type,
        description: body.description,
        website: body.website,
    };

    let updated = repo
        .update(&id, patch)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("organization", request_id))?;
    Ok(Json(updated))
}

async fn remove(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;

    let repo = SqlOrganizationRepository::new(ctx.db_pool.clone());
    let id = OrganizationId(id);
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("organization", request_id.clone()))?;

    if !can_modify(&authed, &existing) {
        return Err(ApiError::forbidden(
            "only the owner can delete this organization",
            request_id,
        ));
    }

    let deleted = repo
        .delete(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?;

    tracing::info!(
        event_name = "api.organizations.deleted",
        correlation_id = %request_id,
        organization_id = %id.0,
        "organization deleted"
    );
    Ok(Json(json!({ "deleted": deleted })))
}
