//! Business-plan CRUD with visibility enforcement.
//!
//! Non-owners only see `public` plans anonymously and `network` plans with a
//! session; `private` plans never leave their owner.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use cofoundry_core::domain::business_plan::{
    BusinessPlan, BusinessPlanId, BusinessPlanPatch, PlanStage, Visibility,
};
use cofoundry_core::domain::user::UserId;
use cofoundry_core::permissions;

use cofoundry_db::repositories::{BusinessPlanRepository, SqlBusinessPlanRepository};

use crate::auth::{authenticate, maybe_authenticate, AuthedUser};
use crate::bootstrap::AppContext;
use crate::errors::{correlation_id, ApiError};

const MAX_TITLE_LEN: usize = 160;
const MAX_CONTENT_LEN: usize = 200_000;
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/business-plans", get(list).post(create))
        .route("/api/business-plans/{id}", get(fetch).patch(update).delete(remove))
        .with_state(ctx)
}

#[derive(Debug, Deserialize)]
struct CreatePlanRequest {
    title: Option<String>,
    industry: Option<String>,
    content: Option<String>,
    stage: Option<String>,
    visibility: Option<String>,
    funding_target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatePlanRequest {
    title: Option<String>,
    industry: Option<String>,
    content: Option<String>,
    stage: Option<String>,
    visibility: Option<String>,
    funding_target: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

fn viewer_id(authed: &Option<AuthedUser>) -> Option<&UserId> {
    authed.as_ref().map(|a| &a.user.id)
}

fn can_modify(authed: &AuthedUser, plan: &BusinessPlan) -> bool {
    plan.owner_id == authed.user.id
        || permissions::has_permission(authed.user.user_type, permissions::ADMIN_ALL)
}

fn parse_stage(
    raw: Option<&str>,
    fields: &mut BTreeMap<String, String>,
) -> Option<PlanStage> {
    let raw = raw?;
    match PlanStage::parse(raw) {
        Some(stage) => Some(stage),
        None => {
            fields.insert("stage".to_string(), "unknown stage".to_string());
            None
        }
    }
}

fn parse_visibility(
    raw: Option<&str>,
    fields: &mut BTreeMap<String, String>,
) -> Option<Visibility> {
    let raw = raw?;
    match Visibility::parse(raw) {
        Some(visibility) => Some(visibility),
        None => {
            fields.insert("visibility".to_string(), "unknown visibility".to_string());
            None
        }
    }
}

fn parse_funding_target(
    raw: Option<&str>,
    fields: &mut BTreeMap<String, String>,
) -> Option<rust_decimal::Decimal> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            fields.insert("funding_target".to_string(), "must be a decimal amount".to_string());
            None
        }
    }
}

async fn create(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<BusinessPlan>), ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;

    let mut fields = BTreeMap::new();
    let title = body.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        fields.insert("title".to_string(), "required".to_string());
    } else if title.len() > MAX_TITLE_LEN {
        fields.insert("title".to_string(), format!("must be at most {MAX_TITLE_LEN} characters"));
    }
    let industry = body.industry.as_deref().map(str::trim).unwrap_or_default();
    if industry.is_empty() {
        fields.insert("industry".to_string(), "required".to_string());
    }
    if body.content.as_deref().map(str::len).unwrap_or(0) > MAX_CONTENT_LEN {
        fields.insert(
            "content".to_string(),
            format!("must be at most {MAX_CONTENT_LEN} characters"),
        );
    }
    let stage = parse_stage(body.stage.as_deref(), &mut fields);
    let visibility = parse_visibility(body.visibility.as_deref(), &mut fields);
    let funding_target = parse_funding_target(body.funding_target.as_deref(), &mut fields);

    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let mut plan =
        BusinessPlan::new(authed.user.id.clone(), title.to_string(), industry.to_string());
    if let Some(content) = body.content {
        plan.content = content;
    }
    if let Some(stage) = stage {
        plan.stage = stage;
    }
    if let Some(visibility) = visibility {
        plan.visibility = visibility;
    }
    if let Some(funding_target) = funding_target {
        plan.funding_target = funding_target;
    }

    SqlBusinessPlanRepository::new(ctx.db_pool.clone())
        .create(plan.clone())
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?;

    tracing::info!(
        event_name = "api.business_plans.created",
        correlation_id = %request_id,
        plan_id = %plan.id.0,
        owner_id = %authed.user.id.0,
        "business plan created"
    );

    Ok((StatusCode::CREATED, Json(plan)))
}

async fn list(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BusinessPlan>>, ApiError> {
    let request_id = correlation_id();
    let authed = maybe_authenticate(&ctx, &headers, &request_id).await?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let plans = SqlBusinessPlanRepository::new(ctx.db_pool.clone())
        .list(limit, query.offset.unwrap_or(0))
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;

    let visible =
        plans.into_iter().filter(|plan| plan.can_view(viewer_id(&authed))).collect::<Vec<_>>();
    Ok(Json(visible))
}

async fn fetch(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BusinessPlan>, ApiError> {
    let request_id = correlation_id();
    let authed = maybe_authenticate(&ctx, &headers, &request_id).await?;

    let plan = SqlBusinessPlanRepository::new(ctx.db_pool.clone())
        .find_by_id(&BusinessPlanId(id))
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("business plan", request_id.clone()))?;

    if !plan.can_view(viewer_id(&authed)) {
        // Hidden plans 404 rather than 403 so probing cannot confirm ids.
        return Err(ApiError::not_found("business plan", request_id));
    }
    Ok(Json(plan))
}

async fn update(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdatePlanRequest>,
) -> Result<Json<BusinessPlan>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;

    let repo = SqlBusinessPlanRepository::new(ctx.db_pool.clone());
    let id = BusinessPlanId(id);
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("business plan", request_id.clone()))?;

    if !can_modify(&authed, &existing) {
        return Err(ApiError::forbidden("only the owner can modify this plan", request_id));
    }

    let mut fields = BTreeMap::new();
    if let Some(title) = body.title.as_deref() {
        if title.trim().is_empty() {
            fields.insert("title".to_string(), "must not be empty".to_string());
        }
    }
    if body.content.as_deref().map(str::len).unwrap_or(0) > MAX_CONTENT_LEN {
        fields.insert(
            "content".to_string(),
            format!("must be at most {MAX_CONTENT_LEN} characters"),
        );
    }
    let stage = parse_stage(body.stage.as_deref(), &mut fields);
    let visibility = parse_visibility(body.visibility.as_deref(), &mut fields);
    let funding_target = parse_funding_target(body.funding_target.as_deref(), &mut fields);
    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let patch = BusinessPlanPatch {
        title: body.title.map(|value| value.trim().to_string()),
        content: body.content,
        industry: body.industry,
        stage,
        funding_target,
        visibility,
    };

    let updated = repo
        .update(&id, patch)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("business plan", request_id))?;
    Ok(Json(updated))
}

async fn remove(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;

    let repo = SqlBusinessPlanRepository::new(ctx.db_pool.clone());
    let id = BusinessPlanId(id);
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("business plan", request_id.clone()))?;

    if !can_modify(&authed, &existing) {
        return Err(ApiError::forbidden("only the owner can delete this plan", request_id));
    }

    let deleted = repo
        .delete(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;
    Ok(Json(json!({ "deleted": deleted })))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use crate::bootstrap::test_context;

    use super::router;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn plan_creation_requires_title_and_industry() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .oneshot(json_request("POST", "/api/business-plans", json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["fields"]["title"], "required");
        assert_eq!(body["fields"]["industry"], "required");
    }

    #[tokio::test]
    async fn funding_target_round_trips_as_decimal_text() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/business-plans",
                json!({
                    "title": "Cold-chain expansion",
                    "industry": "logistics",
                    "funding_target": "750000.00",
                    "stage": "prototype"
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["funding_target"], "750000.00");
        assert_eq!(created["stage"], "prototype");
    }

    #[tokio::test]
    async fn invalid_stage_is_a_validation_error() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/business-plans",
                json!({ "title": "Plan", "industry": "fintech", "stage": "warp_speed" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["fields"]["stage"], "unknown stage");
    }

    #[tokio::test]
    async fn owner_sees_private_plans_in_the_listing() {
        let ctx = test_context().await;
        let app = router(ctx);

        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/business-plans",
                json!({ "title": "Secret plan", "industry": "logistics" }),
            ))
            .await
            .expect("response");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/business-plans")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let plans = body_json(response).await;
        assert_eq!(plans.as_array().map(Vec::len), Some(1));
        assert_eq!(plans[0]["visibility"], "private");
    }
}
