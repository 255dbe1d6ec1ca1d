//! Agent surface: chat plus Co-Founder goal and commitment CRUD.
//!
//! JSON API Endpoints:
//! - `POST   /api/agent/chat`
//! - `GET    /api/agent/goals` / `POST /api/agent/goals`
//! - `PATCH  /api/agent/goals/{id}` / `DELETE /api/agent/goals/{id}`
//! - `POST   /api/agent/goals/{id}/progress`
//! - `GET    /api/agent/commitments` / `POST /api/agent/commitments`
//! - `PATCH  /api/agent/commitments/{id}` / `DELETE /api/agent/commitments/{id}`
//! - `GET    /api/loans`, `/api/portfolios`, `/api/mentorships` — explicit 501

use std::collections::BTreeMap;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use cofoundry_agent::context::{ContextBuilder, ContextSource};
use cofoundry_agent::dispatch::{dispatch, AgentAction, AgentKind, AgentRequest};
use cofoundry_agent::safety::{check_content_safety, tag_sentiment};
use cofoundry_core::domain::commitment::{
    CoFounderCommitment, CommitmentId, CommitmentPatch, CommitmentStatus,
};
use cofoundry_core::domain::goal::{CoFounderGoal, GoalId, GoalPatch, GoalStatus};
use cofoundry_core::domain::message::{AgentMessage, MessageRole, Sentiment};
use cofoundry_core::domain::user::{User, UserId};
use cofoundry_core::permissions;

use cofoundry_db::repositories::{
    unsupported_domain, CommitmentRepository, GoalRepository, MessageRepository,
    SqlCommitmentRepository, SqlGoalRepository, SqlMessageRepository, SqlUserRepository,
    UserRepository,
};
use cofoundry_db::DbPool;

use crate::auth::{authenticate, AuthedUser};
use crate::bootstrap::AppContext;
use crate::errors::{correlation_id, ApiError};

const MAX_MESSAGE_LEN: usize = 4_000;
const MAX_DESCRIPTION_LEN: usize = 500;

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/agent/chat", post(chat))
        .route("/api/agent/goals", get(list_goals).post(create_goal))
        .route("/api/agent/goals/{id}", axum::routing::patch(update_goal).delete(delete_goal))
        .route("/api/agent/goals/{id}/progress", post(set_goal_progress))
        .route("/api/agent/commitments", get(list_commitments).post(create_commitment))
        .route(
            "/api/agent/commitments/{id}",
            axum::routing::patch(update_commitment).delete(delete_commitment),
        )
        .route("/api/loans", get(|| unsupported("loans")))
        .route("/api/portfolios", get(|| unsupported("portfolios")))
        .route("/api/mentorships", get(|| unsupported("mentorships")))
        .with_state(ctx)
}

/// Adapts the sql repositories onto the agent crate's context seam.
struct DbContextSource {
    pool: DbPool,
}

#[async_trait]
impl ContextSource for DbContextSource {
    async fn load_user(&self, id: &UserId) -> AnyResult<Option<User>> {
        Ok(SqlUserRepository::new(self.pool.clone()).find_by_id(id).await?)
    }

    async fn recent_messages(&self, id: &UserId, limit: u32) -> AnyResult<Vec<AgentMessage>> {
        Ok(SqlMessageRepository::new(self.pool.clone()).recent_for_user(id, limit).await?)
    }
}

async fn unsupported(domain: &'static str) -> ApiError {
    let request_id = correlation_id();
    let error = unsupported_domain(domain)
        .expect("route is only registered for catalogued unsupported domains");
    ApiError::from_repository(error, request_id)
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
    task_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    agent: &'static str,
    content: String,
    suggestions: Vec<String>,
    actions: Vec<AgentAction>,
    insights: Vec<String>,
    confidence: f32,
    sentiment: Sentiment,
}

async fn chat(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;

    if let Err(retry_after) = ctx.chat_limiter.check(&authed.user.id.0).await {
        return Err(ApiError::rate_limited(retry_after, request_id));
    }

    let message = body.message.as_deref().map(str::trim).unwrap_or_default();
    let mut fields = BTreeMap::new();
    if message.is_empty() {
        fields.insert("message".to_string(), "required".to_string());
    } else if message.len() > MAX_MESSAGE_LEN {
        fields.insert(
            "message".to_string(),
            format!("must be at most {MAX_MESSAGE_LEN} characters"),
        );
    }
    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let llm = ctx.llm.as_deref();
    let verdict = check_content_safety(llm, message).await;
    if !verdict.allowed {
        let mut fields = BTreeMap::new();
        fields.insert(
            "message".to_string(),
            verdict.reason.unwrap_or_else(|| "message was rejected".to_string()),
        );
        return Err(ApiError::validation(fields, request_id));
    }

    let source = DbContextSource { pool: ctx.db_pool.clone() };
    let context =
        ContextBuilder::new(&source).build(&authed.user.id, authed.user.user_type).await;

    let sentiment = tag_sentiment(llm, message).await;
    let messages = SqlMessageRepository::new(ctx.db_pool.clone());
    messages
        .append(
            AgentMessage::new(authed.user.id.clone(), MessageRole::User, message.to_string())
                .with_sentiment(sentiment),
        )
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?;

    let kind = AgentKind::resolve(authed.user.user_type, body.task_type.as_deref());
    let request = AgentRequest {
        user_id: authed.user.id.clone(),
        user_type: authed.user.user_type,
        message: message.to_string(),
        task_type: body.task_type,
    };
    let response = dispatch(kind, &request, &context, llm).await;

    messages
        .append(AgentMessage::new(
            authed.user.id.clone(),
            MessageRole::Assistant,
            response.content.clone(),
        ))
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?;

    tracing::info!(
        event_name = "api.agent.chat",
        correlation_id = %request_id,
        user_id = %authed.user.id.0,
        agent_kind = kind.as_str(),
        sentiment = sentiment.as_str(),
        "agent chat turn completed"
    );

    Ok(Json(ChatResponse {
        agent: kind.as_str(),
        content: response.content,
        suggestions: response.suggestions,
        actions: response.actions,
        insights: response.insights,
        confidence: response.confidence,
        sentiment,
    }))
}

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CreateGoalRequest {
    description: Option<String>,
    due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateGoalRequest {
    description: Option<String>,
    due_date: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoalProgressRequest {
    progress_pct: Option<u8>,
}

fn require_goal_access(authed: &AuthedUser, request_id: &str) -> Result<(), ApiError> {
    if permissions::has_permission(authed.user.user_type, permissions::GOALS) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "this role does not track co-founder goals",
            request_id.to_string(),
        ))
    }
}

fn owns_goal(authed: &AuthedUser, goal: &CoFounderGoal) -> bool {
    goal.owner_id == authed.user.id
        || permissions::has_permission(authed.user.user_type, permissions::ADMIN_ALL)
}

fn parse_due_date(
    raw: Option<&str>,
    fields: &mut BTreeMap<String, String>,
) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(value) => Some(value.with_timezone(&Utc)),
        Err(_) => {
            fields.insert("due_date".to_string(), "must be an RFC 3339 timestamp".to_string());
            None
        }
    }
}

fn validate_description(
    raw: Option<&str>,
    fields: &mut BTreeMap<String, String>,
) -> Option<String> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        fields.insert("description".to_string(), "required".to_string());
        None
    } else if trimmed.len() > MAX_DESCRIPTION_LEN {
        fields.insert(
            "description".to_string(),
            format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
        );
        None
    } else {
        Some(trimmed.to_string())
    }
}

async fn create_goal(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<CoFounderGoal>), ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_goal_access(&authed, &request_id)?;

    let mut fields = BTreeMap::new();
    let description = validate_description(body.description.as_deref(), &mut fields);
    let due_date = parse_due_date(body.due_date.as_deref(), &mut fields);
    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let goal = CoFounderGoal::new(
        authed.user.id.clone(),
        description.expect("validated above"),
        due_date,
    );
    SqlGoalRepository::new(ctx.db_pool.clone())
        .create(goal.clone())
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;

    Ok((StatusCode::CREATED, Json(goal)))
}

async fn list_goals(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Vec<CoFounderGoal>>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_goal_access(&authed, &request_id)?;

    let goals = SqlGoalRepository::new(ctx.db_pool.clone())
        .list_for_owner(&authed.user.id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;
    Ok(Json(goals))
}

async fn update_goal(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateGoalRequest>,
) -> Result<Json<CoFounderGoal>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_goal_access(&authed, &request_id)?;

    let repo = SqlGoalRepository::new(ctx.db_pool.clone());
    let id = GoalId(id);
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("goal", request_id.clone()))?;
    if !owns_goal(&authed, &existing) {
        return Err(ApiError::forbidden("only the owner can modify this goal", request_id));
    }

    let mut fields = BTreeMap::new();
    if let Some(description) = body.description.as_deref() {
        if description.trim().is_empty() {
            fields.insert("description".to_string(), "must not be empty".to_string());
        }
    }
    let due_date = parse_due_date(body.due_date.as_deref(), &mut fields);
    let status = match body.status.as_deref() {
        None => None,
        Some(raw) => match GoalStatus::parse(raw) {
            Some(parsed) => Some(parsed),
            None => {
                fields.insert("status".to_string(), "unknown status".to_string());
                None
            }
        },
    };
    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let patch = GoalPatch {
        description: body.description.map(|value| value.trim().to_string()),
        due_date,
        status,
    };
    let updated = repo
        .update(&id, patch)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("goal", request_id))?;
    Ok(Json(updated))
}

async fn set_goal_progress(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<GoalProgressRequest>,
) -> Result<Json<CoFounderGoal>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_goal_access(&authed, &request_id)?;

    let Some(progress_pct) = body.progress_pct else {
        let mut fields = BTreeMap::new();
        fields.insert("progress_pct".to_string(), "required".to_string());
        return Err(ApiError::validation(fields, request_id));
    };

    let repo = SqlGoalRepository::new(ctx.db_pool.clone());
    let id = GoalId(id);
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("goal", request_id.clone()))?;
    if !owns_goal(&authed, &existing) {
        return Err(ApiError::forbidden("only the owner can modify this goal", request_id));
    }

    let updated = repo
        .set_progress(&id, progress_pct)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("goal", request_id))?;
    Ok(Json(updated))
}

async fn delete_goal(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_goal_access(&authed, &request_id)?;

    let repo = SqlGoalRepository::new(ctx.db_pool.clone());
    let id = GoalId(id);
    match repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
    {
        Some(existing) if !owns_goal(&authed, &existing) => {
            return Err(ApiError::forbidden("only the owner can delete this goal", request_id));
        }
        _ => {}
    }

    let deleted = repo
        .delete(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;
    Ok(Json(json!({ "deleted": deleted })))
}

// ---------------------------------------------------------------------------
// Commitments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CreateCommitmentRequest {
    description: Option<String>,
    due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateCommitmentRequest {
    description: Option<String>,
    due_date: Option<String>,
    status: Option<String>,
}

fn require_commitment_access(authed: &AuthedUser, request_id: &str) -> Result<(), ApiError> {
    if permissions::has_permission(authed.user.user_type, permissions::COMMITMENTS) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "this role does not track co-founder commitments",
            request_id.to_string(),
        ))
    }
}

fn owns_commitment(authed: &AuthedUser, commitment: &CoFounderCommitment) -> bool {
    commitment.owner_id == authed.user.id
        || permissions::has_permission(authed.user.user_type, permissions::ADMIN_ALL)
}

async fn create_commitment(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<CreateCommitmentRequest>,
) -> Result<(StatusCode, Json<CoFounderCommitment>), ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_commitment_access(&authed, &request_id)?;

    let mut fields = BTreeMap::new();
    let description = validate_description(body.description.as_deref(), &mut fields);
    let due_date = match body.due_date.as_deref() {
        None => {
            fields.insert("due_date".to_string(), "required".to_string());
            None
        }
        raw => parse_due_date(raw, &mut fields),
    };
    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let commitment = CoFounderCommitment::new(
        authed.user.id.clone(),
        description.expect("validated above"),
        due_date.expect("validated above"),
    );
    SqlCommitmentRepository::new(ctx.db_pool.clone())
        .create(commitment.clone())
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;

    Ok((StatusCode::CREATED, Json(commitment)))
}

async fn list_commitments(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<Vec<CoFounderCommitment>>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_commitment_access(&authed, &request_id)?;

    let commitments = SqlCommitmentRepository::new(ctx.db_pool.clone())
        .list_for_owner(&authed.user.id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id))?;
    Ok(Json(commitments))
}

async fn update_commitment(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateCommitmentRequest>,
) -> Result<Json<CoFounderCommitment>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_commitment_access(&authed, &request_id)?;

    let repo = SqlCommitmentRepository::new(ctx.db_pool.clone());
    let id = CommitmentId(id);
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("commitment", request_id.clone()))?;
    if !owns_commitment(&authed, &existing) {
        return Err(ApiError::forbidden(
            "only the owner can modify this commitment",
            request_id,
        ));
    }

    let mut fields = BTreeMap::new();
    if let Some(description) = body.description.as_deref() {
        if description.trim().is_empty() {
            fields.insert("description".to_string(), "must not be empty".to_string());
        }
    }
    let due_date = parse_due_date(body.due_date.as_deref(), &mut fields);
    let status = match body.status.as_deref() {
        None => None,
        Some(raw) => match CommitmentStatus::parse(raw) {
            Some(parsed) => Some(parsed),
            None => {
                fields.insert("status".to_string(), "unknown status".to_string());
                None
            }
        },
    };
    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let patch = CommitmentPatch {
        description: body.description.map(|value| value.trim().to_string()),
        due_date,
        status,
    };
    let updated = repo
        .update(&id, patch)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("commitment", request_id))?;
    Ok(Json(updated))
}

async fn delete_commitment(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    require_commitment_access(&authed, &request_id)?;

    let repo = SqlCommitmentRepository::new(ctx.db_pool.clone());
    let id = CommitmentId(id);
    match repo
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
    {
        Some(existing) if !owns_commitment(&authed, &existing) => {
            return Err(ApiError::forbidden(
                "only the owner can delete this commitment",
                request_id,
            ));
        }
        _ => {}
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
    async fn chat_answers_with_the_entrepreneur_default_advisor() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/agent/chat",
                json!({ "message": "Where should I focus this week?" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        assert_eq!(body["agent"], "venture_coach");
        assert!(!body["content"].as_str().unwrap_or_default().is_empty());
        assert!(body["confidence"].as_f64().unwrap_or_default() > 0.0);
    }

    #[tokio::test]
    async fn co_founder_task_type_reroutes_the_chat() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/agent/chat",
                json!({ "message": "keep me honest", "task_type": "co_founder_checkin" }),
            ))
            .await
            .expect("response");
        let body = body_json(response).await;
        assert_eq!(body["agent"], "co_founder");
    }

    #[tokio::test]
    async fn empty_chat_message_is_a_validation_error() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .oneshot(json_request("POST", "/api/agent/chat", json!({ "message": "  " })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["fields"]["message"], "required");
    }

    #[tokio::test]
    async fn chat_turns_are_recorded_and_fed_back_as_context() {
        let ctx = test_context().await;
        let pool = ctx.db_pool.clone();
        let app = router(ctx);

        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/agent/chat",
                json!({ "message": "We lost our biggest customer" }),
            ))
            .await
            .expect("response");

        let message_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM agent_messages")
            .fetch_one(&pool)
            .await
            .expect("count messages");
        assert_eq!(message_count, 2, "user turn and assistant turn are both recorded");

        let sentiment: Option<String> = sqlx::query_scalar(
            "SELECT sentiment FROM agent_messages WHERE role = 'user' LIMIT 1",
        )
        .fetch_one(&pool)
        .await
        .expect("read sentiment");
        assert_eq!(sentiment.as_deref(), Some("negative"));
    }

    #[tokio::test]
    async fn goal_without_description_is_a_400_not_a_500() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .oneshot(json_request("POST", "/api/agent/goals", json!({})))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["fields"]["description"], "required");
    }

    #[tokio::test]
    async fn goal_lifecycle_create_progress_complete() {
        let ctx = test_context().await;
        let app = router(ctx);

        let created = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/api/agent/goals",
                    json!({ "description": "Close three pilot customers" }),
                ))
                .await
                .expect("response"),
        )
        .await;
        let id = created["id"].as_str().expect("id").to_string();
        assert_eq!(created["status"], "active");
        assert_eq!(created["progress_pct"], 0);

        let progressed = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    &format!("/api/agent/goals/{id}/progress"),
                    json!({ "progress_pct": 65 }),
                ))
                .await
                .expect("response"),
        )
        .await;
        assert_eq!(progressed["progress_pct"], 65);

        let completed = body_json(
            app.oneshot(json_request(
                "PATCH",
                &format!("/api/agent/goals/{id}"),
                json!({ "status": "completed" }),
            ))
            .await
            .expect("response"),
        )
        .await;
        assert_eq!(completed["status"], "completed");
    }

    #[tokio::test]
    async fn overflowing_progress_is_rejected_as_bad_request() {
        let ctx = test_context().await;
        let app = router(ctx);

        let created = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/api/agent/goals",
                    json!({ "description": "Ship the beta" }),
                ))
                .await
                .expect("response"),
        )
        .await;
        let id = created["id"].as_str().expect("id");

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/agent/goals/{id}/progress"),
                json!({ "progress_pct": 130 }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_a_missing_goal_reports_deleted_false() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/agent/goals/no-such-goal")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["deleted"], false);
    }

    #[tokio::test]
    async fn commitment_requires_a_due_date() {
        let ctx = test_context().await;
        let app = router(ctx);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/agent/commitments",
                json!({ "description": "Send the deck" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["fields"]["due_date"], "required");
    }

    #[tokio::test]
    async fn unsupported_domains_are_explicit_501s() {
        let ctx = test_context().await;
        let app = router(ctx);

        for path in ["/api/loans", "/api/portfolios", "/api/mentorships"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(
                response.status(),
                StatusCode::NOT_IMPLEMENTED,
                "{path} must be explicitly unimplemented"
            );
            let body = body_json(response).await;
            assert_eq!(body["error"], "This capability is not available yet.");
        }
    }
}
