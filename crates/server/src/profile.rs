//! Current-user profile: `GET /api/profile`, `PATCH /api/profile`.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cofoundry_core::domain::user::{User, UserPatch, UserType};
use cofoundry_core::permissions;

use cofoundry_db::repositories::{SqlUserRepository, UserRepository};

use crate::auth::authenticate;
use crate::bootstrap::AppContext;
use crate::errors::{correlation_id, ApiError};

const MAX_DISPLAY_NAME_LEN: usize = 80;

pub fn router(ctx: AppContext) -> Router {
    Router::new().route("/api/profile", get(fetch).patch(update)).with_state(ctx)
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    #[serde(flatten)]
    user: User,
    permissions: &'static [&'static str],
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    display_name: Option<String>,
    user_type: Option<String>,
    preferences: Option<Value>,
    metrics: Option<Value>,
    profile_complete: Option<bool>,
}

async fn fetch(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;
    let permissions = permissions::permissions_for(authed.user.user_type);
    Ok(Json(ProfileResponse { user: authed.user, permissions }))
}

async fn update(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let request_id = correlation_id();
    let authed = authenticate(&ctx, &headers, &request_id).await?;

    let mut fields = BTreeMap::new();
    if let Some(display_name) = body.display_name.as_deref() {
        if display_name.trim().is_empty() {
            fields.insert("display_name".to_string(), "must not be empty".to_string());
        } else if display_name.len() > MAX_DISPLAY_NAME_LEN {
            fields.insert(
                "display_name".to_string(),
                format!("must be at most {MAX_DISPLAY_NAME_LEN} characters"),
            );
        }
    }

    let user_type = match body.user_type.as_deref() {
        None => None,
        Some(raw) => match UserType::parse(raw) {
            Some(UserType::Admin) if authed.user.user_type != UserType::Admin => {
                fields.insert("user_type".to_string(), "cannot self-assign admin".to_string());
                None
            }
            Some(parsed) => Some(parsed),
            None => {
                fields.insert("user_type".to_string(), "unknown type".to_string());
                None
            }
        },
    };

    if !fields.is_empty() {
        return Err(ApiError::validation(fields, request_id));
    }

    let patch = UserPatch {
        display_name: body.display_name.map(|value| value.trim().to_string()),
        user_type,
        preferences: body.preferences,
        metrics: body.metrics,
        email_verified: None,
        profile_complete: body.profile_complete,
    };

    let updated = SqlUserRepository::new(ctx.db_pool.clone())
        .update(&authed.user.id, patch)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
        .ok_or_else(|| ApiError::not_found("profile", request_id))?;

    let permissions = permissions::permissions_for(updated.user_type);
    Ok(Json(ProfileResponse { user: updated, permissions }))
}
