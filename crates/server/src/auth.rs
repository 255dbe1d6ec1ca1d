//! Session-cookie auth boundary.
//!
//! Endpoints:
//! - `GET  /auth/{provider}/start`    — redirect to the provider authorize URL
//! - `GET  /auth/{provider}/callback` — code exchange, user upsert, session issue
//! - `POST /auth/logout`              — drop the session
//!
//! The OAuth `state` parameter is HMAC-signed (`provider:nonce`) so the
//! callback only accepts states this process issued. A development-only
//! bypass injects a fixed mock entrepreneur for sessionless requests;
//! configuration validation refuses that flag outside development.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::{Path, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use cofoundry_core::config::AuthConfig;
use cofoundry_core::domain::session::Session;
use cofoundry_core::domain::user::{User, UserId, UserType};
use cofoundry_core::signing::generate_token;

use cofoundry_db::repositories::{
    SessionRepository, SqlSessionRepository, SqlUserRepository, UserRepository,
};

use crate::bootstrap::AppContext;
use crate::errors::{correlation_id, ApiError};

pub const SESSION_COOKIE: &str = "cofoundry_session";
const DEV_BYPASS_USER_ID: &str = "user-dev-bypass";
const STATE_NONCE_LEN: usize = 24;

pub struct AuthedUser {
    pub user: User,
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/auth/{provider}/start", get(start))
        .route("/auth/{provider}/callback", get(callback))
        .route("/auth/logout", post(logout))
        .with_state(ctx)
}

/// Resolves the request's session to a user, or the dev-bypass mock user
/// when enabled. Everything else is a 401.
pub async fn authenticate(
    ctx: &AppContext,
    headers: &HeaderMap,
    correlation_id: &str,
) -> Result<AuthedUser, ApiError> {
    if let Some(authed) = session_user(ctx, headers).await? {
        return Ok(authed);
    }

    if ctx.config.auth.dev_bypass {
        return Ok(AuthedUser { user: dev_bypass_user(ctx, correlation_id).await? });
    }

    Err(ApiError::unauthorized(correlation_id.to_string()))
}

/// Like [`authenticate`] but anonymous requests are `None` instead of 401.
/// Used where visibility rules distinguish signed-in from anonymous.
pub async fn maybe_authenticate(
    ctx: &AppContext,
    headers: &HeaderMap,
    correlation_id: &str,
) -> Result<Option<AuthedUser>, ApiError> {
    if let Some(authed) = session_user(ctx, headers).await? {
        return Ok(Some(authed));
    }
    if ctx.config.auth.dev_bypass {
        return Ok(Some(AuthedUser { user: dev_bypass_user(ctx, correlation_id).await? }));
    }
    Ok(None)
}

async fn session_user(
    ctx: &AppContext,
    headers: &HeaderMap,
) -> Result<Option<AuthedUser>, ApiError> {
    let Some(token) = cookie_value(headers, SESSION_COOKIE) else {
        return Ok(None);
    };

    let sessions = SqlSessionRepository::new(ctx.db_pool.clone());
    let session = sessions
        .find_valid(&token, Utc::now())
        .await
        .map_err(|error| ApiError::from_repository(error, correlation_id()))?;
    let Some(session) = session else {
        return Ok(None);
    };

    let users = SqlUserRepository::new(ctx.db_pool.clone());
    let user = users
        .find_by_id(&session.user_id)
        .await
        .map_err(|error| ApiError::from_repository(error, correlation_id()))?;

    Ok(user.map(|user| AuthedUser { user }))
}

async fn dev_bypass_user(ctx: &AppContext, correlation_id: &str) -> Result<User, ApiError> {
    let users = SqlUserRepository::new(ctx.db_pool.clone());
    let id = UserId(DEV_BYPASS_USER_ID.to_string());

    if let Some(user) = users
        .find_by_id(&id)
        .await
        .map_err(|error| ApiError::from_repository(error, correlation_id.to_string()))?
    {
        return Ok(user);
    }

    let mut user = User::new(
        "dev@cofoundry.local".to_string(),
        "Dev Founder".to_string(),
        UserType::Entrepreneur,
    );
    user.id = id;
    user.email_verified = true;
    user.profile_complete = true;

    users
        .create(user.clone())
        .await
        .map_err(|error| ApiError::from_repository(error, correlation_id.to_string()))?;
    info!(
        event_name = "auth.dev_bypass.user_created",
        correlation_id = correlation_id,
        "created the development bypass user"
    );
    Ok(user)
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

// ---------------------------------------------------------------------------
// OAuth providers
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AuthProvider {
    Google,
    AzureAd,
}

impl AuthProvider {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "google" => Some(Self::Google),
            "azure" | "azure_ad" => Some(Self::AzureAd),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::AzureAd => "azure",
        }
    }

    fn credentials<'a>(&self, config: &'a AuthConfig) -> Option<(&'a str, String)> {
        match self {
            Self::Google => match (&config.google_client_id, &config.google_client_secret) {
                (Some(id), Some(secret)) => {
                    Some((id.as_str(), secret.expose_secret().to_string()))
                }
                _ => None,
            },
            Self::AzureAd => match (&config.azure_client_id, &config.azure_client_secret) {
                (Some(id), Some(secret)) => {
                    Some((id.as_str(), secret.expose_secret().to_string()))
                }
                _ => None,
            },
        }
    }

    fn redirect_uri(&self, config: &AuthConfig) -> Option<String> {
        let base = config.callback_base_url.as_deref()?.trim_end_matches('/');
        Some(format!("{base}/auth/{}/callback", self.as_str()))
    }

    fn authorize_url(&self, config: &AuthConfig, state: &str) -> Option<String> {
        let (client_id, _) = self.credentials(config)?;
        let redirect_uri = url_encode(&self.redirect_uri(config)?);
        let state = url_encode(state);

        Some(match self {
            Self::Google => format!(
                "https://accounts.google.com/o/oauth2/v2/auth\
                 ?client_id={client_id}&redirect_uri={redirect_uri}\
                 &response_type=code&scope=openid%20email%20profile&state={state}"
            ),
            Self::AzureAd => {
                let tenant = config.azure_tenant.as_deref().unwrap_or("common");
                format!(
                    "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize\
                     ?client_id={client_id}&redirect_uri={redirect_uri}\
                     &response_type=code&scope=openid%20email%20profile&state={state}"
                )
            }
        })
    }

    fn token_url(&self, config: &AuthConfig) -> String {
        match self {
            Self::Google => "https://oauth2.googleapis.com/token".to_string(),
            Self::AzureAd => {
                let tenant = config.azure_tenant.as_deref().unwrap_or("common");
                format!("https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token")
            }
        }
    }

    fn userinfo_url(&self) -> &'static str {
        match self {
            Self::Google => "https://openidconnect.googleapis.com/v1/userinfo",
            Self::AzureAd => "https://graph.microsoft.com/oidc/userinfo",
        }
    }
}

fn url_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
}

async fn start(
    State(ctx): State<AppContext>,
    Path(provider): Path<String>,
) -> Result<Redirect, ApiError> {
    let request_id = correlation_id();
    let provider = AuthProvider::parse(&provider)
        .ok_or_else(|| ApiError::bad_request("unknown auth provider", request_id.clone()))?;

    let nonce = generate_token(STATE_NONCE_LEN);
    let state = ctx.signer.sign(&format!("{}:{nonce}", provider.as_str()));

    let url = provider
        .authorize_url(&ctx.config.auth, &state)
        .ok_or_else(|| ApiError::bad_request("auth provider is not configured", request_id))?;

    Ok(Redirect::temporary(&url))
}

async fn callback(
    State(ctx): State<AppContext>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = correlation_id();
    let provider = AuthProvider::parse(&provider)
        .ok_or_else(|| ApiError::bad_request("unknown auth provider", request_id.clone()))?;

    if let Some(error) = query.error {
        warn!(
            event_name = "auth.oauth.provider_error",
            correlation_id = %request_id,
            provider = provider.as_str(),
            error = %error,
            "provider reported an authorization error"
        );
        return Err(ApiError::bad_request("authorization was not granted", request_id));
    }

    let state = query
        .state
        .ok_or_else(|| ApiError::bad_request("missing state parameter", request_id.clone()))?;
    let payload = ctx
        .signer
        .verify(&state)
        .ok_or_else(|| ApiError::bad_request("state signature mismatch", request_id.clone()))?;
    if payload.split(':').next() != Some(provider.as_str()) {
        return Err(ApiError::bad_request("state issued for another provider", request_id));
    }

    let code = query
        .code
        .ok_or_else(|| ApiError::bad_request("missing authorization code", request_id.clone()))?;

    let (client_id, client_secret) = provider
        .credentials(&ctx.config.auth)
        .ok_or_else(|| ApiError::bad_request("auth provider is not configured", request_id.clone()))?;
    let redirect_uri = provider
        .redirect_uri(&ctx.config.auth)
        .ok_or_else(|| ApiError::bad_request("auth provider is not configured", request_id.clone()))?;

    let token: TokenResponse = ctx
        .http
        .post(provider.token_url(&ctx.config.auth))
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret.as_str()),
            ("code", code.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|error| {
            warn!(
                event_name = "auth.oauth.token_exchange_failed",
                correlation_id = %request_id,
                provider = provider.as_str(),
                error = %error,
                "token exchange failed"
            );
            ApiError::internal("token exchange failed", request_id.clone())
        })?
        .json()
        .await
        .map_err(|_| ApiError::internal("malformed token response", request_id.clone()))?;

    let info: UserInfo = ctx
        .http
        .get(provider.userinfo_url())
        .bearer_auth(&token.access_token)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|_| ApiError::internal("userinfo request failed", request_id.clone()))?
        .json()
        .await
        .map_err(|_| ApiError::internal("malformed userinfo response", request_id.clone()))?;

    let email = info
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("provider returned no email", request_id.clone()))?;

    let users = SqlUserRepository::new(ctx.db_pool.clone());
    let user = match users
        .find_by_email(&email)
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?
    {
        Some(user) => user,
        None => {
            let display_name =
                info.name.filter(|name| !name.trim().is_empty()).unwrap_or_else(|| email.clone());
            let mut user = User::new(email.clone(), display_name, UserType::Entrepreneur);
            user.email_verified = true;
            users
                .create(user.clone())
                .await
                .map_err(|error| ApiError::from_repository(error, request_id.clone()))?;
            info!(
                event_name = "auth.oauth.user_created",
                correlation_id = %request_id,
                provider = provider.as_str(),
                user_id = %user.id.0,
                "provisioned a new user from the oauth callback"
            );
            user
        }
    };

    let session = Session::issue(user.id.clone(), ctx.config.auth.session_ttl_hours);
    SqlSessionRepository::new(ctx.db_pool.clone())
        .create(session.clone())
        .await
        .map_err(|error| ApiError::from_repository(error, request_id.clone()))?;

    info!(
        event_name = "auth.session.issued",
        correlation_id = %request_id,
        provider = provider.as_str(),
        user_id = %user.id.0,
        "session issued"
    );

    let cookie =
        format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", session.token);
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/portal")))
}

async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = correlation_id();
    if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
        SqlSessionRepository::new(ctx.db_pool.clone())
            .delete(&token)
            .await
            .map_err(|error| ApiError::from_repository(error, request_id))?;
    }

    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/portal")))
}

// ---------------------------------------------------------------------------
// Chat rate limiting
// ---------------------------------------------------------------------------

/// Sliding-window limiter keyed by user id, applied to `/api/agent/chat`.
pub struct ChatRateLimiter {
    window: Duration,
    limit: u32,
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl ChatRateLimiter {
    pub fn per_minute(limit: u32) -> Self {
        Self { window: Duration::from_secs(60), limit: limit.max(1), requests: Mutex::new(HashMap::new()) }
    }

    /// `Ok(remaining)` records the request; `Err(retry_after_secs)` rejects it.
    pub async fn check(&self, key: &str) -> Result<u32, u32> {
        let now = Instant::now();
        let mut requests = self.requests.lock().await;
        let timestamps = requests.entry(key.to_string()).or_default();
        timestamps.retain(|instant| now.duration_since(*instant) < self.window);

        if timestamps.len() as u32 >= self.limit {
            return Err(self.window.as_secs() as u32);
        }

        timestamps.push(now);
        Ok(self.limit - timestamps.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::COOKIE;
    use axum::http::HeaderMap;

    use cofoundry_core::config::AppConfig;
    use cofoundry_core::signing::StateSigner;

    use super::{cookie_value, AuthProvider, ChatRateLimiter, SESSION_COOKIE};

    #[test]
    fn cookie_parsing_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("theme=dark; {SESSION_COOKIE}=tok123; lang=en").parse().expect("header"),
        );
        assert_eq!(cookie_value(&headers, SESSION_COOKIE), Some("tok123".to_string()));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn authorize_url_carries_client_id_and_signed_state() {
        let mut config = AppConfig::default().auth;
        config.google_client_id = Some("google-client".to_string());
        config.google_client_secret = Some("google-secret".to_string().into());
        config.callback_base_url = Some("https://app.cofoundry.example".to_string());

        let signer = StateSigner::new("secret");
        let state = signer.sign("google:nonce");
        let url = AuthProvider::Google.authorize_url(&config, &state).expect("authorize url");

        assert!(url.contains("client_id=google-client"));
        assert!(url.contains("accounts.google.com"));
        assert!(url.contains("auth%2Fgoogle%2Fcallback"));
    }

    #[test]
    fn azure_tenant_defaults_to_common() {
        let mut config = AppConfig::default().auth;
        config.azure_client_id = Some("azure-client".to_string());
        config.azure_client_secret = Some("azure-secret".to_string().into());
        config.callback_base_url = Some("https://app.cofoundry.example".to_string());

        assert!(AuthProvider::AzureAd.token_url(&config).contains("/common/"));
        config.azure_tenant = Some("contoso".to_string());
        assert!(AuthProvider::AzureAd.token_url(&config).contains("/contoso/"));
    }

    #[test]
    fn provider_parsing_accepts_aliases() {
        assert_eq!(AuthProvider::parse("google"), Some(AuthProvider::Google));
        assert_eq!(AuthProvider::parse("azure_ad"), Some(AuthProvider::AzureAd));
        assert_eq!(AuthProvider::parse("github"), None);
    }

    #[tokio::test]
    async fn rate_limiter_rejects_after_the_window_fills() {
        let limiter = ChatRateLimiter::per_minute(2);

        assert_eq!(limiter.check("user-1").await, Ok(1));
        assert_eq!(limiter.check("user-1").await, Ok(0));
        assert!(limiter.check("user-1").await.is_err());
        // Another user has an independent window.
        assert_eq!(limiter.check("user-2").await, Ok(1));
    }
}
