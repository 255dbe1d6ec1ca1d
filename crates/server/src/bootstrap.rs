use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tower_http::services::ServeDir;
use tracing::info;

use cofoundry_agent::llm::{LlmClient, OpenAiClient, RetryPolicy, RetryingClient};
use cofoundry_core::config::{AppConfig, ConfigError, LoadOptions};
use cofoundry_core::signing::StateSigner;
use cofoundry_db::repositories::{SessionRepository, SqlSessionRepository};
use cofoundry_db::{connect_with_settings, migrations, DbPool};
use secrecy::ExposeSecret;

use crate::auth::ChatRateLimiter;
use crate::{agents, auth, health, organizations, plans, portal, profile};

/// Shared state handed to every router.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db_pool: DbPool,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub signer: Arc<StateSigner>,
    pub http: reqwest::Client,
    pub chat_limiter: Arc<ChatRateLimiter>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client initialization failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<AppContext, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<AppContext, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    match SqlSessionRepository::new(db_pool.clone()).purge_expired(chrono::Utc::now()).await {
        Ok(purged) if purged > 0 => info!(
            event_name = "system.bootstrap.sessions_purged",
            correlation_id = "bootstrap",
            purged,
            "expired sessions removed"
        ),
        Ok(_) => {}
        Err(error) => tracing::warn!(
            event_name = "system.bootstrap.session_purge_failed",
            correlation_id = "bootstrap",
            error = %error,
            "expired-session purge failed, continuing startup"
        ),
    }

    let llm: Option<Arc<dyn LlmClient>> = OpenAiClient::from_config(&config.llm).map(|client| {
        let policy = RetryPolicy {
            max_retries: config.llm.max_retries,
            base_delay: Duration::from_millis(500),
        };
        Arc::new(RetryingClient::new(client, policy)) as Arc<dyn LlmClient>
    });
    info!(
        event_name = "system.bootstrap.llm_mode",
        correlation_id = "bootstrap",
        llm_mode = if llm.is_some() { "provider" } else { "canned_only" },
        "llm enrichment mode resolved"
    );

    let signer = Arc::new(StateSigner::new(config.auth.state_secret.expose_secret()));
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(BootstrapError::HttpClient)?;
    let chat_limiter =
        Arc::new(ChatRateLimiter::per_minute(config.auth.chat_rate_limit_per_minute));

    Ok(AppContext { config: Arc::new(config), db_pool, llm, signer, http, chat_limiter })
}

pub fn app_router(ctx: &AppContext) -> Router {
    Router::new()
        .merge(health::router(ctx.db_pool.clone()))
        .merge(auth::router(ctx.clone()))
        .merge(organizations::router(ctx.clone()))
        .merge(profile::router(ctx.clone()))
        .merge(plans::router(ctx.clone()))
        .merge(agents::router(ctx.clone()))
        .merge(portal::router(ctx.clone()))
        .nest_service("/static", ServeDir::new("static"))
}

/// In-memory context with the dev bypass on, for router tests.
#[cfg(test)]
pub(crate) async fn test_context() -> AppContext {
    use cofoundry_core::config::{ConfigOverrides, LoadOptions};

    // Unique named shared-memory database per test so the pool's connections
    // agree on the data while tests stay isolated from each other.
    let database_url = format!(
        "sqlite://file:server-test-{}?mode=memory&cache=shared",
        uuid::Uuid::new_v4()
    );
    let config = cofoundry_core::config::AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            database_url: Some(database_url),
            dev_bypass: Some(true),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    })
    .expect("test config should validate");

    let mut ctx = bootstrap_with_config(config).await.expect("test bootstrap");
    ctx.llm = None;
    ctx
}

#[cfg(test)]
mod tests {
    use cofoundry_core::config::{ConfigOverrides, Environment, LoadOptions};

    use crate::bootstrap::{app_router, bootstrap};

    fn memory_overrides() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_config() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                environment: Some(Environment::Production),
                dev_bypass: Some(true),
                state_secret: Some("unique-production-secret".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("bootstrap should fail").to_string();
        assert!(message.contains("dev_bypass"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_builds_the_router() {
        let ctx = bootstrap(memory_overrides()).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('users', 'organizations', 'business_plans', \
             'cofounder_goals', 'cofounder_commitments', 'agent_messages', 'sessions')",
        )
        .fetch_one(&ctx.db_pool)
        .await
        .expect("foundation tables should exist after bootstrap");
        assert_eq!(table_count, 7);

        let _router = app_router(&ctx);
        ctx.db_pool.close().await;
    }
}
