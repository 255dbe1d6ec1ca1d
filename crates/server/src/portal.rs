//! Read-only HTML dashboard.
//!
//! HTML Endpoints:
//! - `GET /portal` — organizations and currently-visible business plans

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tera::{Context, Tera};
use tracing::warn;

use cofoundry_db::repositories::{
    BusinessPlanRepository, OrganizationRepository, SqlBusinessPlanRepository,
    SqlOrganizationRepository,
};

use crate::auth::maybe_authenticate;
use crate::bootstrap::AppContext;
use crate::errors::correlation_id;

const PAGE_SIZE: u32 = 50;

#[derive(Clone)]
struct PortalState {
    ctx: AppContext,
    templates: Arc<Tera>,
}

/// Loads portal templates from the filesystem, with the embedded copies as a
/// fallback so the binary renders something from any working directory.
fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/portal/**/*") {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "Failed to load portal templates from filesystem, using empty Tera instance");
            Tera::default()
        }
    };

    tera.add_raw_template("index.html", include_str!("../../../templates/portal/index.html"))
        .ok();

    Arc::new(tera)
}

pub fn router(ctx: AppContext) -> Router {
    let templates = init_templates();
    Router::new()
        .route("/portal", get(index))
        .with_state(PortalState { ctx, templates })
}

async fn index(
    State(state): State<PortalState>,
    headers: HeaderMap,
) -> Result<Html<String>, StatusCode> {
    let request_id = correlation_id();
    let authed = maybe_authenticate(&state.ctx, &headers, &request_id).await.ok().flatten();
    let viewer_id = authed.as_ref().map(|a| a.user.id.clone());

    let organizations = SqlOrganizationRepository::new(state.ctx.db_pool.clone())
        .list(PAGE_SIZE, 0)
        .await
        .map_err(|error| {
            warn!(
                event_name = "portal.index.load_failed",
                correlation_id = %request_id,
                error = %error,
                "failed to load organizations for the portal"
            );
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    let plans = SqlBusinessPlanRepository::new(state.ctx.db_pool.clone())
        .list(PAGE_SIZE, 0)
        .await
        .map_err(|error| {
            warn!(
                event_name = "portal.index.load_failed",
                correlation_id = %request_id,
                error = %error,
                "failed to load business plans for the portal"
            );
            StatusCode::SERVICE_UNAVAILABLE
        })?;
    let visible_plans =
        plans.into_iter().filter(|plan| plan.can_view(viewer_id.as_ref())).collect::<Vec<_>>();

    let mut context = Context::new();
    context.insert("signed_in", &authed.is_some());
    context.insert(
        "viewer_name",
        &authed.as_ref().map(|a| a.user.display_name.clone()).unwrap_or_default(),
    );
    context.insert("organizations", &organizations);
    context.insert("plans", &visible_plans);

    state
        .templates
        .render("index.html", &context)
        .map(Html)
        .map_err(|error| {
            warn!(
                event_name = "portal.index.render_failed",
                correlation_id = %request_id,
                error = %error,
                "portal template rendering failed"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    use cofoundry_core::domain::business_plan::BusinessPlan;
    use cofoundry_core::domain::organization::Organization;
    use cofoundry_core::domain::user::{User, UserType};
    use cofoundry_db::repositories::{
        BusinessPlanRepository, OrganizationRepository, SqlBusinessPlanRepository,
        SqlOrganizationRepository, SqlUserRepository, UserRepository,
    };

    use crate::bootstrap::test_context;

    use super::router;

    #[tokio::test]
    async fn portal_renders_seeded_organizations() {
        let ctx = test_context().await;

        let owner = User::new(
            "founder@example.com".to_string(),
            "Dana".to_string(),
            UserType::Entrepreneur,
        );
        SqlUserRepository::new(ctx.db_pool.clone())
            .create(owner.clone())
            .await
            .expect("create owner");
        SqlOrganizationRepository::new(ctx.db_pool.clone())
            .create(Organization::new(
                "Northwind Labs".to_string(),
                UserType::Entrepreneur,
                owner.id.clone(),
            ))
            .await
            .expect("create organization");
        SqlBusinessPlanRepository::new(ctx.db_pool.clone())
            .create(BusinessPlan::new(
                owner.id.clone(),
                "Cold-chain expansion".to_string(),
                "logistics".to_string(),
            ))
            .await
            .expect("create plan");

        let app = router(ctx);
        let response = app
            .oneshot(Request::builder().uri("/portal").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let html = String::from_utf8(bytes.to_vec()).expect("utf8 body");
        assert!(html.contains("Northwind Labs"));
    }
}
