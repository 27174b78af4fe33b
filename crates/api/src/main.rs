use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bazaar_core::domain::market::AnalysisSnapshot;
use bazaar_core::llm::error::{AnalysisError, ErrorKind};
use bazaar_core::llm::gemini::GeminiClient;
use bazaar_core::llm::LlmClient;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod dashboard;

use dashboard::{Dashboard, DashboardView, ErrorView, RefreshError};

type AppState = Arc<Dashboard>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = bazaar_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let llm: Result<Arc<dyn LlmClient>, AnalysisError> = match GeminiClient::from_settings(&settings)
    {
        Ok(client) => {
            tracing::info!(model = client.model(), "gemini client ready");
            Ok(Arc::new(client) as Arc<dyn LlmClient>)
        }
        Err(e) => {
            sentry::capture_error(&e);
            tracing::error!(error = %e, "gemini client unavailable; starting API in degraded mode");
            Err(e)
        }
    };

    let state: AppState = Arc::new(Dashboard::new(llm));

    // Initial load, same as the first render of the dashboard.
    tokio::spawn({
        let state = state.clone();
        async move {
            if let Err(err) = state.refresh().await {
                report_refresh_error(&err);
            }
        }
    });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/analysis", get(get_analysis))
        .route("/analysis/refresh", post(post_refresh))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_analysis(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.view().await)
}

async fn post_refresh(State(state): State<AppState>) -> Result<Json<AnalysisSnapshot>, RefreshError> {
    let snapshot = state.refresh().await.inspect_err(report_refresh_error)?;
    tracing::info!(
        fetch_id = %snapshot.fetch_id,
        prices = snapshot.result.prices.len(),
        strategies = snapshot.result.strategies.len(),
        sources = snapshot.result.sources.len(),
        "analysis refreshed"
    );
    Ok(Json(snapshot))
}

impl IntoResponse for RefreshError {
    fn into_response(self) -> Response {
        match self {
            RefreshError::Busy => (
                StatusCode::CONFLICT,
                Json(json!({
                    "kind": "BUSY",
                    "message": "در حال دریافت اطلاعات هستیم. لطفا صبر کنید.",
                })),
            )
                .into_response(),
            RefreshError::Failed(err) => {
                let view = ErrorView::from(&err);
                (dashboard::status_for(view.kind), Json(view)).into_response()
            }
        }
    }
}

fn report_refresh_error(err: &RefreshError) {
    match err {
        RefreshError::Busy => tracing::debug!("refresh rejected; fetch already in flight"),
        RefreshError::Failed(e) => {
            // Quota exhaustion is expected on the free tier; keep it out of Sentry.
            if e.kind() != ErrorKind::RateLimited {
                sentry::capture_error(e);
            }
            tracing::error!(kind = ?e.kind(), error = %e, "analysis refresh failed");
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &bazaar_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
