use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alfred_core::dashboard::{Dashboard, DashboardView, LoadSource, LoadedPayload, Notice};
use alfred_core::domain::recommendation::Mode;
use alfred_core::engine::{CategoryFilter, FilterCriteria, SearchScope};
use alfred_core::error::DashboardError;
use alfred_core::execution::{ActionExecutor, ExecutionReceipt, SimulatedExecutor};
use alfred_core::export::CsvColumns;
use alfred_core::ingest::{HttpPayloadSource, PayloadSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = alfred_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let source: Option<Arc<dyn PayloadSource>> = match HttpPayloadSource::from_settings(&settings) {
        Ok(source) => Some(Arc::new(source)),
        Err(e) => {
            tracing::warn!(error = %e, "remote endpoint not configured; only uploads are available");
            None
        }
    };

    let state = AppState {
        dashboard: Arc::new(RwLock::new(Dashboard::new())),
        source,
        executor: Arc::new(SimulatedExecutor::new(settings.simulated_delay)),
        default_mode: settings.default_mode,
    };

    let app = router(state);

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

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/dashboard", get(get_dashboard))
        .route("/notice", get(get_notice))
        .route("/refresh", post(refresh))
        .route("/upload", post(upload))
        .route("/export.csv", get(export_csv))
        .route("/actions", post(run_actions))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    dashboard: Arc<RwLock<Dashboard>>,
    source: Option<Arc<dyn PayloadSource>>,
    executor: Arc<dyn ActionExecutor>,
    default_mode: Option<Mode>,
}

#[derive(Debug, Default, Deserialize)]
struct ViewParams {
    q: Option<String>,
    strategy: Option<String>,
    action: Option<String>,
    scope: Option<SearchScope>,
    columns: Option<CsvColumns>,
    mode: Option<Mode>,
}

impl ViewParams {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::default()
            .query(self.q.clone().unwrap_or_default())
            .strategy(CategoryFilter::parse(self.strategy.as_deref()))
            .price_action(CategoryFilter::parse(self.action.as_deref()))
            .scope(self.scope.unwrap_or_default())
    }
}

#[derive(Debug, Serialize)]
struct LoadResult {
    run_id: Option<String>,
    sku_count: Option<u64>,
    records: usize,
    source: LoadSource,
    loaded_at: DateTime<Utc>,
}

impl From<&LoadedPayload> for LoadResult {
    fn from(loaded: &LoadedPayload) -> Self {
        Self {
            run_id: loaded.payload.run_id.clone(),
            sku_count: loaded.payload.sku_count,
            records: loaded.payload.recommendations.len(),
            source: loaded.source.clone(),
            loaded_at: loaded.loaded_at,
        }
    }
}

#[derive(Debug)]
enum ApiError {
    Dashboard(DashboardError),
    NotLoaded,
    Unavailable(&'static str),
    Internal(anyhow::Error),
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        Self::Dashboard(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, error) = match self {
            Self::Dashboard(err) => {
                let status = match err {
                    DashboardError::Fetch(_) => StatusCode::BAD_GATEWAY,
                    DashboardError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
                    DashboardError::Busy => StatusCode::CONFLICT,
                };
                (status, err.kind(), err.to_string())
            }
            Self::NotLoaded => (
                StatusCode::NOT_FOUND,
                "not_loaded",
                "no recommendations loaded".to_string(),
            ),
            Self::Unavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                detail.to_string(),
            ),
            Self::Internal(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    format!("{err:#}"),
                )
            }
        };
        (status, Json(ErrorBody { kind, error })).into_response()
    }
}

async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<DashboardView>, ApiError> {
    let dashboard = state.dashboard.read().await;
    let view = dashboard
        .view(&params.criteria())
        .ok_or(ApiError::NotLoaded)?;
    Ok(Json(view))
}

async fn get_notice(State(state): State<AppState>) -> Json<Option<Notice>> {
    let dashboard = state.dashboard.read().await;
    Json(dashboard.notice().cloned())
}

async fn refresh(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<LoadResult>, ApiError> {
    let Some(source) = state.source.clone() else {
        return Err(ApiError::Unavailable("ALFRED_ENDPOINT_URL is not configured"));
    };
    let mode = params.mode.or(state.default_mode);

    // The lock is released while the request is in flight so reads keep working.
    state.dashboard.write().await.begin_fetch()?;
    let mut guard = FetchGuard::new(state.dashboard.clone());

    let result = source.fetch_payload(mode).await;

    let mut dashboard = state.dashboard.write().await;
    guard.disarm();
    let loaded = dashboard.finish_fetch(result, mode)?;

    Ok(Json(LoadResult::from(loaded.as_ref())))
}

/// Clears the fetch lock if the refresh future is dropped before it finishes, e.g. when the
/// client disconnects mid-request.
struct FetchGuard {
    dashboard: Arc<RwLock<Dashboard>>,
    armed: bool,
}

impl FetchGuard {
    fn new(dashboard: Arc<RwLock<Dashboard>>) -> Self {
        Self {
            dashboard,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!("refresh abandoned before completion; releasing fetch lock");

        if let Ok(mut dashboard) = self.dashboard.try_write() {
            dashboard.cancel_fetch();
            return;
        }
        let dashboard = self.dashboard.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    dashboard.write().await.cancel_fetch();
                });
            }
            Err(_) => {
                tracing::error!("no runtime to release fetch lock");
            }
        }
    }
}

async fn upload(State(state): State<AppState>, body: String) -> Result<Json<LoadResult>, ApiError> {
    let loaded = state
        .dashboard
        .write()
        .await
        .load_text(&body, LoadSource::Upload)?;
    Ok(Json(LoadResult::from(loaded.as_ref())))
}

async fn export_csv(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Response, ApiError> {
    let dashboard = state.dashboard.read().await;
    if dashboard.current().is_none() {
        return Err(ApiError::NotLoaded);
    }

    let columns = params.columns.unwrap_or_default();
    let Some(export) = dashboard.export(&params.criteria(), columns) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    Ok((
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}

async fn run_actions(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ExecutionReceipt>, ApiError> {
    let mode = params.mode.or(state.default_mode);
    let plan = state
        .dashboard
        .read()
        .await
        .action_plan(&params.criteria(), mode)
        .ok_or(ApiError::NotLoaded)?;

    let receipt = state
        .executor
        .execute_actions(&plan)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(receipt))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &alfred_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
