//! HTTP dashboard.
//!
//! Every request reloads the dataset from the store and rescores it, so the page
//! always reflects the file on disk. Loads run on the blocking pool. Routes:
//!
//! - `GET /` - HTML dashboard, `POST /update` - manual update form
//! - `GET /api/summary`, `/api/leaderboard`, `/api/categories`, `/api/quality`, `/api/records`
//! - `POST /api/update` - manual update as JSON
//! - `GET /download` - current dataset as CSV
//! - `GET /health`

pub mod html;

use crate::error::MetricsError;
use crate::gscholar::AuthorLookup;
use crate::record::{Dataset, ScientistRecord};
use crate::report::{self, CategoryLabel, DashboardView, DataQuality, LeaderboardEntry, Summary};
use crate::scoring::ScoringConfig;
use crate::store::{dataset_to_export_csv, RecordStore};
use crate::update::{missing_candidates, update_missing_record, UpdateOutcome};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use html::Flash;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Filename offered for the CSV download
pub const EXPORT_FILENAME: &str = "iihr_research_performance.csv";

/// Shared state for all handlers
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub lookup: Arc<dyn AuthorLookup>,
    pub scoring: ScoringConfig,
}

impl AppState {
    async fn load_scored(&self) -> crate::Result<Dataset> {
        let store = Arc::clone(&self.store);
        let mut dataset = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| MetricsError::Io(std::io::Error::other(e)))??;
        dataset.refresh_scores(&self.scoring);
        Ok(dataset)
    }
}

/// Error response: JSON `{status: "error", message}` with a status derived from the error kind
#[derive(Debug)]
pub struct ApiError(MetricsError);

impl From<MetricsError> for ApiError {
    fn from(e: MetricsError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            MetricsError::Validation(_) => StatusCode::BAD_REQUEST,
            MetricsError::NotFound(_) => StatusCode::NOT_FOUND,
            MetricsError::Network(_)
            | MetricsError::Api { .. }
            | MetricsError::Captcha
            | MetricsError::RateLimited(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_user_error() {
            debug!(error = %self.0, "Rejected request");
        } else {
            error!(error = %self.0, "Request failed");
        }
        let body = Json(serde_json::json!({
            "status": "error",
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Build the dashboard router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/update", post(update_form_handler))
        .route("/download", get(download_handler))
        .route("/health", get(health_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/leaderboard", get(leaderboard_handler))
        .route("/api/categories", get(categories_handler))
        .route("/api/quality", get(quality_handler))
        .route("/api/records", get(records_handler))
        .route("/api/update", post(api_update_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the dashboard until the process stops
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Dashboard listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Flash message carried through the post/redirect/get cycle
#[derive(Debug, Default, Deserialize)]
struct FlashQuery {
    status: Option<String>,
    message: Option<String>,
}

impl FlashQuery {
    fn into_flash(self) -> Option<Flash> {
        let message = self.message?;
        match self.status.as_deref() {
            Some("ok") => Some(Flash::Success(message)),
            _ => Some(Flash::Error(message)),
        }
    }
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, ApiError> {
    let dataset = state.load_scored().await?;
    let view = DashboardView::build(&dataset);
    let candidates = missing_candidates(&dataset);
    let flash = flash.into_flash();
    Ok(Html(html::render_page(&view, &dataset, &candidates, flash.as_ref())))
}

/// Manual update request
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub name: String,
    #[serde(default)]
    pub link: String,
}

async fn run_update(state: &AppState, req: &UpdateRequest) -> crate::Result<UpdateOutcome> {
    let mut dataset = state.load_scored().await?;
    update_missing_record(
        state.store.as_ref(),
        state.lookup.as_ref(),
        &state.scoring,
        &mut dataset,
        &req.name,
        &req.link,
    )
    .await
}

async fn update_form_handler(
    State(state): State<Arc<AppState>>,
    Form(req): Form<UpdateRequest>,
) -> Redirect {
    let (status, message) = match run_update(&state, &req).await {
        Ok(outcome) => ("ok", outcome.message()),
        Err(MetricsError::Validation(msg)) => ("error", msg),
        Err(MetricsError::Api { message, .. }) => ("error", message),
        Err(e) => ("error", e.to_string()),
    };
    Redirect::to(&format!(
        "/?status={}&message={}",
        status,
        urlencoding::encode(&message)
    ))
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    status: &'static str,
    message: String,
    record: UpdateOutcome,
}

async fn api_update_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let outcome = run_update(&state, &req).await?;
    Ok(Json(UpdateResponse {
        status: "success",
        message: outcome.message(),
        record: outcome,
    }))
}

async fn download_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let dataset = state.load_scored().await?;
    let bytes = dataset_to_export_csv(&dataset)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn summary_handler(State(state): State<Arc<AppState>>) -> Result<Json<Summary>, ApiError> {
    let dataset = state.load_scored().await?;
    Ok(Json(report::summarize(&dataset)))
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let dataset = state.load_scored().await?;
    let limit = query.limit.unwrap_or(report::LEADERBOARD_SIZE);
    Ok(Json(report::leaderboard(&dataset, limit)))
}

#[derive(Debug, Serialize)]
struct CategoryCount {
    label: CategoryLabel,
    count: usize,
}

async fn categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryCount>>, ApiError> {
    let dataset = state.load_scored().await?;
    let counts = report::category_distribution(&dataset)
        .into_iter()
        .map(|(label, count)| CategoryCount { label, count })
        .collect();
    Ok(Json(counts))
}

async fn quality_handler(State(state): State<Arc<AppState>>) -> Result<Json<DataQuality>, ApiError> {
    let dataset = state.load_scored().await?;
    Ok(Json(report::data_quality(&dataset)))
}

async fn records_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ScientistRecord>>, ApiError> {
    let dataset = state.load_scored().await?;
    Ok(Json(dataset.records))
}
