//! HTTP adapter for dashboards: summaries, CSV download, email sharing.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregate::AggregationResult;
use crate::config::AppConfig;
use crate::export::to_delimited;
use crate::filter::{select, DateRange, FilterCriteria};
use crate::ingest::cache::DatasetCache;
use crate::ingest::types::{Dataset, RetrievalError, RowSource, Tonality};
use crate::notify::{EmailRequest, NotificationDispatcher, SendError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<DatasetCache>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    pub fn new(config: AppConfig, source: Arc<dyn RowSource>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(DatasetCache::new(source)),
            dispatcher: Arc::new(dispatcher),
        }
    }

    async fn dataset(&self) -> Result<Dataset, ApiError> {
        Ok(self.cache.load(&self.config.retrieval_key()).await?)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/mentions/sources", get(list_sources))
        .route("/mentions/summary", get(summary))
        .route("/mentions/export.csv", get(export_csv))
        .route("/mentions/share", post(share))
        .route("/admin/reload", post(admin_reload))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Retrieval(_) => StatusCode::BAD_GATEWAY,
            ApiError::Send(SendError::TransportError(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Send(_) => StatusCode::BAD_REQUEST,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Filter selection as it arrives from the UI. Lists are comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub sources: Option<String>,
    #[serde(default)]
    pub tonalities: Option<String>,
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_date(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("`{field}` must be YYYY-MM-DD, got `{s}`"))),
    }
}

impl FilterQuery {
    /// Missing bounds default to the dataset's own date span.
    pub fn to_criteria(&self, dataset: &Dataset) -> Result<FilterCriteria, ApiError> {
        let fallback = DateRange::default_for(dataset, Utc::now().date_naive());
        let start = parse_date(self.start.as_deref(), "start")?.unwrap_or(fallback.start);
        let end = parse_date(self.end.as_deref(), "end")?.unwrap_or(fallback.end);

        Ok(FilterCriteria::new(DateRange::new(start, end))
            .with_sources(split_list(self.sources.as_deref()))
            .with_tonalities(split_list(self.tonalities.as_deref()).map(Tonality::parse)))
    }
}

// serde_urlencoded does not parse numbers inside #[serde(flatten)] fields.
#[derive(Debug, Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    sources: Option<String>,
    #[serde(default)]
    tonalities: Option<String>,
    #[serde(default)]
    top_n: Option<usize>,
    #[serde(default)]
    recent_n: Option<usize>,
}

impl SummaryQuery {
    fn filter(&self) -> FilterQuery {
        FilterQuery {
            start: self.start.clone(),
            end: self.end.clone(),
            sources: self.sources.clone(),
            tonalities: self.tonalities.clone(),
        }
    }
}

#[derive(Serialize)]
struct SummaryResp {
    range: DateRange,
    #[serde(flatten)]
    result: AggregationResult,
}

async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.dataset().await?.distinct_sources()))
}

async fn summary(
    State(state): State<AppState>,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<SummaryResp>, ApiError> {
    let dataset = state.dataset().await?;
    let criteria = q.filter().to_criteria(&dataset)?;
    let view = select(&dataset, &criteria);

    let top_n = q.top_n.unwrap_or(state.config.top_n);
    let recent_n = q.recent_n.unwrap_or(state.config.recent_n);
    Ok(Json(SummaryResp {
        range: criteria.date_range,
        result: AggregationResult::compute(&view, top_n, recent_n),
    }))
}

async fn export_csv(
    State(state): State<AppState>,
    Query(q): Query<FilterQuery>,
) -> Result<Response, ApiError> {
    let dataset = state.dataset().await?;
    let criteria = q.to_criteria(&dataset)?;
    let bytes = to_delimited(&select(&dataset, &criteria))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        state.config.report_context().file_name()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct ShareReq {
    #[serde(default)]
    recipients: String,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    smtp_host: String,
    #[serde(default)]
    smtp_port: String,
    #[serde(default)]
    smtp_password: String,
    #[serde(flatten)]
    filter: FilterQuery,
}

async fn share(
    State(state): State<AppState>,
    Json(req): Json<ShareReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dataset = state.dataset().await?;
    let criteria = req.filter.to_criteria(&dataset)?;
    let view = select(&dataset, &criteria);
    let ctx = state.config.report_context();

    let email = EmailRequest {
        recipients: req.recipients,
        sender: req.sender,
        smtp_host: req.smtp_host,
        smtp_port: req.smtp_port,
        smtp_password: req.smtp_password,
        subject: ctx.subject(&criteria.date_range, view.len()),
        body: ctx.body(),
        attachment_name: ctx.file_name(),
        attachment: to_delimited(&view)?,
    };
    state.dispatcher.send(&email).await?;

    Ok(Json(serde_json::json!({ "status": "sent", "mentions": view.len() })))
}

async fn admin_reload(State(state): State<AppState>) -> Json<serde_json::Value> {
    let removed = state.cache.invalidate(&state.config.retrieval_key()).await;
    Json(serde_json::json!({ "invalidated": removed }))
}
