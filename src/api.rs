// src/api.rs
//! HTTP surface: envelope types, error mapping and the Axum router.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::SecondsFormat;
use serde::Serialize;
use thiserror::Error;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};

use crate::cache::{EventCache, EVENTS_CACHE_KEY};
use crate::query::{self, EventsPage, EventsQuery, ListParams};
use crate::scrape::types::Event;
use crate::scrape::{ScrapeError, Scraper};

#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<Scraper>,
}

impl AppState {
    pub fn new(scraper: Scraper) -> Self {
        Self {
            scraper: Arc::new(scraper),
        }
    }

    fn cache(&self) -> &EventCache {
        self.scraper.cache()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/events", get(list_events))
        .route("/api/events/refresh", post(refresh_events))
        .route("/api/events/{id}", get(get_event))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Envelope
---------------------------- */

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub last_scraped_at: String,
    /// Seconds, rounded.
    pub cache_age: u64,
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Event not found")]
    NotFound,
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Scrape(_) => "SCRAPE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Scrape(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: self.code(),
                message: self.to_string(),
            }),
            meta: None,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// A handler that panics still answers with the JSON envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(target: "api", panic = detail, "handler panicked");
    ApiError::Internal.into_response()
}

/* ----------------------------
Handlers
---------------------------- */

#[derive(Serialize)]
struct RootMessage {
    message: &'static str,
}

async fn root() -> Json<RootMessage> {
    Json(RootMessage {
        message: "Pet News Events API",
    })
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

async fn health() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::ok(HealthStatus { status: "ok" }))
}

async fn list_events(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<EventsPage>>, ApiError> {
    let events = state.scraper.events().await?;
    let params = ListParams::from(&EventsQuery::from_pairs(pairs));
    let page = query::apply(&events, &params);

    // Rounded seconds; absent entry reads as 0.
    let age_ms = state.cache().age(EVENTS_CACHE_KEY).unwrap_or(0);
    let meta = Meta {
        last_scraped_at: state
            .scraper
            .last_scraped_at()
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        cache_age: (age_ms + 500) / 1_000,
    };

    Ok(Json(ApiResponse::ok(page).with_meta(meta)))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Event>>, ApiError> {
    let events = state.scraper.events().await?;
    let event = events
        .iter()
        .find(|e| e.id == id)
        .cloned()
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ApiResponse::ok(event)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshSummary {
    message: &'static str,
    events_found: usize,
    events_updated: usize,
}

async fn refresh_events(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RefreshSummary>>, ApiError> {
    let old_count = state
        .cache()
        .get(EVENTS_CACHE_KEY)
        .map(|v| v.len())
        .unwrap_or(0);
    let events = state.scraper.scrape_and_refresh().await?;
    let new_count = events.len();

    Ok(Json(ApiResponse::ok(RefreshSummary {
        message: "Scraping completed",
        events_found: new_count,
        events_updated: new_count.abs_diff(old_count),
    })))
}
