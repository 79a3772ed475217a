//! HTTP handlers for the crawl API
//!
//! `/crawl` answers with the scraped data as JSON, or a plain-text error body.
//! The admin endpoints read and change the quota guard at runtime.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cache::CacheStats;
use crate::error::{Error, TiercrawlErrorTrait};
use crate::metrics;
use crate::models::{ScrapedData, Tier};
use crate::scheduler::{QueueDepth, QuotaSnapshot};

use super::http::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Single counter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueResponse {
    pub value: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub cache_backend: String,
    pub cache_healthy: bool,
}

/// Runtime statistics
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub queue: QueueDepth,
    pub cache: CacheStats,
    pub cache_hit_rate: f64,
    pub quota: QuotaSnapshot,
    pub uptime_secs: u64,
}

/// Query parameters of `/crawl`
#[derive(Debug, Default, Deserialize)]
pub struct CrawlParams {
    pub url: Option<String>,
    #[serde(rename = "customerType", alias = "tier")]
    pub customer_type: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                category = self.category().as_str(),
                recoverable = self.is_recoverable(),
                "Crawl request failed"
            );
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response()
    }
}

fn invalid_number() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid number provided").into_response()
}

fn parse_param<T: std::str::FromStr>(params: &HashMap<String, String>, key: &str) -> Option<T> {
    params.get(key).and_then(|v| v.trim().parse().ok())
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Crawl endpoint
        .route("/crawl", get(crawl).post(crawl))
        // Quota administration
        .route("/workers", get(set_workers).post(set_workers))
        .route("/pages", get(set_pages).post(set_pages))
        .route("/getworkers", get(get_workers))
        .route("/getpages", get(get_pages))
        .route("/getCurrWorkers", get(get_current_workers))
        .route("/getCurrPages", get(get_current_pages))
        .route("/api/quota", get(get_quota))
        // Health and stats
        .route("/api/health", get(health_check))
        .route("/api/stats", get(get_stats))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// ============================================================================
// Crawl Handler
// ============================================================================

async fn crawl(
    State(state): State<AppState>,
    Query(params): Query<CrawlParams>,
) -> Result<Json<ScrapedData>, Error> {
    let url = params.url.unwrap_or_default();
    let tier = Tier::from_indicator(params.customer_type.as_deref());

    let data = state.service.crawl(&url, tier).await?;
    Ok(Json(data))
}

// ============================================================================
// Quota Handlers
// ============================================================================

async fn set_workers(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(workers) = parse_param::<u32>(&params, "workers") else {
        return invalid_number();
    };

    state.service.quota().set_max_workers(workers);
    Json(ValueResponse {
        value: u64::from(workers),
    })
    .into_response()
}

async fn set_pages(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(pages) = parse_param::<u64>(&params, "pages") else {
        return invalid_number();
    };

    state.service.quota().set_max_pages_per_window(pages);
    Json(ValueResponse { value: pages }).into_response()
}

async fn get_workers(State(state): State<AppState>) -> Json<ValueResponse> {
    Json(ValueResponse {
        value: u64::from(state.service.quota().max_workers()),
    })
}

async fn get_pages(State(state): State<AppState>) -> Json<ValueResponse> {
    Json(ValueResponse {
        value: state.service.quota().max_pages_per_window(),
    })
}

async fn get_current_workers(State(state): State<AppState>) -> Json<ValueResponse> {
    Json(ValueResponse {
        value: u64::from(state.service.quota().current_workers()),
    })
}

async fn get_current_pages(State(state): State<AppState>) -> Json<ValueResponse> {
    Json(ValueResponse {
        value: state.service.quota().current_pages(),
    })
}

async fn get_quota(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.service.quota().snapshot()))
}

// ============================================================================
// Health and Stats Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.service.cache();
    let cache_healthy = cache.is_healthy().await;

    Json(ApiResponse::success(HealthResponse {
        status: if cache_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cache_backend: cache.backend().to_string(),
        cache_healthy,
    }))
}

async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.service.cache_stats();

    Json(ApiResponse::success(StatsResponse {
        queue: state.service.queue_depth(),
        cache_hit_rate: cache.hit_rate(),
        cache,
        quota: state.service.quota().snapshot(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

/// Prometheus text exposition
async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {e}"),
        )
            .into_response(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert!(response.data.is_some());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_crawl_params_alias() {
        let params: CrawlParams =
            serde_json::from_str(r#"{"url":"https://example.com","tier":"Paid"}"#).unwrap();
        assert_eq!(params.customer_type.as_deref(), Some("Paid"));

        let params: CrawlParams = serde_json::from_str(r#"{"customerType":"Free"}"#).unwrap();
        assert_eq!(params.customer_type.as_deref(), Some("Free"));
        assert!(params.url.is_none());
    }

    #[test]
    fn test_parse_param() {
        let mut params = HashMap::new();
        params.insert("workers".to_string(), "12".to_string());
        params.insert("pages".to_string(), "-3".to_string());

        assert_eq!(parse_param::<u32>(&params, "workers"), Some(12));
        assert_eq!(parse_param::<u64>(&params, "pages"), None);
        assert_eq!(parse_param::<u32>(&params, "missing"), None);
    }

    #[test]
    fn test_error_response_status() {
        let response = Error::QuotaExceeded.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = Error::invalid_input("URL is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
