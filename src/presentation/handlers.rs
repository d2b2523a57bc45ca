// HTTP request handlers
use crate::application::ride_map_service::LoadRequest;
use crate::domain::error::LoadError;
use crate::domain::joined_sample::Metric;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RenderQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub metric: Option<String>,
    pub mode: Option<String>,
    pub interpolate: Option<u32>,
}

impl RenderQuery {
    fn to_request(&self) -> Result<LoadRequest, LoadError> {
        LoadRequest::parse(
            self.start.as_deref(),
            self.end.as_deref(),
            self.metric.as_deref(),
            self.mode.as_deref(),
            self.interpolate,
        )
    }
}

fn error_status(err: &LoadError) -> StatusCode {
    match err {
        LoadError::Validation(_) => StatusCode::BAD_REQUEST,
        LoadError::Fetch { .. } => StatusCode::BAD_GATEWAY,
        LoadError::EmptyNetwork => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn error_response(err: LoadError, compress: bool) -> Response {
    let status = error_status(&err);
    let body = match &err {
        LoadError::Fetch { datastream, .. } => {
            json!({"error": err.to_string(), "datastream": datastream})
        }
        _ => json!({"error": err.to_string()}),
    };
    match json_response(&body, status, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Legend for one coloring metric
pub async fn get_legend(
    Path(metric): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let legend = metric
        .parse::<Metric>()
        .map_err(LoadError::Validation)
        .and_then(|metric| state.ride_map_service.legend(metric));

    match legend {
        Ok(legend) => match json_response(&legend, StatusCode::OK, compress).await {
            Ok(response) => response,
            Err(status) => status.into_response(),
        },
        Err(e) => error_response(e, compress).await,
    }
}

/// Run one render pass and return all artifacts at once
pub async fn render(
    Query(query): Query<RenderQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let result = match query.to_request() {
        Ok(request) => state.ride_map_service.load(&request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => match json_response(&output, StatusCode::OK, compress).await {
            Ok(response) => response,
            Err(status) => status.into_response(),
        },
        Err(e) => {
            tracing::warn!("Render request failed: {}", e);
            error_response(e, compress).await
        }
    }
}

/// Run one render pass, streaming artifacts as length-prefixed chunks.
/// Request validation still fails synchronously with a JSON error.
pub async fn stream_render(
    Query(query): Query<RenderQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    match query.to_request() {
        Ok(request) => {
            let rx = state.ride_map_service.stream_render(request);
            stream_from_receiver(rx, compress).into_response()
        }
        Err(e) => error_response(e, compress).await,
    }
}
