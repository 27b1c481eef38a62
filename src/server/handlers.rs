//! Request handlers for `/segment` and `/health`

use super::error::{ApiError, ApiResult};
use crate::{api::SegmentationResponse, processor::SegmentationPipeline, tracing_config::spans};
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, Instrument, Span};
use uuid::Uuid;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SegmentationPipeline>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub scorer: String,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        scorer: state.pipeline.scorer_name().to_string(),
    })
}

/// `POST /segment`
///
/// Accepts a `multipart/form-data` upload or the raw image bytes as the body.
pub async fn segment(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<SegmentationResponse>> {
    let request_id = Uuid::new_v4().to_string();
    let span = spans::segment_request(&request_id);

    handle_segment(state, request)
        .instrument(span)
        .await
        .map(Json)
}

async fn handle_segment(state: AppState, request: Request) -> ApiResult<SegmentationResponse> {
    let upload = read_upload(request).await?;
    info!(bytes = upload.len(), "Upload received");

    let pipeline = Arc::clone(&state.pipeline);
    let span = Span::current();
    let result = tokio::task::spawn_blocking(move || span.in_scope(|| pipeline.process_bytes(&upload)))
        .await
        .map_err(|e| ApiError::Internal(format!("Segmentation task failed: {e}")))??;

    info!(bbox = %result.bounding_box, total_ms = result.timings.total_ms, "Segmentation served");
    Ok(SegmentationResponse::from(&result))
}

/// Image bytes from either upload style
async fn read_upload(request: Request) -> ApiResult<Bytes> {
    if !is_multipart(request.headers()) {
        return Ok(Bytes::from_request(request, &()).await?);
    }

    let mut multipart = Multipart::from_request(request, &()).await?;
    let mut first = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        let data = field.bytes().await?;
        debug!(field = name.as_deref().unwrap_or(""), bytes = data.len(), "Multipart field");

        if name.as_deref() == Some("file") {
            return Ok(data);
        }
        if first.is_none() {
            first = Some(data);
        }
    }

    first.ok_or_else(|| ApiError::BadRequest("Multipart body contains no fields".to_string()))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
}

/// Rewrite JSON error responses to `200`, leaving the body intact
pub async fn force_ok_status(mut response: Response) -> Response {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|value| value.as_bytes().starts_with(b"application/json"));

    if is_json && !response.status().is_success() {
        *response.status_mut() = StatusCode::OK;
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_multipart_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        assert!(!is_multipart(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Multipart/Form-Data; boundary=xyz"),
        );
        assert!(is_multipart(&headers));
    }

    #[tokio::test]
    async fn test_force_ok_only_touches_json_errors() {
        let json_error = Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header(CONTENT_TYPE, "application/json")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(force_ok_status(json_error).await.status(), StatusCode::OK);

        let not_found = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(force_ok_status(not_found).await.status(), StatusCode::NOT_FOUND);
    }
}
