//! axum integration.
//!
//! [`admit`] is a `from_fn_with_state` middleware that identifies the caller
//! and the endpoint, asks the controller for a decision and either forwards
//! the request or answers `429 Too Many Requests` itself.
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use gateway_admission::{admit, AdmissionController, EndpointPolicy};
//!
//! let controller = AdmissionController::builder()
//!     .with_endpoint_policy("/search", EndpointPolicy::per_minute(3))
//!     .build()
//!     .unwrap();
//!
//! let app: Router = Router::new()
//!     .route("/search", get(|| async { "results" }))
//!     .route_layer(middleware::from_fn_with_state(controller, admit));
//! ```

use crate::application::admission::AdmissionController;
use crate::domain::decision::AdmissionDecision;
use crate::infrastructure::storage::DefaultStorage;
use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

/// Configured per-window limit for the endpoint.
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// Whole tokens left in the caller's bucket.
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";
const UNKNOWN_CLIENT: &str = "unknown";

/// Explicit endpoint id for a route.
///
/// Insert it as a request extension (for example with an outer
/// `axum::Extension` layer) to group several routes under one policy or to
/// decouple policy names from route templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(Arc<str>);

impl Endpoint {
    /// Create an endpoint id.
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    /// Get the endpoint id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identify the caller.
///
/// Uses the left-most non-empty `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the peer address, and finally `"unknown"`. Header values are taken
/// verbatim; trusting them is the job of the proxy in front of the gateway.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').map(str::trim).find(|s| !s.is_empty()))
    {
        return forwarded.to_string();
    }

    if let Some(real_ip) = headers
        .get(X_REAL_IP)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Identify the endpoint a request targets.
///
/// Prefers an [`Endpoint`] extension, then the matched route template, then
/// the raw path.
pub fn endpoint_id(request: &Request) -> String {
    if let Some(endpoint) = request.extensions().get::<Endpoint>() {
        return endpoint.as_str().to_string();
    }
    if let Some(matched) = request.extensions().get::<MatchedPath>() {
        return matched.as_str().to_string();
    }
    request.uri().path().to_string()
}

/// Admission middleware for `axum::middleware::from_fn_with_state`.
///
/// Rejected requests never reach the inner service.
pub async fn admit(
    State(controller): State<AdmissionController<DefaultStorage>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_id(request.headers(), peer);
    let endpoint = endpoint_id(&request);

    let decision = controller.check(&client, &endpoint);
    if decision.is_rejected() {
        return reject(&decision);
    }

    let mut response = next.run(request).await;
    attach_headers(response.headers_mut(), &decision);
    response
}

fn reject(decision: &AdmissionDecision) -> Response {
    let body = Json(json!({
        "error": "Too Many Requests",
        "code": "RATE_LIMIT_EXCEEDED",
        "message": format!(
            "Rate limit of {} requests exceeded. Retry after {} seconds.",
            decision.limit, decision.retry_after_secs
        ),
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    let headers = response.headers_mut();
    attach_headers(headers, decision);
    headers.insert(RETRY_AFTER, HeaderValue::from(decision.retry_after_secs));
    response
}

fn attach_headers(headers: &mut HeaderMap, decision: &AdmissionDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(
        X_RATELIMIT_REMAINING,
        HeaderValue::from(decision.remaining_requests()),
    );
}
