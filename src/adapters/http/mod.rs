//! HTTP adapters - REST API implementations.
//!
//! `app_router` assembles the billing routes, the session middleware and
//! the tower-http stack (request ids, tracing, CORS, timeout, compression).

pub mod billing;
pub mod error;
pub mod middleware;

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use billing::{billing_router, BillingAppState};
pub use error::ErrorResponse;
pub use middleware::{auth_middleware, AuthState, OptionalAuth, RequireAuth};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cross-cutting HTTP settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Allowed browser origins; `*` allows any origin without credentials.
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Builds the full application router.
///
/// # Routes
/// - `GET /health` - Liveness probe
/// - `/api/...` - Billing endpoints behind the session middleware
pub fn app_router(state: BillingAppState, auth: AuthState, options: &HttpOptions) -> Router {
    let api = billing_router()
        .layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(&options.cors_origins))
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(options.request_timeout)),
        )
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(allowed).allow_credentials(true)
}
