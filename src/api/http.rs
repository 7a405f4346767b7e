use crate::api::types::{ErrorBody, FindPathRequest, FindPathResponse};
use crate::config::Config;
use crate::error::{Result, SixDegreesError};
use crate::finder::PathFinder;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Check if a port is available by attempting to bind to it
async fn check_port_available(port: u16) -> bool {
    tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await.is_ok()
}

/// HTTP front end over a [`PathFinder`]
pub struct HttpServer {
    finder: Arc<PathFinder>,
    allowed_origins: Vec<String>,
}

impl HttpServer {
    pub fn new(finder: PathFinder, allowed_origins: Vec<String>) -> Self {
        Self {
            finder: Arc::new(finder),
            allowed_origins,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PathFinder::from_config(config),
            config.http_server.allowed_origins.clone(),
        )
    }

    /// Run the HTTP server
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.router();

        let addr = format!("127.0.0.1:{}", port);
        log::info!("Starting HTTP server on http://{}", addr);
        log::info!("Path endpoint: http://{}/path", addr);

        if !check_port_available(port).await {
            return Err(SixDegreesError::Config(format!(
                "Port {} is already in use. Stop the other process or set http_server.port in config.toml",
                port
            )));
        }

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            SixDegreesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        axum::serve(listener, app).await.map_err(|e| {
            SixDegreesError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Build the axum router
    pub fn router(&self) -> Router {
        // With no configured origins any origin is allowed; otherwise preflight
        // answers match the check done in `handle_find_path`.
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/path", post(handle_find_path))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(AppState {
                finder: Arc::clone(&self.finder),
                allowed_origins: Arc::new(self.allowed_origins.clone()),
            })
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    finder: Arc<PathFinder>,
    allowed_origins: Arc<Vec<String>>,
}

/// A [`SixDegreesError`] tagged with the request it belongs to.
struct ApiError {
    request_id: Option<String>,
    error: SixDegreesError,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        status_for(&self.error)
    }
}

/// HTTP status for each error kind
pub fn status_for(error: &SixDegreesError) -> StatusCode {
    match error {
        SixDegreesError::InvalidFilterOperand { .. }
        | SixDegreesError::UnknownField { .. }
        | SixDegreesError::EmptyPath
        | SixDegreesError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SixDegreesError::MalformedSegment { .. } | SixDegreesError::UnresolvedType(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SixDegreesError::TraversalFailed(_) | SixDegreesError::LookupFailed(_) => StatusCode::BAD_GATEWAY,
        SixDegreesError::Database(_) | SixDegreesError::Io(_) | SixDegreesError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request {:?} failed: {}", self.request_id, self.error);
        } else {
            log::debug!("Request {:?} rejected: {}", self.request_id, self.error);
        }
        let body = ErrorBody {
            error: self.error.to_string(),
            kind: self.error.kind().to_string(),
            request_id: self.request_id,
        };
        (status, Json(body)).into_response()
    }
}

/// Handle `POST /path`
async fn handle_find_path(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    if let Err(response) = validate_origin(&headers, &state.allowed_origins) {
        return response;
    }

    let request: FindPathRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return ApiError {
                request_id: None,
                error: SixDegreesError::InvalidInput(format!("Invalid JSON: {}", e)),
            }
            .into_response();
        }
    };

    let request_id = Uuid::new_v4().to_string();
    let result = state
        .finder
        .find_path_with_id(
            &request_id,
            request.first_person_id,
            request.second_person_id,
            request.filters.as_ref(),
        )
        .await;

    match result {
        Ok(path) => (StatusCode::OK, Json(FindPathResponse { request_id, path })).into_response(),
        Err(error) => ApiError {
            request_id: Some(request_id),
            error,
        }
        .into_response(),
    }
}

/// Handle health check endpoint
async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "sixdegrees",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

/// Reject browser requests from origins outside the configured list.
fn validate_origin(headers: &HeaderMap, allowed_origins: &[String]) -> std::result::Result<(), Response> {
    if allowed_origins.is_empty() {
        return Ok(());
    }

    // Non-browser clients send no Origin
    let origin = match headers.get("origin").and_then(|h| h.to_str().ok()) {
        Some(o) => o,
        None => return Ok(()),
    };

    if allowed_origins.iter().any(|allowed| origin == allowed) {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ErrorBody {
                error: format!("Origin '{}' is not in the allowed origins list", origin),
                kind: "OriginNotAllowed".to_string(),
                request_id: None,
            }),
        )
            .into_response())
    }
}
