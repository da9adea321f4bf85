//! HTTP boundary for the report service and the observation stores.
//!
//! Routers are built with their state already applied so a binary can merge
//! them with [`health_routes`] and hand the result to [`serve`].

pub mod observation_routes;
pub mod report_routes;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::net::SocketAddr;
use tokio::signal;

use crate::logging::{self, DataSource};
use crate::model::{ReportError, StoreError, UpstreamFailure};

pub use observation_routes::observation_routes;
pub use report_routes::report_routes;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    /// Missing or unparseable request parameter, or an invalid request body.
    BadRequest(String),
    Report(ReportError),
    Store(StoreError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Report(err) => write!(f, "{}", err),
            ApiError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::Report(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Report(ReportError::InvalidWindow(_)) => StatusCode::BAD_REQUEST,
            ApiError::Report(ReportError::UpstreamUnavailable { failure, .. }) => match failure {
                UpstreamFailure::HttpStatus(_) | UpstreamFailure::Malformed(_) => StatusCode::BAD_GATEWAY,
                UpstreamFailure::Unreachable(_) | UpstreamFailure::TimedOut(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
            ApiError::Report(ReportError::InsufficientData(_))
            | ApiError::Report(ReportError::PersistenceFailed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(StoreError::Rejected(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable name carried in the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Report(err) => err.kind(),
            ApiError::Store(StoreError::Rejected(_)) => "Rejected",
            ApiError::Store(StoreError::Database(_)) => "StorageFailed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string()
        }));

        (self.status(), body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared request parsing
// ---------------------------------------------------------------------------

/// `?days=` as received. Kept as text so a missing or non-numeric value is
/// reported as a 400 with a message instead of axum's default rejection.
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub days: Option<String>,
}

impl WindowQuery {
    pub fn days(&self) -> Result<i64, ApiError> {
        let raw = self
            .days
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("query parameter `days` is required".to_string()))?;

        raw.trim()
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("`days` must be an integer, got {:?}", raw)))
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub fn health_routes(service: &'static str) -> Router {
    Router::new().route("/health", get(move || health_check(service)))
}

async fn health_check(service: &'static str) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": service
    }))
}

// ---------------------------------------------------------------------------
// Serving
// ---------------------------------------------------------------------------

/// Binds `addr` and serves `app` until Ctrl-C or SIGTERM.
pub async fn serve(app: Router, addr: SocketAddr, service: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    logging::info(
        DataSource::Http,
        None,
        &format!("{} listening on {}", service, addr),
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logging::info(DataSource::Http, None, &format!("{} shut down", service));
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            logging::error(DataSource::System, None, &format!("Ctrl+C handler failed: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                logging::error(DataSource::System, None, &format!("SIGTERM handler failed: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            logging::info(DataSource::System, None, "received Ctrl+C, shutting down");
        },
        _ = terminate => {
            logging::info(DataSource::System, None, "received SIGTERM, shutting down");
        },
    }
}
