//! HTTP surface of the sync server.
//!
//! Implements:
//! - GET /document - Authoritative state, seeded on first access
//! - POST /document - Versioned submission (200 state, 409 conflict)
//! - POST /document/force-sync - Authoritative state, unconditionally
//! - POST /document/force-push - Unconditional replacement
//! - GET /health - Health check endpoint

use crate::coordinator::SubmitOutcome;
use crate::error::{ServerError, ServerResult};
use crate::server::SyncServer;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use progsync_model::{
    DocumentState, ErrorBody, ForcePushRequest, HealthResponse, OwnerId, SubmitRequest,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Header naming the owner when authentication is disabled.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Builds the router for `server`.
pub fn router(server: Arc<SyncServer>) -> Router {
    let body_limit = server.config().max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/document", get(get_document).post(submit_document))
        .route("/document/force-sync", post(force_sync))
        .route("/document/force-push", post(force_push))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Serves `server` on `listener` until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<F>(
    server: Arc<SyncServer>,
    listener: TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        addr = %listener.local_addr()?,
        auth_enabled = server.auth_enabled(),
        "sync server listening"
    );

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await
}

/// The owner a request acts for, resolved from its headers.
#[derive(Debug, Clone)]
pub struct VerifiedOwner(pub OwnerId);

impl FromRequestParts<Arc<SyncServer>> for VerifiedOwner {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &Arc<SyncServer>,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        let owner = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok());

        server.authenticate(bearer, owner).map(VerifiedOwner)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::AuthenticationFailed(_) | ServerError::NotAuthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::Busy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Store(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Runs blocking store work off the async executor.
async fn blocking<T, F>(work: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
}

fn invalid_body(rejection: JsonRejection) -> ServerError {
    ServerError::InvalidRequest(rejection.body_text())
}

async fn health(State(server): State<Arc<SyncServer>>) -> Json<HealthResponse> {
    Json(server.health())
}

async fn get_document(
    State(server): State<Arc<SyncServer>>,
    VerifiedOwner(owner): VerifiedOwner,
) -> ServerResult<Json<DocumentState>> {
    let state = blocking(move || server.handle_get(&owner)).await?;
    Ok(Json(state))
}

async fn submit_document(
    State(server): State<Arc<SyncServer>>,
    VerifiedOwner(owner): VerifiedOwner,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> ServerResult<Response> {
    let Json(request) = body.map_err(invalid_body)?;

    match blocking(move || server.handle_submit(&owner, request)).await? {
        SubmitOutcome::Accepted { state, .. } => Ok(Json(state).into_response()),
        SubmitOutcome::Conflict(conflict) => {
            Ok((StatusCode::CONFLICT, Json(conflict)).into_response())
        }
    }
}

async fn force_sync(
    State(server): State<Arc<SyncServer>>,
    VerifiedOwner(owner): VerifiedOwner,
) -> ServerResult<Json<DocumentState>> {
    let state = blocking(move || server.handle_force_sync(&owner)).await?;
    Ok(Json(state))
}

async fn force_push(
    State(server): State<Arc<SyncServer>>,
    VerifiedOwner(owner): VerifiedOwner,
    body: Result<Json<ForcePushRequest>, JsonRejection>,
) -> ServerResult<Json<DocumentState>> {
    let Json(request) = body.map_err(invalid_body)?;
    let state = blocking(move || server.handle_force_push(&owner, request)).await?;
    Ok(Json(state))
}
