//! # Service Host Module
//!
//! Exposes one [`Dispatcher`] over HTTP:
//! - `POST /` takes a request envelope and always answers with an envelope
//! - `GET /health` answers `OK`

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::errors::ServiceError;
use crate::rpc::{Dispatcher, Request, Response};

type SharedDispatcher = Arc<dyn Dispatcher>;

/// Build the router for one service
pub fn router(dispatcher: SharedDispatcher) -> Router {
    Router::new()
        .route("/", post(handle_envelope).fallback(method_not_allowed))
        .route("/health", get(health))
        .with_state(dispatcher)
}

/// Serve until the listener fails
pub async fn serve(listener: TcpListener, dispatcher: SharedDispatcher) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(%addr, "Service listening");
    axum::serve(listener, router(dispatcher))
        .await
        .context("Service host stopped")
}

async fn handle_envelope(
    State(dispatcher): State<SharedDispatcher>,
    body: Bytes,
) -> (StatusCode, Json<Response>) {
    let request: Request = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected undecodable request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(Response::failure(&ServiceError::invalid(
                    "Invalid request format",
                ))),
            );
        }
    };

    debug!(action = %request.action, "Dispatching request");
    (StatusCode::OK, Json(dispatcher.dispatch(request).await))
}

async fn method_not_allowed() -> (StatusCode, Json<Response>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(Response::failure(&ServiceError::invalid("Method not allowed"))),
    )
}

async fn health() -> &'static str {
    "OK"
}
