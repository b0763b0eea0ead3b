use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::config::AppConfig;
use crate::dx::DxCallback;
use crate::error::ApiError;
use crate::messenger::{VerifyParams, WebhookPayload};
use crate::session::SessionSweeper;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the HTTP router for the relay.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/callback", post(dx_callback))
        .route("/dx/callback", post(dx_callback))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                tracing::info_span!(
                    "http.request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %Uuid::new_v4(),
                )
            }),
        )
        .with_state(state)
}

/// Start the relay: sweeper, HTTP server, and graceful shutdown on signal.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    serve(listener, config, shutdown_signal()).await
}

/// Serve on `listener` until `shutdown` resolves, then stop the sweeper.
///
/// `config` is validated first; settings the relay cannot run with are
/// returned as an error before anything starts.
pub async fn serve<F>(
    listener: TcpListener,
    config: Arc<AppConfig>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    let state = AppState::from_config(Arc::clone(&config))?;

    let sweeper = SessionSweeper::new(
        state.sessions.clone(),
        config.session.sweep_interval(),
        config.session.timeout(),
    )
    .start();

    let app = build_router(state);
    let result = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.stop().await;
    info!(name: "server.stopped", "Server stopped");

    result?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Liveness probe.
async fn root() -> Json<Value> {
    Json(json!({ "status": "Running" }))
}

/// GET /health - Liveness plus the number of tracked sessions.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.sessions.len(),
    }))
}

/// GET /webhook - Subscription verification handshake.
async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    match params.verify(&state.config.messenger.verify_token) {
        Some(challenge) => {
            info!(name: "webhook.verified", "Webhook verified");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        None => {
            warn!(mode = ?params.mode, "Webhook verification rejected");
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}

/// POST /webhook - Inbound messaging events.
async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Malformed webhook payload");
        ApiError::from(e)
    })?;

    let outcomes = state.router.handle_payload(&payload).await;
    tracing::debug!(?outcomes, "Webhook payload handled");

    Ok(Json(json!({ "status": "ok" })))
}

/// POST /callback - Asynchronous result from DX.
async fn dx_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let callback: DxCallback = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Malformed DX callback payload");
        ApiError::from(e)
    })?;

    let resolution = state.resolver.resolve(&callback).await;
    tracing::debug!(?resolution, chat_id = %callback.chat_id, "Callback handled");

    Ok(Json(json!({ "status": "received" })))
}
