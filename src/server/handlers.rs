use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::fetch::ImageFetcher;
use crate::ocr::VisionClient;
use crate::settings;
use crate::translation::TranslationEngine;

use super::models::{ErrorResponse, TranslateRequest, TranslateResponse};
use super::state::ServerState;
use super::translate::{ServerError, translate_request};

pub async fn run_server(settings: settings::Settings, addr: String) -> Result<()> {
    let pipeline = crate::build_pipeline(&settings)?;
    let state = Arc::new(ServerState::new(pipeline, settings.request_timeout));
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

pub fn router<F, C, E>(state: Arc<ServerState<F, C, E>>) -> Router
where
    F: ImageFetcher + 'static,
    C: VisionClient + 'static,
    E: TranslationEngine + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/translate", post(translate::<F, C, E>))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

async fn translate<F, C, E>(
    State(state): State<Arc<ServerState<F, C, E>>>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, (StatusCode, Json<ErrorResponse>)>
where
    F: ImageFetcher + 'static,
    C: VisionClient + 'static,
    E: TranslationEngine + 'static,
{
    let Json(payload) = payload.map_err(|err| {
        let err = ServerError::bad_request(format!("invalid request body: {}", err.body_text()));
        (err.status, Json(err.body()))
    })?;

    let result = translate_request(state.as_ref(), payload).await;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(err) => Err((err.status, Json(err.body()))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
