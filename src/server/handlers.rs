use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::providers::Provider;

use super::page;
use super::state::ServerState;
use super::upload::handle_upload;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router<P: Provider>(state: ServerState<P>) -> Result<Router> {
    let home = Arc::new(page::render_home(
        state.translator.languages(),
        state.api_ready,
    )?);
    let body_limit = state.settings.max_upload_bytes + MULTIPART_OVERHEAD;
    let state = Arc::new(state);

    let router = Router::new()
        .route(
            "/",
            get({
                let home = home.clone();
                move || {
                    let home = home.clone();
                    async move { Html((*home).clone()) }
                }
            }),
        )
        .route("/app", get(app_redirect))
        .route("/health", get(health))
        .route("/static/js/home.js", get(home_script))
        .route("/upload", post(handle_upload::<P>))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(cors_middleware));
    Ok(router)
}

pub async fn run_server<P: Provider>(state: ServerState<P>, addr: String) -> Result<()> {
    let app = build_router(state)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn app_redirect() -> Redirect {
    Redirect::to("/#app")
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn home_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        page::HOME_SCRIPT,
    )
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
