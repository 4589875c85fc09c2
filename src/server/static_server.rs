// src/server/static_server.rs

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Script tag that loads the live-reload client from `host:port`.
pub fn reload_snippet(host: &str, port: u16) -> String {
    format!(r#"<script src="//{host}:{port}/livereload.js?snipver=1"></script>"#)
}

/// Insert `snippet` before the last `</body>`, or append it when the page
/// has no body close tag.
pub fn inject_snippet(html: &str, snippet: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(at) => format!("{}{snippet}{}", &html[..at], &html[at..]),
        None => format!("{html}{snippet}"),
    }
}

/// Static file server over `root` (the build tree) that injects `snippet`
/// into HTML responses.
pub fn router(root: impl Into<PathBuf>, snippet: String) -> Router {
    let snippet: Arc<str> = snippet.into();
    Router::new()
        .fallback_service(ServeDir::new(root.into()))
        .layer(middleware::from_fn_with_state(snippet, inject_reload_client))
        .layer(TraceLayer::new_for_http())
}

async fn inject_reload_client(State(snippet): State<Arc<str>>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::OK || !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer html response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let injected = inject_snippet(&html, &snippet);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(injected))
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}
