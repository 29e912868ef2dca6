//! Loopback HTTP listener for question imports.
//!
//! Browser extensions post question data here; validated imports are handed
//! to the GUI thread through a [`UiDispatcher`] and the client gets its answer
//! right away, without waiting for the GUI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/import` | Import `{token, id, imageBase64}` |
//! | `OPTIONS` | `/import` | CORS preflight, `204` |
//!
//! # Response Contract
//!
//! Every response carries `Access-Control-Allow-Origin: *`. Bodies are JSON:
//!
//! ```json
//! { "ok": false, "message": "Invalid token" }
//! ```
//!
//! Statuses: `200` imported, `400` malformed payload, `403` bad token,
//! `404` unknown path, `405` wrong method, `413` body too large,
//! `500` GUI not ready.
//!
//! # Threading
//!
//! [`spawn_listener`] binds on the caller's thread, so a busy port is reported
//! immediately, then serves from a dedicated `import-listener` thread with its
//! own tokio runtime. Nothing here runs on, or waits for, the GUI thread.
//!
//! Request bodies and tokens are never logged.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tokio::sync::Notify;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error, info};

use crate::dispatch::UiDispatcher;
use crate::models::StatusBody;
use crate::validate::validate_import;

pub const IMPORT_PATH: &str = "/import";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const ALLOW_PRIVATE_NETWORK: HeaderName =
    HeaderName::from_static("access-control-allow-private-network");

/// Shared state for the import handlers.
#[derive(Clone)]
struct AppState {
    /// Expected token; empty disables the check.
    token: Arc<str>,
    dispatcher: UiDispatcher,
}

/// Builds the import router.
pub fn import_router(token: Arc<str>, dispatcher: UiDispatcher, max_body_bytes: usize) -> Router {
    let state = AppState { token, dispatcher };

    Router::new()
        .route(
            IMPORT_PATH,
            post(handle_import)
                .options(handle_preflight)
                .fallback(handle_method_not_allowed),
        )
        .fallback(handle_not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid listen address '{0}'")]
    InvalidBind(String),
    #[error("refusing to listen on non-loopback address {0}")]
    NonLoopback(SocketAddr),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start import listener: {0}")]
    Io(#[from] std::io::Error),
}

/// A running listener. Clones refer to the same listener.
#[derive(Clone, Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Full URL of the import endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://{}{}", self.local_addr, IMPORT_PATH)
    }

    /// Stops accepting connections; in-flight requests finish first.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Binds `bind` and serves `router` on a background thread.
pub fn spawn_listener(bind: SocketAddr, router: Router) -> Result<ListenerHandle, ListenerError> {
    if !bind.ip().is_loopback() {
        return Err(ListenerError::NonLoopback(bind));
    }

    let std_listener = std::net::TcpListener::bind(bind)
        .map_err(|source| ListenerError::Bind { addr: bind, source })?;
    std_listener.set_nonblocking(true)?;
    let local_addr = std_listener.local_addr()?;

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("import-worker")
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("import-listener".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(std_listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!(error = %e, "import listener could not adopt socket");
                        return;
                    }
                };
                let served = axum::serve(listener, router)
                    .with_graceful_shutdown(async move { signal.notified().await })
                    .await;
                if let Err(e) = served {
                    error!(error = %e, "import listener stopped with an error");
                }
            });
            debug!("import listener thread exiting");
        })?;

    info!(endpoint = %format!("http://{}{}", local_addr, IMPORT_PATH), "import listener started");

    Ok(ListenerHandle {
        local_addr,
        shutdown,
    })
}

// ============ Responses ============

fn json_response(status: StatusCode, ok: bool, message: &str) -> Response {
    let body = serde_json::to_string(&StatusBody::new(ok, message))
        .unwrap_or_else(|_| String::from(r#"{"ok":false,"message":"Internal error"}"#));
    (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response()
}

// ============ POST /import ============

/// Handler for `POST /import`.
///
/// Validates the body, queues the import for the GUI thread and answers
/// immediately. GUI-side failures are never reported back to the client.
async fn handle_import(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            debug!("import rejected: body too large");
            return json_response(StatusCode::PAYLOAD_TOO_LARGE, false, "Payload Too Large");
        }
        Err(_) => return json_response(StatusCode::BAD_REQUEST, false, "Invalid JSON"),
    };

    let request = match validate_import(&body, &state.token) {
        Ok(request) => request,
        Err(rejection) => {
            debug!(reason = %rejection, "import rejected");
            return json_response(rejection.status(), false, &rejection.to_string());
        }
    };

    let question_id = request.question_id.clone();
    let image_len = request.image_bytes.len();
    if state.dispatcher.dispatch(request).is_err() {
        error!(question_id = %question_id, "import dropped: GUI event loop is not running");
        return json_response(StatusCode::INTERNAL_SERVER_ERROR, false, "Client not ready");
    }

    info!(question_id = %question_id, image_bytes = image_len, "import queued");
    json_response(StatusCode::OK, true, "Imported")
}

// ============ OPTIONS /import ============

async fn handle_preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_MAX_AGE, "600"),
            (ALLOW_PRIVATE_NETWORK, "true"),
        ],
    )
        .into_response()
}

// ============ Fallbacks ============

async fn handle_method_not_allowed() -> Response {
    let mut response = json_response(StatusCode::METHOD_NOT_ALLOWED, false, "Method Not Allowed");
    response.headers_mut().insert(
        header::ALLOW,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response
}

async fn handle_not_found() -> Response {
    json_response(StatusCode::NOT_FOUND, false, "Not Found")
}
