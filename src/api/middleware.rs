use crate::app_state::AppState;
use crate::session::Caller;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, warn};

/// Resolve the caller's identity once per request and stash it in request
/// extensions. Handlers behind this layer see `Caller(None)` for anonymous
/// callers instead of an auth failure.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = state.sessions.caller_from_headers(req.headers()).await;
    req.extensions_mut().insert(Caller(caller));
    next.run(req).await
}

pub async fn log_request_errors(req: Request, next: Next) -> Response {
    let uri = req.uri().clone();
    let method = req.method().clone();

    let response = next.run(req).await;
    let status = response.status();
    if status.is_client_error() {
        // 4xx error
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            "Client error"
        );
    } else if status.is_server_error() {
        // 5xx error
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            "Server error"
        );
    }

    response
}
