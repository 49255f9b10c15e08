use crate::app_state::AppState;
use crate::entitlements::entitlements_for;
use crate::error::VaultError;
use crate::reference::ObjectRef;
use crate::session::Caller;
use axum::body::Body;
use axum::extract::{Extension, Query};
use axum::http::{Request, Response, StatusCode, header};
use axum::response::{IntoResponse, Json};
use mime_guess::from_path;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub signing: bool,
}

#[derive(Deserialize)]
pub struct DeliverParams {
    #[serde(rename = "ref", default)]
    pub reference: String,
}

#[axum::debug_handler]
pub async fn healthz(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            backend: state.storage.backend_name(),
            signing: state.signer.is_some(),
        }),
    )
}

/// List what the caller may watch right now, each entry carrying a signed
/// locator when the issuer is configured. Authorization conditions never
/// surface as errors here; the view is simply empty.
pub async fn get_entitlements(
    Extension(state): Extension<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Response<Body> {
    match entitlements_for(&state, caller.as_deref()).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(error) => {
            error!(%error, "Failed to compute entitlement view");
            error.into_response()
        }
    }
}

/// Relay one object's bytes through the application without revealing the
/// backend address or minting a locator. Authorization happens upstream;
/// this path only validates the reference shape.
pub async fn deliver(
    Extension(state): Extension<AppState>,
    Query(params): Query<DeliverParams>,
    req: Request<Body>,
) -> Result<Response<Body>, VaultError> {
    let object = ObjectRef::parse(&params.reference)?;

    let meta = state.storage.stat(&object).await?;
    let size = meta.content_length();
    let content_type = meta
        .content_type()
        .map(str::to_owned)
        .unwrap_or_else(|| from_path(object.object()).first_or_octet_stream().to_string());

    debug!(key = %object.key(), size, %content_type, "Delivering object");

    if size == 0 {
        return Ok(empty_object_response(&content_type));
    }

    let (status, start, end) = parse_range(&req, size);
    let len = end - start + 1;

    let stream = state.storage.open_read(&object, start..end + 1).await?;

    let mut res = Response::new(Body::from_stream(stream));
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        content_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::ACCEPT_RANGES, "bytes".parse().unwrap());
    headers.insert(
        header::CACHE_CONTROL,
        "public,max-age=3600".parse().unwrap(),
    );
    headers.insert(header::CONTENT_LENGTH, len.to_string().parse().unwrap());
    if status == StatusCode::PARTIAL_CONTENT {
        headers.insert(
            header::CONTENT_RANGE,
            format!("bytes {start}-{end}/{size}").parse().unwrap(),
        );
    }
    Ok(res)
}

fn parse_range(req: &Request<Body>, file_size: u64) -> (StatusCode, u64, u64) {
    if let Some(rh) = req.headers().get(header::RANGE)
        && let Ok(s) = rh.to_str()
        && let Some(stripped) = s.strip_prefix("bytes=")
        && let parts = stripped.split('-').collect::<Vec<_>>()
        && let Ok(start) = parts[0].parse::<u64>()
        && start < file_size
    {
        let end = parts
            .get(1)
            .and_then(|e| e.parse::<u64>().ok())
            .unwrap_or(file_size - 1);
        return (StatusCode::PARTIAL_CONTENT, start, end.min(file_size - 1));
    }

    (StatusCode::OK, 0, file_size - 1)
}

fn empty_object_response(content_type: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, "0")
        .body(Body::empty())
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_range(range: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/deliver");
        if let Some(range) = range {
            builder = builder.header(header::RANGE, range);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_parse_range_without_header() {
        let req = request_with_range(None);
        assert_eq!(parse_range(&req, 100), (StatusCode::OK, 0, 99));
    }

    #[test]
    fn test_parse_range_bounded() {
        let req = request_with_range(Some("bytes=2-5"));
        assert_eq!(parse_range(&req, 100), (StatusCode::PARTIAL_CONTENT, 2, 5));
    }

    #[test]
    fn test_parse_range_open_ended_and_clamped() {
        let req = request_with_range(Some("bytes=90-"));
        assert_eq!(parse_range(&req, 100), (StatusCode::PARTIAL_CONTENT, 90, 99));

        let req = request_with_range(Some("bytes=50-5000"));
        assert_eq!(parse_range(&req, 100), (StatusCode::PARTIAL_CONTENT, 50, 99));
    }

    #[test]
    fn test_parse_range_past_end_falls_back_to_full() {
        let req = request_with_range(Some("bytes=200-300"));
        assert_eq!(parse_range(&req, 100), (StatusCode::OK, 0, 99));
    }
}
