use crate::reference::{STATE_CONTAINER, is_safe_identifier};
use axum::http::{HeaderMap, header};
use opendal::{ErrorKind, Operator};
use serde::Deserialize;
use tracing::{debug, warn};

/// Identity resolved for one request; `None` is an anonymous caller
#[derive(Debug, Clone)]
pub struct Caller(pub Option<String>);

#[derive(Deserialize)]
struct SessionRecord {
    user_id: String,
}

/// Resolves bearer tokens against session documents owned by the external
/// identity system. This process never parses or verifies credentials
/// itself; a token either names a live session document or the caller is
/// anonymous.
#[derive(Clone)]
pub struct SessionStore {
    operator: Operator,
}

impl SessionStore {
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// Map request headers to a caller identity, anonymous on any failure
    pub async fn caller_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let token = bearer_token(headers)?;
        if !is_safe_identifier(token) {
            warn!("Refusing session lookup for unsafe token");
            return None;
        }

        let key = format!("{STATE_CONTAINER}/sessions/{token}.json");
        match self.operator.read(&key).await {
            Ok(buffer) => match serde_json::from_slice::<SessionRecord>(&buffer.to_bytes()) {
                Ok(record) => Some(record.user_id),
                Err(error) => {
                    warn!(%error, "Malformed session document, treating as anonymous");
                    None
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("Unknown session token");
                None
            }
            Err(error) => {
                warn!(%error, "Session lookup failed, treating as anonymous");
                None
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok-123"),
        );
        assert_eq!(bearer_token(&headers), Some("tok-123"));
    }

    #[test]
    fn test_missing_or_malformed_authorization() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
