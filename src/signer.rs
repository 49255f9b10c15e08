//! Credential issuance: time-bounded, read-scoped presigned locators for
//! single storage objects, computed locally with AWS SigV4.

use crate::error::VaultError;
use crate::reference::ObjectRef;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use url::Url;

/// Fixed credential validity window. Policy, not caller-supplied.
pub const CREDENTIAL_TTL_SECS: i64 = 24 * 60 * 60;

const SERVICE: &str = "s3";

/// Deployment-held signing identity, constructed once at startup and
/// immutable afterwards. The secret never appears in credentials, logs,
/// or responses.
#[derive(Clone)]
pub struct SignerConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// A minted read credential for exactly one object
#[derive(Debug, Clone)]
pub struct AccessCredential {
    pub object_reference: String,
    pub signed_locator: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues presigned read URLs against a known backend address.
///
/// Signing is a local HMAC computation; no network call is involved.
pub struct UrlSigner {
    config: SignerConfig,
    endpoint: Url,
}

impl UrlSigner {
    /// Refuses to construct without a complete signing identity, so a
    /// misconfigured deployment fails at startup rather than per call
    pub fn new(config: SignerConfig) -> Result<Self, VaultError> {
        if config.access_key_id.is_empty() {
            return Err(VaultError::Configuration(
                "signing access key id is missing".into(),
            ));
        }
        if config.secret_access_key.is_empty() {
            return Err(VaultError::Configuration(
                "signing secret is missing".into(),
            ));
        }
        if config.bucket.is_empty() {
            return Err(VaultError::Configuration(
                "signing bucket is missing".into(),
            ));
        }
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|error| VaultError::Configuration(format!("invalid endpoint: {error}")))?;

        Ok(Self { config, endpoint })
    }

    /// Mint a credential for one object, valid for the fixed window
    /// starting now
    pub fn issue(&self, reference: &str) -> Result<AccessCredential, VaultError> {
        self.issue_at(reference, Utc::now())
    }

    /// URL form for direct embedding in responses
    pub fn issue_url(&self, reference: &str) -> Result<String, VaultError> {
        Ok(self.issue(reference)?.signed_locator)
    }

    /// Mint a credential at an explicit instant. Deterministic: the same
    /// reference, instant, and secret always produce the same locator.
    pub fn issue_at(
        &self,
        reference: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<AccessCredential, VaultError> {
        let object = ObjectRef::parse(reference)?;

        let timestamp = issued_at.format("%Y%m%dT%H%M%SZ").to_string();
        let date = &timestamp[0..8];
        let region = &self.config.region;
        let scope = format!("{date}/{region}/{SERVICE}/aws4_request");

        // Path-style object URL under the configured endpoint
        let mut url = self.endpoint.clone();
        url.set_path(&format!("{}/{}", self.config.bucket, object.key()));

        let hostname = url
            .host_str()
            .ok_or_else(|| VaultError::Configuration("endpoint has no host".into()))?;
        let host = match url.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.to_string(),
        };

        // Only the host header is signed for a presigned GET
        let signed_headers = "host";
        let mut query_params: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()),
            ("X-Amz-Content-Sha256".into(), "UNSIGNED-PAYLOAD".into()),
            (
                "X-Amz-Credential".into(),
                format!("{}/{}", self.config.access_key_id, scope),
            ),
            ("X-Amz-Date".into(), timestamp.clone()),
            ("X-Amz-Expires".into(), CREDENTIAL_TTL_SECS.to_string()),
            ("X-Amz-SignedHeaders".into(), signed_headers.into()),
        ];
        query_params.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_query: String = query_params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "GET\n{}\n{}\nhost:{}\n\n{}\nUNSIGNED-PAYLOAD",
            percent_encode_path(url.path()),
            canonical_query,
            host,
            signed_headers
        );

        let digest = Sha256::digest(canonical_request.as_bytes());
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            timestamp,
            scope,
            hex_encode(&digest)
        );

        let key = derive_signing_key(&self.config.secret_access_key, date, region);
        let signature = sign_hex(&key, string_to_sign.as_bytes());

        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in &query_params {
                query.append_pair(k, v);
            }
            query.append_pair("X-Amz-Signature", &signature);
        }

        Ok(AccessCredential {
            object_reference: object.key(),
            signed_locator: url.to_string(),
            issued_at,
            expires_at: issued_at + Duration::seconds(CREDENTIAL_TTL_SECS),
        })
    }
}

/// SigV4 key derivation chain for the fixed "s3" service
fn derive_signing_key(secret_key: &str, date: &str, region: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, SERVICE.as_bytes());
    hmac_sha256(&service_key, b"aws4_request")
}

fn sign_hex(key: &[u8], message: &[u8]) -> String {
    hex_encode(&hmac_sha256(key, message))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(result, "{byte:02x}").unwrap();
    }
    result
}

/// Percent-encode a query component per SigV4 rules
fn percent_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                write!(result, "%{byte:02X}").unwrap();
            }
        }
    }
    result
}

/// Percent-encode a URL path, preserving slashes
fn percent_encode_path(path: &str) -> String {
    path.split('/')
        .map(percent_encode)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signer() -> UrlSigner {
        UrlSigner::new(SignerConfig {
            endpoint: "https://blobs.example.com:9000".into(),
            region: "us-east-1".into(),
            bucket: "course-media".into(),
            access_key_id: "AKIATEST".into(),
            secret_access_key: "secret123".into(),
        })
        .unwrap()
    }

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap()
    }

    fn signature_of(locator: &str) -> String {
        let url = Url::parse(locator).unwrap();
        url.query_pairs()
            .find(|(k, _)| k == "X-Amz-Signature")
            .map(|(_, v)| v.into_owned())
            .expect("locator carries a signature")
    }

    #[test]
    fn test_credential_window_is_fixed_at_24_hours() {
        let cred = signer().issue("videos/week1/day1.mp4").unwrap();
        assert_eq!(
            (cred.expires_at - cred.issued_at).num_seconds(),
            CREDENTIAL_TTL_SECS
        );
        assert!(cred.expires_at > cred.issued_at);
        assert!(cred.signed_locator.contains("X-Amz-Expires=86400"));
    }

    #[test]
    fn test_locator_carries_sigv4_parameters() {
        let cred = signer().issue_at("videos/intro.mp4", instant()).unwrap();
        let locator = &cred.signed_locator;

        assert!(locator.starts_with("https://blobs.example.com:9000/course-media/videos/intro.mp4?"));
        assert!(locator.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(locator.contains("X-Amz-Credential=AKIATEST%2F20260807%2Fus-east-1%2Fs3%2Faws4_request"));
        assert!(locator.contains("X-Amz-Date=20260807T120000Z"));
        assert!(locator.contains("X-Amz-SignedHeaders=host"));
        assert!(locator.contains("X-Amz-Signature="));
    }

    #[test]
    fn test_issuance_is_deterministic_for_equal_inputs() {
        let s = signer();
        let a = s.issue_at("videos/intro.mp4", instant()).unwrap();
        let b = s.issue_at("videos/intro.mp4", instant()).unwrap();
        assert_eq!(a.signed_locator, b.signed_locator);
    }

    #[test]
    fn test_signature_is_scoped_to_one_object() {
        let s = signer();
        let x = s.issue_at("videos/week1/day1.mp4", instant()).unwrap();
        let y = s.issue_at("videos/week1/day2.mp4", instant()).unwrap();
        assert_ne!(signature_of(&x.signed_locator), signature_of(&y.signed_locator));
    }

    #[test]
    fn test_signature_differs_across_secrets() {
        let a = signer();
        let b = UrlSigner::new(SignerConfig {
            secret_access_key: "other-secret".into(),
            endpoint: "https://blobs.example.com:9000".into(),
            region: "us-east-1".into(),
            bucket: "course-media".into(),
            access_key_id: "AKIATEST".into(),
        })
        .unwrap();

        let x = a.issue_at("videos/intro.mp4", instant()).unwrap();
        let y = b.issue_at("videos/intro.mp4", instant()).unwrap();
        assert_ne!(signature_of(&x.signed_locator), signature_of(&y.signed_locator));
    }

    #[test]
    fn test_secret_never_appears_in_locator() {
        let cred = signer().issue_at("videos/intro.mp4", instant()).unwrap();
        assert!(!cred.signed_locator.contains("secret123"));
    }

    #[test]
    fn test_malformed_reference_is_rejected() {
        let s = signer();
        assert!(matches!(
            s.issue(""),
            Err(VaultError::InvalidReference(_))
        ));
        assert!(matches!(
            s.issue("no-container"),
            Err(VaultError::InvalidReference(_))
        ));
        assert!(matches!(
            s.issue("videos/../state/catalog.json"),
            Err(VaultError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_incomplete_identity_refuses_construction() {
        let missing_secret = UrlSigner::new(SignerConfig {
            endpoint: "https://blobs.example.com".into(),
            region: "us-east-1".into(),
            bucket: "course-media".into(),
            access_key_id: "AKIATEST".into(),
            secret_access_key: String::new(),
        });
        assert!(matches!(missing_secret, Err(VaultError::Configuration(_))));

        let missing_account = UrlSigner::new(SignerConfig {
            endpoint: "https://blobs.example.com".into(),
            region: "us-east-1".into(),
            bucket: "course-media".into(),
            access_key_id: String::new(),
            secret_access_key: "secret123".into(),
        });
        assert!(matches!(missing_account, Err(VaultError::Configuration(_))));
    }
}
