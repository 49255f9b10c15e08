use crate::error::VaultError;

/// Container that holds the catalog, progress, and session documents.
/// References into it are never served.
pub const STATE_CONTAINER: &str = "state";

const MAX_REFERENCE_LEN: usize = 1024;

/// A validated storage object locator of the form `container/path`.
///
/// The backend's native addressing never leaves the process; callers only
/// ever see the opaque reference string or a signed locator minted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    container: String,
    object: String,
}

impl ObjectRef {
    /// Parse and validate a raw reference string
    pub fn parse(reference: &str) -> Result<Self, VaultError> {
        if reference.is_empty() {
            return Err(VaultError::InvalidReference("empty reference".into()));
        }
        if reference.len() > MAX_REFERENCE_LEN {
            return Err(VaultError::InvalidReference("reference too long".into()));
        }
        if !reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
        {
            return Err(VaultError::InvalidReference(format!(
                "unsupported characters in {reference:?}"
            )));
        }
        if reference.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return Err(VaultError::InvalidReference(format!(
                "malformed path in {reference:?}"
            )));
        }

        let Some((container, object)) = reference.split_once('/') else {
            return Err(VaultError::InvalidReference(format!(
                "missing container in {reference:?}"
            )));
        };

        if container == STATE_CONTAINER {
            return Err(VaultError::InvalidReference(format!(
                "reserved container in {reference:?}"
            )));
        }

        Ok(Self {
            container: container.to_string(),
            object: object.to_string(),
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// Full backend key, `container/object`
    pub fn key(&self) -> String {
        format!("{}/{}", self.container, self.object)
    }
}

/// Basic hygiene for identifiers that become path segments of state
/// documents (user ids, session tokens)
pub(crate) fn is_safe_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 128
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}
