use crate::error::VaultError;
use crate::reference::STATE_CONTAINER;
use chrono::{DateTime, Utc};
use opendal::{ErrorKind, Operator};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One video in the curriculum, tagged with the week/day at which it
/// becomes unlockable. Several entries may share a `(week, day)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub week: i64,
    pub day: i64,
    pub object_reference: String,
    pub created_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Rows with a week or day below 1 are bad data from the external
    /// store and must never unlock
    pub fn is_valid(&self) -> bool {
        self.week >= 1 && self.day >= 1
    }
}

/// Read-only accessor for the published catalog document
#[derive(Clone)]
pub struct CatalogStore {
    operator: Operator,
}

impl CatalogStore {
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    fn catalog_key() -> String {
        format!("{STATE_CONTAINER}/catalog.json")
    }

    /// Load the full catalog in document order. An unpublished catalog is
    /// empty, not an error; an unreadable one is a backend failure.
    pub async fn list(&self) -> Result<Vec<CatalogEntry>, VaultError> {
        let key = Self::catalog_key();
        match self.operator.read(&key).await {
            Ok(buffer) => serde_json::from_slice(&buffer.to_bytes()).map_err(|error| {
                VaultError::BackendUnavailable(format!("malformed catalog document: {error}"))
            }),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("No catalog document published yet");
                Ok(Vec::new())
            }
            Err(error) => Err(VaultError::BackendUnavailable(error.to_string())),
        }
    }
}
