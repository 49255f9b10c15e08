use crate::reference::{STATE_CONTAINER, is_safe_identifier};
use opendal::{ErrorKind, Operator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A user's current position in the week/day-ordered curriculum.
///
/// Markers are totally ordered lexicographically on `(week, day)`. The
/// ledger is an external system of record; this process only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMarker {
    pub current_week: i64,
    pub current_day: i64,
}

impl ProgressMarker {
    /// Both fields must be at least 1 for the marker to grant anything
    pub fn is_valid(&self) -> bool {
        self.current_week >= 1 && self.current_day >= 1
    }

    /// Whether a lesson unlocking at `(week, day)` is reachable from this
    /// position: every prior week fully, the current week up to today
    pub fn permits(&self, week: i64, day: i64) -> bool {
        week < self.current_week || (week == self.current_week && day <= self.current_day)
    }
}

/// Read-only accessor for per-user progress documents
#[derive(Clone)]
pub struct ProgressLedger {
    operator: Operator,
}

impl ProgressLedger {
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// Fetch the caller's marker; any condition that prevents verifying
    /// progress yields `None`, never an error
    pub async fn progress_for(&self, user_id: &str) -> Option<ProgressMarker> {
        if !is_safe_identifier(user_id) {
            warn!(%user_id, "Refusing progress lookup for unsafe user id");
            return None;
        }

        let key = format!("{STATE_CONTAINER}/progress/{user_id}.json");
        match self.operator.read(&key).await {
            Ok(buffer) => match serde_json::from_slice::<ProgressMarker>(&buffer.to_bytes()) {
                Ok(marker) => Some(marker),
                Err(error) => {
                    warn!(%key, %error, "Malformed progress document, treating as no progress");
                    None
                }
            },
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(%user_id, "No progress marker recorded");
                None
            }
            Err(error) => {
                warn!(%key, %error, "Progress ledger read failed, treating as no progress");
                None
            }
        }
    }
}
