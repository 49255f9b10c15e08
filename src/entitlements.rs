use crate::app_state::AppState;
use crate::error::VaultError;
use crate::gate::unlocked;
use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const ISSUE_CONCURRENCY: usize = 8;

/// Wire form of one entitlement: catalog metadata plus, when a signer is
/// configured and issuance succeeded, a signed locator. An entry without
/// a `url` is metadata only; its `ref` can still be handed to the
/// delivery proxy by callers holding a session-scoped right to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementRow {
    pub id: String,
    pub week: i64,
    pub day: i64,
    #[serde(rename = "ref")]
    pub object_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Compute the caller's entitlement view: progress -> catalog -> gate ->
/// one credential per surviving entry.
///
/// Anonymous callers and callers without a progress marker get the empty
/// view. A single failed issuance drops that entry and keeps the rest.
pub async fn entitlements_for(
    state: &AppState,
    caller: Option<&str>,
) -> Result<Vec<EntitlementRow>, VaultError> {
    let Some(user_id) = caller else {
        debug!("Anonymous caller, empty entitlement view");
        return Ok(Vec::new());
    };

    let Some(marker) = state.ledger.progress_for(user_id).await else {
        return Ok(Vec::new());
    };

    let catalog = state.catalog.list().await?;
    let permitted = unlocked(&catalog, Some(&marker));
    info!(
        user_id,
        unlocked = permitted.len(),
        catalog = catalog.len(),
        "Computed unlockable catalog subset"
    );

    let rows = stream::iter(permitted)
        .map(|entry| {
            let signer = state.signer.clone();
            async move {
                let url = match &signer {
                    None => None,
                    Some(signer) => match signer.issue_url(&entry.object_reference) {
                        Ok(url) => Some(url),
                        Err(error) => {
                            warn!(
                                entry_id = %entry.id,
                                %error,
                                "Dropping entry, credential issuance failed"
                            );
                            return None;
                        }
                    },
                };

                Some(EntitlementRow {
                    id: entry.id,
                    week: entry.week,
                    day: entry.day,
                    object_reference: entry.object_reference,
                    url,
                })
            }
        })
        .buffered(ISSUE_CONCURRENCY)
        .filter_map(|row| async move { row })
        .collect::<Vec<_>>()
        .await;

    Ok(rows)
}
