use crate::catalog::CatalogStore;
use crate::progress::ProgressLedger;
use crate::session::SessionStore;
use crate::signer::UrlSigner;
use crate::storage::StorageManager;
use std::sync::Arc;

/// Shared per-process state. Everything here is read-only after startup
/// and safe for unlimited concurrent readers; requests carry no shared
/// mutable state.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageManager>,
    pub signer: Option<Arc<UrlSigner>>,
    pub catalog: CatalogStore,
    pub ledger: ProgressLedger,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(storage: StorageManager, signer: Option<UrlSigner>) -> Self {
        let operator = storage.operator().clone();

        Self {
            storage: Arc::new(storage),
            signer: signer.map(Arc::new),
            catalog: CatalogStore::new(operator.clone()),
            ledger: ProgressLedger::new(operator.clone()),
            sessions: SessionStore::new(operator),
        }
    }
}
