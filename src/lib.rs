pub mod api;
pub mod app_state;
pub mod catalog;
pub mod config;
pub mod entitlements;
pub mod error;
pub mod gate;
pub mod progress;
pub mod reference;
pub mod session;
pub mod signer;
pub mod storage;

use anyhow::bail;
use axum::Router;
use axum::extract::Extension;
use axum::routing::get;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tracing::info;

//
// Re-export
//
pub use api::{deliver, get_entitlements, healthz, log_request_errors, resolve_identity};
pub use app_state::AppState;
pub use catalog::{CatalogEntry, CatalogStore};
pub use config::Config;
pub use entitlements::{EntitlementRow, entitlements_for};
pub use error::VaultError;
pub use gate::unlocked;
pub use progress::{ProgressLedger, ProgressMarker};
pub use reference::ObjectRef;
pub use session::{Caller, SessionStore};
pub use signer::{AccessCredential, CREDENTIAL_TTL_SECS, SignerConfig, UrlSigner};
pub use storage::{StorageBackend, StorageConfig, StorageManager};

pub async fn run(config: Config) -> anyhow::Result<()> {
    let workspace = PathBuf::from(&config.workspace);

    // Configure storage backend
    let storage_backend = match config.storage_backend.as_str() {
        "local" => {
            info!("Using local filesystem storage");
            StorageBackend::Local
        }
        "s3" => {
            info!("Using S3 storage backend");
            let Some(s3_config) = config.to_s3_config() else {
                bail!("S3 configuration is required when using S3 backend");
            };
            StorageBackend::S3 {
                bucket: s3_config.bucket,
                endpoint: s3_config.endpoint,
                region: s3_config.region,
                access_key_id: s3_config.access_key_id,
                secret_access_key: s3_config.secret_access_key,
            }
        }
        backend => {
            bail!("Unsupported storage backend: {backend}. Use 'local' or 's3'");
        }
    };

    let storage_manager = StorageManager::new(StorageConfig {
        backend: storage_backend,
        workspace,
    })
    .await?;

    // An incomplete signing identity is fatal here; a wholly absent one
    // degrades entitlements to unsigned references
    let signer = match config.to_signer_config() {
        Some(signer_config) => Some(UrlSigner::new(signer_config)?),
        None => {
            info!("No signing identity configured, entitlements degrade to unsigned references");
            None
        }
    };

    let state = AppState::new(storage_manager, signer);

    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/entitlements", get(get_entitlements))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            resolve_identity,
        ))
        .route("/deliver", get(deliver))
        .route("/healthz", get(healthz))
        .layer(axum::middleware::from_fn(log_request_errors))
        .layer(cors)
        .layer(Extension(state));

    let addr = format!("0.0.0.0:{}", config.listen_on_port);
    info!("Listening on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
