use std::sync::Arc;

use tracing::info;

use aquarent_store::{FileStore, KeyValueStore, KeyringStore, MemoryStore};

use crate::error::ClientError;
use crate::settings::{StorageBackend, StorageConfig};

/// Opens the configured session store.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, ClientError> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => {
            let path = config.resolved_path()?;
            info!(backend = "file", path = %path.display(), "opening session store");
            Arc::new(FileStore::open(path).await?)
        }
        StorageBackend::Keyring => {
            info!(backend = "keyring", service = %config.service, "opening session store");
            Arc::new(KeyringStore::new(config.service.clone()))
        }
    };
    Ok(store)
}
