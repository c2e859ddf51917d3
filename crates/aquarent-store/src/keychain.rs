use async_trait::async_trait;
use tokio::task;
use tracing::warn;

use crate::{KeyValueStore, StoreError};

/// OS credential store, one entry per key under a shared service name.
///
/// Batches are applied key by key since the platform keychains offer no
/// multi-entry transaction. When one key fails, the keys already written
/// in that batch are put back to their previous values (best effort).
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    async fn run<T, F>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let account = key.to_string();
        task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &account).map_err(keyring_error)?;
            op(entry).map_err(keyring_error)
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }
}

fn keyring_error(err: keyring::Error) -> StoreError {
    StoreError::Keyring {
        message: err.to_string(),
    }
}

#[async_trait]
impl KeyValueStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.run(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.to_string();
        self.run(key, move |entry| entry.set_password(&value)).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let result = self
            .run(key, |entry| match entry.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(err) => Err(err),
            })
            .await;
        if let Err(err) = &result {
            warn!(service = %self.service, key, "failed to delete keyring entry: {err}");
        }
        result
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let batch: Vec<(&str, Option<&str>)> =
            entries.iter().map(|(key, value)| (*key, Some(*value))).collect();
        apply_batch(self, &batch).await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let batch: Vec<(&str, Option<&str>)> = keys.iter().map(|key| (*key, None)).collect();
        apply_batch(self, &batch).await
    }
}

/// Applies `(key, Some(value))` writes and `(key, None)` removals in order.
/// On failure, restores the snapshot of every key touched before it.
async fn apply_batch<S>(store: &S, batch: &[(&str, Option<&str>)]) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
{
    let keys: Vec<&str> = batch.iter().map(|(key, _)| *key).collect();
    let previous = store.get_many(&keys).await?;

    for (index, (key, value)) in batch.iter().enumerate() {
        let result = match value {
            Some(value) => store.set(key, value).await,
            None => store.remove(key).await,
        };
        if let Err(err) = result {
            for (key, old) in keys[..index].iter().zip(&previous[..index]) {
                let restored = match old {
                    Some(old) => store.set(key, old).await,
                    None => store.remove(key).await,
                };
                if let Err(restore_err) = restored {
                    warn!(key, error = %restore_err, "failed to roll back keyring entry");
                }
            }
            return Err(err);
        }
    }
    Ok(())
}
