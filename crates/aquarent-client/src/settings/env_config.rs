use tracing::warn;

use super::{ClientConfig, StorageBackend};

/// Applies `AQUARENT_*` overrides. `lookup` returns the raw value of a
/// variable; invalid values are logged and ignored.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("AQUARENT_API_URL") {
        if value.trim().is_empty() {
            warn!(event = "config_invalid", field = "AQUARENT_API_URL", value = %value);
        } else {
            config.api.base_url = value.trim().to_string();
        }
    }
    if let Some(value) = lookup("AQUARENT_HTTP_TIMEOUT_SECS") {
        match value.trim().parse::<u64>() {
            Ok(seconds) if seconds > 0 => config.api.timeout_secs = seconds,
            _ => {
                warn!(
                    event = "config_invalid",
                    field = "AQUARENT_HTTP_TIMEOUT_SECS",
                    value = %value
                );
            }
        }
    }
    if let Some(value) = lookup("AQUARENT_REFRESH_PATH") {
        if value.trim().is_empty() {
            warn!(event = "config_invalid", field = "AQUARENT_REFRESH_PATH", value = %value);
        } else {
            config.api.refresh_path = value.trim().to_string();
        }
    }
    if let Some(value) = lookup("AQUARENT_STORAGE") {
        if let Some(backend) = parse_backend(&value) {
            config.storage.backend = backend;
        } else {
            warn!(event = "config_invalid", field = "AQUARENT_STORAGE", value = %value);
        }
    }
    if let Some(value) = lookup("AQUARENT_STORAGE_PATH") {
        config.storage.path = Some(value);
    }
}

fn parse_backend(value: &str) -> Option<StorageBackend> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "memory" | "in_memory" => Some(StorageBackend::Memory),
        "file" => Some(StorageBackend::File),
        "keyring" | "keychain" => Some(StorageBackend::Keyring),
        _ => None,
    }
}
