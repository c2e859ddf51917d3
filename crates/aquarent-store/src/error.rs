use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("keyring error: {message}")]
    Keyring { message: String },
    #[error("storage task failed: {0}")]
    Task(String),
}
