use aquarent_store::StoreError;
use thiserror::Error;

/// Call-site and setup failures. Ordinary HTTP failures never surface here;
/// they come back as a failed `ApiResponse`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// Why a token refresh did not produce a new access token.
///
/// `Clone` because a single refresh outcome is handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("no refresh token stored; sign in again")]
    MissingRefreshToken,
    #[error("refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh response malformed: {0}")]
    Malformed(String),
    #[error("session storage failed: {0}")]
    Storage(String),
    #[error("refresh task aborted: {0}")]
    Aborted(String),
}

impl From<StoreError> for RefreshError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
