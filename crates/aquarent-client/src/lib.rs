#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

pub mod auth;
pub mod client;
pub mod error;
pub mod refresher;
pub mod request;
pub mod session;
pub mod settings;
pub mod storage;
pub mod telemetry;

pub use auth::AuthApi;
pub use client::{ApiClient, CONNECT_MESSAGE, TIMEOUT_MESSAGE};
pub use error::{ClientError, RefreshError};
pub use refresher::{HttpTokenRefresher, TokenRefresher};
pub use request::{Attempt, RequestOptions};
pub use session::{Session, SessionState};
pub use settings::{ApiConfig, ClientConfig, StorageBackend, StorageConfig};
pub use storage::open_store;
pub use telemetry::init_logging;

pub use aquarent_core::{ApiResponse, TokenPair, UserProfile};
pub use aquarent_store::{KeyValueStore, StoreError};
