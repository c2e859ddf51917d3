use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use aquarent_core::{ApiResponse, RefreshGrant, RefreshRequest, UNEXPECTED_FORMAT_MESSAGE};

use crate::client::describe_transport_error;
use crate::error::{ClientError, RefreshError};
use crate::request::{join_url, parse_base_url};

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, RefreshError>;
}

/// Calls the backend refresh endpoint directly, bypassing the
/// authenticated client so a rejected refresh can never recurse.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    url: Url,
}

impl HttpTokenRefresher {
    pub fn new(http: reqwest::Client, base_url: &str, path: &str) -> Result<Self, ClientError> {
        let base = parse_base_url(base_url)?;
        let url = join_url(&base, path)?;
        Ok(Self { http, url })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, RefreshError> {
        let payload = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        debug!(url = %self.url, "token refresh request");
        let response = self
            .http
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|err| RefreshError::Transport(describe_transport_error(err)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| RefreshError::Transport(describe_transport_error(err)))?;

        let envelope = ApiResponse::from_http(status, &body);
        if !envelope.success {
            let message = envelope.error_message().to_string();
            if (200..300).contains(&status) {
                return Err(RefreshError::Malformed(message));
            }
            return Err(RefreshError::Rejected { status, message });
        }

        let grant = envelope
            .decode::<RefreshGrant>()
            .into_result()
            .map_err(RefreshError::Malformed)?
            .ok_or_else(|| RefreshError::Malformed(UNEXPECTED_FORMAT_MESSAGE.to_string()))?;
        if grant.access_token.trim().is_empty() {
            return Err(RefreshError::Malformed("empty access token".to_string()));
        }
        Ok(grant)
    }
}
