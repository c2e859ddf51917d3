use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use aquarent_core::{
    paths, ApiResponse, AuthSession, LogoutRequest, SendOtpRequest, UserProfile, VerifyOtpRequest,
    UNEXPECTED_FORMAT_MESSAGE,
};

use crate::client::ApiClient;
use crate::error::ClientError;
use crate::request::RequestOptions;

pub const SESSION_SAVE_FAILED_MESSAGE: &str = "Signed in, but the session could not be saved";

/// `/auth/me` answers either with the user itself or with `{ "user": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserPayload {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

impl UserPayload {
    fn into_profile(self) -> UserProfile {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}

/// Phone/OTP sign-in and the session lifecycle built on top of it.
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn send_otp(&self, phone: &str) -> Result<ApiResponse<Value>, ClientError> {
        let body = serde_json::to_value(SendOtpRequest {
            phone: phone.to_string(),
        })?;
        self.client
            .post(paths::SEND_OTP, Some(body), RequestOptions::new().without_auth())
            .await
    }

    /// Verifies the code and, on success, persists the issued tokens and
    /// the returned user.
    pub async fn verify_otp(
        &self,
        phone: &str,
        otp: &str,
    ) -> Result<ApiResponse<UserProfile>, ClientError> {
        let body = serde_json::to_value(VerifyOtpRequest {
            phone: phone.to_string(),
            otp: otp.to_string(),
        })?;
        let response: ApiResponse<AuthSession> = self
            .client
            .post(paths::VERIFY_OTP, Some(body), RequestOptions::new().without_auth())
            .await?;

        let ApiResponse {
            success,
            data,
            message,
            error,
            status,
        } = response;
        if !success {
            return Ok(ApiResponse {
                success,
                data: None,
                message,
                error,
                status,
            });
        }
        let Some(session) = data else {
            return Ok(ApiResponse::failure(UNEXPECTED_FORMAT_MESSAGE, status));
        };

        if let Err(err) = self
            .client
            .session()
            .establish(&session.tokens, session.user.as_ref())
            .await
        {
            warn!(event = "session_save_failed", error = %err);
            return Ok(ApiResponse::failure(SESSION_SAVE_FAILED_MESSAGE, status));
        }
        Ok(ApiResponse::ok(session.user, message, status))
    }

    /// Fetches the current user and overwrites the cached snapshot.
    pub async fn refresh_user(&self) -> Result<ApiResponse<UserProfile>, ClientError> {
        let response: ApiResponse<UserPayload> = self
            .client
            .get(paths::CURRENT_USER, RequestOptions::new())
            .await?;
        let response = response.map(UserPayload::into_profile);
        if let Some(profile) = response.data.as_ref() {
            if let Err(err) = self.client.session().store_profile(profile).await {
                warn!(event = "profile_cache_failed", error = %err);
            }
        }
        Ok(response)
    }

    pub async fn cached_user(&self) -> Option<UserProfile> {
        self.client.session().cached_profile().await
    }

    /// Tells the backend (best effort) and clears local credentials.
    /// Calling it while signed out only clears storage again.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let session = self.client.session();
        let refresh_token = session.refresh_token().await.unwrap_or_else(|err| {
            warn!(event = "token_read_failed", error = %err);
            None
        });
        let signed_in = refresh_token.is_some() || session.access_token().await.is_some();

        if signed_in {
            let body = serde_json::to_value(LogoutRequest { refresh_token })?;
            let response: ApiResponse<Value> = self
                .client
                .post(paths::LOGOUT, Some(body), RequestOptions::new())
                .await?;
            if !response.success {
                debug!(error = %response.error_message(), "server logout failed; clearing locally");
            }
        }

        session.end().await?;
        Ok(())
    }
}
