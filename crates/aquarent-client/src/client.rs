use std::sync::Arc;
use std::time::Instant;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use aquarent_core::ApiResponse;

use crate::auth::AuthApi;
use crate::error::ClientError;
use crate::refresher::HttpTokenRefresher;
use crate::request::{parse_base_url, Attempt, PreparedRequest, RequestOptions};
use crate::session::Session;
use crate::settings::{ApiConfig, ClientConfig};
use crate::storage::open_store;

pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please check your connection and try again.";
pub const CONNECT_MESSAGE: &str = "Unable to reach the server. Please check your internet connection.";

/// Single point of contact with the backend.
///
/// Every verb returns `Ok(ApiResponse)` for anything the server or network
/// can do; `Err` only signals a malformed call site (bad url or header).
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<Session>) -> Result<Self, ClientError> {
        let http = build_http_client(config)?;
        Self::with_http_client(http, &config.base_url, session)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        session: Arc<Session>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            session,
        })
    }

    /// Wires storage, refresher and session from configuration and restores
    /// any persisted session.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let store = open_store(&config.storage).await?;
        let http = build_http_client(&config.api)?;
        let refresher =
            HttpTokenRefresher::new(http.clone(), &config.api.base_url, &config.api.refresh_path)?;
        let session = Arc::new(Session::new(store, Arc::new(refresher)));
        session.restore().await?;
        Self::with_http_client(http, &config.api.base_url, session)
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.request(Method::GET, path, None, options).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.request(Method::POST, path, body, options).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.request(Method::PUT, path, body, options).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.request(Method::PATCH, path, body, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.request(Method::DELETE, path, body, options).await
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ClientError> {
        let request = PreparedRequest::build(&self.base_url, method, path, body, options)?;
        Ok(self.dispatch(&request).await.decode())
    }

    async fn dispatch(&self, request: &PreparedRequest) -> ApiResponse<Value> {
        let attempt = Attempt::FIRST;
        let token = if request.skip_auth {
            None
        } else {
            self.session.access_token().await
        };
        let response = self.send_once(request, token.as_deref(), attempt).await;
        if request.skip_auth || !response.is_unauthorized() || !attempt.allows_refresh() {
            return response;
        }

        info!(
            method = %request.method,
            url = %request.log_url(),
            "http request unauthorized; refreshing access token"
        );
        let fresh = match self.session.refresh_access_token(token.as_deref()).await {
            Ok(fresh) => fresh,
            Err(err) => {
                warn!(
                    event = "session_expired",
                    method = %request.method,
                    url = %request.log_url(),
                    error = %err
                );
                return response;
            }
        };

        let retried = self.send_once(request, Some(&fresh), attempt.next()).await;
        if retried.is_unauthorized() {
            warn!(
                event = "session_rejected",
                method = %request.method,
                url = %request.log_url(),
                "request still unauthorized after refresh; ending session"
            );
            if let Err(err) = self.session.end().await {
                warn!(event = "session_clear_failed", error = %err);
            }
        }
        retried
    }

    async fn send_once(
        &self,
        request: &PreparedRequest,
        token: Option<&str>,
        attempt: Attempt,
    ) -> ApiResponse<Value> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method,
            url = %request.log_url(),
            attempt = attempt.number(),
            "http request"
        );
        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return self.transport_failure(request, err, start),
        };
        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => return self.transport_failure(request, err, start),
        };
        debug!(
            method = %request.method,
            url = %request.log_url(),
            status = %status,
            elapsed_ms = start.elapsed().as_millis(),
            "http response"
        );
        ApiResponse::from_http(status.as_u16(), &body)
    }

    fn transport_failure(
        &self,
        request: &PreparedRequest,
        err: reqwest::Error,
        start: Instant,
    ) -> ApiResponse<Value> {
        let message = describe_transport_error(err);
        debug!(
            method = %request.method,
            url = %request.log_url(),
            elapsed_ms = start.elapsed().as_millis(),
            error = %message,
            "http transport failure"
        );
        ApiResponse::from_transport_error(message)
    }
}

pub(crate) fn build_http_client(config: &ApiConfig) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder().timeout(config.timeout());
    if let Some(user_agent) = config.user_agent.as_deref() {
        builder = builder.user_agent(user_agent);
    }
    Ok(builder.build()?)
}

/// Message for a request that produced no usable response. The url is
/// stripped so query strings never reach the UI.
pub(crate) fn describe_transport_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        TIMEOUT_MESSAGE.to_string()
    } else if err.is_connect() {
        CONNECT_MESSAGE.to_string()
    } else {
        err.without_url().to_string()
    }
}
