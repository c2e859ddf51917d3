use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;

use crate::error::ClientError;

/// Per-call transport settings.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    timeout: Option<Duration>,
    skip_auth: bool,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn opt_param<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Overrides the client-wide timeout for this call.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends the call without a bearer token and never refreshes on 401.
    /// Used for the sign-in endpoints.
    #[must_use]
    pub fn without_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// Which try of a logical request is being sent. Only the first try may
/// trigger a token refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt(u8);

impl Attempt {
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub fn number(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    #[must_use]
    pub fn allows_refresh(self) -> bool {
        self == Self::FIRST
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    pub skip_auth: bool,
}

impl PreparedRequest {
    pub fn build(
        base: &Url,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Self, ClientError> {
        let mut url = join_url(base, path)?;
        // Credentials and the 401 contract belong to the backend origin only.
        let foreign = url.origin() != base.origin();
        if !options.params.is_empty() {
            url.query_pairs_mut().extend_pairs(options.params.iter());
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::InvalidHeader { name: name.clone() })?;
            headers.append(header_name, header_value);
        }

        Ok(Self {
            method,
            url,
            headers,
            body,
            timeout: options.timeout,
            skip_auth: options.skip_auth || foreign,
        })
    }

    /// Url without query string, safe to log.
    pub fn log_url(&self) -> &str {
        let full = self.url.as_str();
        full.split('?').next().unwrap_or(full)
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|err| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: "not a base url".to_string(),
        });
    }
    Ok(url)
}

/// Appends `path` to the base url, keeping any path prefix the base has.
/// Absolute urls are used as-is; off-origin ones are sent unauthenticated.
pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url, ClientError> {
    let raw = if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };
    Url::parse(&raw).map_err(|err| ClientError::InvalidUrl {
        url: raw.clone(),
        reason: err.to_string(),
    })
}
