//! Backend client.
//!
//! DESIGN
//! ======
//! `MonitorApi` is the seam between the dashboard and the monitoring
//! backend. The HTTP implementation is a thin `reqwest` wrapper: every call
//! is a single request, non-2xx is a failure, and timeouts come from config.
//! Retrying is left to the polling cadence.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::participant::{StatusResponse, StatusSnapshot, UserEntry};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (connect, timeout, TLS).
    #[error("request to {path} failed: {message}")]
    Request { path: String, message: String },

    /// The backend answered with a non-success status.
    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    /// The response body was not the expected JSON.
    #[error("{path} returned an unreadable body: {message}")]
    Decode { path: String, message: String },
}

impl ApiError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Request { .. } => "E_API_REQUEST",
            Self::Status { .. } => "E_API_STATUS",
            Self::Decode { .. } => "E_API_DECODE",
        }
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Request { .. } | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Operations the dashboard needs from the monitoring backend.
#[async_trait::async_trait]
pub trait MonitorApi: Send + Sync {
    /// `GET /status`.
    async fn status(&self) -> Result<StatusSnapshot, ApiError>;

    /// `GET /users.json`, undecoded entries in backend order.
    async fn users(&self) -> Result<Vec<UserEntry>, ApiError>;

    /// `POST /switch-video`.
    async fn switch_video(&self, video_id: &str) -> Result<(), ApiError>;

    /// `POST /pull`.
    async fn pull(&self) -> Result<(), ApiError>;

    /// `POST /reset`.
    async fn reset(&self) -> Result<(), ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request: Duration,
    pub connect: Duration,
}

pub struct HttpMonitorApi {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwitchVideoBody<'a> {
    video_id: &'a str,
}

impl HttpMonitorApi {
    /// Build a client for `base_url` (trailing slashes are ignored).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the TLS backend fails to
    /// initialise.
    pub fn new(base_url: &str, timeouts: ApiTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request)
            .connect_timeout(timeouts.connect)
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(path, self.http.get(self.url(path))).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode { path: path.to_owned(), message: e.to_string() })
    }

    async fn post(&self, path: &str, request: reqwest::RequestBuilder) -> Result<(), ApiError> {
        self.send(path, request).await.map(|_| ())
    }

    async fn send(&self, path: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request { path: path.to_owned(), message: e.to_string() })?;

        let status = response.status();
        debug!(path, status = status.as_u16(), "backend responded");
        if !status.is_success() {
            return Err(ApiError::Status { path: path.to_owned(), status: status.as_u16() });
        }
        Ok(response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl MonitorApi for HttpMonitorApi {
    async fn status(&self) -> Result<StatusSnapshot, ApiError> {
        let raw: StatusResponse = self.get_json("/status").await?;
        Ok(raw.into())
    }

    async fn users(&self) -> Result<Vec<UserEntry>, ApiError> {
        let path = "/users.json";
        // Backends with no session yet send `null` (or no array at all).
        let body: serde_json::Value = self.get_json(path).await?;
        if !body.is_array() {
            debug!(path, "users body is not an array; treating as empty");
            return Ok(Vec::new());
        }
        serde_json::from_value(body).map_err(|e| ApiError::Decode { path: path.to_owned(), message: e.to_string() })
    }

    async fn switch_video(&self, video_id: &str) -> Result<(), ApiError> {
        let path = "/switch-video";
        let request = self.http.post(self.url(path)).json(&SwitchVideoBody { video_id });
        self.post(path, request).await
    }

    async fn pull(&self) -> Result<(), ApiError> {
        let path = "/pull";
        self.post(path, self.http.post(self.url(path))).await
    }

    async fn reset(&self) -> Result<(), ApiError> {
        let path = "/reset";
        self.post(path, self.http.post(self.url(path))).await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
