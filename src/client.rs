//! HTTP client for the sync server, used by the CLI commands.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::Config;
use crate::models::User;
use crate::sync::{ChangeSet, SyncResponse, SyncStatus};

/// Response to an OTP request. `otp` is present only when the server runs
/// in dev mode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequested {
    pub message: String,
    #[serde(default)]
    pub otp: Option<String>,
}

/// Response to a successful login or registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    error: String,
    message: String,
}

#[derive(Debug)]
pub enum ClientError {
    /// The request never completed (connection refused, timeout, ...).
    Http(reqwest::Error),
    /// The server answered with an error status.
    Api { status: u16, message: String },
    /// An authenticated call was made without a stored access token.
    MissingToken,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "request failed: {}", e),
            ClientError::Api { status, message } => {
                write!(f, "server error ({}): {}", status, message)
            }
            ClientError::MissingToken => {
                write!(f, "not logged in (run `fintrack login` first)")
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e)
    }
}

/// Thin typed wrapper over the server's HTTP API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.server_url.trim_end_matches('/').to_string(),
            token: config.access_token.clone(),
        }
    }

    pub async fn request_login_otp(&self, phone: &str) -> Result<OtpRequested, ClientError> {
        self.post_json(
            "/auth/request-login-otp",
            &serde_json::json!({ "phoneNumber": phone }),
        )
        .await
    }

    pub async fn request_registration_otp(&self, phone: &str) -> Result<OtpRequested, ClientError> {
        self.post_json(
            "/auth/request-registration-otp",
            &serde_json::json!({ "phoneNumber": phone }),
        )
        .await
    }

    pub async fn verify_login(&self, phone: &str, otp: &str) -> Result<AuthResponse, ClientError> {
        self.post_json(
            "/auth/verify-login-otp",
            &serde_json::json!({ "phoneNumber": phone, "otp": otp }),
        )
        .await
    }

    pub async fn register(
        &self,
        phone: &str,
        name: &str,
        otp: &str,
    ) -> Result<AuthResponse, ClientError> {
        self.post_json(
            "/auth/register",
            &serde_json::json!({ "phoneNumber": phone, "name": name, "otp": otp }),
        )
        .await
    }

    pub async fn sync_status(&self) -> Result<SyncStatus, ClientError> {
        let response = self
            .http
            .get(format!("{}/sync/status", self.base_url))
            .bearer_auth(self.token()?)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn changes(&self, since: DateTime<Utc>) -> Result<ChangeSet, ClientError> {
        let response = self
            .http
            .get(format!("{}/sync/changes", self.base_url))
            .query(&[("lastSync", since.to_rfc3339())])
            .bearer_auth(self.token()?)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn push(&self, batch: &ChangeSet) -> Result<SyncResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/sync", self.base_url))
            .bearer_auth(self.token()?)
            .json(batch)
            .send()
            .await?;
        Self::parse(response).await
    }

    fn token(&self) -> Result<&str, ClientError> {
        self.token.as_deref().ok_or(ClientError::MissingToken)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
