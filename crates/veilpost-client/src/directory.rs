//! Directory-write endpoint client.
//!
//! The directory maps a user identity to their current public key so other
//! parties can discover it. This module covers only the write side; the
//! recipient-lookup read path belongs to the message-send collaborator.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::RegistrationError;

/// Directory response to a key registration.
///
/// `Conflict` (key already registered) and `NotFound` (older server
/// deployment without the endpoint) are part of the contract and non-fatal;
/// callers proceed as if registration completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The directory accepted the key.
    Accepted,
    /// The directory already holds this key.
    Conflict,
    /// The directory endpoint does not exist on this deployment.
    NotFound,
}

/// Write access to the server-side key directory.
///
/// Registering the same key twice must not error (idempotent endpoint).
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    /// Publish the device public key under the authenticated user identity.
    async fn register(&self, public_key_text: &str) -> Result<RegisterOutcome, RegistrationError>;
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    public_key: &'a str,
}

/// Directory client over HTTPS.
pub struct HttpDirectory {
    base_url: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl HttpDirectory {
    /// Create a client for the directory at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegistrationError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| RegistrationError::Network { reason: e.to_string() })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
            client,
        })
    }

    /// Attach the session's bearer token to every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn keys_url(&self) -> String {
        format!("{}/v1/keys", self.base_url)
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn register(&self, public_key_text: &str) -> Result<RegisterOutcome, RegistrationError> {
        let mut request = self
            .client
            .post(self.keys_url())
            .json(&RegisterRequest { public_key: public_key_text });
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistrationError::Network { reason: e.to_string() })?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
                Ok(RegisterOutcome::Accepted)
            },
            StatusCode::CONFLICT => Ok(RegisterOutcome::Conflict),
            StatusCode::NOT_FOUND => Ok(RegisterOutcome::NotFound),
            status => {
                let reason = response.text().await.unwrap_or_default();
                Err(RegistrationError::Rejected { status: status.as_u16(), reason })
            },
        }
    }
}
