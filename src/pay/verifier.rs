//! Session verification against the payment backend. The assertion is posted
//! as a form field to the verify URL; the JSON answer decides whether the buyer
//! already has a PIN. Assertions are never logged.

use crate::{pay::bridge::Assertion, APP_USER_AGENT};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument};
use url::Url;

/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Unable to reach the server: {0}")]
    Network(String),
    #[error("Request timed out. Please try again.")]
    Timeout,
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Client(String),
}

/// What the backend decided about the verified buyer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationResult {
    /// The buyer has a PIN and should enter it.
    HasPin,
    /// The buyer has no PIN yet; the page must navigate to `url`.
    CreatePin { url: Url },
}

/// Response body of the verify endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VerifyResponse {
    /// Read from session state on the backend, so it may be `null`.
    #[serde(default)]
    pub has_pin: Option<bool>,
    #[serde(default)]
    pub pin_create: Option<String>,
}

impl VerifyResponse {
    /// Converts the wire shape, resolving a relative `pin_create` against the
    /// verify URL.
    ///
    /// # Errors
    ///
    /// Returns `Parse` when the buyer has no PIN and `pin_create` is missing or
    /// not a URL.
    pub fn into_result(self, base: &Url) -> Result<VerificationResult, VerifyError> {
        if self.has_pin.unwrap_or(false) {
            return Ok(VerificationResult::HasPin);
        }

        let target = self
            .pin_create
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| VerifyError::Parse("missing pin_create in response".to_string()))?;

        base.join(target)
            .map(|url| VerificationResult::CreatePin { url })
            .map_err(|err| VerifyError::Parse(format!("invalid pin_create {target:?}: {err}")))
    }
}

/// Exchanges an assertion for a verification result.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Verifies `assertion` with the backend.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, timeout, non-2xx status, or an
    /// undecodable body.
    async fn verify(&self, assertion: &Assertion) -> Result<VerificationResult, VerifyError>;
}

/// [`SessionVerifier`] backed by a single HTTP POST.
#[derive(Clone, Debug)]
pub struct HttpVerifier {
    client: Client,
    verify_url: Url,
}

impl HttpVerifier {
    /// Builds a verifier with the crate user agent and `timeout` per request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(verify_url: Url, timeout: Duration) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| VerifyError::Client(format!("Failed to build client: {err}")))?;

        Ok(Self { client, verify_url })
    }
}

#[async_trait]
impl SessionVerifier for HttpVerifier {
    #[instrument(skip_all, fields(url = %self.verify_url))]
    async fn verify(&self, assertion: &Assertion) -> Result<VerificationResult, VerifyError> {
        debug!("verifying assertion");

        let response = self
            .client
            .post(self.verify_url.clone())
            .form(&[("assertion", assertion.expose())])
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("verification failed: {}", status);
            return Err(VerifyError::Http {
                status: status.as_u16(),
                message: sanitize_body(&body),
            });
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|err| VerifyError::Parse(format!("Failed to decode response: {err}")))?;

        let result = body.into_result(&self.verify_url)?;
        info!(has_pin = matches!(result, VerificationResult::HasPin), "login success");

        Ok(result)
    }
}

/// Maps transport errors, keeping timeouts distinct.
fn map_request_error(err: reqwest::Error) -> VerifyError {
    if err.is_timeout() {
        VerifyError::Timeout
    } else {
        VerifyError::Network(err.to_string())
    }
}

/// Trims and truncates error bodies before they reach the UI.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://pay.example/mozpay/auth/verify").unwrap()
    }

    #[test]
    fn has_pin_true_wins_over_pin_create() {
        let response = VerifyResponse {
            has_pin: Some(true),
            pin_create: Some("/mozpay/pin/create".to_string()),
        };
        assert_eq!(
            response.into_result(&base()).unwrap(),
            VerificationResult::HasPin
        );
    }

    #[test]
    fn null_has_pin_means_create() {
        let response: VerifyResponse =
            serde_json::from_str(r#"{"has_pin": null, "pin_create": "/mozpay/pin/create"}"#)
                .unwrap();
        assert_eq!(
            response.into_result(&base()).unwrap(),
            VerificationResult::CreatePin {
                url: Url::parse("https://pay.example/mozpay/pin/create").unwrap()
            }
        );
    }

    #[test]
    fn absolute_pin_create_is_kept() {
        let response = VerifyResponse {
            has_pin: Some(false),
            pin_create: Some("https://x/create".to_string()),
        };
        assert_eq!(
            response.into_result(&base()).unwrap(),
            VerificationResult::CreatePin {
                url: Url::parse("https://x/create").unwrap()
            }
        );
    }

    #[test]
    fn missing_pin_create_is_parse_error() {
        let response = VerifyResponse {
            has_pin: Some(false),
            pin_create: Some("  ".to_string()),
        };
        assert!(matches!(
            response.into_result(&base()),
            Err(VerifyError::Parse(_))
        ));
    }

    #[test]
    fn sanitize_body_trims_and_truncates() {
        assert_eq!(sanitize_body("   "), "Request failed.");
        assert_eq!(sanitize_body("  bad request \n"), "bad request");
        assert_eq!(sanitize_body(&"x".repeat(500)).len(), MAX_ERROR_CHARS);
    }

    #[test]
    fn verify_error_messages_are_user_facing() {
        let err = VerifyError::Http {
            status: 400,
            message: "Request failed.".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed (400): Request failed.");
        assert_eq!(
            VerifyError::Timeout.to_string(),
            "Request timed out. Please try again."
        );
    }
}
