//! Page configuration supplied by the server-rendered page as data attributes,
//! plus the runtime timing knobs of the flow. Configuration values are public;
//! nothing here is secret.

use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Interval between checks for the host completion callback.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// How long a manual sign-in may wait for the identity provider.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(120);
/// Timeout applied to the verify request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("verify-url is required when beginflow is set")]
    MissingVerifyUrl,
    #[error("invalid verify-url {value:?}: {reason}")]
    InvalidVerifyUrl { value: String, reason: String },
}

/// Flags and URLs the embedding page passes to parameterize the flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageConfiguration {
    pub begin_flow: bool,
    pub verify_url: Option<Url>,
    pub unverified_issuer: Option<String>,
    pub privacy_policy_url: Option<String>,
    pub terms_of_service_url: Option<String>,
    pub do_complete: bool,
}

impl PageConfiguration {
    /// Reads the configuration from `(name, value)` attribute pairs.
    ///
    /// Names match with or without the `data-` prefix and ignore case, so the
    /// pairs can come straight from the page body. Unknown attributes are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `verify-url` is malformed, or missing on a
    /// begin-flow page.
    pub fn from_attributes<'a, I>(attributes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        let mut verify_url = None;

        for (name, value) in attributes {
            let name = name.trim().to_ascii_lowercase();
            let key = name.strip_prefix("data-").unwrap_or(&name);

            match key {
                "beginflow" => config.begin_flow = data_truthy(value),
                "docomplete" => config.do_complete = data_truthy(value),
                "verify-url" => verify_url = normalize_value(value),
                "unverified-issuer" => config.unverified_issuer = normalize_value(value),
                "privacy-policy" => config.privacy_policy_url = normalize_value(value),
                "terms-of-service" => config.terms_of_service_url = normalize_value(value),
                _ => {}
            }
        }

        config.verify_url = verify_url.map(|value| parse_verify_url(&value)).transpose()?;
        config.validate()?;

        Ok(config)
    }

    /// Checks the cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns `MissingVerifyUrl` for a begin-flow page without a verify URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.begin_flow && self.verify_url.is_none() {
            return Err(ConfigError::MissingVerifyUrl);
        }
        Ok(())
    }
}

/// Timing used by the controller and its helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowOptions {
    pub poll_interval: Duration,
    pub login_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Parses a verify URL, keeping the original value in the error.
///
/// # Errors
///
/// Returns `InvalidVerifyUrl` when the value is not an absolute URL.
pub fn parse_verify_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|err| ConfigError::InvalidVerifyUrl {
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// Truthiness of a data attribute once the page has coerced it: booleans and
/// numbers are converted, any other non-empty string is true.
fn data_truthy(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    match value.to_ascii_lowercase().as_str() {
        "false" | "null" => false,
        "true" => true,
        other => other.parse::<f64>().map_or(true, |n| n != 0.0 && !n.is_nan()),
    }
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
