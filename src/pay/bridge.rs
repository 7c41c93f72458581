//! Identity provider bridge: the contract consumed from the third-party
//! identity client. `watch` registers persistent handlers that may fire at any
//! time, in any order, any number of times; `request` opens identity selection
//! and may never produce a callback at all.

use crate::pay::state::Event;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("identity provider rejected watch: {0}")]
    Watch(String),
    #[error("identity provider rejected request: {0}")]
    Request(String),
    #[error("request called before watch registered handlers")]
    NotWatching,
}

/// Opaque signed identity proof issued by the identity provider.
/// Passed through to the backend unmodified and never logged.
#[derive(Clone)]
pub struct Assertion(SecretString);

impl Assertion {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Returns the raw token for the verify request body.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl PartialEq for Assertion {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Assertion {}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Assertion(***)")
    }
}

/// Options passed to the identity selection flow.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub allow_unverified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
}

/// Login/logout callbacks registered through [`IdentityBridge::watch`].
/// Each callback posts an event to the flow controller; calls after the flow
/// has finished are silently dropped.
#[derive(Clone, Debug)]
pub struct BridgeHandlers {
    events: UnboundedSender<Event>,
}

impl BridgeHandlers {
    #[must_use]
    pub fn new(events: UnboundedSender<Event>) -> Self {
        Self { events }
    }

    pub fn on_login(&self, assertion: Assertion) {
        debug!("identity provider reported login");
        if self.events.send(Event::Login(assertion)).is_err() {
            debug!("flow finished, login ignored");
        }
    }

    pub fn on_logout(&self) {
        debug!("identity provider reported logout");
        if self.events.send(Event::Logout).is_err() {
            debug!("flow finished, logout ignored");
        }
    }
}

/// Third-party identity client.
pub trait IdentityBridge: Send {
    /// Registers the persistent login/logout handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot register the handlers.
    fn watch(&mut self, handlers: BridgeHandlers) -> Result<(), BridgeError>;

    /// Opens the user-facing identity selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider refuses to start selection.
    fn request(&mut self, options: &RequestOptions) -> Result<(), BridgeError>;
}

/// Bridge that answers with a fixed assertion: once on `watch` (the provider
/// remembering a previous login) and again on every `request`. Without an
/// assertion it behaves like a user who never finishes selection.
#[derive(Debug, Default)]
pub struct PresetBridge {
    assertion: Option<Assertion>,
    handlers: Option<BridgeHandlers>,
}

impl PresetBridge {
    #[must_use]
    pub fn new(assertion: Option<Assertion>) -> Self {
        Self {
            assertion,
            handlers: None,
        }
    }
}

impl IdentityBridge for PresetBridge {
    fn watch(&mut self, handlers: BridgeHandlers) -> Result<(), BridgeError> {
        if let Some(assertion) = &self.assertion {
            info!("auto-login with preset assertion");
            handlers.on_login(assertion.clone());
        }
        self.handlers = Some(handlers);
        Ok(())
    }

    fn request(&mut self, options: &RequestOptions) -> Result<(), BridgeError> {
        let handlers = self.handlers.as_ref().ok_or(BridgeError::NotWatching)?;
        debug!(?options, "identity selection requested");

        match &self.assertion {
            Some(assertion) => handlers.on_login(assertion.clone()),
            None => warn!("no preset assertion, identity selection will not complete"),
        }
        Ok(())
    }
}
