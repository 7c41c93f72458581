//! # webpay-flow (payment page sign-in and completion)
//!
//! `webpay-flow` drives the client side of the payment page: the buyer proves
//! identity through an external identity provider, the resulting assertion is
//! exchanged with the backend, and the page either moves to PIN entry or
//! navigates away to PIN creation.
//!
//! ## Sign-in
//!
//! 1. **Watch:** On a begin-flow page the identity provider bridge is watched for
//!    login and logout events.
//! 2. **Verify:** Each login assertion is posted to the verify endpoint.
//! 3. **Route:** `has_pin` selects PIN entry; otherwise the page navigates to
//!    the `pin_create` URL returned by the backend.
//!
//! ## Completion handshake
//!
//! When the page is rendered with `docomplete`, the embedding host eventually
//! injects a payment-success callback. The page checks for it every 500 ms and
//! invokes it exactly once.
//!
//! The state machine in [`pay::state`] is pure; [`pay::controller`] applies its
//! effects to the view, the bridge and the verifier.

pub mod cli;
pub mod pay;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
