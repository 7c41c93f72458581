//! Payment page flow: configuration, the sign-in state machine, and the
//! collaborators it drives. Assertions are identity material and must never be
//! logged; every type that carries one redacts it in `Debug`.

pub mod bridge;
pub mod completion;
pub mod config;
pub mod controller;
pub mod error;
pub mod state;
pub mod verifier;
pub mod view;

pub use self::bridge::{Assertion, BridgeHandlers, IdentityBridge, PresetBridge, RequestOptions};
pub use self::completion::{CompletionCallback, CompletionPoller, CompletionSlot, PollOutcome};
pub use self::config::{FlowOptions, PageConfiguration};
pub use self::controller::{FlowController, FlowHandle, FlowOutcome};
pub use self::error::{install_panic_reporter, FlowError};
pub use self::state::{Effect, Event, Flow, FlowState, Panel, UiState};
pub use self::verifier::{HttpVerifier, SessionVerifier, VerificationResult, VerifyError};
pub use self::view::{FieldType, TracingView, View};

/// Name of the input that receives the buyer's PIN.
pub const PIN_FIELD: &str = "pin";

/// Placeholder shown in PIN inputs.
pub const PIN_PLACEHOLDER: &str = "****";
