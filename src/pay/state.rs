//! Sign-in state machine for the payment page.
//!
//! [`transition`] is pure: it maps the current [`Flow`] and an [`Event`] to the
//! next flow and the list of [`Effect`]s the controller must perform. Nothing
//! here touches the view, the network, or timers.
//!
//! ```text
//! Init ──Start──▶ Watching ──Login──▶ LoginWaiting ──Verified(has pin)──▶ PinEntry
//!   │                 │                   │         ──Verified(no pin)──▶ Redirected
//!   │                 │                   └──VerifyFailed / timeout──▶ Failed
//!   │                 └──Logout──▶ LoggedOut
//!   └──Start (not a begin flow)──▶ PinEntry
//! ```
//!
//! Every login attempt gets a new generation. Verification results, failures
//! and timeouts carry the generation they belong to and are dropped when it is
//! no longer the current one.

use crate::pay::{
    bridge::{Assertion, RequestOptions},
    config::PageConfiguration,
    verifier::VerificationResult,
    view::FieldType,
    PIN_FIELD, PIN_PLACEHOLDER,
};
use tracing::debug;
use url::Url;

/// Message shown when identity selection never reports back.
pub const LOGIN_TIMEOUT_MESSAGE: &str = "Sign-in did not complete. Please try again.";

/// UI panels the view knows how to toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Panel {
    /// Spinner shown while identity selection or verification is pending.
    LoginWait,
    /// PIN entry form.
    EnterPin,
    /// Initial "begin payment" panel.
    Begin,
    /// Panel holding the sign-in control.
    Login,
}

/// The mutually exclusive UI state visible to the buyer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiState {
    LoginPrompt,
    LoginWaiting,
    PinEntry,
    LoggedOut,
    ErrorBanner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowState {
    Init,
    /// Bridge handlers registered, no login seen yet.
    Watching,
    /// Waiting on identity selection (`assertion` is `None`) or on the
    /// verification of `assertion`.
    LoginWaiting {
        generation: u64,
        assertion: Option<Assertion>,
    },
    PinEntry,
    LoggedOut,
    Failed {
        message: String,
    },
    /// Full-page navigation; terminal.
    Redirected {
        url: Url,
    },
}

#[derive(Clone, Debug)]
pub enum Event {
    Start,
    Login(Assertion),
    Logout,
    /// The sign-in control was activated.
    SignIn,
    Verified {
        generation: u64,
        result: VerificationResult,
    },
    VerifyFailed {
        generation: u64,
        message: String,
    },
    LoginTimedOut {
        generation: u64,
    },
    /// An uncaught error, already formatted for the page heading.
    Uncaught {
        heading: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    SetFieldType {
        name: String,
        field_type: FieldType,
        placeholder: String,
    },
    HideMessages,
    Show(Panel),
    Hide(Panel),
    Focus(String),
    ShowError(String),
    SetHeading(String),
    Navigate(Url),
    Watch,
    Request(RequestOptions),
    Verify {
        generation: u64,
        assertion: Assertion,
    },
    ArmLoginTimeout {
        generation: u64,
    },
    StartCompletion,
    StopCompletion,
}

/// Machine state plus the generation counter for login attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flow {
    pub state: FlowState,
    pub generation: u64,
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

impl Flow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FlowState::Init,
            generation: 0,
        }
    }

    /// The visible UI state; `None` before start and after navigation.
    #[must_use]
    pub fn ui_state(&self) -> Option<UiState> {
        match self.state {
            FlowState::Init | FlowState::Redirected { .. } => None,
            FlowState::Watching => Some(UiState::LoginPrompt),
            FlowState::LoginWaiting { .. } => Some(UiState::LoginWaiting),
            FlowState::PinEntry => Some(UiState::PinEntry),
            FlowState::LoggedOut => Some(UiState::LoggedOut),
            FlowState::Failed { .. } => Some(UiState::ErrorBanner),
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.state, FlowState::Redirected { .. })
    }

    fn with_state(&self, state: FlowState) -> Self {
        Self {
            state,
            generation: self.generation,
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.wrapping_add(1)
    }

    /// True when `generation` is the attempt currently waiting on the verifier.
    fn verifying(&self, generation: u64) -> bool {
        matches!(
            &self.state,
            FlowState::LoginWaiting { generation: g, assertion: Some(_) } if *g == generation
        )
    }
}

/// Outcome of a single transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub flow: Flow,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(flow: &Flow) -> Self {
        Self {
            flow: flow.clone(),
            effects: Vec::new(),
        }
    }
}

/// Identity selection options drawn from the page configuration.
#[must_use]
pub fn request_options(config: &PageConfiguration) -> RequestOptions {
    RequestOptions {
        allow_unverified: true,
        force_issuer: config.unverified_issuer.clone(),
        privacy_policy: config.privacy_policy_url.clone(),
        terms_of_service: config.terms_of_service_url.clone(),
    }
}

/// Applies `event` to `flow`.
#[must_use]
pub fn transition(flow: &Flow, config: &PageConfiguration, event: &Event) -> Transition {
    if flow.is_terminal() {
        debug!("page is navigating away, event ignored");
        return Transition::unchanged(flow);
    }

    match event {
        Event::Start => start(flow, config),
        Event::Uncaught { heading } => Transition {
            flow: flow.clone(),
            effects: vec![Effect::SetHeading(heading.clone())],
        },
        _ if matches!(flow.state, FlowState::Init) => {
            debug!("flow not started, event ignored");
            Transition::unchanged(flow)
        }
        _ if !config.begin_flow => {
            debug!("not a begin flow, identity event ignored");
            Transition::unchanged(flow)
        }
        Event::Login(assertion) => login(flow, assertion),
        Event::Logout => Transition {
            flow: flow.with_state(FlowState::LoggedOut),
            effects: vec![
                Effect::HideMessages,
                Effect::Hide(Panel::Begin),
                Effect::Show(Panel::Login),
            ],
        },
        Event::SignIn => {
            let generation = flow.next_generation();
            Transition {
                flow: Flow {
                    state: FlowState::LoginWaiting {
                        generation,
                        assertion: None,
                    },
                    generation,
                },
                effects: vec![
                    Effect::HideMessages,
                    Effect::Show(Panel::LoginWait),
                    Effect::Request(request_options(config)),
                    Effect::ArmLoginTimeout { generation },
                ],
            }
        }
        Event::Verified { generation, result } if flow.verifying(*generation) => {
            verified(flow, result)
        }
        Event::VerifyFailed {
            generation,
            message,
        } if flow.verifying(*generation) => Transition {
            flow: flow.with_state(FlowState::Failed {
                message: message.clone(),
            }),
            effects: vec![Effect::HideMessages, Effect::ShowError(message.clone())],
        },
        Event::LoginTimedOut { generation }
            if matches!(
                &flow.state,
                FlowState::LoginWaiting { generation: g, assertion: None } if g == generation
            ) =>
        {
            Transition {
                flow: flow.with_state(FlowState::Failed {
                    message: LOGIN_TIMEOUT_MESSAGE.to_string(),
                }),
                effects: vec![
                    Effect::HideMessages,
                    Effect::ShowError(LOGIN_TIMEOUT_MESSAGE.to_string()),
                    Effect::Show(Panel::Login),
                ],
            }
        }
        Event::Verified { generation, .. }
        | Event::VerifyFailed { generation, .. }
        | Event::LoginTimedOut { generation } => {
            debug!(generation, current = flow.generation, "stale event dropped");
            Transition::unchanged(flow)
        }
    }
}

fn start(flow: &Flow, config: &PageConfiguration) -> Transition {
    if !matches!(flow.state, FlowState::Init) {
        debug!("flow already started");
        return Transition::unchanged(flow);
    }

    let mut effects = vec![Effect::SetFieldType {
        name: PIN_FIELD.to_string(),
        field_type: FieldType::Number,
        placeholder: PIN_PLACEHOLDER.to_string(),
    }];

    let state = if config.begin_flow {
        effects.push(Effect::Watch);
        FlowState::Watching
    } else {
        effects.push(Effect::HideMessages);
        effects.push(Effect::Show(Panel::EnterPin));
        FlowState::PinEntry
    };

    if config.do_complete {
        effects.push(Effect::StartCompletion);
    }

    Transition {
        flow: flow.with_state(state),
        effects,
    }
}

fn login(flow: &Flow, assertion: &Assertion) -> Transition {
    if let FlowState::LoginWaiting {
        assertion: Some(pending),
        ..
    } = &flow.state
    {
        if pending == assertion {
            debug!("assertion already being verified");
            return Transition::unchanged(flow);
        }
    }

    let generation = flow.next_generation();
    Transition {
        flow: Flow {
            state: FlowState::LoginWaiting {
                generation,
                assertion: Some(assertion.clone()),
            },
            generation,
        },
        effects: vec![
            Effect::HideMessages,
            Effect::Show(Panel::LoginWait),
            Effect::Verify {
                generation,
                assertion: assertion.clone(),
            },
        ],
    }
}

fn verified(flow: &Flow, result: &VerificationResult) -> Transition {
    match result {
        VerificationResult::HasPin => Transition {
            flow: flow.with_state(FlowState::PinEntry),
            effects: vec![
                Effect::HideMessages,
                Effect::Show(Panel::EnterPin),
                Effect::Focus(PIN_FIELD.to_string()),
            ],
        },
        VerificationResult::CreatePin { url } => Transition {
            flow: flow.with_state(FlowState::Redirected { url: url.clone() }),
            effects: vec![Effect::StopCompletion, Effect::Navigate(url.clone())],
        },
    }
}
