//! Flow controller: owns the page state machine and performs its effects.
//!
//! Every input (bridge callbacks, the sign-in control, verification results,
//! timers, uncaught errors) arrives as an [`Event`] on one channel and is
//! applied in order by [`FlowController::run`], so the flow has a single
//! writer. Slow work is spawned and reports back through the same channel.

use crate::pay::{
    bridge::{BridgeHandlers, IdentityBridge},
    completion::{CompletionCallback, CompletionError, CompletionPoller, CompletionSlot},
    config::{ConfigError, FlowOptions, PageConfiguration},
    error::FlowError,
    state::{transition, Effect, Event, Flow, FlowState, Transition},
    verifier::{HttpVerifier, SessionVerifier},
    view::View,
};
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// How [`FlowController::run`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The page navigated to the given URL.
    Redirected(Url),
    /// [`FlowHandle::shutdown`] was called.
    Shutdown,
}

/// Cloneable handle used by the page to feed user actions into the flow.
#[derive(Clone, Debug)]
pub struct FlowHandle {
    events: UnboundedSender<Event>,
    shutdown: CancellationToken,
}

impl FlowHandle {
    /// Activates the sign-in control.
    pub fn sign_in(&self) {
        debug!("signing in manually");
        self.send(Event::SignIn);
    }

    /// Stops the flow and any polling it started.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Sender for collaborators that post raw events, such as the panic reporter.
    #[must_use]
    pub fn events(&self) -> UnboundedSender<Event> {
        self.events.clone()
    }

    fn send(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("flow finished, event dropped");
        }
    }
}

pub struct FlowController<V: View> {
    config: PageConfiguration,
    options: FlowOptions,
    view: V,
    bridge: Option<Box<dyn IdentityBridge>>,
    verifier: Option<Arc<dyn SessionVerifier>>,
    slot: CompletionSlot,
    flow: Flow,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
    shutdown: CancellationToken,
    completion_cancel: CancellationToken,
}

impl<V: View> FlowController<V> {
    #[must_use]
    pub fn new(config: PageConfiguration, options: FlowOptions, view: V) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let completion_cancel = shutdown.child_token();

        Self {
            config,
            options,
            view,
            bridge: None,
            verifier: None,
            slot: CompletionSlot::new(),
            flow: Flow::new(),
            events_tx,
            events_rx,
            shutdown,
            completion_cancel,
        }
    }

    #[must_use]
    pub fn with_bridge(mut self, bridge: Box<dyn IdentityBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Replaces the HTTP verifier that would otherwise be built from the
    /// configured verify URL.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn SessionVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Uses a slot shared with the host, which injects the callback later.
    #[must_use]
    pub fn with_completion_slot(mut self, slot: CompletionSlot) -> Self {
        self.slot = slot;
        self
    }

    /// Hands the completion callback over up front; it is delivered on the
    /// first completion check.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot already holds or consumed a callback.
    pub fn with_completion_callback(
        self,
        callback: CompletionCallback,
    ) -> Result<Self, CompletionError> {
        self.slot.inject(callback)?;
        Ok(self)
    }

    #[must_use]
    pub fn handle(&self) -> FlowHandle {
        FlowHandle {
            events: self.events_tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    #[must_use]
    pub const fn flow(&self) -> &Flow {
        &self.flow
    }

    #[must_use]
    pub const fn view(&self) -> &V {
        &self.view
    }

    #[must_use]
    pub fn completion_slot(&self) -> CompletionSlot {
        self.slot.clone()
    }

    /// Starts the flow and processes events until the page navigates away or
    /// the flow is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent, a begin flow has
    /// no bridge, or the bridge refuses `watch`.
    #[instrument(skip_all, fields(begin_flow = self.config.begin_flow, do_complete = self.config.do_complete))]
    pub async fn run(&mut self) -> Result<FlowOutcome, FlowError> {
        self.prepare()?;
        self.dispatch(Event::Start)?;

        loop {
            if let FlowState::Redirected { url } = &self.flow.state {
                info!(%url, "page navigated away");
                return Ok(FlowOutcome::Redirected(url.clone()));
            }

            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    info!("flow shut down");
                    return Ok(FlowOutcome::Shutdown);
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => self.dispatch(event)?,
                    None => return Err(FlowError::ChannelClosed),
                },
            }
        }
    }

    /// Resolves the collaborators a begin flow needs.
    fn prepare(&mut self) -> Result<(), FlowError> {
        self.config.validate()?;

        if !self.config.begin_flow {
            return Ok(());
        }
        if self.bridge.is_none() {
            return Err(FlowError::BridgeUnavailable);
        }
        if self.verifier.is_none() {
            let url = self
                .config
                .verify_url
                .clone()
                .ok_or(ConfigError::MissingVerifyUrl)?;
            self.verifier = Some(Arc::new(HttpVerifier::new(
                url,
                self.options.request_timeout,
            )?));
        }
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<(), FlowError> {
        debug!(?event, "event");
        let Transition { flow, effects } = transition(&self.flow, &self.config, &event);

        if flow.ui_state() != self.flow.ui_state() {
            info!(from = ?self.flow.ui_state(), to = ?flow.ui_state(), "ui state");
        }
        self.flow = flow;

        for effect in effects {
            self.apply(effect)?;
        }
        Ok(())
    }

    fn apply(&mut self, effect: Effect) -> Result<(), FlowError> {
        match effect {
            Effect::SetFieldType {
                name,
                field_type,
                placeholder,
            } => self.view.set_field_type(&name, field_type, &placeholder),
            Effect::HideMessages => self.view.hide_messages(),
            Effect::Show(panel) => self.view.show(panel),
            Effect::Hide(panel) => self.view.hide(panel),
            Effect::Focus(field) => self.view.focus(&field),
            Effect::ShowError(message) => self.view.show_error(&message),
            Effect::SetHeading(text) => self.view.set_heading(&text),
            Effect::Navigate(url) => self.view.navigate(&url),
            Effect::Watch => {
                let bridge = self.bridge.as_mut().ok_or(FlowError::BridgeUnavailable)?;
                bridge.watch(BridgeHandlers::new(self.events_tx.clone()))?;
            }
            Effect::Request(options) => {
                let bridge = self.bridge.as_mut().ok_or(FlowError::BridgeUnavailable)?;
                if let Err(err) = bridge.request(&options) {
                    error!("identity request failed: {}", err);
                    let _ = self.events_tx.send(Event::LoginTimedOut {
                        generation: self.flow.generation,
                    });
                }
            }
            Effect::Verify {
                generation,
                assertion,
            } => {
                let verifier = self
                    .verifier
                    .clone()
                    .ok_or(ConfigError::MissingVerifyUrl)?;
                let events = self.events_tx.clone();

                tokio::spawn(async move {
                    let event = match verifier.verify(&assertion).await {
                        Ok(result) => Event::Verified { generation, result },
                        Err(err) => {
                            error!("login error: {}", err);
                            Event::VerifyFailed {
                                generation,
                                message: err.to_string(),
                            }
                        }
                    };
                    let _ = events.send(event);
                });
            }
            Effect::ArmLoginTimeout { generation } => {
                let events = self.events_tx.clone();
                let cancel = self.shutdown.child_token();
                let timeout = self.options.login_timeout;

                tokio::spawn(async move {
                    tokio::select! {
                        () = cancel.cancelled() => {}
                        () = sleep(timeout) => {
                            warn!(generation, "identity selection timed out");
                            let _ = events.send(Event::LoginTimedOut { generation });
                        }
                    }
                });
            }
            Effect::StartCompletion => {
                let poller = CompletionPoller::new(
                    self.slot.clone(),
                    self.options.poll_interval,
                    self.completion_cancel.clone(),
                );
                tokio::spawn(async move {
                    let outcome = poller.run().await;
                    debug!(?outcome, "completion polling finished");
                });
            }
            Effect::StopCompletion => self.completion_cancel.cancel(),
        }
        Ok(())
    }
}
