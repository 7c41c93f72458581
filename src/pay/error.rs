//! Flow errors and the uncaught-error reporter.
//!
//! Uncaught failures are made loud on purpose: the panic hook formats
//! `<file>:<line> <message>` and the flow writes it over the page heading.

use crate::pay::{bridge::BridgeError, config::ConfigError, state::Event, verifier::VerifyError};
use std::panic::{self, PanicHookInfo};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("begin flow requires an identity provider bridge")]
    BridgeUnavailable,
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Verifier(#[from] VerifyError),
    #[error("flow event channel closed")]
    ChannelClosed,
}

/// Formats an uncaught error the way it is shown in the page heading: the
/// file name without its directories, the line, then the message.
#[must_use]
pub fn uncaught_heading(file: &str, line: u32, message: &str) -> String {
    let name = file.rsplit(['/', '\\']).next().unwrap_or(file);
    format!("{name}:{line} {message}")
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Installs a panic hook that reports every panic to the flow as
/// [`Event::Uncaught`]. The previously installed hook still runs.
pub fn install_panic_reporter(events: UnboundedSender<Event>) {
    let previous = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let message = panic_message(info);
        let heading = match info.location() {
            Some(location) => uncaught_heading(location.file(), location.line(), &message),
            None => message,
        };
        // The flow may already be gone; the previous hook still reports it.
        let _ = events.send(Event::Uncaught { heading });
        previous(info);
    }));
}
