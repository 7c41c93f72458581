use crate::pay::config::FlowOptions;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_ASSERTION: &str = "assertion";
pub const ARG_LOGIN_TIMEOUT: &str = "login-timeout";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";
pub const ARG_POLL_INTERVAL: &str = "poll-interval";
pub const ARG_COMPLETE_AFTER: &str = "complete-after";

#[derive(Debug, Clone)]
pub struct Options {
    pub assertion: Option<String>,
    pub timing: FlowOptions,
    pub complete_after: Option<Duration>,
}

impl Options {
    /// Parse flow arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_u64 = |id: &str| -> anyhow::Result<u64> {
            matches
                .get_one::<u64>(id)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            assertion: matches
                .get_one::<String>(ARG_ASSERTION)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            timing: FlowOptions {
                poll_interval: Duration::from_millis(read_u64(ARG_POLL_INTERVAL)?),
                login_timeout: Duration::from_secs(read_u64(ARG_LOGIN_TIMEOUT)?),
                request_timeout: Duration::from_secs(read_u64(ARG_REQUEST_TIMEOUT)?),
            },
            complete_after: matches
                .get_one::<u64>(ARG_COMPLETE_AFTER)
                .map(|ms| Duration::from_millis(*ms)),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ASSERTION)
                .long(ARG_ASSERTION)
                .help("Identity assertion the provider answers with; omit to simulate an abandoned sign-in")
                .env("WEBPAY_ASSERTION")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_LOGIN_TIMEOUT)
                .long(ARG_LOGIN_TIMEOUT)
                .help("Seconds to wait for identity selection before offering a retry")
                .env("WEBPAY_LOGIN_TIMEOUT")
                .default_value("120")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Verify request timeout in seconds")
                .env("WEBPAY_REQUEST_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_POLL_INTERVAL)
                .long(ARG_POLL_INTERVAL)
                .help("Milliseconds between checks for the payment-success callback")
                .env("WEBPAY_POLL_INTERVAL")
                .default_value("500")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COMPLETE_AFTER)
                .long(ARG_COMPLETE_AFTER)
                .help("Simulate the host injecting the payment-success callback after this many milliseconds")
                .env("WEBPAY_COMPLETE_AFTER")
                .value_parser(clap::value_parser!(u64)),
        )
}
