//! Verbosity flag. Each `-v` raises the level one step; `WEBPAY_LOG_LEVEL`
//! takes a level name or the same step count.

use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim().to_ascii_lowercase();

    let step = match level.parse::<usize>() {
        Ok(step) if step < LOG_LEVELS.len() => Some(step),
        Ok(_) => None,
        Err(_) => LOG_LEVELS.iter().position(|name| *name == level),
    };

    step.and_then(|step| u8::try_from(step).ok())
        .ok_or_else(|| format!("invalid log level {level:?}, expected one of {LOG_LEVELS:?}"))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_log_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity: -v warn, -vv info, -vvv debug, -vvvv trace (default: error)")
            .env("WEBPAY_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
