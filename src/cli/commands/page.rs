//! Page configuration arguments. These mirror the data attributes the
//! server-rendered page puts on its body element.

use crate::pay::config::{ConfigError, PageConfiguration};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_BEGIN_FLOW: &str = "beginflow";
pub const ARG_VERIFY_URL: &str = "verify-url";
pub const ARG_UNVERIFIED_ISSUER: &str = "unverified-issuer";
pub const ARG_PRIVACY_POLICY: &str = "privacy-policy";
pub const ARG_TERMS_OF_SERVICE: &str = "terms-of-service";
pub const ARG_DO_COMPLETE: &str = "docomplete";

/// Parse the page configuration from matches.
///
/// # Errors
/// Returns an error if `--verify-url` is invalid or missing for a begin flow.
pub fn parse(matches: &ArgMatches) -> Result<PageConfiguration, ConfigError> {
    let mut attributes: Vec<(&str, &str)> = vec![
        (ARG_BEGIN_FLOW, bool_attribute(matches.get_flag(ARG_BEGIN_FLOW))),
        (ARG_DO_COMPLETE, bool_attribute(matches.get_flag(ARG_DO_COMPLETE))),
    ];

    for id in [
        ARG_VERIFY_URL,
        ARG_UNVERIFIED_ISSUER,
        ARG_PRIVACY_POLICY,
        ARG_TERMS_OF_SERVICE,
    ] {
        if let Some(value) = matches.get_one::<String>(id) {
            attributes.push((id, value.as_str()));
        }
    }

    PageConfiguration::from_attributes(attributes)
}

const fn bool_attribute(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BEGIN_FLOW)
                .long(ARG_BEGIN_FLOW)
                .help("Start the identity sign-in flow instead of going straight to PIN entry")
                .env("WEBPAY_BEGINFLOW")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_VERIFY_URL)
                .long(ARG_VERIFY_URL)
                .help("Backend endpoint that verifies identity assertions")
                .env("WEBPAY_VERIFY_URL")
                .required_if_eq(ARG_BEGIN_FLOW, "true"),
        )
        .arg(
            Arg::new(ARG_UNVERIFIED_ISSUER)
                .long(ARG_UNVERIFIED_ISSUER)
                .help("Identity issuer forced for unverified emails")
                .env("WEBPAY_UNVERIFIED_ISSUER"),
        )
        .arg(
            Arg::new(ARG_PRIVACY_POLICY)
                .long(ARG_PRIVACY_POLICY)
                .help("Privacy policy URL shown during identity selection")
                .env("WEBPAY_PRIVACY_POLICY"),
        )
        .arg(
            Arg::new(ARG_TERMS_OF_SERVICE)
                .long(ARG_TERMS_OF_SERVICE)
                .help("Terms of service URL shown during identity selection")
                .env("WEBPAY_TERMS_OF_SERVICE"),
        )
        .arg(
            Arg::new(ARG_DO_COMPLETE)
                .long(ARG_DO_COMPLETE)
                .help("Wait for the host payment-success callback and invoke it")
                .env("WEBPAY_DOCOMPLETE")
                .action(ArgAction::SetTrue),
        )
}
