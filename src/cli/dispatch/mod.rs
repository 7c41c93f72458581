//! Maps validated CLI arguments to the flow action.

use crate::{
    cli::{
        actions::{pay::Args, Action},
        commands::{flow, page},
    },
    pay::Assertion,
};
use anyhow::{Context, Result};

/// Map validated CLI matches to a pay action.
///
/// # Errors
/// Returns an error if the page configuration is inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let config = page::parse(matches).context("invalid page configuration")?;
    let flow_opts = flow::Options::parse(matches)?;

    Ok(Action::Pay(Args {
        config,
        options: flow_opts.timing,
        assertion: flow_opts.assertion.map(Assertion::new),
        complete_after: flow_opts.complete_after,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_pay_action() {
        temp_env::with_vars(
            [
                ("WEBPAY_BEGINFLOW", None::<&str>),
                ("WEBPAY_VERIFY_URL", None),
                ("WEBPAY_DOCOMPLETE", None),
                ("WEBPAY_ASSERTION", None),
                ("WEBPAY_COMPLETE_AFTER", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "webpay-flow",
                    "--docomplete",
                    "--complete-after",
                    "750",
                ]);

                let Action::Pay(args) = handler(&matches).unwrap();
                assert!(!args.config.begin_flow);
                assert!(args.config.do_complete);
                assert_eq!(args.assertion, None);
                assert_eq!(
                    args.complete_after,
                    Some(std::time::Duration::from_millis(750))
                );
            },
        );
    }

    #[test]
    fn handler_rejects_invalid_verify_url() {
        temp_env::with_vars(
            [
                ("WEBPAY_BEGINFLOW", None::<&str>),
                ("WEBPAY_VERIFY_URL", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "webpay-flow",
                    "--beginflow",
                    "--verify-url",
                    "not a url",
                ]);

                assert!(handler(&matches).is_err());
            },
        );
    }
}
