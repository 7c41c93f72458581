pub mod flow;
pub mod logging;
pub mod page;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("webpay-flow")
        .about("Payment page sign-in and completion flow")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles);

    let command = page::with_args(command);
    let command = flow::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    const ENV_VARS: [&str; 12] = [
        "WEBPAY_BEGINFLOW",
        "WEBPAY_VERIFY_URL",
        "WEBPAY_UNVERIFIED_ISSUER",
        "WEBPAY_PRIVACY_POLICY",
        "WEBPAY_TERMS_OF_SERVICE",
        "WEBPAY_DOCOMPLETE",
        "WEBPAY_ASSERTION",
        "WEBPAY_LOGIN_TIMEOUT",
        "WEBPAY_REQUEST_TIMEOUT",
        "WEBPAY_POLL_INTERVAL",
        "WEBPAY_COMPLETE_AFTER",
        "WEBPAY_LOG_LEVEL",
    ];

    /// Runs `f` with every WEBPAY_* variable cleared except `set`.
    fn with_clean_env<F: FnOnce()>(set: &[(&str, &str)], f: F) {
        let vars: Vec<(&str, Option<&str>)> = ENV_VARS
            .iter()
            .map(|name| {
                let value = set.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
                (*name, value)
            })
            .collect();
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "webpay-flow");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Payment page sign-in and completion flow".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_page_arguments() {
        with_clean_env(&[], || {
            let matches = new().get_matches_from(vec![
                "webpay-flow",
                "--beginflow",
                "--verify-url",
                "https://pay.example/auth/verify",
                "--unverified-issuer",
                "login.example",
                "--docomplete",
            ]);

            let config = page::parse(&matches).unwrap();
            assert!(config.begin_flow);
            assert!(config.do_complete);
            assert_eq!(
                config.verify_url.map(|u| u.to_string()),
                Some("https://pay.example/auth/verify".to_string())
            );
            assert_eq!(config.unverified_issuer.as_deref(), Some("login.example"));
            assert_eq!(config.privacy_policy_url, None);
        });
    }

    #[test]
    fn test_begin_flow_requires_verify_url() {
        with_clean_env(&[], || {
            let result = new().try_get_matches_from(vec!["webpay-flow", "--beginflow"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_flow_defaults() {
        with_clean_env(&[], || {
            let matches = new().get_matches_from(vec!["webpay-flow"]);
            let options = flow::Options::parse(&matches).unwrap();

            assert_eq!(options.assertion, None);
            assert_eq!(options.timing.poll_interval, Duration::from_millis(500));
            assert_eq!(options.timing.login_timeout, Duration::from_secs(120));
            assert_eq!(options.timing.request_timeout, Duration::from_secs(10));
            assert_eq!(options.complete_after, None);
        });
    }

    #[test]
    fn test_check_env() {
        with_clean_env(
            &[
                ("WEBPAY_BEGINFLOW", "true"),
                ("WEBPAY_VERIFY_URL", "https://pay.example/auth/verify"),
                ("WEBPAY_ASSERTION", "  token  "),
                ("WEBPAY_POLL_INTERVAL", "250"),
                ("WEBPAY_COMPLETE_AFTER", "1500"),
                ("WEBPAY_LOG_LEVEL", "info"),
            ],
            || {
                let matches = new().get_matches_from(vec!["webpay-flow"]);
                let config = page::parse(&matches).unwrap();
                let options = flow::Options::parse(&matches).unwrap();

                assert!(config.begin_flow);
                assert!(!config.do_complete);
                assert_eq!(options.assertion.as_deref(), Some("token"));
                assert_eq!(options.timing.poll_interval, Duration::from_millis(250));
                assert_eq!(options.complete_after, Some(Duration::from_millis(1500)));
                assert_eq!(matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_log_level_env_names() {
        for (step, level) in (0_u8..).zip(logging::LOG_LEVELS) {
            with_clean_env(&[("WEBPAY_LOG_LEVEL", level)], || {
                let matches = new().get_matches_from(vec!["webpay-flow"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(step),
                    "level {level}"
                );
            });
        }
    }

    #[test]
    fn test_log_level_env_rejects_unknown_name() {
        with_clean_env(&[("WEBPAY_LOG_LEVEL", "loud")], || {
            assert!(new().try_get_matches_from(vec!["webpay-flow"]).is_err());
        });
    }

    #[test]
    fn test_verbose_flag_counts() {
        for count in 0_u8..5 {
            with_clean_env(&[], || {
                let mut args = vec!["webpay-flow".to_string()];
                if count > 0 {
                    args.push(format!("-{}", "v".repeat(usize::from(count))));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(count)
                );
            });
        }
    }
}
