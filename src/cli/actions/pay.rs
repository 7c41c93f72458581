use crate::pay::{
    install_panic_reporter, Assertion, FlowController, FlowOptions, FlowOutcome,
    PageConfiguration, PresetBridge, TracingView,
};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub config: PageConfiguration,
    pub options: FlowOptions,
    pub assertion: Option<Assertion>,
    pub complete_after: Option<Duration>,
}

/// Run the page flow until it navigates away or is interrupted.
/// # Errors
/// Returns an error if the flow cannot start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let bridge = PresetBridge::new(args.assertion);
    let mut controller = FlowController::new(args.config, args.options, TracingView::new())
        .with_bridge(Box::new(bridge));
    let handle = controller.handle();

    install_panic_reporter(handle.events());

    if let Some(delay) = args.complete_after {
        let slot = controller.completion_slot();
        tokio::spawn(async move {
            sleep(delay).await;
            debug!("host injecting payment-success callback");
            if let Err(err) = slot.inject(Box::new(|| info!("payment success reported to host"))) {
                warn!("completion callback not injected: {}", err);
            }
        });
    }

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            interrupt.shutdown();
        }
    });

    match controller.run().await.context("payment flow failed")? {
        FlowOutcome::Redirected(url) => info!(%url, "redirected to PIN creation"),
        FlowOutcome::Shutdown => info!(state = ?controller.flow().ui_state(), "stopped"),
    }

    Ok(())
}

fn log_startup_args(args: &Args) {
    debug!(
        begin_flow = args.config.begin_flow,
        do_complete = args.config.do_complete,
        verify_url = ?args.config.verify_url.as_ref().map(url::Url::as_str),
        unverified_issuer = ?args.config.unverified_issuer,
        has_assertion = args.assertion.is_some(),
        poll_interval = ?args.options.poll_interval,
        login_timeout = ?args.options.login_timeout,
        "startup arguments"
    );
}
