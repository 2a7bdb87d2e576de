// ABOUTME: Periodic execution of update passes.
// ABOUTME: Runs a pass immediately, then once per interval until shutdown is signalled.

use crate::container::Client;
use crate::update::{UpdateError, UpdateParams, UpdateReport, update};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Run update passes every `interval` until `shutdown` turns `true`.
///
/// A pass in progress is never interrupted; shutdown takes effect between
/// passes. A fatal pass error is logged and the schedule continues. Each
/// result is handed to `on_pass`. Returns the number of passes run.
pub async fn run_scheduled<C, F>(
    client: &C,
    params: &UpdateParams,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut on_pass: F,
) -> usize
where
    C: Client + ?Sized,
    F: FnMut(&Result<UpdateReport, UpdateError>),
{
    // tokio rejects a zero period.
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut passes = 0;

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        let result = update(client, params).await;
        if let Err(e) = &result {
            error!(error = %e, "update pass aborted");
        }
        on_pass(&result);
        passes += 1;

        if *shutdown.borrow() {
            break;
        }
        log_next_run(interval);
    }

    debug!(passes, "scheduler stopped");
    passes
}

/// Resolves once shutdown is requested; never resolves if the sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn log_next_run(interval: Duration) {
    match chrono::Duration::from_std(interval) {
        Ok(delta) => {
            let next = chrono::Local::now() + delta;
            info!(
                next_run = %next.format("%Y-%m-%d %H:%M:%S"),
                "scheduling next update"
            );
        }
        Err(_) => info!(?interval, "scheduling next update"),
    }
}
