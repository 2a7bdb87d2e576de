// ABOUTME: The update pass: find containers running superseded images and replace them.
// ABOUTME: Enumerate, classify, order, propagate, then start replacements and stop the old ones.

mod error;
mod name;
mod report;

pub use error::{UpdateError, UpdateErrorKind};
pub use name::{NAME_LEN, random_name};
pub use report::UpdateReport;

use crate::container::{Client, Container, Filter, UpdateState, sort_by_dependencies};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Caller-controlled settings for one pass.
#[derive(Debug, Clone)]
pub struct UpdateParams {
    /// Restricts which containers are enumerated.
    pub filter: Filter,
    /// Remove the old image after its container is stopped.
    pub cleanup: bool,
    /// Start replacements only for the updater itself.
    pub no_restart: bool,
    /// Bound on each replacement start.
    pub start_timeout: Duration,
    /// Bound on each stop of an old container.
    pub stop_timeout: Duration,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            filter: Filter::all(),
            cleanup: false,
            no_restart: false,
            start_timeout: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(10),
        }
    }
}

/// Run one update pass against `client`.
///
/// Returns an error only when the container set cannot be listed or its links
/// form a cycle; in both cases no container is modified. Failures affecting a
/// single container are logged and recorded in the report.
pub async fn update<C: Client + ?Sized>(
    client: &C,
    params: &UpdateParams,
) -> Result<UpdateReport, UpdateError> {
    debug!("checking containers for updated images");

    let mut containers = client
        .list_containers(&params.filter)
        .await
        .map_err(UpdateError::List)?;

    let mut report = UpdateReport {
        scanned: containers.len(),
        ..Default::default()
    };

    classify(client, &mut containers).await;

    let mut containers = sort_by_dependencies(containers)?;
    propagate(&mut containers);

    for container in &containers {
        match container.state() {
            UpdateState::StaleByImage => report.stale.push(container.name().to_string()),
            UpdateState::StaleByDependency => {
                report.dependents.push(container.name().to_string())
            }
            UpdateState::Fresh | UpdateState::StartFailed => {}
        }
    }

    start_replacements(client, &mut containers, params, &mut report).await;
    stop_replaced(client, &containers, params, &mut report).await;

    debug!(
        scanned = report.scanned,
        started = report.started.len(),
        stopped = report.stopped.len(),
        failed = report.failed.len(),
        "update pass finished"
    );
    Ok(report)
}

/// Mark containers whose image has been superseded.
///
/// A failed check leaves the container fresh for this pass.
async fn classify<C: Client + ?Sized>(client: &C, containers: &mut [Container]) {
    for container in containers.iter_mut() {
        match client.is_container_stale(container).await {
            Ok(true) => container.set_state(UpdateState::StaleByImage),
            Ok(false) => {}
            Err(e) => {
                warn!(
                    container = %container.name(),
                    error = %e,
                    "unable to check container for updates, proceeding to next"
                );
            }
        }
    }
}

/// Mark every fresh container that links, directly or transitively, to a stale one.
///
/// Runs to a fixpoint, so the result does not depend on the order of `containers`.
pub(crate) fn propagate(containers: &mut [Container]) {
    let mut stale: HashSet<String> = containers
        .iter()
        .filter(|c| c.is_stale())
        .map(|c| c.name().to_string())
        .collect();

    loop {
        let mut changed = false;
        for container in containers.iter_mut() {
            if container.state() != UpdateState::Fresh {
                continue;
            }
            if let Some(link) = container.links().iter().find(|l| stale.contains(*l)) {
                debug!(container = %container.name(), dependency = %link, "dependency is being replaced");
                container.set_state(UpdateState::StaleByDependency);
                stale.insert(container.name().to_string());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Start replacements in dependency order.
///
/// The old container is renamed out of the way first so its replacement can
/// take the original name. If either step fails the container is marked
/// [`UpdateState::StartFailed`], which keeps it out of the stop phase.
async fn start_replacements<C: Client + ?Sized>(
    client: &C,
    containers: &mut [Container],
    params: &UpdateParams,
    report: &mut UpdateReport,
) {
    for container in containers.iter_mut() {
        if !container.is_stale() {
            continue;
        }

        if params.no_restart && !container.is_self() {
            debug!(container = %container.name(), "restart disabled, not starting replacement");
            continue;
        }

        let original = container.name().to_string();

        if let Err(e) = client.rename_container(container, &random_name()).await {
            error!(container = %original, error = %e, "failed to rename container before update");
            container.set_state(UpdateState::StartFailed);
            report.failed.push(original);
            continue;
        }

        if let Err(e) = client.start_container(container, params.start_timeout).await {
            error!(container = %original, error = %e, "failed to start replacement container");
            container.set_state(UpdateState::StartFailed);

            if let Err(e) = client.rename_container(container, &original).await {
                error!(container = %original, error = %e, "failed to restore original container name");
            }

            report.failed.push(original);
            continue;
        }

        report.started.push(original);
    }
}

/// Stop replaced containers in reverse dependency order, dependents first.
///
/// The updater never stops itself here; a new updater instance takes care
/// of its predecessor.
async fn stop_replaced<C: Client + ?Sized>(
    client: &C,
    containers: &[Container],
    params: &UpdateParams,
    report: &mut UpdateReport,
) {
    for container in containers.iter().rev() {
        if container.is_self() || !container.is_stale() {
            continue;
        }

        if let Err(e) = client.stop_container(container, params.stop_timeout).await {
            error!(container = %container.name(), error = %e, "failed to stop old container");
            report.failed.push(container.name().to_string());
            continue;
        }
        report.stopped.push(container.name().to_string());

        if params.cleanup
            && let Err(e) = client.remove_image(container).await
        {
            warn!(container = %container.name(), error = %e, "failed to remove old image");
        }
    }
}
