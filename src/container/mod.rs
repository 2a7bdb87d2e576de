// ABOUTME: Container descriptors as seen by one update pass.
// ABOUTME: Exports the descriptor, its update state, filters, sorting, and the client contract.

mod client;
mod filter;
mod sort;

pub use client::{Client, ClientError, ClientOptions, DockerClient};
pub use filter::Filter;
pub use sort::{CycleError, sort_by_dependencies};

use crate::types::{ContainerId, ImageId};
use std::collections::HashMap;

/// Label marking the updater's own container.
pub const UPDATER_LABEL: &str = "relaunch.updater";
/// Label opting a container in when label filtering is enabled.
pub const ENABLE_LABEL: &str = "relaunch.enable";
/// Label overriding the signal sent when stopping a container.
pub const STOP_SIGNAL_LABEL: &str = "relaunch.stop-signal";

/// Where a container stands within the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateState {
    /// Image is current and no dependency is being replaced.
    #[default]
    Fresh,
    /// A newer image exists for the container's reference.
    StaleByImage,
    /// Image is current but a linked container is being replaced.
    StaleByDependency,
    /// Replacement could not be started; the old container stays.
    StartFailed,
}

impl UpdateState {
    pub fn is_stale(self) -> bool {
        matches!(self, UpdateState::StaleByImage | UpdateState::StaleByDependency)
    }
}

/// One container as enumerated at the start of a pass.
///
/// A descriptor is a view onto runtime state; only [`UpdateState`] changes
/// after enumeration.
#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    name: String,
    image_name: String,
    image_id: ImageId,
    links: Vec<String>,
    labels: HashMap<String, String>,
    is_self: bool,
    state: UpdateState,
}

impl Container {
    pub fn new(
        id: ContainerId,
        name: impl Into<String>,
        image_name: impl Into<String>,
        image_id: ImageId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            image_name: image_name.into(),
            image_id,
            links: Vec::new(),
            labels: HashMap::new(),
            is_self: false,
            state: UpdateState::Fresh,
        }
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_self(mut self, is_self: bool) -> Self {
        self.is_self = is_self;
        self
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registry reference the container was started from.
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Image the container is currently bound to.
    pub fn image_id(&self) -> &ImageId {
        &self.image_id
    }

    /// Names of the containers this one depends on, in declaration order.
    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Whether this is the updater's own container.
    pub fn is_self(&self) -> bool {
        self.is_self
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn is_stale(&self) -> bool {
        self.state.is_stale()
    }

    pub(crate) fn set_state(&mut self, state: UpdateState) {
        self.state = state;
    }

    /// Signal to send on stop, from the container's labels.
    pub fn stop_signal(&self) -> Option<&str> {
        self.label(STOP_SIGNAL_LABEL).filter(|s| !s.is_empty())
    }
}
