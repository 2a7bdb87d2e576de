// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup and an in-memory recording container client.

use async_trait::async_trait;
use parking_lot::Mutex;
use relaunch::container::{Client, ClientError, Container, Filter};
use relaunch::runtime::{ContainerError, ImageError};
use relaunch::types::{ContainerId, ImageId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("relaunch=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Shared sink for captured log output.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a subscriber that keeps WARN and above, returning the formatted output.
#[allow(dead_code)]
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
    (result, logs)
}

/// A container descriptor with the given links.
#[allow(dead_code)]
pub fn container(name: &str, links: &[&str]) -> Container {
    Container::new(
        ContainerId::new(format!("{name}-id")),
        name,
        format!("example/{name}:latest"),
        ImageId::new(format!("sha256:{name}-old")),
    )
    .with_links(links.iter().copied())
}

/// One call made against [`FakeClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Call {
    List,
    IsStale(String),
    Rename { name: String, to: String },
    Start(String),
    Stop(String),
    RemoveImage(String),
}

#[allow(dead_code)]
impl Call {
    /// Whether the call changes runtime state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::List | Call::IsStale(_))
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    /// Container id to its current runtime name.
    names: HashMap<String, String>,
    /// Names held on the runtime, mapped to the id holding them.
    live: HashMap<String, String>,
    /// Names a call tried to take while another container held them.
    conflicts: Vec<String>,
}

impl State {
    /// Give `name` to `owner`, refusing if someone else holds it.
    fn claim(&mut self, name: &str, owner: &str) -> bool {
        match self.live.get(name) {
            Some(holder) if holder != owner => {
                self.conflicts.push(name.to_string());
                false
            }
            _ => {
                self.live.insert(name.to_string(), owner.to_string());
                true
            }
        }
    }
}

/// Scripted, recording implementation of [`Client`].
///
/// Containers are returned in the order given. Failures are keyed by
/// container name.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeClient {
    containers: Vec<Container>,
    stale: HashSet<String>,
    stale_check_fails: HashSet<String>,
    rename_fails: HashSet<String>,
    start_fails: HashSet<String>,
    stop_fails: HashSet<String>,
    remove_image_fails: HashSet<String>,
    list_fails: bool,
    state: Mutex<State>,
}

#[allow(dead_code)]
impl FakeClient {
    pub fn new(containers: Vec<Container>) -> Self {
        let names: HashMap<String, String> = containers
            .iter()
            .map(|c| (c.id().to_string(), c.name().to_string()))
            .collect();
        let live = names
            .iter()
            .map(|(id, name)| (name.clone(), id.clone()))
            .collect();
        Self {
            containers,
            state: Mutex::new(State {
                names,
                live,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn stale(mut self, names: &[&str]) -> Self {
        self.stale.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn failing_stale_check(mut self, name: &str) -> Self {
        self.stale_check_fails.insert(name.to_string());
        self
    }

    pub fn failing_rename(mut self, name: &str) -> Self {
        self.rename_fails.insert(name.to_string());
        self
    }

    pub fn failing_start(mut self, name: &str) -> Self {
        self.start_fails.insert(name.to_string());
        self
    }

    pub fn failing_stop(mut self, name: &str) -> Self {
        self.stop_fails.insert(name.to_string());
        self
    }

    pub fn failing_remove_image(mut self, name: &str) -> Self {
        self.remove_image_fails.insert(name.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    /// Calls with generated names replaced by `*`.
    pub fn calls_masked(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .map(|call| match call {
                Call::Rename { name, to } if to != name => Call::Rename {
                    name,
                    to: "*".to_string(),
                },
                other => other,
            })
            .collect()
    }

    /// Names the fake generated for renames, in call order.
    pub fn temporary_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Rename { name, to } if to != name => Some(to),
                _ => None,
            })
            .collect()
    }

    /// Current runtime name of the container originally called `name`.
    pub fn current_name(&self, name: &str) -> Option<String> {
        self.state.lock().names.get(&format!("{name}-id")).cloned()
    }

    /// Id of the container holding `name` on the runtime. Replacements are `{name}-new`.
    pub fn holder(&self, name: &str) -> Option<String> {
        self.state.lock().live.get(name).cloned()
    }

    /// Names a rename or start tried to take while they were in use.
    pub fn name_conflicts(&self) -> Vec<String> {
        self.state.lock().conflicts.clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

fn runtime_error(what: &str, name: &str) -> ClientError {
    ContainerError::Runtime(format!("{what} failed for {name}")).into()
}

#[async_trait]
impl Client for FakeClient {
    async fn list_containers(&self, filter: &Filter) -> Result<Vec<Container>, ClientError> {
        self.record(Call::List);
        if self.list_fails {
            return Err(ContainerError::Runtime("daemon unavailable".to_string()).into());
        }
        Ok(self
            .containers
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn is_container_stale(&self, container: &Container) -> Result<bool, ClientError> {
        let name = container.name().to_string();
        self.record(Call::IsStale(name.clone()));
        if self.stale_check_fails.contains(&name) {
            return Err(ImageError::PullFailed(format!("registry unreachable for {name}")).into());
        }
        Ok(self.stale.contains(&name))
    }

    async fn rename_container(
        &self,
        container: &Container,
        new_name: &str,
    ) -> Result<(), ClientError> {
        let name = container.name().to_string();
        self.record(Call::Rename {
            name: name.clone(),
            to: new_name.to_string(),
        });
        // Renaming back to the original name always succeeds.
        if new_name != name && self.rename_fails.contains(&name) {
            return Err(runtime_error("rename", &name));
        }
        let id = container.id().to_string();
        let mut state = self.state.lock();
        if !state.claim(new_name, &id) {
            return Err(ContainerError::AlreadyExists(new_name.to_string()).into());
        }
        if let Some(old) = state.names.insert(id, new_name.to_string())
            && old != new_name
        {
            state.live.remove(&old);
        }
        Ok(())
    }

    async fn start_container(
        &self,
        container: &Container,
        _timeout: Duration,
    ) -> Result<(), ClientError> {
        let name = container.name().to_string();
        self.record(Call::Start(name.clone()));
        if self.start_fails.contains(&name) {
            return Err(runtime_error("start", &name));
        }
        if !self.state.lock().claim(&name, &format!("{name}-new")) {
            return Err(ContainerError::AlreadyExists(name).into());
        }
        Ok(())
    }

    async fn stop_container(
        &self,
        container: &Container,
        _timeout: Duration,
    ) -> Result<(), ClientError> {
        let name = container.name().to_string();
        self.record(Call::Stop(name.clone()));
        if self.stop_fails.contains(&name) {
            return Err(runtime_error("stop", &name));
        }
        let id = container.id().to_string();
        let mut state = self.state.lock();
        if let Some(current) = state.names.remove(&id)
            && state.live.get(&current) == Some(&id)
        {
            state.live.remove(&current);
        }
        Ok(())
    }

    async fn remove_image(&self, container: &Container) -> Result<(), ClientError> {
        let name = container.name().to_string();
        self.record(Call::RemoveImage(name.clone()));
        if self.remove_image_fails.contains(&name) {
            return Err(ImageError::InUse(container.image_id().to_string()).into());
        }
        Ok(())
    }
}
