// ABOUTME: Predicates restricting which containers an update pass considers.
// ABOUTME: Name allow-lists, opt-in labels, and their conjunction.

use super::{Container, ENABLE_LABEL};
use std::fmt;
use std::sync::Arc;

type Predicate = dyn Fn(&Container) -> bool + Send + Sync;

/// A container predicate handed to [`Client::list_containers`](super::Client::list_containers).
#[derive(Clone)]
pub struct Filter {
    predicate: Arc<Predicate>,
}

impl Filter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Container) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Accept every container.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Accept containers whose name is in `names`; an empty list accepts all.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.into().trim_start_matches('/').to_string())
            .collect();
        if names.is_empty() {
            return Self::all();
        }
        Self::new(move |c| names.iter().any(|n| n == c.name()))
    }

    /// Accept containers labelled `relaunch.enable=true`.
    pub fn enabled_by_label() -> Self {
        Self::new(|c| {
            c.label(ENABLE_LABEL)
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        })
    }

    /// Accept containers both filters accept.
    pub fn and(self, other: Filter) -> Self {
        Self::new(move |c| self.matches(c) && other.matches(c))
    }

    /// Operator filter: optional name allow-list, optionally restricted to opted-in containers.
    pub fn build(names: &[String], label_enable: bool) -> Self {
        let filter = Self::names(names.iter().cloned());
        if label_enable {
            filter.and(Self::enabled_by_label())
        } else {
            filter
        }
    }

    pub fn matches(&self, container: &Container) -> bool {
        (self.predicate)(container)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").finish_non_exhaustive()
    }
}
