// ABOUTME: Topological ordering of containers by their links.
// ABOUTME: Dependencies come first; ties keep enumeration order; cycles are an error.

use super::Container;
use std::collections::{BTreeSet, HashMap};

/// The link graph among the given containers is not acyclic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circular reference among containers: {}", .names.join(", "))]
pub struct CycleError {
    /// Containers that could not be ordered, in enumeration order.
    pub names: Vec<String>,
}

/// Order containers so every container follows the containers it links to.
///
/// Links naming containers outside the set are ignored. Among containers
/// whose dependencies are all placed, the one enumerated first goes next.
pub fn sort_by_dependencies(containers: Vec<Container>) -> Result<Vec<Container>, CycleError> {
    // dependents[i] lists the containers waiting on container i.
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); containers.len()];
    let mut pending: Vec<usize> = vec![0; containers.len()];

    {
        let index: HashMap<&str, usize> = containers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name(), i))
            .collect();

        for (parent, container) in containers.iter().enumerate() {
            let children: BTreeSet<usize> = container
                .links()
                .iter()
                .filter_map(|link| index.get(link.as_str()).copied())
                .collect();
            pending[parent] = children.len();
            for child in children {
                dependents[child].push(parent);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..containers.len())
        .filter(|&i| pending[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(containers.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &parent in &dependents[next] {
            pending[parent] -= 1;
            if pending[parent] == 0 {
                ready.insert(parent);
            }
        }
    }

    if order.len() < containers.len() {
        let names = pending
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p > 0)
            .map(|(i, _)| containers[i].name().to_string())
            .collect();
        return Err(CycleError { names });
    }

    let mut slots: Vec<Option<Container>> = containers.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect())
}
