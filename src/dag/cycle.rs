// src/dag/cycle.rs

//! Incremental cycle detection over a graph that is revealed while it is
//! being evaluated.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::dag::graph::NotableGraph;
use crate::task::Task;

/// Tracks "who requested whom" and reports a cycle as soon as one closes.
///
/// Only notable tasks become graph nodes. For every task (notable or not)
/// the detector remembers the notable tasks that transitively requested it,
/// so a chain `A -> x -> y -> B` of non-notable hops collapses into a
/// single edge `A -> B`.
///
/// Non-notable tasks additionally remember what they requested. When a
/// memoized non-notable task is reached again through a new notable
/// ancestor, that ancestor is forwarded to its known descendants so the
/// collapsed edges stay complete.
#[derive(Debug)]
pub struct CycleDetector<T> {
    /// Notable tasks that transitively requested each task.
    ancestors: HashMap<T, HashSet<T>>,
    /// Children requested by non-notable tasks.
    requested: HashMap<T, HashSet<T>>,
    graph: NotableGraph<T>,
}

impl<T: Task> CycleDetector<T> {
    pub fn new() -> Self {
        Self {
            ancestors: HashMap::new(),
            requested: HashMap::new(),
            graph: NotableGraph::new(),
        }
    }

    /// Register a root of an evaluation.
    ///
    /// A notable root becomes its own reference point. Non-notable roots
    /// have no notable ancestors.
    pub fn register_root(&mut self, task: &T) {
        if task.is_notable() {
            self.graph.node(task);
            self.ancestors
                .insert(task.clone(), HashSet::from([task.clone()]));
        } else {
            debug!(?task, "non-notable root; cycles are tracked from its notable descendants");
            self.ancestors.entry(task.clone()).or_default();
        }
    }

    /// Record that `parent` requested `child`.
    ///
    /// Returns the cycle path (`[n, .., n]`) if the new relation closes one.
    pub fn add_relation(&mut self, parent: &T, child: &T) -> Result<(), Vec<T>> {
        let inherited = self.ancestors.get(parent).cloned().unwrap_or_default();

        if !parent.is_notable() {
            self.requested
                .entry(parent.clone())
                .or_default()
                .insert(child.clone());
        }

        let linked = self.link(child, inherited);

        for node in linked {
            if let Some(path) = self.graph.cycle_through(&node) {
                warn!(?path, "dependency cycle detected");
                return Err(path);
            }
        }

        Ok(())
    }

    /// Propagate `incoming` notable ancestors into `child`.
    ///
    /// Returns the notable tasks that received new edges; any new cycle has
    /// to pass through one of them.
    fn link(&mut self, child: &T, incoming: HashSet<T>) -> Vec<T> {
        let mut linked = Vec::new();
        let mut work = vec![(child.clone(), incoming)];

        while let Some((node, incoming)) = work.pop() {
            if node.is_notable() {
                self.graph.node(&node);
                let mut added = false;
                for ancestor in &incoming {
                    added |= self.graph.add_edge(ancestor, &node);
                }
                self.ancestors
                    .insert(node.clone(), HashSet::from([node.clone()]));
                if added {
                    linked.push(node);
                }
                continue;
            }

            let known = self.ancestors.entry(node.clone()).or_default();
            let fresh: HashSet<T> = incoming
                .into_iter()
                .filter(|a| known.insert(a.clone()))
                .collect();
            if fresh.is_empty() {
                continue;
            }

            if let Some(children) = self.requested.get(&node) {
                for grandchild in children {
                    work.push((grandchild.clone(), fresh.clone()));
                }
            }
        }

        linked
    }

    /// Notable ancestors currently recorded for `task`.
    pub fn ancestors_of(&self, task: &T) -> Option<&HashSet<T>> {
        self.ancestors.get(task)
    }

    pub fn graph(&self) -> &NotableGraph<T> {
        &self.graph
    }
}

impl<T: Task> Default for CycleDetector<T> {
    fn default() -> Self {
        Self::new()
    }
}
