// src/dag/graph.rs

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use petgraph::graph::{DiGraph, NodeIndex};

/// Directed graph over notable tasks only.
///
/// An edge `a -> b` means notable task `a` (transitively, through any number
/// of non-notable hops) requested notable task `b`. Nodes are never removed.
#[derive(Debug, Clone)]
pub struct NotableGraph<T> {
    graph: DiGraph<T, ()>,
    index: HashMap<T, NodeIndex>,
}

impl<T> NotableGraph<T>
where
    T: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Index of `task`, adding the node if it is new.
    pub fn node(&mut self, task: &T) -> NodeIndex {
        if let Some(idx) = self.index.get(task) {
            return *idx;
        }
        let idx = self.graph.add_node(task.clone());
        self.index.insert(task.clone(), idx);
        idx
    }

    /// Add `from -> to`. Returns `true` if the edge is new.
    pub fn add_edge(&mut self, from: &T, to: &T) -> bool {
        let a = self.node(from);
        let b = self.node(to);
        if self.graph.contains_edge(a, b) {
            return false;
        }
        self.graph.add_edge(a, b, ());
        true
    }

    pub fn contains_edge(&self, from: &T, to: &T) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
            _ => false,
        }
    }

    /// Shortest cycle through `start`, as `[start, .., start]`.
    ///
    /// Breadth-first from `start` until an edge leads back into it.
    pub fn cycle_through(&self, start: &T) -> Option<Vec<T>> {
        let start = *self.index.get(start)?;

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors(current) {
                if next == start {
                    return Some(self.path_back(start, current, &parent));
                }
                if visited.insert(next) {
                    parent.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    fn path_back(
        &self,
        start: NodeIndex,
        last: NodeIndex,
        parent: &HashMap<NodeIndex, NodeIndex>,
    ) -> Vec<T> {
        let mut nodes = vec![last];
        let mut current = last;
        while current != start {
            match parent.get(&current) {
                Some(prev) => {
                    current = *prev;
                    nodes.push(current);
                }
                None => break,
            }
        }
        nodes.reverse();
        nodes.push(start);
        nodes
            .into_iter()
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl<T: Clone + Eq + Hash> Default for NotableGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}
