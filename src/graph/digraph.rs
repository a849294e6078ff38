//! A small directed graph that remembers insertion order.
//!
//! Iteration over nodes and edges always follows the order in which they were
//! added, so every algorithm here is deterministic.

use ahash::AHashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct Digraph<V> {
    nodes: Vec<V>,
    index: AHashMap<V, usize>,
    edges: Vec<Vec<usize>>,
}

impl<V> Default for Digraph<V> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: AHashMap::new(),
            edges: Vec::new(),
        }
    }
}

impl<V: Copy + Eq + Hash> Digraph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: V) -> usize {
        if let Some(&index) = self.index.get(&node) {
            return index;
        }
        self.nodes.push(node);
        self.edges.push(Vec::new());
        self.index.insert(node, self.nodes.len() - 1);
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, from: V, to: V) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
    }

    pub fn contains(&self, node: V) -> bool {
        self.index.contains_key(&node)
    }

    pub fn nodes(&self) -> &[V] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes directly reachable from `node`.
    pub fn connected(&self, node: V) -> impl Iterator<Item = V> + '_ {
        let edges = match self.index.get(&node) {
            Some(&index) => self.edges[index].as_slice(),
            None => &[],
        };
        edges.iter().map(|i| self.nodes[*i])
    }

    pub fn edges(&self) -> impl Iterator<Item = (V, V)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .flat_map(move |(from, targets)| {
                targets.iter().map(move |to| (self.nodes[from], self.nodes[*to]))
            })
    }

    /// The same graph with every edge reversed.
    pub fn transpose(&self) -> Self {
        let mut results = Self::new();
        for node in &self.nodes {
            results.add_node(*node);
        }
        for (from, to) in self.edges() {
            results.add_edge(to, from);
        }
        results
    }

    /// Returns every circuit of the graph: strongly connected components with
    /// more than one node, and nodes with an edge to themselves. Members of a
    /// circuit are listed in insertion order.
    pub fn find_circuits(&self) -> Vec<Vec<V>> {
        let count = self.nodes.len();

        // first pass: finishing order on the graph itself
        let mut visited = vec![false; count];
        let mut finished = Vec::with_capacity(count);
        for start in 0..count {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut stack = vec![(start, 0usize)];
            while let Some((node, next)) = stack.pop() {
                if let Some(&target) = self.edges[node].get(next) {
                    stack.push((node, next + 1));
                    if !visited[target] {
                        visited[target] = true;
                        stack.push((target, 0));
                    }
                } else {
                    finished.push(node);
                }
            }
        }

        // second pass: components on the transposed graph
        let mut reversed = vec![Vec::new(); count];
        for (from, targets) in self.edges.iter().enumerate() {
            for to in targets {
                reversed[*to].push(from);
            }
        }
        let mut component = vec![usize::MAX; count];
        let mut components: Vec<Vec<usize>> = Vec::new();
        for &root in finished.iter().rev() {
            if component[root] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut members = Vec::new();
            let mut stack = vec![root];
            component[root] = id;
            while let Some(node) = stack.pop() {
                members.push(node);
                for &source in &reversed[node] {
                    if component[source] == usize::MAX {
                        component[source] = id;
                        stack.push(source);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }

        let mut circuits: Vec<Vec<usize>> = components
            .into_iter()
            .filter(|members| {
                members.len() >= 2 || self.edges[members[0]].contains(&members[0])
            })
            .collect();
        circuits.sort_by_key(|members| members[0]);
        circuits
            .into_iter()
            .map(|members| members.into_iter().map(|i| self.nodes[i]).collect())
            .collect()
    }

    /// Orders the nodes so that every node comes after all nodes it has an
    /// edge to. Edges therefore read "depends on". Among nodes whose
    /// dependencies are all emitted, the earliest inserted goes first.
    ///
    /// Fails with the nodes that could not be ordered if the graph has a circuit.
    pub fn sort_post_order(&self) -> Result<Vec<V>, Vec<V>> {
        let count = self.nodes.len();
        let mut pending: Vec<usize> = self.edges.iter().map(Vec::len).collect();
        let mut dependents = vec![Vec::new(); count];
        for (from, targets) in self.edges.iter().enumerate() {
            for to in targets {
                dependents[*to].push(from);
            }
        }
        let mut ready: std::collections::BTreeSet<usize> =
            (0..count).filter(|i| pending[*i] == 0).collect();
        let mut results = Vec::with_capacity(count);
        while let Some(node) = ready.pop_first() {
            results.push(self.nodes[node]);
            for &dependent in &dependents[node] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }
        if results.len() == count {
            Ok(results)
        } else {
            Err((0..count)
                .filter(|i| pending[*i] > 0)
                .map(|i| self.nodes[i])
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_self_loops_and_components() {
        let mut graph = Digraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);
        graph.add_edge(3, 2);
        graph.add_edge(4, 4);
        graph.add_edge(3, 5);
        assert_eq!(graph.find_circuits(), vec![vec![2, 3], vec![4]]);
    }

    #[test]
    fn post_order_puts_dependencies_first() {
        let mut graph = Digraph::new();
        graph.add_node("a");
        graph.add_node("b");
        graph.add_node("c");
        graph.add_edge("a", "c");
        assert_eq!(graph.sort_post_order().unwrap(), vec!["b", "c", "a"]);

        graph.add_edge("c", "a");
        assert!(graph.sort_post_order().is_err());
    }
}
