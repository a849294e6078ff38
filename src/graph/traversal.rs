use super::digraph::Digraph;
use super::{ElementDescription, ElementId, FlowGraph, PortId, ScopeId};

/// Collects every non-flow-part element of `graph`, descending into nested
/// flow-parts. Each element appears once, in depth-first encounter order
/// starting from the declared inputs, then the declared outputs.
pub fn collect_elements(graph: &FlowGraph) -> Vec<ElementId> {
    let mut collector = Collector::new(graph, true);
    collector.visit_scope(graph.root());
    collector.results
}

/// Collects the elements that belong directly to `scope`, flow-part elements
/// included, without descending into their bodies.
pub fn collect_scope_elements(graph: &FlowGraph, scope: ScopeId) -> Vec<ElementId> {
    let mut collector = Collector::new(graph, false);
    collector.visit_scope(scope);
    collector.results
}

pub fn collect_flow_parts(graph: &FlowGraph, scope: ScopeId) -> Vec<ElementId> {
    collect_scope_elements(graph, scope)
        .into_iter()
        .filter(|e| graph.element(*e).description().flow_part().is_some())
        .collect()
}

pub fn collect_boundaries(graph: &FlowGraph, scope: ScopeId) -> Vec<ElementId> {
    collect_scope_elements(graph, scope)
        .into_iter()
        .filter(|e| graph.element(*e).is_boundary())
        .collect()
}

/// Builds the element-level dependency graph of `scope` (upstream -> downstream).
pub fn to_element_graph(graph: &FlowGraph, scope: ScopeId) -> Digraph<ElementId> {
    let mut results = Digraph::new();
    for element in collect_scope_elements(graph, scope) {
        results.add_node(element);
        for successor in graph.successors(element) {
            results.add_edge(element, successor);
        }
    }
    results
}

/// Boundary elements reachable downstream of `output` without crossing
/// another boundary.
pub fn succeeding_boundaries(graph: &FlowGraph, output: PortId) -> Vec<ElementId> {
    let mut visited = vec![false; graph.element_count()];
    let mut results = Vec::new();
    let mut stack: Vec<ElementId> = graph
        .port(output)
        .opposites()
        .iter()
        .rev()
        .map(|p| graph.port(*p).owner())
        .collect();
    while let Some(element) = stack.pop() {
        if std::mem::replace(&mut visited[element.index()], true) {
            continue;
        }
        if graph.element(element).is_boundary() {
            results.push(element);
            continue;
        }
        let mut successors = graph.successors(element);
        successors.reverse();
        stack.extend(successors);
    }
    results
}

struct Collector<'a> {
    graph: &'a FlowGraph,
    flatten: bool,
    visited: Vec<bool>,
    results: Vec<ElementId>,
}

impl<'a> Collector<'a> {
    fn new(graph: &'a FlowGraph, flatten: bool) -> Self {
        Self {
            graph,
            flatten,
            visited: vec![false; graph.element_count()],
            results: Vec::new(),
        }
    }

    fn visit_scope(&mut self, scope: ScopeId) {
        let scope = self.graph.scope(scope);
        for element in scope.inputs().iter().chain(scope.outputs()) {
            self.visit(*element);
        }
    }

    /// Depth-first preorder from `start`. Elements are pushed in reverse so
    /// they pop in port order; flattened parts come before their neighbors.
    fn visit(&mut self, start: ElementId) {
        let graph = self.graph;
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut self.visited[id.index()], true) {
                continue;
            }
            let element = graph.element(id);
            let neighbors = element
                .outputs()
                .iter()
                .chain(element.inputs())
                .flat_map(|port| graph.port(*port).opposites())
                .map(|opposite| graph.port(*opposite).owner())
                .collect::<Vec<_>>();
            stack.extend(neighbors.into_iter().rev());
            match element.description() {
                ElementDescription::FlowPart(part) if self.flatten => {
                    let scope = graph.scope(part.scope);
                    let members = scope.inputs().iter().chain(scope.outputs());
                    stack.extend(members.rev().copied());
                }
                _ => self.results.push(id),
            }
        }
    }
}
