use crate::error::{Diagnostic, PlanningError};
use crate::graph::{
    Connectivity, ElementId, FlowGraph, ScopeId, collect_flow_parts, collect_scope_elements,
    to_element_graph,
};
use crate::shuffle::{self, ShuffleKey};
use tracing::debug;

/// Checks `graph` and all flow-part bodies it calls, appending one
/// diagnostic per problem. Returns `true` if nothing was found.
pub fn validate(graph: &FlowGraph, diagnostics: &mut Vec<Diagnostic>) -> bool {
    let before = diagnostics.len();
    let mut scopes = vec![graph.root()];
    let mut next = 0;
    while let Some(scope) = scopes.get(next).copied() {
        next += 1;
        validate_scope(graph, scope, diagnostics);
        for part in collect_flow_parts(graph, scope) {
            if let Some(nested) = graph.element(part).description().flow_part() {
                if !scopes.contains(&nested.scope) {
                    scopes.push(nested.scope);
                }
            }
        }
    }
    diagnostics.len() == before
}

fn validate_scope(graph: &FlowGraph, scope: ScopeId, diagnostics: &mut Vec<Diagnostic>) {
    let flow = graph.scope(scope).name();
    debug!(flow, "validating flow graph");
    let mut report = |error| diagnostics.push(Diagnostic::new(flow, error));

    for id in collect_scope_elements(graph, scope) {
        let element = graph.element(id);
        for port in element.inputs() {
            let port = graph.port(*port);
            if !port.is_connected() {
                report(PlanningError::OrphanedInput {
                    element: element.name().to_string(),
                    port: port.name().to_string(),
                });
            }
        }
        for port in element.outputs() {
            let port = graph.port(*port);
            if !port.is_connected() && element.connectivity() == Connectivity::Mandatory {
                report(PlanningError::OrphanedOutput {
                    element: element.name().to_string(),
                    port: port.name().to_string(),
                });
            }
        }
        if element.is_shuffle_boundary() {
            validate_shuffle_keys(graph, id, &mut report);
        }
    }

    for circuit in to_element_graph(graph, scope).find_circuits() {
        report(PlanningError::CyclicFlow {
            elements: circuit
                .iter()
                .map(|e| graph.element(*e).name().to_string())
                .collect(),
        });
    }
}

fn validate_shuffle_keys(
    graph: &FlowGraph,
    id: ElementId,
    report: &mut impl FnMut(PlanningError),
) {
    let element = graph.element(id);
    let mut first: Option<(&str, ShuffleKey)> = None;
    for port in element.inputs() {
        let port = graph.port(*port);
        let Some(declaration) = port.key() else {
            report(PlanningError::MissingShuffleKey {
                element: element.name().to_string(),
                port: port.name().to_string(),
            });
            continue;
        };
        match shuffle::resolve(declaration, port.model()) {
            Ok(key) => match &first {
                None => first = Some((port.name(), key)),
                Some((expected, reference)) => {
                    if !reference.is_compatible_with(&key) {
                        report(PlanningError::IncompatibleShuffleKey {
                            element: element.name().to_string(),
                            port: port.name().to_string(),
                            expected_port: expected.to_string(),
                        });
                    }
                }
            },
            Err(source) => report(PlanningError::InvalidKey {
                element: element.name().to_string(),
                port: port.name().to_string(),
                source,
            }),
        }
    }
}
