//! Rewrites applied to a private copy of the flow graph before it is cut
//! into blocks. After `normalize` the graph has no flow-parts, no unconnected
//! outputs, a stage boundary between any two shuffle operators, and an
//! identity between a stage boundary and any boundary it feeds directly.

use crate::compiler::CompilerOptions;
use crate::graph::{
    ElementId, FlowGraph, Inline, LogLevel, OperatorKind, PortDirection, PortId, PseudoKind,
    collect_elements, collect_flow_parts, collect_scope_elements, succeeding_boundaries,
};
use ahash::AHashMap;
use std::collections::VecDeque;
use tracing::debug;

pub fn normalize(graph: &mut FlowGraph, options: &CompilerOptions) {
    debug!(flow = graph.name(), "normalizing operator graph");
    inline_flow_parts(graph, options);
    remove_disabled_loggings(graph, options);
    insert_implicit_stops(graph);
    unify_global_side_effects(graph);
    insert_checkpoints(graph);
    insert_identities(graph);
    reduce_identities(graph);
}

/// Replaces every flow-part call with a copy of its body, innermost last.
pub fn inline_flow_parts(graph: &mut FlowGraph, options: &CompilerOptions) {
    loop {
        let parts = collect_flow_parts(graph, graph.root());
        if parts.is_empty() {
            break;
        }
        for part in parts {
            inline_flow_part(graph, part, options);
        }
    }
}

fn inline_flow_part(graph: &mut FlowGraph, element: ElementId, options: &CompilerOptions) {
    let caller = graph.element(element).clone();
    let Some(part) = caller.description().flow_part().cloned() else {
        return;
    };
    let segregate = match part.inline {
        Inline::Default => !options.compress_flow_part,
        Inline::ForceAggregate => false,
        Inline::KeepSegregated => true,
    };
    debug!(
        flow_part = part.name.as_str(),
        segregate, "inlining flow-part"
    );

    let nested = graph.scope(part.scope).clone();
    let members: Vec<ElementId> = collect_scope_elements(graph, part.scope)
        .into_iter()
        .filter(|e| !nested.inputs().contains(e) && !nested.outputs().contains(e))
        .collect();
    let mut copies = AHashMap::with_capacity(members.len());
    for member in &members {
        copies.insert(*member, graph.copy_element(*member, caller.scope()));
    }

    for member in &members {
        let outputs = graph.element(*member).outputs().to_vec();
        for output in outputs {
            let Some(upstream) = copied_port(graph, &copies, output) else {
                continue;
            };
            for downstream in graph.port(output).opposites().to_vec() {
                if let Some(downstream) = copied_port(graph, &copies, downstream) {
                    graph.connect(upstream, downstream);
                }
            }
        }
    }

    for (index, inner) in nested.inputs().iter().enumerate() {
        let upstreams = graph.port(caller.inputs()[index]).opposites().to_vec();
        let mut downstreams = Vec::new();
        for port in graph.element(*inner).outputs().to_vec() {
            for target in graph.port(port).opposites().to_vec() {
                if let Some(copy) = copied_port(graph, &copies, target) {
                    downstreams.push(copy);
                    continue;
                }
                let owner = graph.port(target).owner();
                if let Some(position) = nested.outputs().iter().position(|o| *o == owner) {
                    let exit = caller.outputs()[position];
                    downstreams.extend_from_slice(graph.port(exit).opposites());
                }
            }
        }
        bridge(graph, caller.inputs()[index], &upstreams, &downstreams, segregate);
    }

    for (index, inner) in nested.outputs().iter().enumerate() {
        let downstreams = graph.port(caller.outputs()[index]).opposites().to_vec();
        let mut upstreams = Vec::new();
        for port in graph.element(*inner).inputs().to_vec() {
            for source in graph.port(port).opposites().to_vec() {
                if let Some(copy) = copied_port(graph, &copies, source) {
                    upstreams.push(copy);
                }
            }
        }
        bridge(graph, caller.outputs()[index], &upstreams, &downstreams, segregate);
    }

    graph.disconnect_element(element);
}

fn copied_port(
    graph: &FlowGraph,
    copies: &AHashMap<ElementId, ElementId>,
    port: PortId,
) -> Option<PortId> {
    let original = graph.port(port);
    let copy = graph.element(*copies.get(&original.owner())?);
    let index = graph.port_index(port);
    match original.direction() {
        PortDirection::Input => copy.inputs().get(index).copied(),
        PortDirection::Output => copy.outputs().get(index).copied(),
    }
}

fn bridge(
    graph: &mut FlowGraph,
    caller_port: PortId,
    upstreams: &[PortId],
    downstreams: &[PortId],
    segregate: bool,
) {
    if segregate && !upstreams.is_empty() && !downstreams.is_empty() {
        let scope = graph.element(graph.port(caller_port).owner()).scope();
        let model = graph.port(caller_port).model().clone();
        let checkpoint = graph.add_pseudo(scope, PseudoKind::Checkpoint, model);
        let input = graph.element(checkpoint).inputs()[0];
        let output = graph.element(checkpoint).outputs()[0];
        for upstream in upstreams {
            graph.connect(*upstream, input);
        }
        for downstream in downstreams {
            graph.connect(output, *downstream);
        }
    } else {
        for upstream in upstreams {
            for downstream in downstreams {
                graph.connect(*upstream, *downstream);
            }
        }
    }
}

/// Bypasses debug level `Logging` operators unless debug logging is enabled.
pub fn remove_disabled_loggings(graph: &mut FlowGraph, options: &CompilerOptions) {
    if options.enable_debug_logging {
        return;
    }
    for id in collect_elements(graph) {
        let element = graph.element(id);
        let debug_logging = matches!(
            element.description().operator().map(|op| &op.kind),
            Some(OperatorKind::Logging {
                level: LogLevel::Debug
            })
        );
        if debug_logging && element.inputs().len() == 1 && element.outputs().len() <= 1 {
            debug!(element = %element, "removing debug logging");
            graph.skip(id);
        }
    }
}

/// Terminates every unconnected output with an implicit stop.
pub fn insert_implicit_stops(graph: &mut FlowGraph) {
    for id in collect_elements(graph) {
        for output in graph.element(id).outputs().to_vec() {
            if !graph.port(output).is_connected() {
                debug!(element = %graph.element(id), "inserting implicit stop");
                graph.stop(output);
            }
        }
    }
}

/// Puts a checkpoint after every operator that must not run twice.
pub fn unify_global_side_effects(graph: &mut FlowGraph) {
    for id in collect_elements(graph) {
        let element = graph.element(id);
        if element.has_global_side_effect() && !element.is_boundary() {
            debug!(element = %element, "inserting checkpoint after volatile operator");
            for output in element.outputs().to_vec() {
                graph.insert_pseudo(output, PseudoKind::Checkpoint);
            }
        }
    }
}

/// Separates consecutive shuffle operators with a checkpoint, pushed as far
/// downstream as single-input push-down operators allow.
pub fn insert_checkpoints(graph: &mut FlowGraph) {
    for id in collect_elements(graph) {
        if !graph.element(id).is_shuffle_boundary() {
            continue;
        }
        let mut work: VecDeque<PortId> = graph.element(id).outputs().iter().copied().collect();
        while let Some(output) = work.pop_front() {
            let reaches_shuffle = succeeding_boundaries(graph, output)
                .into_iter()
                .any(|e| graph.element(e).is_shuffle_boundary());
            if !reaches_shuffle {
                continue;
            }
            let opposites = graph.port(output).opposites();
            if opposites.len() == 1 {
                let successor = graph.port(opposites[0]).owner();
                if is_push_down_target(graph, successor) {
                    work.extend(graph.element(successor).outputs().iter().copied());
                    continue;
                }
            }
            debug!(element = %graph.element(graph.port(output).owner()), "inserting checkpoint");
            graph.insert_pseudo(output, PseudoKind::Checkpoint);
        }
    }
}

fn is_push_down_target(graph: &FlowGraph, id: ElementId) -> bool {
    let element = graph.element(id);
    if element.is_boundary() || element.inputs().len() != 1 {
        return false;
    }
    if graph.port(element.inputs()[0]).opposites().len() != 1 {
        return false;
    }
    match element.description().operator() {
        Some(op) => op.kind.is_push_down_target(),
        None => element.description().pseudo().is_some(),
    }
}

/// Places an identity on every connection from a stage boundary straight
/// into another boundary, so that each such edge becomes a map block.
pub fn insert_identities(graph: &mut FlowGraph) {
    for id in collect_elements(graph) {
        if !graph.element(id).is_stage_boundary() {
            continue;
        }
        for output in graph.element(id).outputs().to_vec() {
            for downstream in graph.port(output).opposites().to_vec() {
                let successor = graph.port(downstream).owner();
                if graph.element(successor).is_boundary() {
                    debug!(element = %graph.element(id), "inserting identity");
                    graph.insert_pseudo_between(output, downstream, PseudoKind::Identity);
                }
            }
        }
    }
}

/// Removes identities that do not sit between a stage boundary and a boundary.
pub fn reduce_identities(graph: &mut FlowGraph) {
    loop {
        let mut changed = false;
        for id in collect_elements(graph) {
            if graph.element(id).description().pseudo() != Some(PseudoKind::Identity) {
                continue;
            }
            let predecessors = graph.predecessors(id);
            let successors = graph.successors(id);
            let required = predecessors.len() == 1
                && successors.len() == 1
                && graph.element(predecessors[0]).is_stage_boundary()
                && graph.element(successors[0]).is_boundary();
            if !required {
                debug!(element = %graph.element(id), "removing redundant identity");
                graph.skip(id);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}
