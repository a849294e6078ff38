//! The operator graph: elements, ports and the connections between them.
//!
//! All elements of a flow, including those nested in flow-parts, live in one
//! arena owned by `FlowGraph` and are addressed by `ElementId`. Ports are
//! addressed by `PortId` and point back to their owning element. A flow-part
//! element refers to a nested `FlowScope` of the same arena; several
//! flow-part elements may share a scope.

use crate::shuffle::KeyDeclaration;
use serde::{Deserialize, Serialize};
use std::fmt;

mod builder;
mod description;
pub mod digraph;
mod traversal;

pub use builder::{FlowGraphBuilder, PortSpec};
pub use description::*;
pub use traversal::*;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Index of a `FlowElement` in its graph's arena.
    ElementId,
    "e"
);
define_id!(
    /// Index of a `Port` in its graph's arena.
    PortId,
    "p"
);
define_id!(
    /// Index of a `FlowScope`. The root scope is always `ScopeId(0)`.
    ScopeId,
    "s"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    owner: ElementId,
    direction: PortDirection,
    name: String,
    model: DataModel,
    key: Option<KeyDeclaration>,
    opposites: Vec<PortId>,
}

impl Port {
    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn owner(&self) -> ElementId {
        self.owner
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &DataModel {
        &self.model
    }

    /// The `@Key` declared on this port, if any.
    pub fn key(&self) -> Option<&KeyDeclaration> {
        self.key.as_ref()
    }

    /// Ports at the other end of this port's connections, in connection order.
    pub fn opposites(&self) -> &[PortId] {
        &self.opposites
    }

    pub fn is_connected(&self) -> bool {
        !self.opposites.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FlowElement {
    id: ElementId,
    ordinal: u32,
    scope: ScopeId,
    name: String,
    description: ElementDescription,
    inputs: Vec<PortId>,
    outputs: Vec<PortId>,
}

impl FlowElement {
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Declaration order of the element. Copies made by flow-part inlining
    /// keep the ordinal of the element they were copied from.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &ElementDescription {
        &self.description
    }

    pub fn kind(&self) -> ElementKind {
        self.description.kind()
    }

    pub fn inputs(&self) -> &[PortId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PortId] {
        &self.outputs
    }

    pub fn boundary(&self) -> Option<FlowBoundary> {
        self.description.boundary()
    }

    pub fn is_boundary(&self) -> bool {
        self.boundary().is_some()
    }

    pub fn is_stage_boundary(&self) -> bool {
        self.boundary() == Some(FlowBoundary::Stage)
    }

    pub fn is_shuffle_boundary(&self) -> bool {
        self.boundary() == Some(FlowBoundary::Shuffle)
    }

    pub fn connectivity(&self) -> Connectivity {
        self.description.connectivity()
    }

    pub fn observation_count(&self) -> ObservationCount {
        self.description.observation_count()
    }

    /// The element must run even if nothing consumes its outputs.
    pub fn has_mandatory_side_effect(&self) -> bool {
        self.observation_count().at_least_once()
    }

    /// The element must not be recomputed once it has run.
    pub fn has_global_side_effect(&self) -> bool {
        self.observation_count().at_most_once()
    }
}

impl fmt::Display for FlowElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            ElementDescription::Operator(op) => {
                write!(f, "{}@{}#{}", self.name, op.kind, op.method)
            }
            ElementDescription::Input(_) => write!(f, "{}@input", self.name),
            ElementDescription::Output(_) => write!(f, "{}@output", self.name),
            ElementDescription::FlowPart(part) => {
                write!(f, "{}@flow-part({})", self.name, part.name)
            }
            ElementDescription::Pseudo(kind) => write!(f, "{}@{}", self.name, kind.name()),
        }
    }
}

/// A flow graph or one nested flow-part body.
#[derive(Debug, Clone)]
pub struct FlowScope {
    name: String,
    inputs: Vec<ElementId>,
    outputs: Vec<ElementId>,
}

impl FlowScope {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared flow inputs, in declaration order.
    pub fn inputs(&self) -> &[ElementId] {
        &self.inputs
    }

    /// Declared flow outputs, in declaration order.
    pub fn outputs(&self) -> &[ElementId] {
        &self.outputs
    }
}

#[derive(Debug, Clone)]
pub struct FlowGraph {
    elements: Vec<FlowElement>,
    ports: Vec<Port>,
    scopes: Vec<FlowScope>,
    next_ordinal: u32,
}

impl FlowGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            elements: Vec::new(),
            ports: Vec::new(),
            scopes: vec![FlowScope {
                name: name.into(),
                inputs: Vec::new(),
                outputs: Vec::new(),
            }],
            next_ordinal: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.scopes[0].name
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &FlowScope {
        &self.scopes[id.index()]
    }

    pub fn element(&self, id: ElementId) -> &FlowElement {
        &self.elements[id.index()]
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.index()]
    }

    /// Every element of the arena, including detached ones.
    pub fn elements(&self) -> impl Iterator<Item = &FlowElement> {
        self.elements.iter()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Finds an element of a scope by name.
    pub fn find(&self, scope: ScopeId, name: &str) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|e| e.scope == scope && e.name == name)
            .map(|e| e.id)
    }

    pub fn input_port(&self, element: ElementId, name: &str) -> Option<PortId> {
        self.element(element)
            .inputs
            .iter()
            .copied()
            .find(|p| self.port(*p).name == name)
    }

    pub fn output_port(&self, element: ElementId, name: &str) -> Option<PortId> {
        self.element(element)
            .outputs
            .iter()
            .copied()
            .find(|p| self.port(*p).name == name)
    }

    /// Position of a port among its owner's ports of the same direction.
    pub fn port_index(&self, port: PortId) -> usize {
        let port = self.port(port);
        let element = self.element(port.owner);
        let ports = match port.direction {
            PortDirection::Input => &element.inputs,
            PortDirection::Output => &element.outputs,
        };
        ports.iter().position(|p| *p == port.id).unwrap_or(0)
    }

    /// Elements downstream of `element`, in port and connection order.
    pub fn successors(&self, element: ElementId) -> Vec<ElementId> {
        self.neighbors(&self.element(element).outputs)
    }

    /// Elements upstream of `element`, in port and connection order.
    pub fn predecessors(&self, element: ElementId) -> Vec<ElementId> {
        self.neighbors(&self.element(element).inputs)
    }

    fn neighbors(&self, ports: &[PortId]) -> Vec<ElementId> {
        let mut results = Vec::new();
        for port in ports {
            for opposite in &self.port(*port).opposites {
                let owner = self.port(*opposite).owner;
                if !results.contains(&owner) {
                    results.push(owner);
                }
            }
        }
        results
    }

    pub(crate) fn add_scope(&mut self, name: impl Into<String>) -> ScopeId {
        self.scopes.push(FlowScope {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        ScopeId::from_index(self.scopes.len() - 1)
    }

    pub(crate) fn add_element(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        description: ElementDescription,
        inputs: Vec<PortSpec>,
        outputs: Vec<PortSpec>,
    ) -> ElementId {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.add_element_with_ordinal(scope, name.into(), description, inputs, outputs, ordinal)
    }

    fn add_element_with_ordinal(
        &mut self,
        scope: ScopeId,
        name: String,
        description: ElementDescription,
        inputs: Vec<PortSpec>,
        outputs: Vec<PortSpec>,
        ordinal: u32,
    ) -> ElementId {
        let id = ElementId::from_index(self.elements.len());
        match description.kind() {
            ElementKind::Input => self.scopes[scope.index()].inputs.push(id),
            ElementKind::Output => self.scopes[scope.index()].outputs.push(id),
            _ => {}
        }
        let inputs = inputs
            .into_iter()
            .map(|spec| self.add_port(id, PortDirection::Input, spec))
            .collect();
        let outputs = outputs
            .into_iter()
            .map(|spec| self.add_port(id, PortDirection::Output, spec))
            .collect();
        self.elements.push(FlowElement {
            id,
            ordinal,
            scope,
            name,
            description,
            inputs,
            outputs,
        });
        id
    }

    fn add_port(&mut self, owner: ElementId, direction: PortDirection, spec: PortSpec) -> PortId {
        let id = PortId::from_index(self.ports.len());
        self.ports.push(Port {
            id,
            owner,
            direction,
            name: spec.name,
            model: spec.model,
            key: spec.key,
            opposites: Vec::new(),
        });
        id
    }

    /// Creates a detached copy of `element` in `scope` with the same ordinal
    /// and unconnected ports in the same order.
    pub(crate) fn copy_element(&mut self, element: ElementId, scope: ScopeId) -> ElementId {
        let source = self.element(element).clone();
        let specs = |ports: &[PortId]| -> Vec<PortSpec> {
            ports
                .iter()
                .map(|p| PortSpec::from_port(self.port(*p)))
                .collect()
        };
        let inputs = specs(&source.inputs);
        let outputs = specs(&source.outputs);
        self.add_element_with_ordinal(
            scope,
            source.name,
            source.description,
            inputs,
            outputs,
            source.ordinal,
        )
    }

    /// Copies every scope and element of `other` into this arena and returns
    /// the scope that corresponds to `other`'s root.
    pub(crate) fn import(&mut self, other: &FlowGraph) -> ScopeId {
        let scopes: Vec<ScopeId> = other
            .scopes
            .iter()
            .map(|scope| self.add_scope(scope.name.clone()))
            .collect();
        let mut ports = vec![PortId(0); other.ports.len()];
        for element in &other.elements {
            let mut description = element.description.clone();
            if let ElementDescription::FlowPart(part) = &mut description {
                part.scope = scopes[part.scope.index()];
            }
            let specs = |ids: &[PortId]| -> Vec<PortSpec> {
                ids.iter()
                    .map(|p| PortSpec::from_port(other.port(*p)))
                    .collect()
            };
            let copy = self.add_element(
                scopes[element.scope.index()],
                element.name.clone(),
                description,
                specs(&element.inputs),
                specs(&element.outputs),
            );
            let copied = &self.elements[copy.index()];
            for (from, to) in element.inputs.iter().zip(&copied.inputs) {
                ports[from.index()] = *to;
            }
            for (from, to) in element.outputs.iter().zip(&copied.outputs) {
                ports[from.index()] = *to;
            }
        }
        for port in &other.ports {
            if port.direction == PortDirection::Output {
                for opposite in &port.opposites {
                    self.connect(ports[port.id.index()], ports[opposite.index()]);
                }
            }
        }
        scopes[0]
    }

    /// Connects an output port to an input port. Connecting twice is a no-op.
    pub fn connect(&mut self, upstream: PortId, downstream: PortId) {
        debug_assert_eq!(self.port(upstream).direction, PortDirection::Output);
        debug_assert_eq!(self.port(downstream).direction, PortDirection::Input);
        if self.ports[upstream.index()].opposites.contains(&downstream) {
            return;
        }
        self.ports[upstream.index()].opposites.push(downstream);
        self.ports[downstream.index()].opposites.push(upstream);
    }

    pub fn disconnect(&mut self, upstream: PortId, downstream: PortId) {
        self.ports[upstream.index()]
            .opposites
            .retain(|p| *p != downstream);
        self.ports[downstream.index()]
            .opposites
            .retain(|p| *p != upstream);
    }

    /// Removes every connection of `port`, returning the former opposites.
    pub(crate) fn disconnect_port(&mut self, port: PortId) -> Vec<PortId> {
        let opposites = std::mem::take(&mut self.ports[port.index()].opposites);
        for opposite in &opposites {
            self.ports[opposite.index()].opposites.retain(|p| *p != port);
        }
        opposites
    }

    /// Removes every connection of `element`, leaving it unreachable.
    pub(crate) fn disconnect_element(&mut self, element: ElementId) {
        let element = self.element(element);
        let ports: Vec<PortId> = element.inputs.iter().chain(&element.outputs).copied().collect();
        for port in ports {
            self.disconnect_port(port);
        }
    }

    fn port_context(&self, port: PortId) -> (ScopeId, DataModel) {
        let port = self.port(port);
        (self.element(port.owner).scope, port.model.clone())
    }

    /// Adds a detached pseudo element with ports `in` and, unless it is a stop, `out`.
    pub(crate) fn add_pseudo(
        &mut self,
        scope: ScopeId,
        kind: PseudoKind,
        model: DataModel,
    ) -> ElementId {
        let outputs = match kind {
            PseudoKind::Stop => Vec::new(),
            _ => vec![PortSpec::new("out", model.clone())],
        };
        self.add_element(
            scope,
            kind.name(),
            ElementDescription::Pseudo(kind),
            vec![PortSpec::new("in", model)],
            outputs,
        )
    }

    /// Inserts a pseudo element right after `output`; every former downstream
    /// of `output` is moved to the new element's output.
    pub(crate) fn insert_pseudo(&mut self, output: PortId, kind: PseudoKind) -> ElementId {
        let (scope, model) = self.port_context(output);
        let pseudo = self.add_pseudo(scope, kind, model);
        let pseudo_in = self.elements[pseudo.index()].inputs[0];
        let downstreams = self.disconnect_port(output);
        self.connect(output, pseudo_in);
        if let Some(pseudo_out) = self.elements[pseudo.index()].outputs.first().copied() {
            for downstream in downstreams {
                self.connect(pseudo_out, downstream);
            }
        }
        pseudo
    }

    /// Inserts a pseudo element on the single connection `upstream -> downstream`.
    pub(crate) fn insert_pseudo_between(
        &mut self,
        upstream: PortId,
        downstream: PortId,
        kind: PseudoKind,
    ) -> ElementId {
        let (scope, model) = self.port_context(upstream);
        let pseudo = self.add_pseudo(scope, kind, model);
        let pseudo_in = self.elements[pseudo.index()].inputs[0];
        let pseudo_out = self.elements[pseudo.index()].outputs[0];
        self.disconnect(upstream, downstream);
        self.connect(upstream, pseudo_in);
        self.connect(pseudo_out, downstream);
        pseudo
    }

    /// Terminates `output` with an implicit stop sink.
    pub(crate) fn stop(&mut self, output: PortId) -> ElementId {
        let (scope, model) = self.port_context(output);
        let stop = self.add_pseudo(scope, PseudoKind::Stop, model);
        let stop_in = self.elements[stop.index()].inputs[0];
        self.connect(output, stop_in);
        stop
    }

    /// Removes a single-input, single-output element and connects each of its
    /// upstreams to each of its downstreams.
    pub(crate) fn skip(&mut self, element: ElementId) {
        let target = self.element(element);
        debug_assert!(target.inputs.len() == 1 && target.outputs.len() <= 1);
        let input = target.inputs[0];
        let output = target.outputs.first().copied();
        let upstreams = self.disconnect_port(input);
        let downstreams = match output {
            Some(output) => self.disconnect_port(output),
            None => Vec::new(),
        };
        for upstream in &upstreams {
            for downstream in &downstreams {
                self.connect(*upstream, *downstream);
            }
        }
    }
}
