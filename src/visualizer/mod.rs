//! Renderer-neutral pictures of flow graphs and stage graphs.
//!
//! The analyzer converts a graph into a tree of `VisualNode`s plus a flat
//! list of relations between them. Renderers such as the DOT emitter match
//! the node kinds exhaustively.

use crate::graph::{ElementId, ElementKind};
use crate::plan::BlockRole;
use std::fmt;

mod analyzer;
mod dot;
mod summary;

pub use analyzer::{visualize_flow_graph, visualize_stage_graph};
pub use dot::{emit_dot, write_dot};
pub use summary::{format_jobflow, write_jobflow};

/// Identifier of a visual node, unique within one `Visualization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(u32);

impl fmt::Display for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualNode {
    Graph(VisualGraph),
    Block(VisualBlock),
    FlowPart(VisualFlowPart),
    Element(VisualElement),
    Label(VisualLabel),
}

impl VisualNode {
    pub fn id(&self) -> VisualId {
        match self {
            VisualNode::Graph(node) => node.id,
            VisualNode::Block(node) => node.id,
            VisualNode::FlowPart(node) => node.id,
            VisualNode::Element(node) => node.id,
            VisualNode::Label(node) => node.id,
        }
    }

    /// Nodes nested directly inside this one.
    pub fn children(&self) -> &[VisualNode] {
        match self {
            VisualNode::Graph(node) => &node.nodes,
            VisualNode::Block(node) => &node.nodes,
            VisualNode::FlowPart(node) => &node.nodes,
            VisualNode::Element(_) | VisualNode::Label(_) => &[],
        }
    }

    /// This node and all nodes nested in it, depth first.
    pub fn descendants(&self) -> Vec<&VisualNode> {
        let mut results = vec![self];
        for child in self.children() {
            results.extend(child.descendants());
        }
        results
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualGraph {
    pub id: VisualId,
    pub label: Option<String>,
    pub nodes: Vec<VisualNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualBlock {
    pub id: VisualId,
    pub label: String,
    pub role: BlockRole,
    pub nodes: Vec<VisualNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualFlowPart {
    pub id: VisualId,
    pub label: String,
    pub nodes: Vec<VisualNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualElement {
    pub id: VisualId,
    pub element: ElementId,
    pub kind: ElementKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualLabel {
    pub id: VisualId,
    pub text: String,
}

/// A directed edge between two visual nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualRelation {
    pub source: VisualId,
    pub sink: VisualId,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visualization {
    pub root: VisualGraph,
    pub relations: Vec<VisualRelation>,
}

impl Visualization {
    /// Every node below the root, depth first.
    pub fn nodes(&self) -> Vec<&VisualNode> {
        self.root.nodes.iter().flat_map(VisualNode::descendants).collect()
    }
}

/// Hands out fresh `VisualId`s.
#[derive(Debug, Default)]
pub(crate) struct IdSequence(u32);

impl IdSequence {
    pub(crate) fn next(&mut self) -> VisualId {
        self.0 += 1;
        VisualId(self.0)
    }
}
