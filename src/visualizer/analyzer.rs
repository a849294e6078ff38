use super::{
    IdSequence, VisualBlock, VisualElement, VisualFlowPart, VisualGraph, VisualId, VisualLabel,
    VisualNode, VisualRelation, Visualization,
};
use crate::graph::{
    ElementDescription, ElementId, FlowGraph, PortDirection, PortId, ScopeId,
    collect_scope_elements,
};
use crate::plan::{BlockId, BlockRole, FlowBlock, StageGraph};
use ahash::{AHashMap, AHashSet};

/// Pictures a flow graph with its flow-parts as nested clusters.
///
/// A flow-part body shared by several flow-part elements is drawn inside the
/// first of them only; the others hold a label naming the shared body.
pub fn visualize_flow_graph(graph: &FlowGraph) -> Visualization {
    let mut converter = FlowConverter {
        graph,
        ids: IdSequence::default(),
        visited: vec![false; graph.element_count()],
        drawn: AHashSet::new(),
        nodes: AHashMap::new(),
        shared: AHashMap::new(),
        emitted: Vec::new(),
    };
    let id = converter.ids.next();
    converter.drawn.insert(graph.root());
    let nodes = converter.convert_scope(graph.root());
    let relations = converter.relations();
    Visualization {
        root: VisualGraph {
            id,
            label: Some(graph.name().to_string()),
            nodes,
        },
        relations,
    }
}

struct FlowConverter<'a> {
    graph: &'a FlowGraph,
    ids: IdSequence,
    visited: Vec<bool>,
    drawn: AHashSet<ScopeId>,
    nodes: AHashMap<ElementId, VisualId>,
    // flow-part elements whose body is drawn elsewhere
    shared: AHashMap<ElementId, VisualId>,
    emitted: Vec<ElementId>,
}

impl FlowConverter<'_> {
    fn convert_scope(&mut self, scope: ScopeId) -> Vec<VisualNode> {
        let graph = self.graph;
        let mut results = Vec::new();
        for id in collect_scope_elements(graph, scope) {
            if std::mem::replace(&mut self.visited[id.index()], true) {
                continue;
            }
            self.emitted.push(id);
            let element = graph.element(id);
            let node = self.ids.next();
            self.nodes.insert(id, node);
            match element.description() {
                ElementDescription::FlowPart(part) => {
                    let nodes = if self.drawn.insert(part.scope) {
                        self.convert_scope(part.scope)
                    } else {
                        let label = self.ids.next();
                        self.shared.insert(id, label);
                        vec![VisualNode::Label(VisualLabel {
                            id: label,
                            text: format!("shares {}", graph.scope(part.scope).name()),
                        })]
                    };
                    results.push(VisualNode::FlowPart(VisualFlowPart {
                        id: node,
                        label: element.to_string(),
                        nodes,
                    }));
                }
                _ => results.push(VisualNode::Element(VisualElement {
                    id: node,
                    element: id,
                    kind: element.kind(),
                    label: element.to_string(),
                })),
            }
        }
        results
    }

    /// The visual node a connection of `port` attaches to. Ports of flow-part
    /// elements attach to the matching input or output inside the body.
    fn anchor(&self, port: PortId) -> Option<VisualId> {
        let graph = self.graph;
        let owner = graph.element(graph.port(port).owner());
        let Some(part) = owner.description().flow_part() else {
            return self.nodes.get(&owner.id()).copied();
        };
        if let Some(label) = self.shared.get(&owner.id()) {
            return Some(*label);
        }
        let body = graph.scope(part.scope);
        let boundary = match graph.port(port).direction() {
            PortDirection::Input => body.inputs(),
            PortDirection::Output => body.outputs(),
        };
        boundary
            .get(graph.port_index(port))
            .and_then(|e| self.nodes.get(e))
            .copied()
    }

    fn relations(&self) -> Vec<VisualRelation> {
        let graph = self.graph;
        let mut results = Vec::new();
        for id in &self.emitted {
            let element = graph.element(*id);
            for output in element.outputs() {
                let label = (element.outputs().len() > 1)
                    .then(|| graph.port(*output).name().to_string());
                for opposite in graph.port(*output).opposites() {
                    let ends = (self.anchor(*output), self.anchor(*opposite));
                    if let (Some(source), Some(sink)) = ends {
                        results.push(VisualRelation {
                            source,
                            sink,
                            label: label.clone(),
                        });
                    }
                }
            }
        }
        results
    }
}

/// Pictures planned stages as clusters of blocks, each block holding its
/// elements. Relations follow element connections inside a block and block
/// connections between blocks.
pub fn visualize_stage_graph(stage_graph: &StageGraph) -> Visualization {
    let graph = stage_graph.flow_graph();
    let mut ids = IdSequence::default();
    let mut anchors: AHashMap<(BlockId, ElementId), VisualId> = AHashMap::new();
    let root = ids.next();

    let mut nodes = vec![convert_block(graph, stage_graph.input(), &mut ids, &mut anchors)];
    for stage in stage_graph.stages() {
        let id = ids.next();
        let blocks = stage
            .blocks()
            .map(|b| convert_block(graph, stage_graph.block(b), &mut ids, &mut anchors))
            .collect();
        nodes.push(VisualNode::Graph(VisualGraph {
            id,
            label: Some(stage.label()),
            nodes: blocks,
        }));
    }
    nodes.push(convert_block(graph, stage_graph.output(), &mut ids, &mut anchors));

    let mut relations = Vec::new();
    for block in stage_graph.blocks() {
        for element in block.elements() {
            let Some(source) = anchors.get(&(block.id(), *element)) else {
                continue;
            };
            for output in graph.element(*element).outputs() {
                for opposite in graph.port(*output).opposites() {
                    let owner = graph.port(*opposite).owner();
                    if let Some(sink) = anchors.get(&(block.id(), owner)) {
                        relations.push(VisualRelation {
                            source: *source,
                            sink: *sink,
                            label: None,
                        });
                    }
                }
            }
        }
        for output in block.outputs() {
            let owner = graph.port(output.port()).owner();
            let Some(source) = anchors.get(&(block.id(), owner)) else {
                continue;
            };
            for target in output.targets() {
                let sink_owner = graph.port(target.port).owner();
                let Some(sink) = anchors.get(&(target.block, sink_owner)) else {
                    continue;
                };
                let shuffled = stage_graph.block(target.block).role() == BlockRole::Reduce;
                relations.push(VisualRelation {
                    source: *source,
                    sink: *sink,
                    label: shuffled.then(|| "shuffle".to_string()),
                });
            }
        }
    }

    Visualization {
        root: VisualGraph {
            id: root,
            label: Some(graph.name().to_string()),
            nodes,
        },
        relations,
    }
}

fn convert_block(
    graph: &FlowGraph,
    block: &FlowBlock,
    ids: &mut IdSequence,
    anchors: &mut AHashMap<(BlockId, ElementId), VisualId>,
) -> VisualNode {
    let id = ids.next();
    let mut visited = AHashSet::new();
    let nodes = block
        .elements()
        .iter()
        .filter(|e| visited.insert(**e))
        .map(|e| {
            let element = graph.element(*e);
            let node = ids.next();
            anchors.insert((block.id(), *e), node);
            VisualNode::Element(VisualElement {
                id: node,
                element: *e,
                kind: element.kind(),
                label: element.to_string(),
            })
        })
        .collect();
    let label = if block.allows_partial_aggregation() {
        format!("{block} (combine)")
    } else {
        block.to_string()
    };
    VisualNode::Block(VisualBlock {
        id,
        label,
        role: block.role(),
        nodes,
    })
}
