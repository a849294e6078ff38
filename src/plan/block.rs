use crate::graph::{ElementId, FlowGraph, PortId};
use crate::shuffle::ShuffleKey;
use serde::Serialize;
use std::fmt;

/// Index of a `FlowBlock` inside its `StageGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Addresses one boundary port of one block. Element ports are unique
/// within a block, so the element port identifies the block port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockPortRef {
    pub block: BlockId,
    pub port: PortId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockRole {
    /// Pseudo block holding the flow inputs.
    Input,
    /// Pseudo block holding the flow outputs.
    Output,
    Map,
    Reduce,
}

/// An entry point of a block. It reads only the element connections it was
/// built for, so two blocks sharing an element port never share records.
#[derive(Debug, Clone)]
pub struct BlockInput {
    port: PortId,
    shuffle_key: Option<ShuffleKey>,
    upstreams: Vec<PortId>,
    pub(crate) sources: Vec<BlockPortRef>,
}

impl BlockInput {
    pub(crate) fn new(
        port: PortId,
        shuffle_key: Option<ShuffleKey>,
        upstreams: Vec<PortId>,
    ) -> Self {
        Self {
            port,
            shuffle_key,
            upstreams,
            sources: Vec::new(),
        }
    }

    /// The element input port this block input feeds.
    pub fn port(&self) -> PortId {
        self.port
    }

    /// Element output ports whose connections into `port()` this input reads.
    pub fn upstreams(&self) -> &[PortId] {
        &self.upstreams
    }

    /// Present on every input of a reduce block.
    pub fn shuffle_key(&self) -> Option<&ShuffleKey> {
        self.shuffle_key.as_ref()
    }

    pub fn sources(&self) -> &[BlockPortRef] {
        &self.sources
    }
}

#[derive(Debug, Clone)]
pub struct BlockOutput {
    port: PortId,
    downstreams: Vec<PortId>,
    pub(crate) targets: Vec<BlockPortRef>,
}

impl BlockOutput {
    pub(crate) fn new(port: PortId, downstreams: Vec<PortId>) -> Self {
        Self {
            port,
            downstreams,
            targets: Vec::new(),
        }
    }

    /// The element output port this block output drains.
    pub fn port(&self) -> PortId {
        self.port
    }

    /// Element input ports whose connections from `port()` this output carries.
    pub fn downstreams(&self) -> &[PortId] {
        &self.downstreams
    }

    pub fn targets(&self) -> &[BlockPortRef] {
        &self.targets
    }
}

/// A group of elements that runs on one side of a stage without any shuffle
/// in between.
#[derive(Debug, Clone)]
pub struct FlowBlock {
    pub(crate) id: BlockId,
    pub(crate) role: BlockRole,
    pub(crate) elements: Vec<ElementId>,
    pub(crate) inputs: Vec<BlockInput>,
    pub(crate) outputs: Vec<BlockOutput>,
    pub(crate) partial_aggregation: bool,
}

/// What `FlowBlock::compact` removed.
#[derive(Debug, Default)]
pub(crate) struct Compaction {
    pub inputs: Vec<BlockInput>,
    pub outputs: Vec<BlockOutput>,
}

impl Compaction {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

impl FlowBlock {
    pub(crate) fn new(id: BlockId, role: BlockRole, elements: Vec<ElementId>) -> Self {
        Self {
            id,
            role,
            elements,
            inputs: Vec::new(),
            outputs: Vec::new(),
            partial_aggregation: false,
        }
    }

    /// Unites blocks of one role into a single unconnected block. Elements
    /// and ports shared by several members appear once, with their element
    /// connections combined.
    pub(crate) fn merge(id: BlockId, members: &[&FlowBlock]) -> Self {
        debug_assert!(members.windows(2).all(|w| w[0].role == w[1].role));
        let role = members.first().map_or(BlockRole::Map, |b| b.role);
        let mut merged = Self::new(id, role, Vec::new());
        for member in members {
            for element in &member.elements {
                if !merged.elements.contains(element) {
                    merged.elements.push(*element);
                }
            }
            for input in &member.inputs {
                match merged.inputs.iter_mut().find(|i| i.port == input.port) {
                    Some(existing) => union(&mut existing.upstreams, &input.upstreams),
                    None => merged.inputs.push(BlockInput::new(
                        input.port,
                        input.shuffle_key.clone(),
                        input.upstreams.clone(),
                    )),
                }
            }
            for output in &member.outputs {
                match merged.outputs.iter_mut().find(|o| o.port == output.port) {
                    Some(existing) => union(&mut existing.downstreams, &output.downstreams),
                    None => merged
                        .outputs
                        .push(BlockOutput::new(output.port, output.downstreams.clone())),
                }
            }
            merged.partial_aggregation |= member.partial_aggregation;
        }
        merged
    }

    /// Forgets every block-to-block connection.
    pub(crate) fn disconnect(&mut self) {
        self.inputs.iter_mut().for_each(|i| i.sources.clear());
        self.outputs.iter_mut().for_each(|o| o.targets.clear());
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    /// One-based sequence number used in labels.
    pub fn serial(&self) -> usize {
        self.id.index() + 1
    }

    pub fn role(&self) -> BlockRole {
        self.role
    }

    pub fn is_reduce(&self) -> bool {
        self.role == BlockRole::Reduce
    }

    pub fn is_map(&self) -> bool {
        self.role == BlockRole::Map
    }

    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }

    pub fn inputs(&self) -> &[BlockInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[BlockOutput] {
        &self.outputs
    }

    pub fn input(&self, port: PortId) -> Option<&BlockInput> {
        self.inputs.iter().find(|i| i.port == port)
    }

    pub fn output(&self, port: PortId) -> Option<&BlockOutput> {
        self.outputs.iter().find(|o| o.port == port)
    }

    pub(crate) fn input_mut(&mut self, port: PortId) -> Option<&mut BlockInput> {
        self.inputs.iter_mut().find(|i| i.port == port)
    }

    pub(crate) fn output_mut(&mut self, port: PortId) -> Option<&mut BlockOutput> {
        self.outputs.iter_mut().find(|o| o.port == port)
    }

    /// A reduce block of a fold or summarize operator that may run a combiner.
    pub fn allows_partial_aggregation(&self) -> bool {
        self.partial_aggregation
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// True if some output of this block feeds a block satisfying `is_target`.
    pub(crate) fn feeds(&self, mut is_target: impl FnMut(BlockId) -> bool) -> bool {
        self.outputs
            .iter()
            .flat_map(|o| &o.targets)
            .any(|t| is_target(t.block))
    }

    /// Blocks feeding this one, in input and connection order.
    pub fn predecessors(&self) -> Vec<BlockId> {
        let mut results = Vec::new();
        for source in self.inputs.iter().flat_map(|i| &i.sources) {
            if !results.contains(&source.block) {
                results.push(source.block);
            }
        }
        results
    }

    /// Blocks fed by this one, in output and connection order.
    pub fn successors(&self) -> Vec<BlockId> {
        let mut results = Vec::new();
        for target in self.outputs.iter().flat_map(|o| &o.targets) {
            if !results.contains(&target.block) {
                results.push(target.block);
            }
        }
        results
    }

    /// Drops outputs nobody reads, then elements whose results are never
    /// used and that have no mandatory side effect, then inputs of dropped
    /// elements. Returns the dropped boundary ports so the caller can detach
    /// them from neighbouring blocks.
    pub(crate) fn compact(&mut self, graph: &FlowGraph) -> Compaction {
        let mut removed = Compaction::default();
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.outputs)
            .into_iter()
            .partition(|o| !o.targets.is_empty());
        self.outputs = kept;
        removed.outputs.extend(dropped);

        let mut live = vec![false; self.elements.len()];
        let mut stack = Vec::new();
        for (index, id) in self.elements.iter().enumerate() {
            let element = graph.element(*id);
            let exported = element
                .outputs()
                .iter()
                .any(|p| self.outputs.iter().any(|o| o.port == *p));
            if exported || element.has_mandatory_side_effect() {
                live[index] = true;
                stack.push(*id);
            }
        }
        while let Some(id) = stack.pop() {
            for upstream in graph.predecessors(id) {
                if let Some(index) = self.elements.iter().position(|e| *e == upstream) {
                    if !live[index] {
                        live[index] = true;
                        stack.push(upstream);
                    }
                }
            }
        }

        let mut index = 0;
        self.elements.retain(|_| {
            index += 1;
            live[index - 1]
        });
        let elements = &self.elements;
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.inputs)
            .into_iter()
            .partition(|i| elements.contains(&graph.port(i.port).owner()));
        self.inputs = kept;
        removed.inputs.extend(dropped);
        let elements = &self.elements;
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.outputs)
            .into_iter()
            .partition(|o| elements.contains(&graph.port(o.port).owner()));
        self.outputs = kept;
        removed.outputs.extend(dropped);
        removed
    }
}

fn union(ports: &mut Vec<PortId>, more: &[PortId]) {
    for port in more {
        if !ports.contains(port) {
            ports.push(*port);
        }
    }
}

impl fmt::Display for FlowBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            BlockRole::Input => f.write_str("input"),
            BlockRole::Output => f.write_str("output"),
            BlockRole::Map => write!(f, "map-block-{:04}", self.serial()),
            BlockRole::Reduce => write!(f, "reduce-block-{:04}", self.serial()),
        }
    }
}
