use super::block::{
    BlockId, BlockInput, BlockOutput, BlockPortRef, BlockRole, Compaction, FlowBlock,
};
use crate::compiler::CompilerOptions;
use crate::error::{Diagnostic, PlanningError};
use crate::graph::{
    ElementId, FlowGraph, PartialAggregation, PortId, PseudoKind, collect_boundaries,
};
use crate::shuffle::{self, ShuffleKey};
use ahash::{AHashMap, AHashSet};
use tracing::debug;

/// An element connection, upstream output port first.
type Connection = (PortId, PortId);

/// Elements strictly between a boundary and the next boundaries in one direction.
struct BoundaryPath {
    body: Vec<ElementId>,
    arrivals: Vec<ElementId>,
}

impl BoundaryPath {
    fn forward(graph: &FlowGraph, start: ElementId) -> Self {
        Self::walk(graph, start, |graph, e| graph.successors(e))
    }

    fn backward(graph: &FlowGraph, start: ElementId) -> Self {
        Self::walk(graph, start, |graph, e| graph.predecessors(e))
    }

    fn walk(
        graph: &FlowGraph,
        start: ElementId,
        next: impl Fn(&FlowGraph, ElementId) -> Vec<ElementId>,
    ) -> Self {
        let mut visited = vec![false; graph.element_count()];
        visited[start.index()] = true;
        let mut body = Vec::new();
        let mut arrivals = Vec::new();
        let mut stack: Vec<ElementId> = next(graph, start).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            if graph.element(id).is_boundary() {
                if !arrivals.contains(&id) {
                    arrivals.push(id);
                }
                continue;
            }
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            body.push(id);
            stack.extend(next(graph, id).into_iter().rev());
        }
        Self { body, arrivals }
    }
}

/// Cuts a normalized flow graph into connected, trimmed flow blocks. The
/// input pseudo block comes first, the output pseudo block second.
pub(super) struct BlockAssembler<'a> {
    graph: &'a FlowGraph,
    options: &'a CompilerOptions,
    blocks: Vec<FlowBlock>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> BlockAssembler<'a> {
    pub(super) fn new(graph: &'a FlowGraph, options: &'a CompilerOptions) -> Self {
        Self {
            graph,
            options,
            blocks: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(super) fn assemble(mut self) -> Result<Vec<FlowBlock>, Vec<Diagnostic>> {
        let graph = self.graph;
        let root = graph.root();

        let input = self.add_block(BlockRole::Input, graph.scope(root).inputs().to_vec());
        let outputs: Vec<BlockOutput> = graph
            .scope(root)
            .inputs()
            .iter()
            .flat_map(|e| graph.element(*e).outputs())
            .map(|p| BlockOutput::new(*p, graph.port(*p).opposites().to_vec()))
            .collect();
        self.blocks[input.index()].outputs = outputs;

        let output = self.add_block(BlockRole::Output, graph.scope(root).outputs().to_vec());
        let inputs: Vec<BlockInput> = graph
            .scope(root)
            .outputs()
            .iter()
            .flat_map(|e| graph.element(*e).inputs())
            .map(|p| BlockInput::new(*p, None, graph.port(*p).opposites().to_vec()))
            .collect();
        self.blocks[output.index()].inputs = inputs;

        let boundaries = collect_boundaries(graph, root);
        let (shuffles, stages): (Vec<ElementId>, Vec<ElementId>) = boundaries
            .into_iter()
            .partition(|e| graph.element(*e).is_shuffle_boundary());

        for shuffle in &shuffles {
            self.build_reduce_block(*shuffle);
        }
        for shuffle in &shuffles {
            self.build_map_blocks_to_shuffle(*shuffle);
        }
        for stage in &stages {
            self.build_map_block_between_stages(*stage);
        }
        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }

        connect_blocks(graph, &mut self.blocks);
        trim_blocks(graph, &mut self.blocks);
        Ok(self.blocks)
    }

    fn add_block(&mut self, role: BlockRole, elements: Vec<ElementId>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(FlowBlock::new(id, role, elements));
        id
    }

    fn build_reduce_block(&mut self, shuffle: ElementId) {
        let graph = self.graph;
        let path = BoundaryPath::forward(graph, shuffle);
        debug_assert!(
            path.arrivals
                .iter()
                .all(|e| graph.element(*e).is_stage_boundary()),
            "shuffle operators must be separated by a stage boundary"
        );
        let mut elements = vec![shuffle];
        elements.extend(path.body);

        let inputs = self.resolve_shuffle_inputs(shuffle);
        let outputs = self.exported_outputs(&elements, &path.arrivals);

        let element = graph.element(shuffle);
        let declared = element
            .description()
            .operator()
            .and_then(|op| op.kind.partial_aggregation());
        let partial_aggregation = match declared {
            Some(PartialAggregation::Partial) => true,
            Some(PartialAggregation::Total) | None => false,
            Some(PartialAggregation::Default) => self.options.enable_combiner,
        };

        let id = self.add_block(BlockRole::Reduce, elements);
        let block = &mut self.blocks[id.index()];
        block.inputs = inputs;
        block.outputs = outputs;
        block.partial_aggregation = partial_aggregation;
        debug!(block = %block, operator = %element, "built reduce block");
    }

    fn resolve_shuffle_inputs(&mut self, shuffle: ElementId) -> Vec<BlockInput> {
        let graph = self.graph;
        let element = graph.element(shuffle);
        let mut results = Vec::with_capacity(element.inputs().len());
        let mut first: Option<(&str, ShuffleKey)> = None;
        for port_id in element.inputs() {
            let port = graph.port(*port_id);
            let Some(declaration) = port.key() else {
                self.report(PlanningError::MissingShuffleKey {
                    element: element.name().to_string(),
                    port: port.name().to_string(),
                });
                continue;
            };
            let key = match shuffle::resolve(declaration, port.model()) {
                Ok(key) => key,
                Err(source) => {
                    self.report(PlanningError::InvalidKey {
                        element: element.name().to_string(),
                        port: port.name().to_string(),
                        source,
                    });
                    continue;
                }
            };
            match &first {
                None => first = Some((port.name(), key.clone())),
                Some((expected, reference)) if !reference.is_compatible_with(&key) => {
                    self.report(PlanningError::IncompatibleShuffleKey {
                        element: element.name().to_string(),
                        port: port.name().to_string(),
                        expected_port: expected.to_string(),
                    });
                }
                Some(_) => {}
            }
            results.push(BlockInput::new(*port_id, Some(key), port.opposites().to_vec()));
        }
        results
    }

    fn build_map_blocks_to_shuffle(&mut self, shuffle: ElementId) {
        let graph = self.graph;
        let backward = BoundaryPath::backward(graph, shuffle);
        let reachable: AHashSet<ElementId> = backward.body.iter().copied().collect();
        for stage in &backward.arrivals {
            debug_assert!(graph.element(*stage).is_stage_boundary());
            self.build_map_block(*stage, &[shuffle], &reachable);
        }
    }

    fn build_map_block_between_stages(&mut self, stage: ElementId) {
        let graph = self.graph;
        let forward = BoundaryPath::forward(graph, stage);
        let targets: Vec<ElementId> = forward
            .arrivals
            .into_iter()
            .filter(|e| graph.element(*e).is_stage_boundary())
            .collect();
        if targets.is_empty() {
            return;
        }
        let reachable: AHashSet<ElementId> = targets
            .iter()
            .flat_map(|t| BoundaryPath::backward(graph, *t).body)
            .collect();
        self.build_map_block(stage, &targets, &reachable);
    }

    /// Builds the map block running from `start` to `targets`, restricted to
    /// elements that can reach one of the targets. The block reads only the
    /// connections leaving `start` and writes only those reaching `targets`.
    fn build_map_block(
        &mut self,
        start: ElementId,
        targets: &[ElementId],
        reachable: &AHashSet<ElementId>,
    ) {
        let graph = self.graph;
        let elements: Vec<ElementId> = BoundaryPath::forward(graph, start)
            .body
            .into_iter()
            .filter(|e| reachable.contains(e))
            .collect();
        if elements.is_empty() {
            return;
        }
        let start_outputs = graph.element(start).outputs();
        let mut inputs = Vec::new();
        for port in elements.iter().flat_map(|e| graph.element(*e).inputs()) {
            let upstreams: Vec<PortId> = graph
                .port(*port)
                .opposites()
                .iter()
                .copied()
                .filter(|o| start_outputs.contains(o))
                .collect();
            if !upstreams.is_empty() {
                inputs.push(BlockInput::new(*port, None, upstreams));
            }
        }
        let outputs = self.exported_outputs(&elements, targets);

        let id = self.add_block(BlockRole::Map, elements);
        let block = &mut self.blocks[id.index()];
        block.inputs = inputs;
        block.outputs = outputs;
        debug!(block = %block, from = %graph.element(start), "built map block");
    }

    /// Block outputs for the connections of `elements` that enter `targets`.
    fn exported_outputs(&self, elements: &[ElementId], targets: &[ElementId]) -> Vec<BlockOutput> {
        let graph = self.graph;
        let mut outputs = Vec::new();
        for port in elements.iter().flat_map(|e| graph.element(*e).outputs()) {
            let downstreams: Vec<PortId> = graph
                .port(*port)
                .opposites()
                .iter()
                .copied()
                .filter(|o| targets.contains(&graph.port(*o).owner()))
                .collect();
            if !downstreams.is_empty() {
                outputs.push(BlockOutput::new(*port, downstreams));
            }
        }
        outputs
    }

    fn report(&mut self, error: PlanningError) {
        self.diagnostics
            .push(Diagnostic::new(self.graph.name(), error));
    }
}

/// Links every block output to the block inputs reading its connections,
/// either directly or through checkpoints.
pub(super) fn connect_blocks(graph: &FlowGraph, blocks: &mut [FlowBlock]) {
    let mut consumers: AHashMap<Connection, Vec<BlockPortRef>> = AHashMap::new();
    for block in blocks.iter() {
        for input in &block.inputs {
            let this = BlockPortRef {
                block: block.id,
                port: input.port(),
            };
            for upstream in input.upstreams() {
                consumers
                    .entry((*upstream, input.port()))
                    .or_default()
                    .push(this);
            }
        }
    }

    let mut links = Vec::new();
    for block in blocks.iter() {
        for output in &block.outputs {
            let this = BlockPortRef {
                block: block.id,
                port: output.port(),
            };
            let connections = output.downstreams().iter().map(|d| (output.port(), *d));
            for connection in succeeding_connections(graph, connections, &consumers) {
                for target in &consumers[&connection] {
                    links.push((this, *target));
                }
            }
        }
    }

    for (upstream, downstream) in links {
        if let Some(output) = blocks[upstream.block.index()].output_mut(upstream.port) {
            if !output.targets.contains(&downstream) {
                output.targets.push(downstream);
            }
        }
        if let Some(input) = blocks[downstream.block.index()].input_mut(downstream.port) {
            if !input.sources.contains(&upstream) {
                input.sources.push(upstream);
            }
        }
    }
}

/// Connections read by some block input that `start` leads to, looking
/// through checkpoints that no block owns.
fn succeeding_connections(
    graph: &FlowGraph,
    start: impl DoubleEndedIterator<Item = Connection>,
    consumers: &AHashMap<Connection, Vec<BlockPortRef>>,
) -> Vec<Connection> {
    let mut results = Vec::new();
    let mut stack: Vec<Connection> = start.rev().collect();
    while let Some(connection) = stack.pop() {
        if consumers.contains_key(&connection) {
            if !results.contains(&connection) {
                results.push(connection);
            }
            continue;
        }
        let owner = graph.element(graph.port(connection.1).owner());
        if owner.description().pseudo() != Some(PseudoKind::Checkpoint) {
            continue;
        }
        for next in owner.outputs().iter().rev() {
            for opposite in graph.port(*next).opposites().iter().rev() {
                stack.push((*next, *opposite));
            }
        }
    }
    results
}

/// Removes dead operators and empty blocks until nothing changes, then
/// renumbers the surviving blocks. Returns the new id of every old block.
pub(super) fn trim_blocks(
    graph: &FlowGraph,
    blocks: &mut Vec<FlowBlock>,
) -> Vec<Option<BlockId>> {
    let mut removed = vec![false; blocks.len()];
    loop {
        let mut changed = false;
        for index in 0..blocks.len() {
            let computation = matches!(blocks[index].role, BlockRole::Map | BlockRole::Reduce);
            if removed[index] || !computation {
                continue;
            }
            let compaction = blocks[index].compact(graph);
            if !compaction.is_empty() {
                changed = true;
                let id = blocks[index].id;
                detach(blocks, id, compaction);
            }
            if blocks[index].is_empty() {
                debug!(block = %blocks[index], "removing empty block");
                removed[index] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut renumbered = vec![None; blocks.len()];
    let mut next = 0u32;
    for (index, slot) in renumbered.iter_mut().enumerate() {
        if !removed[index] {
            *slot = Some(BlockId(next));
            next += 1;
        }
    }
    let remap = |r: &mut BlockPortRef| {
        if let Some(id) = renumbered[r.block.index()] {
            r.block = id;
        }
    };
    for (index, mut block) in std::mem::take(blocks).into_iter().enumerate() {
        let Some(id) = renumbered[index] else {
            continue;
        };
        block.id = id;
        block
            .inputs
            .iter_mut()
            .flat_map(|i| i.sources.iter_mut())
            .for_each(remap);
        block
            .outputs
            .iter_mut()
            .flat_map(|o| o.targets.iter_mut())
            .for_each(remap);
        blocks.push(block);
    }
    renumbered
}

fn detach(blocks: &mut [FlowBlock], block: BlockId, compaction: Compaction) {
    for input in compaction.inputs {
        let this = BlockPortRef {
            block,
            port: input.port(),
        };
        for source in input.sources() {
            if let Some(output) = blocks[source.block.index()].output_mut(source.port) {
                output.targets.retain(|t| *t != this);
            }
        }
    }
    for output in compaction.outputs {
        let this = BlockPortRef {
            block,
            port: output.port(),
        };
        for target in output.targets() {
            if let Some(input) = blocks[target.block.index()].input_mut(target.port) {
                input.sources.retain(|s| *s != this);
            }
        }
    }
}
