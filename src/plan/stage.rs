use super::assembler::{connect_blocks, trim_blocks};
use super::block::{BlockId, BlockRole, FlowBlock};
use crate::compiler::CompilerOptions;
use crate::error::PlanningError;
use crate::graph::FlowGraph;
use crate::graph::digraph::Digraph;
use ahash::AHashMap;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// One MapReduce stage: map blocks, and the reduce blocks they feed if any.
#[derive(Debug, Clone, Serialize)]
pub struct StageBlock {
    number: usize,
    map_blocks: Vec<BlockId>,
    reduce_blocks: Vec<BlockId>,
}

impl StageBlock {
    /// One-based position of the stage in execution order.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn map_blocks(&self) -> &[BlockId] {
        &self.map_blocks
    }

    pub fn reduce_blocks(&self) -> &[BlockId] {
        &self.reduce_blocks
    }

    pub fn has_reduce(&self) -> bool {
        !self.reduce_blocks.is_empty()
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.map_blocks.iter().chain(&self.reduce_blocks).copied()
    }

    pub fn label(&self) -> String {
        StageNode::Stage(self.number).to_string()
    }
}

/// A vertex of the stage dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StageNode {
    Input,
    Stage(usize),
    Output,
}

impl fmt::Display for StageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageNode::Input => f.write_str("input"),
            StageNode::Stage(number) => write!(f, "stage-{number:04}"),
            StageNode::Output => f.write_str("output"),
        }
    }
}

/// The planned stages of a flow together with the normalized graph and the
/// blocks they were cut from.
#[derive(Debug, Clone)]
pub struct StageGraph {
    graph: FlowGraph,
    blocks: Vec<FlowBlock>,
    stages: Vec<StageBlock>,
    membership: Vec<StageNode>,
}

impl StageGraph {
    pub(super) fn new(graph: FlowGraph, blocks: Vec<FlowBlock>, stages: Vec<StageBlock>) -> Self {
        let mut membership = vec![StageNode::Input; blocks.len()];
        for block in &blocks {
            if block.role() == BlockRole::Output {
                membership[block.id().index()] = StageNode::Output;
            }
        }
        for stage in &stages {
            for block in stage.blocks() {
                membership[block.index()] = StageNode::Stage(stage.number);
            }
        }
        Self {
            graph,
            blocks,
            stages,
            membership,
        }
    }

    /// The normalized flow graph the blocks refer to.
    pub fn flow_graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn input(&self) -> &FlowBlock {
        &self.blocks[0]
    }

    pub fn output(&self) -> &FlowBlock {
        &self.blocks[1]
    }

    pub fn blocks(&self) -> &[FlowBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &FlowBlock {
        &self.blocks[id.index()]
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[StageBlock] {
        &self.stages
    }

    pub fn stage(&self, number: usize) -> Option<&StageBlock> {
        number.checked_sub(1).and_then(|i| self.stages.get(i))
    }

    /// The stage (or pseudo stage) a block belongs to.
    pub fn stage_of(&self, block: BlockId) -> StageNode {
        self.membership[block.index()]
    }

    /// Nodes whose outputs `node` reads, in block order.
    pub fn predecessors(&self, node: StageNode) -> Vec<StageNode> {
        self.neighbors(node, FlowBlock::predecessors)
    }

    /// Nodes that read the outputs of `node`, in block order.
    pub fn successors(&self, node: StageNode) -> Vec<StageNode> {
        self.neighbors(node, FlowBlock::successors)
    }

    fn neighbors(&self, node: StageNode, next: fn(&FlowBlock) -> Vec<BlockId>) -> Vec<StageNode> {
        self.blocks
            .iter()
            .filter(|b| self.stage_of(b.id()) == node)
            .flat_map(|b| next(b))
            .map(|b| self.stage_of(b))
            .filter(|n| *n != node)
            .unique()
            .collect()
    }

    /// Every `upstream -> downstream` dependency, input and output included.
    pub fn dependencies(&self) -> Vec<(StageNode, StageNode)> {
        let mut nodes = vec![StageNode::Input];
        nodes.extend(self.stages.iter().map(|s| StageNode::Stage(s.number)));
        nodes.push(StageNode::Output);
        nodes
            .into_iter()
            .flat_map(|node| {
                self.successors(node)
                    .into_iter()
                    .map(move |successor| (node, successor))
            })
            .collect()
    }
}

impl fmt::Display for StageGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges: Vec<String> = self
            .dependencies()
            .into_iter()
            .map(|(from, to)| format!("[{from}] -> [{to}]"))
            .collect();
        write!(f, "StageGraph({})", edges.join(", "))
    }
}

/// Groups computation blocks into stages, orders them and numbers them from 1.
/// Returns the blocks the stages refer to, which differ from `blocks` when
/// flow block groups are compressed.
pub(super) fn build_stages(
    graph: &FlowGraph,
    mut blocks: Vec<FlowBlock>,
    options: &CompilerOptions,
) -> Result<(Vec<FlowBlock>, Vec<StageBlock>), PlanningError> {
    let founders: Vec<BlockId> = blocks
        .iter()
        .filter(|b| b.is_reduce() || (b.is_map() && !b.feeds(|t| blocks[t.index()].is_reduce())))
        .map(FlowBlock::id)
        .collect();

    let mut groups: Vec<Vec<BlockId>> = founders.iter().map(|f| vec![*f]).collect();
    if options.compress_concurrent_stage {
        groups = compress_concurrent_groups(&blocks, &founders);
    }
    if options.compress_flow_block_group {
        (blocks, groups) = compress_flow_block_groups(graph, blocks, groups);
    }

    let mut stages: Vec<StageBlock> = groups
        .into_iter()
        .map(|members| {
            if blocks[members[0].index()].is_reduce() {
                StageBlock {
                    number: 0,
                    map_blocks: map_predecessors(&blocks, &members),
                    reduce_blocks: members,
                }
            } else {
                StageBlock {
                    number: 0,
                    map_blocks: members,
                    reduce_blocks: Vec::new(),
                }
            }
        })
        .collect();

    let order = sort_stages(graph, &blocks, &stages)?;
    let mut sorted = Vec::with_capacity(stages.len());
    for (position, index) in order.into_iter().enumerate() {
        let mut stage = std::mem::replace(
            &mut stages[index],
            StageBlock {
                number: 0,
                map_blocks: Vec::new(),
                reduce_blocks: Vec::new(),
            },
        );
        stage.number = position + 1;
        debug!(
            stage = %stage.label(),
            map_blocks = stage.map_blocks.len(),
            reduce_blocks = stage.reduce_blocks.len(),
            "planned stage"
        );
        sorted.push(stage);
    }
    Ok((blocks, sorted))
}

/// Map blocks feeding any of the reduce blocks in `members`.
fn map_predecessors(blocks: &[FlowBlock], members: &[BlockId]) -> Vec<BlockId> {
    members
        .iter()
        .flat_map(|m| blocks[m.index()].predecessors())
        .filter(|p| blocks[p.index()].is_map())
        .unique()
        .sorted()
        .collect()
}

/// Unites the map blocks feeding each reduce group, and the members of each
/// group with several founders, into single blocks. The merged block takes
/// the place of its first member. Blocks are then reconnected and trimmed,
/// and the groups are rewritten to the new block ids.
fn compress_flow_block_groups(
    graph: &FlowGraph,
    blocks: Vec<FlowBlock>,
    groups: Vec<Vec<BlockId>>,
) -> (Vec<FlowBlock>, Vec<Vec<BlockId>>) {
    let mut claimed = vec![false; blocks.len()];
    let mut merges: Vec<Vec<BlockId>> = Vec::new();
    let mut claim = |members: Vec<BlockId>, merges: &mut Vec<Vec<BlockId>>| {
        if members.len() < 2 || members.iter().any(|m| claimed[m.index()]) {
            return;
        }
        for member in &members {
            claimed[member.index()] = true;
        }
        merges.push(members);
    };
    for members in &groups {
        if blocks[members[0].index()].is_reduce() {
            claim(map_predecessors(&blocks, members), &mut merges);
        }
        claim(members.iter().copied().sorted().collect(), &mut merges);
    }
    if merges.is_empty() {
        return (blocks, groups);
    }

    let mut merged_into: Vec<Option<usize>> = vec![None; blocks.len()];
    for (index, members) in merges.iter().enumerate() {
        for member in members {
            merged_into[member.index()] = Some(index);
        }
    }
    let mut renumbered = vec![BlockId(0); blocks.len()];
    let mut compressed: Vec<FlowBlock> = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let id = BlockId(compressed.len() as u32);
        match merged_into[block.id.index()] {
            Some(index) if merges[index][0] == block.id => {
                let members: Vec<&FlowBlock> =
                    merges[index].iter().map(|m| &blocks[m.index()]).collect();
                debug!(blocks = ?merges[index], "compressing flow blocks");
                for member in &merges[index] {
                    renumbered[member.index()] = id;
                }
                compressed.push(FlowBlock::merge(id, &members));
            }
            Some(_) => {}
            None => {
                renumbered[block.id.index()] = id;
                let mut copy = block.clone();
                copy.id = id;
                compressed.push(copy);
            }
        }
    }

    compressed.iter_mut().for_each(FlowBlock::disconnect);
    connect_blocks(graph, &mut compressed);
    let trimmed = trim_blocks(graph, &mut compressed);
    let groups = groups
        .into_iter()
        .map(|members| {
            members
                .into_iter()
                .filter_map(|m| trimmed[renumbered[m.index()].index()])
                .unique()
                .collect::<Vec<_>>()
        })
        .filter(|members| !members.is_empty())
        .collect();
    (compressed, groups)
}

/// Founders of the stages that `block` directly depends on, looking through
/// map blocks that belong to a reducer's stage.
fn upstream_founders(blocks: &[FlowBlock], founders: &[BlockId], block: BlockId) -> Vec<BlockId> {
    let mut results = Vec::new();
    let mut visited = vec![false; blocks.len()];
    let mut stack = blocks[block.index()].predecessors();
    while let Some(current) = stack.pop() {
        if std::mem::replace(&mut visited[current.index()], true) {
            continue;
        }
        if founders.contains(&current) {
            results.push(current);
        } else if blocks[current.index()].is_map() {
            stack.extend(blocks[current.index()].predecessors());
        }
    }
    results
}

/// Merges stages of the same kind that sit at the same distance from the
/// flow inputs. Such stages never depend on each other.
fn compress_concurrent_groups(blocks: &[FlowBlock], founders: &[BlockId]) -> Vec<Vec<BlockId>> {
    let mut distances: AHashMap<BlockId, usize> = AHashMap::new();
    let mut merged: Vec<((bool, usize), Vec<BlockId>)> = Vec::new();
    for founder in founders {
        let distance = distance_of(blocks, founders, *founder, &mut distances);
        let key = (blocks[founder.index()].is_reduce(), distance);
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(*founder),
            None => merged.push((key, vec![*founder])),
        }
    }
    merged.into_iter().map(|(_, members)| members).collect()
}

fn distance_of(
    blocks: &[FlowBlock],
    founders: &[BlockId],
    founder: BlockId,
    memo: &mut AHashMap<BlockId, usize>,
) -> usize {
    if let Some(distance) = memo.get(&founder) {
        return *distance;
    }
    let distance = upstream_founders(blocks, founders, founder)
        .into_iter()
        .map(|upstream| distance_of(blocks, founders, upstream, memo))
        .max()
        .unwrap_or(0)
        + 1;
    memo.insert(founder, distance);
    distance
}

/// Returns stage indexes in execution order: every stage after the stages it
/// reads from, ties broken by the declaration order of the stage's operators.
fn sort_stages(
    graph: &FlowGraph,
    blocks: &[FlowBlock],
    stages: &[StageBlock],
) -> Result<Vec<usize>, PlanningError> {
    let mut owner = vec![None; blocks.len()];
    for (index, stage) in stages.iter().enumerate() {
        for block in stage.blocks() {
            owner[block.index()] = Some(index);
        }
    }
    let rank = |stage: &StageBlock| {
        let defining = if stage.has_reduce() {
            &stage.reduce_blocks
        } else {
            &stage.map_blocks
        };
        defining
            .iter()
            .flat_map(|b| blocks[b.index()].elements())
            .map(|e| graph.element(*e).ordinal())
            .min()
            .unwrap_or(u32::MAX)
    };

    let mut dependencies = Digraph::new();
    let by_rank = (0..stages.len()).sorted_by_key(|i| (rank(&stages[*i]), *i));
    for index in by_rank {
        dependencies.add_node(index);
    }
    for (index, stage) in stages.iter().enumerate() {
        for block in stage.blocks() {
            for upstream in blocks[block.index()].predecessors() {
                if let Some(other) = owner[upstream.index()] {
                    if other != index {
                        dependencies.add_edge(index, other);
                    }
                }
            }
        }
    }
    dependencies.sort_post_order().map_err(|cycle| {
        PlanningError::Internal(format!("stage dependencies form a cycle through {cycle:?}"))
    })
}
