//! Stage planning: validates a flow graph, normalizes a copy of it, cuts the
//! copy into map and reduce blocks and orders the resulting stages.

use crate::compiler::CompilerOptions;
use crate::error::Diagnostic;
use crate::graph::FlowGraph;
use tracing::debug;

mod assembler;
mod block;
pub mod normalize;
mod stage;
mod validate;

use assembler::BlockAssembler;
pub use block::{BlockId, BlockInput, BlockOutput, BlockPortRef, BlockRole, FlowBlock};
pub use stage::{StageBlock, StageGraph, StageNode};
pub use validate::validate;

/// Plans the stages of one flow graph.
///
/// The planner never mutates the graph it is given. All diagnostics of a
/// failed run are kept and can be read back with `diagnostics()`.
pub struct StagePlanner<'a> {
    options: &'a CompilerOptions,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> StagePlanner<'a> {
    pub fn new(options: &'a CompilerOptions) -> Self {
        Self {
            options,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Builds the stage graph of `graph`, or returns every problem found.
    pub fn plan(&mut self, graph: &FlowGraph) -> Result<StageGraph, Vec<Diagnostic>> {
        debug!(flow = graph.name(), "planning stages");
        self.diagnostics.clear();
        if !validate(graph, &mut self.diagnostics) {
            return Err(self.diagnostics.clone());
        }

        let mut normalized = graph.clone();
        normalize::normalize(&mut normalized, self.options);

        let blocks = match BlockAssembler::new(&normalized, self.options).assemble() {
            Ok(blocks) => blocks,
            Err(diagnostics) => {
                self.diagnostics.extend(diagnostics);
                return Err(self.diagnostics.clone());
            }
        };
        let (blocks, stages) = match stage::build_stages(&normalized, blocks, self.options) {
            Ok(planned) => planned,
            Err(error) => {
                self.diagnostics.push(Diagnostic::new(graph.name(), error));
                return Err(self.diagnostics.clone());
            }
        };
        debug!(
            flow = graph.name(),
            stages = stages.len(),
            blocks = blocks.len(),
            "planned stage graph"
        );
        Ok(StageGraph::new(normalized, blocks, stages))
    }
}
