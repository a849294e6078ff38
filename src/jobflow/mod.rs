//! The compiled form of a jobflow handed to code generation.

use crate::plan::StageGraph;
use serde::Serialize;

mod io;
mod naming;

pub use io::{ExternalIoProcessor, IoContext};
pub use naming::{ClassNaming, DefaultClassNaming, package_segment};

/// Class names of the shuffle phase of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledShuffle {
    pub key_class: String,
    pub value_class: String,
    pub partitioner_class: String,
    pub grouping_comparator_class: String,
    pub sort_comparator_class: String,
    pub reducer_class: String,
    /// Present when some reduce block of the stage allows partial aggregation.
    pub combiner_class: Option<String>,
}

/// One unit of work of a jobflow together with the classes implementing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledStage {
    pub name: String,
    pub client_class: String,
    pub mapper_classes: Vec<String>,
    pub shuffle: Option<CompiledShuffle>,
    /// Names of the stages that must complete first.
    pub dependencies: Vec<String>,
}

impl CompiledStage {
    /// A stage without map or reduce work, such as an import prologue.
    pub fn client_only(name: impl Into<String>, client_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client_class: client_class.into(),
            mapper_classes: Vec::new(),
            shuffle: None,
            dependencies: Vec::new(),
        }
    }
}

/// Everything known about one compiled jobflow. Immutable once built.
#[derive(Debug, Clone)]
pub struct JobflowModel {
    batch_id: String,
    flow_id: String,
    stage_graph: StageGraph,
    prologues: Vec<CompiledStage>,
    stages: Vec<CompiledStage>,
    epilogues: Vec<CompiledStage>,
}

impl JobflowModel {
    pub(crate) fn new(
        batch_id: String,
        flow_id: String,
        stage_graph: StageGraph,
        prologues: Vec<CompiledStage>,
        stages: Vec<CompiledStage>,
        epilogues: Vec<CompiledStage>,
    ) -> Self {
        Self {
            batch_id,
            flow_id,
            stage_graph,
            prologues,
            stages,
            epilogues,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn stage_graph(&self) -> &StageGraph {
        &self.stage_graph
    }

    pub fn prologues(&self) -> &[CompiledStage] {
        &self.prologues
    }

    /// Planned stages in execution order.
    pub fn stages(&self) -> &[CompiledStage] {
        &self.stages
    }

    pub fn epilogues(&self) -> &[CompiledStage] {
        &self.epilogues
    }

    /// A serializable view without the stage graph.
    pub fn manifest(&self) -> JobflowManifest<'_> {
        JobflowManifest {
            batch_id: &self.batch_id,
            flow_id: &self.flow_id,
            prologues: &self.prologues,
            stages: &self.stages,
            epilogues: &self.epilogues,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobflowManifest<'a> {
    pub batch_id: &'a str,
    pub flow_id: &'a str,
    pub prologues: &'a [CompiledStage],
    pub stages: &'a [CompiledStage],
    pub epilogues: &'a [CompiledStage],
}
