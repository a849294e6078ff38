//! Compiles a flow graph into a `JobflowModel`.

use crate::error::{CompileError, Diagnostic, PlanningError};
use crate::graph::{ElementDescription, ExternalDescription, FlowGraph};
use crate::jobflow::{
    ClassNaming, CompiledShuffle, CompiledStage, DefaultClassNaming, ExternalIoProcessor,
    IoContext, JobflowModel,
};
use crate::plan::{StageGraph, StageNode, StagePlanner};
use ahash::AHashMap;
use itertools::Itertools;
use tracing::{debug, warn};

mod options;

pub use options::{CompilerOptions, GenericOptionValue};

pub struct FlowCompiler {
    batch_id: String,
    flow_id: String,
    graph: FlowGraph,
    options: CompilerOptions,
    naming: Box<dyn ClassNaming>,
    processors: AHashMap<String, Box<dyn ExternalIoProcessor>>,
}

pub struct FlowCompilerBuilder {
    batch_id: String,
    flow_id: String,
    graph: FlowGraph,
    options: CompilerOptions,
    naming: Box<dyn ClassNaming>,
    processors: AHashMap<String, Box<dyn ExternalIoProcessor>>,
}

impl FlowCompilerBuilder {
    pub fn new(batch_id: impl Into<String>, flow_id: impl Into<String>, graph: FlowGraph) -> Self {
        Self {
            batch_id: batch_id.into(),
            flow_id: flow_id.into(),
            graph,
            options: CompilerOptions::default(),
            naming: Box::new(DefaultClassNaming::default()),
            processors: AHashMap::new(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_naming(mut self, naming: Box<dyn ClassNaming>) -> Self {
        self.naming = naming;
        self
    }

    /// Registers the processor for one exchange kind, replacing any earlier one.
    pub fn with_io_processor(mut self, processor: Box<dyn ExternalIoProcessor>) -> Self {
        self.processors
            .insert(processor.kind().to_string(), processor);
        self
    }

    pub fn build(self) -> FlowCompiler {
        FlowCompiler {
            batch_id: self.batch_id,
            flow_id: self.flow_id,
            graph: self.graph,
            options: self.options,
            naming: self.naming,
            processors: self.processors,
        }
    }
}

impl FlowCompiler {
    pub fn builder(
        batch_id: impl Into<String>,
        flow_id: impl Into<String>,
        graph: FlowGraph,
    ) -> FlowCompilerBuilder {
        FlowCompilerBuilder::new(batch_id, flow_id, graph)
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Plans the flow and names every generated class. Nothing is produced
    /// if any diagnostic is raised.
    pub fn compile(self) -> Result<JobflowModel, CompileError> {
        debug!(
            batch_id = self.batch_id.as_str(),
            flow_id = self.flow_id.as_str(),
            options = %self.options,
            "compiling jobflow"
        );
        let mut diagnostics = self.check_exchanges();
        let mut planner = StagePlanner::new(&self.options);
        let planned = planner.plan(&self.graph);
        let stage_graph = match planned {
            Ok(stage_graph) if diagnostics.is_empty() => stage_graph,
            Ok(_) => return Err(self.planning_error(diagnostics)),
            Err(errors) => {
                diagnostics.extend(errors);
                return Err(self.planning_error(diagnostics));
            }
        };

        let stages = stage_graph
            .stages()
            .iter()
            .map(|stage| self.compile_stage(&stage_graph, stage.number()))
            .collect();
        let (prologues, epilogues) = self.compile_external_stages();
        Ok(JobflowModel::new(
            self.batch_id,
            self.flow_id,
            stage_graph,
            prologues,
            stages,
            epilogues,
        ))
    }

    fn planning_error(&self, diagnostics: Vec<Diagnostic>) -> CompileError {
        CompileError::Planning {
            flow_id: self.flow_id.clone(),
            diagnostics,
        }
    }

    fn externals(&self) -> impl Iterator<Item = (bool, &ExternalDescription)> {
        let scope = self.graph.scope(self.graph.root());
        scope
            .inputs()
            .iter()
            .chain(scope.outputs())
            .filter_map(|e| match self.graph.element(*e).description() {
                ElementDescription::Input(external) => Some((true, external)),
                ElementDescription::Output(external) => Some((false, external)),
                _ => None,
            })
    }

    fn check_exchanges(&self) -> Vec<Diagnostic> {
        self.externals()
            .filter_map(|(_, external)| {
                let kind = external.exchange.as_ref()?;
                if self.processors.contains_key(kind) {
                    return None;
                }
                Some(Diagnostic::new(
                    self.graph.name(),
                    PlanningError::UnknownExchange {
                        element: external.name.clone(),
                        kind: kind.clone(),
                    },
                ))
            })
            .collect()
    }

    fn compile_stage(&self, stage_graph: &StageGraph, number: usize) -> CompiledStage {
        let package = self
            .naming
            .stage_package(&self.batch_id, &self.flow_id, number);
        let class = |simple: &str| self.naming.class_name(&package, simple);
        let Some(stage) = stage_graph.stage(number) else {
            return CompiledStage::client_only(stage_name(number), class("StageClient"));
        };
        // one mapper per distinct set of upstream sources
        let map_units = stage
            .map_blocks()
            .iter()
            .flat_map(|b| stage_graph.block(*b).inputs())
            .map(|input| input.sources().iter().copied().sorted().collect::<Vec<_>>())
            .unique()
            .count();
        let mapper_classes = (1..=map_units)
            .map(|i| class(&format!("StageMapper{i}")))
            .collect();
        let shuffle = stage.has_reduce().then(|| {
            let combine = stage
                .reduce_blocks()
                .iter()
                .any(|b| stage_graph.block(*b).allows_partial_aggregation());
            CompiledShuffle {
                key_class: class("ShuffleKey"),
                value_class: class("ShuffleValue"),
                partitioner_class: class("ShufflePartitioner"),
                grouping_comparator_class: class("ShuffleGroupingComparator"),
                sort_comparator_class: class("ShuffleSortComparator"),
                reducer_class: class("StageReducer"),
                combiner_class: combine.then(|| class("StageCombiner")),
            }
        });
        let dependencies = stage_graph
            .predecessors(StageNode::Stage(number))
            .into_iter()
            .filter_map(|node| match node {
                StageNode::Stage(upstream) => Some(stage_name(upstream)),
                _ => None,
            })
            .collect();
        CompiledStage {
            name: stage_name(number),
            client_class: class("StageClient"),
            mapper_classes,
            shuffle,
            dependencies,
        }
    }

    fn compile_external_stages(&self) -> (Vec<CompiledStage>, Vec<CompiledStage>) {
        let context = IoContext {
            batch_id: &self.batch_id,
            flow_id: &self.flow_id,
            naming: self.naming.as_ref(),
        };
        let mut prologues = Vec::new();
        let mut epilogues = Vec::new();
        for kind in self.processors.keys().sorted() {
            let processor = &self.processors[kind];
            let (inputs, outputs): (Vec<_>, Vec<_>) = self
                .externals()
                .filter(|(_, external)| external.exchange.as_deref() == Some(kind.as_str()))
                .partition(|(input, _)| *input);
            let inputs: Vec<&ExternalDescription> = inputs.into_iter().map(|(_, e)| e).collect();
            let outputs: Vec<&ExternalDescription> = outputs.into_iter().map(|(_, e)| e).collect();
            if inputs.is_empty() && outputs.is_empty() {
                warn!(kind = kind.as_str(), "io processor is registered but no flow port uses it");
                continue;
            }
            if !inputs.is_empty() {
                prologues.extend(processor.prologues(&context, &inputs));
            }
            if !outputs.is_empty() {
                epilogues.extend(processor.epilogues(&context, &outputs));
            }
        }
        (prologues, epilogues)
    }
}

fn stage_name(number: usize) -> String {
    format!("stage{number:04}")
}
