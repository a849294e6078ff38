//! Prelude module for convenient imports
//!
//! Re-exports the types needed to describe, plan, compile and inspect a flow.
//!
//! # Example
//!
//! ```rust,no_run
//! use asakusa_flow::prelude::*;
//!
//! # fn run_example() -> Result<(), Box<dyn std::error::Error>> {
//! let json = std::fs::read_to_string("path/to/jobflow.json")?;
//! let definition = JobflowDefinition::from_json(&json)?;
//! let options = definition.compiler_options()?;
//! let (batch_id, flow_id) = (definition.batch_id.clone(), definition.flow_id.clone());
//! let graph = definition.graph.into_flow_graph()?;
//!
//! let jobflow = FlowCompiler::builder(batch_id, flow_id, graph)
//!     .with_options(options)
//!     .build()
//!     .compile()?;
//! println!("{}", format_jobflow(&jobflow));
//! # Ok(())
//! # }
//! ```

// Compilation
pub use crate::compiler::{CompilerOptions, FlowCompiler, FlowCompilerBuilder};
pub use crate::jobflow::{
    ClassNaming, CompiledShuffle, CompiledStage, DefaultClassNaming, ExternalIoProcessor,
    IoContext, JobflowModel,
};

// Graph model
pub use crate::graph::{
    Connectivity, DataModel, ElementDescription, ElementId, ElementKind, ExternalDescription,
    FlowGraph, FlowGraphBuilder, Inline, InputBuffer, LogLevel, ObservationCount,
    OperatorDescription, OperatorKind, PartialAggregation, PortId, PortSpec, PropertyType,
    PseudoKind,
};
pub use crate::shuffle::{Direction, KeyDeclaration, Ordering, ShuffleKey};

// Planning
pub use crate::plan::{BlockRole, FlowBlock, StageBlock, StageGraph, StageNode, StagePlanner};

// Flow definitions
pub use crate::definition::{FlowDefinition, IntoFlowGraph, JobflowDefinition};

// Error types
pub use crate::error::{CompileError, DefinitionError, Diagnostic, KeyError, PlanningError};

// Visualization
pub use crate::visualizer::{emit_dot, format_jobflow, visualize_flow_graph, visualize_stage_graph};
