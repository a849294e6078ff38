//! # asakusa-flow - Flow and Stage Planning Core
//!
//! **asakusa-flow** compiles batch data-flow graphs into ordered MapReduce
//! stages. A flow is a graph of operators connected through typed ports;
//! grouping operators need their inputs shuffled by key, and every shuffle
//! splits the work into a map side and a reduce side. The planner finds
//! those splits, packs the operators into map and reduce blocks, groups the
//! blocks into stages and orders the stages so that each one runs after the
//! stages it reads from.
//!
//! ## Core Workflow
//!
//! 1.  **Describe the flow**: build a `FlowGraph` with `FlowGraphBuilder`, or
//!     load a `JobflowDefinition` from JSON and convert it with `IntoFlowGraph`.
//! 2.  **Plan**: `StagePlanner` validates the graph, normalizes a copy of it
//!     and returns a `StageGraph`. Every problem found is reported at once as
//!     a list of `Diagnostic`s.
//! 3.  **Compile**: `FlowCompiler` runs the planner and names the classes of
//!     each stage, producing a `JobflowModel` for code generation.
//! 4.  **Inspect**: the `visualizer` module renders flow and stage graphs as
//!     Graphviz DOT or as a plain-text plan listing.
//!
//! ## Quick Start
//!
//! ```rust
//! use asakusa_flow::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = DataModel::new("Ex1")
//!         .with_property("sid", PropertyType::Long)
//!         .with_property("value", PropertyType::Int);
//!
//!     // in -> fold(value) -> out
//!     let mut builder = FlowGraphBuilder::new("summarize");
//!     builder.define_input("in", model.clone())?;
//!     builder.define_operator(
//!         "fold",
//!         OperatorDescription::new(
//!             OperatorKind::Fold { partial: PartialAggregation::Total },
//!             "com.example.ExOperator",
//!             "fold",
//!         ),
//!         vec![PortSpec::new("in", model.clone()).keyed(KeyDeclaration::group(["value"]))],
//!         vec![PortSpec::new("out", model.clone())],
//!     )?;
//!     builder.define_output("out", model)?;
//!     builder.connect("in", "fold")?.connect("fold", "out")?;
//!
//!     let jobflow = FlowCompiler::builder("batch", "flow", builder.build())
//!         .build()
//!         .compile()?;
//!     assert_eq!(jobflow.stages().len(), 1);
//!     assert_eq!(
//!         jobflow.stage_graph().to_string(),
//!         "StageGraph([input] -> [stage-0001], [stage-0001] -> [output])"
//!     );
//!     println!("{}", format_jobflow(&jobflow));
//!     Ok(())
//! }
//! ```

pub mod compiler;
pub mod definition;
pub mod error;
pub mod graph;
pub mod jobflow;
pub mod plan;
pub mod prelude;
pub mod shuffle;
pub mod visualizer;
