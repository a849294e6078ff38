//! Common test utilities for building flow graphs.
#![allow(dead_code)]
use asakusa_flow::prelude::*;

pub const OPERATOR_CLASS: &str = "com.example.ExOperator";

/// `Ex1 { sid: Long, value: Int, string: Text }`
pub fn ex1() -> DataModel {
    DataModel::new("Ex1")
        .with_property("sid", PropertyType::Long)
        .with_property("value", PropertyType::Int)
        .with_property("string", PropertyType::Text)
}

/// `Ex2 { sid: Long, value: Int, string: Text }` under a different name.
pub fn ex2() -> DataModel {
    DataModel::new("Ex2")
        .with_property("sid", PropertyType::Long)
        .with_property("value", PropertyType::Int)
        .with_property("string", PropertyType::Text)
}

pub fn operator(kind: OperatorKind, method: &str) -> OperatorDescription {
    OperatorDescription::new(kind, OPERATOR_CLASS, method)
}

pub fn port(name: &str) -> PortSpec {
    PortSpec::new(name, ex1())
}

pub fn keyed(name: &str, group: &[&str], order: &[&str]) -> PortSpec {
    port(name).keyed(KeyDeclaration::new(
        group.iter().copied(),
        order.iter().copied(),
    ))
}

/// Defines a one-in one-out `Update` operator with ports `in` and `out`.
pub fn define_update(builder: &mut FlowGraphBuilder, name: &str) {
    builder
        .define_operator(
            name,
            operator(OperatorKind::Update, name),
            vec![port("in")],
            vec![port("out")],
        )
        .expect("Failed to define update");
}

/// Defines a `Fold` operator grouped by `value`.
pub fn define_fold(builder: &mut FlowGraphBuilder, name: &str, partial: PartialAggregation) {
    builder
        .define_operator(
            name,
            operator(OperatorKind::Fold { partial }, name),
            vec![keyed("in", &["value"], &[])],
            vec![port("out")],
        )
        .expect("Failed to define fold");
}

/// Defines a debug or info level `Logging` operator with ports `in` and `out`.
pub fn define_logging(builder: &mut FlowGraphBuilder, name: &str, level: LogLevel) {
    builder
        .define_operator(
            name,
            operator(OperatorKind::Logging { level }, name),
            vec![port("in")],
            vec![port("out")],
        )
        .expect("Failed to define logging");
}

/// `in -> fold(value) -> out`
pub fn create_fold_flow(partial: PartialAggregation) -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("fold");
    builder.define_input("in", ex1()).unwrap();
    define_fold(&mut builder, "fold", partial);
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "fold").unwrap();
    builder.connect("fold", "out").unwrap();
    builder.build()
}

/// `in -> update -> out`
pub fn create_map_only_flow() -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("map_only");
    builder.define_input("in", ex1()).unwrap();
    define_update(&mut builder, "update");
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "update").unwrap();
    builder.connect("update", "out").unwrap();
    builder.build()
}

/// Two inputs co-grouped on `value`, with different orderings, into one output.
pub fn create_cogroup_flow() -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("cogroup");
    builder.define_input("in1", ex1()).unwrap();
    builder.define_input("in2", ex1()).unwrap();
    builder
        .define_operator(
            "cogroup",
            operator(OperatorKind::CoGroup { buffer: InputBuffer::Expand }, "cogroup"),
            vec![
                keyed("a", &["value"], &["sid ASC"]),
                keyed("b", &["value"], &["string DESC"]),
            ],
            vec![port("out")],
        )
        .unwrap();
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in1", "cogroup.a").unwrap();
    builder.connect("in2", "cogroup.b").unwrap();
    builder.connect("cogroup", "out").unwrap();
    builder.build()
}

/// `in -> first(fold) -> update -> second(fold) -> out`
pub fn create_two_shuffle_flow() -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("chain");
    builder.define_input("in", ex1()).unwrap();
    define_fold(&mut builder, "first", PartialAggregation::Total);
    define_update(&mut builder, "update");
    define_fold(&mut builder, "second", PartialAggregation::Total);
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "first").unwrap();
    builder.connect("first", "update").unwrap();
    builder.connect("update", "second").unwrap();
    builder.connect("second", "out").unwrap();
    builder.build()
}

/// A flow-part body `in -> update -> out`, named `part`.
pub fn create_part_body() -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("part");
    builder.define_input("in", ex1()).unwrap();
    define_update(&mut builder, "inner");
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "inner").unwrap();
    builder.connect("inner", "out").unwrap();
    builder.build()
}

/// `in -> call(part) -> out`
pub fn create_flow_part_flow(inline: Inline) -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("caller");
    builder.define_input("in", ex1()).unwrap();
    builder
        .define_flow_part("call", &create_part_body(), inline)
        .unwrap();
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "call").unwrap();
    builder.connect("call", "out").unwrap();
    builder.build()
}

pub fn plan(graph: &FlowGraph) -> Result<StageGraph, Vec<Diagnostic>> {
    plan_with(graph, &CompilerOptions::default())
}

pub fn plan_with(
    graph: &FlowGraph,
    options: &CompilerOptions,
) -> Result<StageGraph, Vec<Diagnostic>> {
    StagePlanner::new(options).plan(graph)
}

/// Names of the operators placed in the blocks of stage `number`.
pub fn operator_names(stage_graph: &StageGraph, number: usize) -> Vec<String> {
    let graph = stage_graph.flow_graph();
    let stage = stage_graph.stage(number).expect("no such stage");
    let mut names: Vec<String> = stage
        .blocks()
        .flat_map(|b| stage_graph.block(b).elements().to_vec())
        .map(|e| graph.element(e))
        .filter(|e| e.kind() == ElementKind::Operator)
        .map(|e| e.name().to_string())
        .collect();
    names.sort();
    names
}
