//! Tests for validation, normalization and stage planning.
mod common;
use asakusa_flow::graph::collect_elements;
use asakusa_flow::prelude::*;
use common::*;

fn count_pseudo(stage_graph: &StageGraph, kind: PseudoKind) -> usize {
    let graph = stage_graph.flow_graph();
    collect_elements(graph)
        .into_iter()
        .filter(|e| graph.element(*e).description().pseudo() == Some(kind))
        .count()
}

#[test]
fn test_validate_accepts_simple_flow() {
    let graph = create_fold_flow(PartialAggregation::Total);
    let mut diagnostics = Vec::new();
    assert!(asakusa_flow::plan::validate(&graph, &mut diagnostics));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_orphaned_input_is_reported() {
    let mut builder = FlowGraphBuilder::new("orphan");
    builder.define_input("in", ex1()).unwrap();
    define_update(&mut builder, "update");
    builder.define_output("out", ex1()).unwrap();
    builder.connect("update", "out").unwrap();
    // `in` is left dangling too
    let diagnostics = plan(&builder.build()).unwrap_err();

    assert!(diagnostics.iter().any(|d| matches!(
        &d.error,
        PlanningError::OrphanedInput { element, port } if element == "update" && port == "in"
    )));
    assert!(diagnostics.iter().any(|d| matches!(
        &d.error,
        PlanningError::OrphanedOutput { element, port } if element == "in" && port == "out"
    )));
    assert!(diagnostics.iter().all(|d| d.flow == "orphan"));
    assert!(
        diagnostics
            .iter()
            .any(|d| d.elements == vec!["update".to_string()])
    );
}

#[test]
fn test_orphaned_mandatory_output_is_reported() {
    let mut builder = FlowGraphBuilder::new("orphan");
    builder.define_input("in", ex1()).unwrap();
    builder
        .define_operator(
            "branch",
            operator(OperatorKind::Branch, "branch"),
            vec![port("in")],
            vec![port("yes"), port("no")],
        )
        .unwrap();
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "branch").unwrap();
    builder.connect("branch.yes", "out").unwrap();

    let diagnostics = plan(&builder.build()).unwrap_err();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].error,
        PlanningError::OrphanedOutput {
            element: "branch".to_string(),
            port: "no".to_string(),
        }
    );
    assert_eq!(
        diagnostics[0].to_string(),
        "output port 'branch.no' is not connected (at orphan)"
    );
}

#[test]
fn test_optional_logging_output_may_be_left_open() {
    let mut builder = FlowGraphBuilder::new("logging");
    builder.define_input("in", ex1()).unwrap();
    define_update(&mut builder, "update");
    define_logging(&mut builder, "logging", LogLevel::Info);
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "update").unwrap();
    builder.connect("in", "logging").unwrap();
    builder.connect("update", "out").unwrap();

    let stage_graph = plan(&builder.build()).expect("Failed to plan");
    assert_eq!(stage_graph.stages().len(), 1);
    // logging must run even though nothing reads it
    assert_eq!(operator_names(&stage_graph, 1), vec!["logging", "update"]);
    assert_eq!(count_pseudo(&stage_graph, PseudoKind::Stop), 1);
}

#[test]
fn test_debug_logging_is_removed_unless_enabled() {
    let create = || {
        let mut builder = FlowGraphBuilder::new("logging");
        builder.define_input("in", ex1()).unwrap();
        define_logging(&mut builder, "logging", LogLevel::Debug);
        define_update(&mut builder, "update");
        builder.define_output("out", ex1()).unwrap();
        builder.connect("in", "logging").unwrap();
        builder.connect("logging", "update").unwrap();
        builder.connect("update", "out").unwrap();
        builder.build()
    };

    let stage_graph = plan(&create()).expect("Failed to plan");
    assert_eq!(operator_names(&stage_graph, 1), vec!["update"]);

    let options = CompilerOptions {
        enable_debug_logging: true,
        ..CompilerOptions::default()
    };
    let stage_graph = plan_with(&create(), &options).expect("Failed to plan");
    assert_eq!(operator_names(&stage_graph, 1), vec!["logging", "update"]);
}

#[test]
fn test_cycle_is_rejected() {
    let mut builder = FlowGraphBuilder::new("loop");
    builder.define_input("in", ex1()).unwrap();
    builder
        .define_operator(
            "a",
            operator(OperatorKind::Update, "a"),
            vec![port("in"), port("back")],
            vec![port("out")],
        )
        .unwrap();
    define_update(&mut builder, "b");
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "a.in").unwrap();
    builder.connect("a", "b").unwrap();
    builder.connect("b", "a.back").unwrap();
    builder.connect("b", "out").unwrap();

    let diagnostics = plan(&builder.build()).unwrap_err();
    assert_eq!(diagnostics.len(), 1);
    match &diagnostics[0].error {
        PlanningError::CyclicFlow { elements } => {
            let mut elements = elements.clone();
            elements.sort();
            assert_eq!(elements, vec!["a", "b"]);
        }
        other => panic!("Expected CyclicFlow error, got {:?}", other),
    }
    let mut context = diagnostics[0].elements.clone();
    context.sort();
    assert_eq!(context, vec!["a", "b"]);
}

#[test]
fn test_errors_in_flow_part_body_name_the_part() {
    let mut part = FlowGraphBuilder::new("broken_part");
    part.define_input("in", ex1()).unwrap();
    define_update(&mut part, "inner");
    part.define_output("out", ex1()).unwrap();
    part.connect("in", "inner").unwrap();
    let part = part.build();

    let mut builder = FlowGraphBuilder::new("caller");
    builder.define_input("in", ex1()).unwrap();
    builder.define_flow_part("call", &part, Inline::Default).unwrap();
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "call").unwrap();
    builder.connect("call", "out").unwrap();

    let diagnostics = plan(&builder.build()).unwrap_err();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| d.flow == "broken_part"));
    assert!(diagnostics.iter().any(|d| matches!(
        &d.error,
        PlanningError::OrphanedOutput { element, .. } if element == "inner"
    )));
    assert!(diagnostics.iter().any(|d| matches!(
        &d.error,
        PlanningError::OrphanedInput { element, .. } if element == "out"
    )));
}

#[test]
fn test_shuffle_key_problems_are_batched() {
    let mut builder = FlowGraphBuilder::new("keys");
    builder.define_input("in1", ex1()).unwrap();
    builder.define_input("in2", ex1()).unwrap();
    builder.define_input("in3", ex1()).unwrap();
    builder
        .define_operator(
            "cogroup",
            operator(OperatorKind::CoGroup { buffer: InputBuffer::Expand }, "cogroup"),
            vec![keyed("a", &["value"], &[]), keyed("b", &["sid"], &[])],
            vec![port("out")],
        )
        .unwrap();
    builder
        .define_operator(
            "fold",
            operator(OperatorKind::Fold { partial: PartialAggregation::Default }, "fold"),
            vec![port("in")],
            vec![port("out")],
        )
        .unwrap();
    builder
        .define_operator(
            "sort",
            operator(OperatorKind::GroupSort { buffer: InputBuffer::Escape }, "sort"),
            vec![keyed("in", &["missing"], &[])],
            vec![port("out")],
        )
        .unwrap();
    builder.define_output("out1", ex1()).unwrap();
    builder.define_output("out2", ex1()).unwrap();
    builder.define_output("out3", ex1()).unwrap();
    builder.connect("in1", "cogroup.a").unwrap();
    builder.connect("in2", "cogroup.b").unwrap();
    builder.connect("cogroup", "out1").unwrap();
    builder.connect("in3", "fold").unwrap();
    builder.connect("fold", "out2").unwrap();
    builder.connect("in3", "sort").unwrap();
    builder.connect("sort", "out3").unwrap();

    let diagnostics = plan(&builder.build()).unwrap_err();
    assert_eq!(diagnostics.len(), 3);
    assert!(diagnostics.iter().any(|d| d.error
        == PlanningError::IncompatibleShuffleKey {
            element: "cogroup".to_string(),
            port: "b".to_string(),
            expected_port: "a".to_string(),
        }));
    assert!(diagnostics.iter().any(|d| d.error
        == PlanningError::MissingShuffleKey {
            element: "fold".to_string(),
            port: "in".to_string(),
        }));
    assert!(diagnostics.iter().any(|d| matches!(
        &d.error,
        PlanningError::InvalidKey {
            element,
            source: KeyError::PropertyNotFound { property, .. },
            ..
        } if element == "sort" && property == "missing"
    )));
}

#[test]
fn test_fold_is_planned_as_single_stage() {
    let stage_graph = plan(&create_fold_flow(PartialAggregation::Total)).expect("Failed to plan");

    assert_eq!(stage_graph.stages().len(), 1);
    assert_eq!(
        stage_graph.dependencies(),
        vec![
            (StageNode::Input, StageNode::Stage(1)),
            (StageNode::Stage(1), StageNode::Output),
        ]
    );
    assert_eq!(
        stage_graph.to_string(),
        "StageGraph([input] -> [stage-0001], [stage-0001] -> [output])"
    );

    let stage = stage_graph.stage(1).unwrap();
    assert_eq!(stage.map_blocks().len(), 1);
    assert_eq!(stage.reduce_blocks().len(), 1);
    let reduce = stage_graph.block(stage.reduce_blocks()[0]);
    assert!(reduce.is_reduce());
    assert!(!reduce.allows_partial_aggregation());
    let key = reduce.inputs()[0].shuffle_key().expect("reduce inputs carry keys");
    assert_eq!(key.group(), ["value"]);
    assert_eq!(operator_names(&stage_graph, 1), vec!["fold"]);
}

#[test]
fn test_cogroup_keeps_per_input_orderings() {
    let stage_graph = plan(&create_cogroup_flow()).expect("Failed to plan");

    assert_eq!(stage_graph.stages().len(), 1);
    let stage = stage_graph.stage(1).unwrap();
    // both inputs are read by one merged map block
    assert_eq!(stage.map_blocks().len(), 1);
    assert_eq!(stage.reduce_blocks().len(), 1);

    let reduce = stage_graph.block(stage.reduce_blocks()[0]);
    let keys: Vec<String> = reduce
        .inputs()
        .iter()
        .map(|i| i.shuffle_key().unwrap().to_string())
        .collect();
    assert_eq!(
        keys,
        vec![
            "group=[value] order=[sid ASC]",
            "group=[value] order=[string DESC]",
        ]
    );
    for input in reduce.inputs() {
        assert_eq!(input.sources().len(), 1);
    }

    let options = CompilerOptions {
        compress_flow_block_group: false,
        ..CompilerOptions::default()
    };
    let stage_graph = plan_with(&create_cogroup_flow(), &options).expect("Failed to plan");
    assert_eq!(stage_graph.stage(1).unwrap().map_blocks().len(), 2);
}

/// Asserts every computation block belongs to exactly one stage.
fn assert_blocks_in_one_stage(stage_graph: &StageGraph) {
    let pseudo = [stage_graph.input().id(), stage_graph.output().id()];
    for block in stage_graph.blocks() {
        let owners = stage_graph
            .stages()
            .iter()
            .filter(|s| s.blocks().any(|b| b == block.id()))
            .count();
        let expected = if pseudo.contains(&block.id()) { 0 } else { 1 };
        assert_eq!(owners, expected, "block {} is in {owners} stages", block.serial());
    }
}

/// Number of block connections leaving each flow input, by input name.
fn input_connections(stage_graph: &StageGraph) -> Vec<(String, usize)> {
    let graph = stage_graph.flow_graph();
    let mut counts: Vec<(String, usize)> = stage_graph
        .input()
        .outputs()
        .iter()
        .map(|o| {
            let owner = graph.port(o.port()).owner();
            (graph.element(owner).name().to_string(), o.targets().len())
        })
        .collect();
    counts.sort();
    counts
}

/// `in -> u`, then `u` feeds both `f1` and `cg.a` while `f1` feeds `cg.b`.
fn create_diamond_flow() -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("diamond");
    builder.define_input("in", ex1()).unwrap();
    define_update(&mut builder, "u");
    define_fold(&mut builder, "f1", PartialAggregation::Total);
    builder
        .define_operator(
            "cg",
            operator(OperatorKind::CoGroup { buffer: InputBuffer::Expand }, "cg"),
            vec![keyed("a", &["value"], &[]), keyed("b", &["value"], &[])],
            vec![port("out")],
        )
        .unwrap();
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "u").unwrap();
    builder.connect("u", "f1").unwrap();
    builder.connect("u", "cg.a").unwrap();
    builder.connect("f1", "cg.b").unwrap();
    builder.connect("cg", "out").unwrap();
    builder.build()
}

#[test]
fn test_map_operator_feeding_two_shuffles_is_copied_per_stage() {
    let no_concurrent = CompilerOptions {
        compress_concurrent_stage: false,
        ..CompilerOptions::default()
    };
    let no_group = CompilerOptions {
        compress_flow_block_group: false,
        ..CompilerOptions::default()
    };
    for (options, second_map_blocks) in [
        (CompilerOptions::default(), 1),
        (no_concurrent, 1),
        (no_group, 2),
    ] {
        let stage_graph = plan_with(&create_diamond_flow(), &options).expect("Failed to plan");

        assert_eq!(stage_graph.stages().len(), 2);
        assert_eq!(operator_names(&stage_graph, 1), vec!["f1", "u"]);
        assert_eq!(operator_names(&stage_graph, 2), vec!["cg", "u"]);
        assert_eq!(
            stage_graph.dependencies(),
            vec![
                (StageNode::Input, StageNode::Stage(1)),
                (StageNode::Input, StageNode::Stage(2)),
                (StageNode::Stage(1), StageNode::Stage(2)),
                (StageNode::Stage(2), StageNode::Output),
            ]
        );
        assert_eq!(stage_graph.stage(1).unwrap().map_blocks().len(), 1);
        assert_eq!(stage_graph.stage(2).unwrap().map_blocks().len(), second_map_blocks);
        assert_blocks_in_one_stage(&stage_graph);
        // one copy of `u` per stage
        assert_eq!(input_connections(&stage_graph), vec![("in".to_string(), 2)]);
    }
}

/// `in1, in2 -> u -> fold -> out`
fn create_fan_in_flow() -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("fan_in");
    builder.define_input("in1", ex1()).unwrap();
    builder.define_input("in2", ex1()).unwrap();
    define_update(&mut builder, "u");
    define_fold(&mut builder, "fold", PartialAggregation::Total);
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in1", "u").unwrap();
    builder.connect("in2", "u").unwrap();
    builder.connect("u", "fold").unwrap();
    builder.connect("fold", "out").unwrap();
    builder.build()
}

#[test]
fn test_fan_in_reads_each_input_once() {
    let stage_graph = plan(&create_fan_in_flow()).expect("Failed to plan");

    assert_eq!(stage_graph.stages().len(), 1);
    assert_eq!(operator_names(&stage_graph, 1), vec!["fold", "u"]);
    let stage = stage_graph.stage(1).unwrap();
    assert_eq!(stage.map_blocks().len(), 1);
    let map = stage_graph.block(stage.map_blocks()[0]);
    assert_eq!(map.inputs().len(), 1);
    assert_eq!(map.inputs()[0].sources().len(), 2);
    assert_blocks_in_one_stage(&stage_graph);
    assert_eq!(
        input_connections(&stage_graph),
        vec![("in1".to_string(), 1), ("in2".to_string(), 1)]
    );

    let options = CompilerOptions {
        compress_flow_block_group: false,
        ..CompilerOptions::default()
    };
    let stage_graph = plan_with(&create_fan_in_flow(), &options).expect("Failed to plan");
    assert_eq!(stage_graph.stages().len(), 1);
    let stage = stage_graph.stage(1).unwrap();
    assert_eq!(stage.map_blocks().len(), 2);
    for block in stage.map_blocks() {
        let inputs = stage_graph.block(*block).inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].sources().len(), 1);
    }
    assert_blocks_in_one_stage(&stage_graph);
    assert_eq!(
        input_connections(&stage_graph),
        vec![("in1".to_string(), 1), ("in2".to_string(), 1)]
    );
}

#[test]
fn test_consecutive_shuffles_are_split_by_checkpoint() {
    let stage_graph = plan(&create_two_shuffle_flow()).expect("Failed to plan");

    assert_eq!(stage_graph.stages().len(), 2);
    assert_eq!(count_pseudo(&stage_graph, PseudoKind::Checkpoint), 1);
    assert_eq!(operator_names(&stage_graph, 1), vec!["first"]);
    assert_eq!(operator_names(&stage_graph, 2), vec!["second", "update"]);
    assert_eq!(
        stage_graph.dependencies(),
        vec![
            (StageNode::Input, StageNode::Stage(1)),
            (StageNode::Stage(1), StageNode::Stage(2)),
            (StageNode::Stage(2), StageNode::Output),
        ]
    );
}

#[test]
fn test_checkpoint_is_pushed_below_projection() {
    let mut builder = FlowGraphBuilder::new("push_down");
    builder.define_input("in", ex1()).unwrap();
    define_fold(&mut builder, "first", PartialAggregation::Total);
    builder
        .define_operator(
            "project",
            operator(OperatorKind::Project, "project"),
            vec![port("in")],
            vec![port("out")],
        )
        .unwrap();
    define_fold(&mut builder, "second", PartialAggregation::Total);
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "first").unwrap();
    builder.connect("first", "project").unwrap();
    builder.connect("project", "second").unwrap();
    builder.connect("second", "out").unwrap();

    let stage_graph = plan(&builder.build()).expect("Failed to plan");
    assert_eq!(stage_graph.stages().len(), 2);
    // the projection runs on the reduce side of the first stage
    assert_eq!(operator_names(&stage_graph, 1), vec!["first", "project"]);
    assert_eq!(operator_names(&stage_graph, 2), vec!["second"]);
}

#[test]
fn test_map_only_flow() {
    let stage_graph = plan(&create_map_only_flow()).expect("Failed to plan");

    assert_eq!(stage_graph.stages().len(), 1);
    let stage = stage_graph.stage(1).unwrap();
    assert!(!stage.has_reduce());
    assert_eq!(stage.map_blocks().len(), 1);
    assert_eq!(operator_names(&stage_graph, 1), vec!["update"]);
    assert_eq!(stage_graph.input().role(), BlockRole::Input);
    assert_eq!(stage_graph.output().role(), BlockRole::Output);
}

#[test]
fn test_flow_part_is_inlined_into_caller() {
    let stage_graph = plan(&create_flow_part_flow(Inline::Default)).expect("Failed to plan");

    assert_eq!(stage_graph.stages().len(), 1);
    assert_eq!(operator_names(&stage_graph, 1), vec!["inner"]);
    assert_eq!(count_pseudo(&stage_graph, PseudoKind::Checkpoint), 0);
    let graph = stage_graph.flow_graph();
    assert!(
        collect_elements(graph)
            .iter()
            .all(|e| graph.element(*e).kind() != ElementKind::FlowPart)
    );
}

#[test]
fn test_segregated_flow_part_gets_its_own_stage() {
    let stage_graph =
        plan(&create_flow_part_flow(Inline::KeepSegregated)).expect("Failed to plan");

    assert_eq!(count_pseudo(&stage_graph, PseudoKind::Checkpoint), 2);
    assert_eq!(stage_graph.stages().len(), 3);
    assert!(operator_names(&stage_graph, 1).is_empty());
    assert_eq!(operator_names(&stage_graph, 2), vec!["inner"]);
    assert!(operator_names(&stage_graph, 3).is_empty());

    // the option only affects flow-parts left at their default
    let options = CompilerOptions {
        compress_flow_part: false,
        ..CompilerOptions::default()
    };
    let stage_graph = plan_with(&create_flow_part_flow(Inline::Default), &options).unwrap();
    assert_eq!(stage_graph.stages().len(), 3);
    let stage_graph =
        plan_with(&create_flow_part_flow(Inline::ForceAggregate), &options).unwrap();
    assert_eq!(stage_graph.stages().len(), 1);
}

#[test]
fn test_shared_flow_part_body_is_inlined_per_call() {
    let mut builder = FlowGraphBuilder::new("caller");
    builder.define_input("in", ex1()).unwrap();
    builder
        .define_flow_part("call1", &create_part_body(), Inline::Default)
        .unwrap();
    builder.reuse_flow_part("call2", "call1").unwrap();
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "call1").unwrap();
    builder.connect("call1", "call2").unwrap();
    builder.connect("call2", "out").unwrap();

    let stage_graph = plan(&builder.build()).expect("Failed to plan");
    assert_eq!(stage_graph.stages().len(), 1);
    assert_eq!(operator_names(&stage_graph, 1), vec!["inner", "inner"]);
}

#[test]
fn test_partial_aggregation_follows_declaration_and_option() {
    let allows = |partial, enable_combiner| {
        let options = CompilerOptions {
            enable_combiner,
            ..CompilerOptions::default()
        };
        let stage_graph = plan_with(&create_fold_flow(partial), &options).unwrap();
        let stage = stage_graph.stage(1).unwrap();
        stage_graph
            .block(stage.reduce_blocks()[0])
            .allows_partial_aggregation()
    };

    assert!(allows(PartialAggregation::Partial, false));
    assert!(!allows(PartialAggregation::Total, true));
    assert!(!allows(PartialAggregation::Default, false));
    assert!(allows(PartialAggregation::Default, true));
}

#[test]
fn test_unused_operators_are_trimmed() {
    let mut builder = FlowGraphBuilder::new("trim");
    builder.define_input("in", ex1()).unwrap();
    define_update(&mut builder, "used");
    builder
        .define_operator(
            "unused",
            operator(OperatorKind::Update, "unused").with_connectivity(Connectivity::Optional),
            vec![port("in")],
            vec![port("out")],
        )
        .unwrap();
    builder
        .define_operator(
            "unused_fold",
            operator(OperatorKind::Fold { partial: PartialAggregation::Total }, "unused_fold")
                .with_connectivity(Connectivity::Optional),
            vec![keyed("in", &["value"], &[])],
            vec![port("out")],
        )
        .unwrap();
    builder.define_output("out", ex1()).unwrap();
    builder.connect("in", "used").unwrap();
    builder.connect("in", "unused").unwrap();
    builder.connect("in", "unused_fold").unwrap();
    builder.connect("used", "out").unwrap();

    let stage_graph = plan(&builder.build()).expect("Failed to plan");
    assert_eq!(stage_graph.stages().len(), 1);
    assert_eq!(operator_names(&stage_graph, 1), vec!["used"]);
    assert!(stage_graph.blocks().iter().all(|b| !b.is_reduce()));
    assert_eq!(stage_graph.blocks().len(), 3);
}

fn create_parallel_flow() -> FlowGraph {
    let mut builder = FlowGraphBuilder::new("parallel");
    builder.define_input("in1", ex1()).unwrap();
    builder.define_input("in2", ex1()).unwrap();
    define_update(&mut builder, "a");
    define_update(&mut builder, "b");
    builder.define_output("out1", ex1()).unwrap();
    builder.define_output("out2", ex1()).unwrap();
    builder.connect("in1", "a").unwrap();
    builder.connect("in2", "b").unwrap();
    builder.connect("a", "out1").unwrap();
    builder.connect("b", "out2").unwrap();
    builder.build()
}

#[test]
fn test_concurrent_stages_are_compressed() {
    let stage_graph = plan(&create_parallel_flow()).expect("Failed to plan");
    assert_eq!(stage_graph.stages().len(), 1);
    assert_eq!(operator_names(&stage_graph, 1), vec!["a", "b"]);

    let options = CompilerOptions {
        compress_concurrent_stage: false,
        ..CompilerOptions::default()
    };
    let stage_graph = plan_with(&create_parallel_flow(), &options).expect("Failed to plan");
    assert_eq!(stage_graph.stages().len(), 2);
    // independent stages keep declaration order
    assert_eq!(operator_names(&stage_graph, 1), vec!["a"]);
    assert_eq!(operator_names(&stage_graph, 2), vec!["b"]);
}

#[test]
fn test_planning_is_deterministic() {
    let graph = create_two_shuffle_flow();
    let first = plan(&graph).expect("Failed to plan");
    let second = plan(&graph).expect("Failed to plan");

    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.blocks().len(), second.blocks().len());
    for number in 1..=first.stages().len() {
        assert_eq!(
            operator_names(&first, number),
            operator_names(&second, number)
        );
    }
}

#[test]
fn test_planner_does_not_modify_input_graph() {
    let graph = create_two_shuffle_flow();
    let before = collect_elements(&graph).len();
    let stage_graph = plan(&graph).expect("Failed to plan");

    assert_eq!(collect_elements(&graph).len(), before);
    assert!(collect_elements(stage_graph.flow_graph()).len() > before);
}
