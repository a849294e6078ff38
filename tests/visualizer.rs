//! Tests for graph visualization and plan listings.
mod common;
use asakusa_flow::prelude::*;
use asakusa_flow::visualizer::VisualNode;
use common::*;

fn count(nodes: &[&VisualNode], matches: impl Fn(&VisualNode) -> bool) -> usize {
    nodes.iter().filter(|n| matches(n)).count()
}

#[test]
fn test_shared_flow_part_body_is_drawn_once() {
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

    let visualization = visualize_flow_graph(&builder.build());
    let nodes = visualization.nodes();

    assert_eq!(count(&nodes, |n| matches!(n, VisualNode::FlowPart(_))), 2);
    assert_eq!(count(&nodes, |n| matches!(n, VisualNode::Element(_))), 5);
    assert_eq!(count(&nodes, |n| matches!(n, VisualNode::Label(_))), 1);
    // in -> part.in -> inner -> part.out -> call2 -> out
    assert_eq!(visualization.relations.len(), 5);

    let mut ids: Vec<_> = nodes.iter().map(|n| n.id()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), nodes.len());
}

#[test]
fn test_flow_graph_dot_output() {
    let visualization = visualize_flow_graph(&create_cogroup_flow());
    let dot = emit_dot(&visualization).expect("Failed to render");

    assert!(dot.starts_with("digraph \"cogroup\" {"));
    assert!(dot.trim_end().ends_with('}'));
    assert!(dot.contains("label=\"cogroup@CoGroup#cogroup\", shape=box"));
    assert!(dot.contains("shape=invhouse"));
    assert_eq!(dot.matches(" -> ").count(), 3);
}

#[test]
fn test_stage_graph_is_drawn_by_stage_and_block() {
    let graph = create_fold_flow(PartialAggregation::Partial);
    let jobflow = FlowCompiler::builder("batch", "flow", graph)
        .build()
        .compile()
        .expect("Failed to compile");
    let visualization = visualize_stage_graph(jobflow.stage_graph());
    let nodes = visualization.nodes();

    let stage_labels: Vec<&str> = nodes
        .iter()
        .filter_map(|n| match n {
            VisualNode::Graph(graph) => graph.label.as_deref(),
            _ => None,
        })
        .collect();
    assert_eq!(stage_labels, vec!["stage-0001"]);
    // input, output, one map and one reduce block
    assert_eq!(count(&nodes, |n| matches!(n, VisualNode::Block(_))), 4);

    let dot = emit_dot(&visualization).unwrap();
    assert!(dot.contains("label = \"stage-0001\";"));
    assert!(dot.contains("(combine)"));
    assert!(dot.contains("[label=\"shuffle\"]"));
}

#[test]
fn test_jobflow_summary_lists_stages() {
    let jobflow = FlowCompiler::builder("batch", "flow", create_two_shuffle_flow())
        .build()
        .compile()
        .expect("Failed to compile");
    let summary = format_jobflow(&jobflow);

    assert!(summary.starts_with("======== JOBFLOW batch.flow ========"));
    assert!(summary.contains("--- STAGES ---"));
    assert!(summary.contains("0002: stage0002"));
    assert!(summary.contains("after stage0001"));
    assert!(summary.contains("key first.in group=[value]"));
    assert!(!summary.contains("--- PROLOGUES ---"));
}
