use super::{VisualNode, Visualization};
use crate::graph::ElementKind;
use std::fmt::{self, Write};

const DEFAULT_FONT: &str = "Courier";

/// Renders a visualization in Graphviz DOT syntax.
pub fn emit_dot(visualization: &Visualization) -> Result<String, fmt::Error> {
    let mut dot = String::new();
    write_dot(&mut dot, visualization)?;
    Ok(dot)
}

pub fn write_dot(out: &mut impl Write, visualization: &Visualization) -> fmt::Result {
    let name = visualization.root.label.as_deref().unwrap_or("flow");
    writeln!(out, "digraph \"{}\" {{", escape(name))?;
    writeln!(out, "\tgraph [fontname=\"{DEFAULT_FONT}\"];")?;
    writeln!(out, "\tnode [fontname=\"{DEFAULT_FONT}\", shape=box];")?;
    writeln!(out, "\tedge [fontname=\"{DEFAULT_FONT}\"];")?;
    for node in &visualization.root.nodes {
        write_node(out, node, 1)?;
    }
    for relation in &visualization.relations {
        match &relation.label {
            Some(label) => writeln!(
                out,
                "\t{} -> {} [label=\"{}\"];",
                relation.source,
                relation.sink,
                escape(label)
            )?,
            None => writeln!(out, "\t{} -> {};", relation.source, relation.sink)?,
        }
    }
    writeln!(out, "}}")
}

fn write_node(out: &mut impl Write, node: &VisualNode, depth: usize) -> fmt::Result {
    let indent = "\t".repeat(depth);
    match node {
        VisualNode::Graph(graph) => {
            let label = graph.label.as_deref().unwrap_or_default();
            write_cluster(out, &indent, node, label, depth)
        }
        VisualNode::Block(block) => write_cluster(out, &indent, node, &block.label, depth),
        VisualNode::FlowPart(part) => write_cluster(out, &indent, node, &part.label, depth),
        VisualNode::Element(element) => writeln!(
            out,
            "{indent}{} [label=\"{}\", shape={}];",
            element.id,
            escape(&element.label),
            shape_of(element.kind)
        ),
        VisualNode::Label(label) => writeln!(
            out,
            "{indent}{} [label=\"{}\", shape=plaintext];",
            label.id,
            escape(&label.text)
        ),
    }
}

fn write_cluster(
    out: &mut impl Write,
    indent: &str,
    node: &VisualNode,
    label: &str,
    depth: usize,
) -> fmt::Result {
    writeln!(out, "{indent}subgraph cluster_{} {{", node.id())?;
    writeln!(out, "{indent}\tlabel = \"{}\";", escape(label))?;
    if node.children().is_empty() {
        // graphviz drops empty clusters
        writeln!(out, "{indent}\t{}_empty [label=\"\", shape=point];", node.id())?;
    }
    for child in node.children() {
        write_node(out, child, depth + 1)?;
    }
    writeln!(out, "{indent}}}")
}

fn shape_of(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Input => "invhouse",
        ElementKind::Output => "house",
        ElementKind::Operator => "box",
        ElementKind::FlowPart => "component",
        ElementKind::Pseudo => "ellipse",
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
