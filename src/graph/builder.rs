use super::{
    DataModel, ElementDescription, ElementId, ExternalDescription, FlowGraph, FlowPartDescription,
    Inline, OperatorDescription, Port, PortId, PseudoKind,
};
use crate::error::DefinitionError;
use crate::shuffle::KeyDeclaration;
use ahash::AHashMap;

/// Declaration of one port of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub name: String,
    pub model: DataModel,
    pub key: Option<KeyDeclaration>,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, model: DataModel) -> Self {
        Self {
            name: name.into(),
            model,
            key: None,
        }
    }

    /// Attaches a `@Key` declaration to the port.
    pub fn keyed(mut self, key: KeyDeclaration) -> Self {
        self.key = Some(key);
        self
    }

    pub(super) fn from_port(port: &Port) -> Self {
        Self {
            name: port.name().to_string(),
            model: port.model().clone(),
            key: port.key().cloned(),
        }
    }
}

/// Builds a `FlowGraph` from named elements and `"element.port"` connections.
///
/// ```
/// use asakusa_flow::graph::*;
///
/// let model = DataModel::new("Ex1").with_property("sid", PropertyType::Long);
/// let mut builder = FlowGraphBuilder::new("example");
/// builder.define_input("in", model.clone()).unwrap();
/// builder
///     .define_operator(
///         "op",
///         OperatorDescription::new(OperatorKind::Update, "ExOperator", "update"),
///         vec![PortSpec::new("in", model.clone())],
///         vec![PortSpec::new("out", model.clone())],
///     )
///     .unwrap();
/// builder.define_output("out", model).unwrap();
/// builder.connect("in", "op.in").unwrap();
/// builder.connect("op.out", "out").unwrap();
/// let graph = builder.build();
/// assert_eq!(collect_elements(&graph).len(), 3);
/// ```
#[derive(Debug)]
pub struct FlowGraphBuilder {
    graph: FlowGraph,
    names: AHashMap<String, ElementId>,
}

impl FlowGraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: FlowGraph::new(name),
            names: AHashMap::new(),
        }
    }

    pub fn define_input(
        &mut self,
        name: &str,
        model: DataModel,
    ) -> Result<ElementId, DefinitionError> {
        self.define_external_input(name, model, None)
    }

    /// Defines a flow input fed by an external exchange such as an importer.
    pub fn define_external_input(
        &mut self,
        name: &str,
        model: DataModel,
        exchange: Option<String>,
    ) -> Result<ElementId, DefinitionError> {
        let description = ElementDescription::Input(ExternalDescription {
            name: name.to_string(),
            model: model.clone(),
            exchange,
        });
        self.define(name, description, Vec::new(), vec![PortSpec::new("out", model)])
    }

    pub fn define_output(
        &mut self,
        name: &str,
        model: DataModel,
    ) -> Result<ElementId, DefinitionError> {
        self.define_external_output(name, model, None)
    }

    /// Defines a flow output drained by an external exchange such as an exporter.
    pub fn define_external_output(
        &mut self,
        name: &str,
        model: DataModel,
        exchange: Option<String>,
    ) -> Result<ElementId, DefinitionError> {
        let description = ElementDescription::Output(ExternalDescription {
            name: name.to_string(),
            model: model.clone(),
            exchange,
        });
        self.define(name, description, vec![PortSpec::new("in", model)], Vec::new())
    }

    pub fn define_operator(
        &mut self,
        name: &str,
        description: OperatorDescription,
        inputs: Vec<PortSpec>,
        outputs: Vec<PortSpec>,
    ) -> Result<ElementId, DefinitionError> {
        self.define(name, ElementDescription::Operator(description), inputs, outputs)
    }

    /// Defines an explicit pseudo element with ports `in` and `out`.
    pub fn define_pseudo(
        &mut self,
        name: &str,
        kind: PseudoKind,
        model: DataModel,
    ) -> Result<ElementId, DefinitionError> {
        let outputs = match kind {
            PseudoKind::Stop => Vec::new(),
            _ => vec![PortSpec::new("out", model.clone())],
        };
        self.define(
            name,
            ElementDescription::Pseudo(kind),
            vec![PortSpec::new("in", model)],
            outputs,
        )
    }

    /// Embeds `part` as a nested scope and defines a flow-part element calling it.
    /// The element's ports mirror the part's declared inputs and outputs.
    pub fn define_flow_part(
        &mut self,
        name: &str,
        part: &FlowGraph,
        inline: Inline,
    ) -> Result<ElementId, DefinitionError> {
        let scope = self.graph.import(part);
        self.define_flow_part_call(name, part.name().to_string(), scope, inline)
    }

    /// Defines another call of an already defined flow-part, sharing its nested scope.
    pub fn reuse_flow_part(&mut self, name: &str, of: &str) -> Result<ElementId, DefinitionError> {
        let part = self
            .names
            .get(of)
            .and_then(|id| self.graph.element(*id).description().flow_part())
            .cloned()
            .ok_or_else(|| DefinitionError::FlowPartNotFound(of.to_string()))?;
        self.define_flow_part_call(name, part.name, part.scope, part.inline)
    }

    fn define_flow_part_call(
        &mut self,
        name: &str,
        part_name: String,
        scope: super::ScopeId,
        inline: Inline,
    ) -> Result<ElementId, DefinitionError> {
        let nested = self.graph.scope(scope).clone();
        let specs = |elements: &[ElementId]| -> Vec<PortSpec> {
            elements
                .iter()
                .map(|e| {
                    let element = self.graph.element(*e);
                    let model = match element.description() {
                        ElementDescription::Input(external)
                        | ElementDescription::Output(external) => external.model.clone(),
                        _ => DataModel::new(element.name()),
                    };
                    PortSpec::new(element.name(), model)
                })
                .collect()
        };
        let inputs = specs(nested.inputs());
        let outputs = specs(nested.outputs());
        let description = ElementDescription::FlowPart(FlowPartDescription {
            name: part_name,
            scope,
            inline,
        });
        self.define(name, description, inputs, outputs)
    }

    fn define(
        &mut self,
        name: &str,
        description: ElementDescription,
        inputs: Vec<PortSpec>,
        outputs: Vec<PortSpec>,
    ) -> Result<ElementId, DefinitionError> {
        if self.names.contains_key(name) {
            return Err(DefinitionError::DuplicateElement(
                name.to_string(),
                self.graph.name().to_string(),
            ));
        }
        let root = self.graph.root();
        let id = self
            .graph
            .add_element(root, name, description, inputs, outputs);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Connects `"element.port"` to `"element.port"`. The port name may be
    /// omitted when the element has exactly one port in that direction.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<&mut Self, DefinitionError> {
        let connection = format!("{from} -> {to}");
        let upstream = self.resolve_port(from, &connection, true)?;
        let downstream = self.resolve_port(to, &connection, false)?;
        self.graph.connect(upstream, downstream);
        Ok(self)
    }

    fn resolve_port(
        &self,
        address: &str,
        connection: &str,
        output: bool,
    ) -> Result<PortId, DefinitionError> {
        let (element_name, port_name) = match address.split_once('.') {
            Some((element, port)) => (element, Some(port)),
            None => (address, None),
        };
        let id = *self
            .names
            .get(element_name)
            .ok_or_else(|| DefinitionError::ElementNotFound {
                element: element_name.to_string(),
                connection: connection.to_string(),
            })?;
        let element = self.graph.element(id);
        let (ports, direction) = if output {
            (element.outputs(), "output")
        } else {
            (element.inputs(), "input")
        };
        match port_name {
            Some(port_name) => ports
                .iter()
                .copied()
                .find(|p| self.graph.port(*p).name() == port_name)
                .ok_or_else(|| DefinitionError::PortNotFound {
                    element: element_name.to_string(),
                    port: port_name.to_string(),
                    direction,
                }),
            None => match ports {
                [single] => Ok(*single),
                [] => Err(DefinitionError::PortNotFound {
                    element: element_name.to_string(),
                    port: String::new(),
                    direction,
                }),
                _ => Err(DefinitionError::AmbiguousPort {
                    element: element_name.to_string(),
                    direction,
                }),
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<ElementId> {
        self.names.get(name).copied()
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn build(self) -> FlowGraph {
        self.graph
    }
}
