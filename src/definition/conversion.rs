use super::schema::{FlowDefinition, PortDefinition};
use crate::error::DefinitionError;
use crate::graph::{DataModel, FlowGraph, FlowGraphBuilder, OperatorDescription, PortSpec};
use ahash::AHashMap;

/// A trait for flow descriptions that can be turned into a `FlowGraph`.
///
/// `FlowDefinition` implements it for the JSON format read by the command
/// line tool. Front-ends with their own format implement it to hand their
/// graphs to the planner without going through JSON.
///
/// # Example
///
/// ```rust
/// use asakusa_flow::prelude::*;
///
/// struct Passthrough {
///     model: DataModel,
/// }
///
/// impl IntoFlowGraph for Passthrough {
///     fn into_flow_graph(self) -> Result<FlowGraph, DefinitionError> {
///         let mut builder = FlowGraphBuilder::new("passthrough");
///         builder.define_input("in", self.model.clone())?;
///         builder.define_output("out", self.model)?;
///         builder.connect("in", "out")?;
///         Ok(builder.build())
///     }
/// }
///
/// let model = DataModel::new("Ex1").with_property("sid", PropertyType::Long);
/// let graph = Passthrough { model }.into_flow_graph().unwrap();
/// assert_eq!(graph.name(), "passthrough");
/// ```
pub trait IntoFlowGraph {
    /// Consumes the description and builds the flow graph it describes.
    fn into_flow_graph(self) -> Result<FlowGraph, DefinitionError>;
}

impl IntoFlowGraph for FlowDefinition {
    fn into_flow_graph(self) -> Result<FlowGraph, DefinitionError> {
        convert(&self, &AHashMap::new())
    }
}

fn convert(
    definition: &FlowDefinition,
    inherited: &AHashMap<String, DataModel>,
) -> Result<FlowGraph, DefinitionError> {
    let mut models = inherited.clone();
    for model in &definition.models {
        models.insert(model.name.clone(), model.clone());
    }
    let model_of = |name: &str, element: &str| {
        models
            .get(name)
            .cloned()
            .ok_or_else(|| DefinitionError::ModelNotFound {
                model: name.to_string(),
                element: element.to_string(),
            })
    };
    let ports = |ports: &[PortDefinition],
                 element: &str|
     -> Result<Vec<PortSpec>, DefinitionError> {
        ports
            .iter()
            .map(|port| {
                let spec = PortSpec::new(&port.name, model_of(&port.model, element)?);
                Ok(match &port.key {
                    Some(key) => spec.keyed(key.clone()),
                    None => spec,
                })
            })
            .collect()
    };

    let mut builder = FlowGraphBuilder::new(&definition.name);
    for input in &definition.inputs {
        let model = model_of(&input.model, &input.name)?;
        builder.define_external_input(&input.name, model, input.exchange.clone())?;
    }
    for output in &definition.outputs {
        let model = model_of(&output.model, &output.name)?;
        builder.define_external_output(&output.name, model, output.exchange.clone())?;
    }
    for operator in &definition.operators {
        let mut description = OperatorDescription::new(
            operator.kind.clone(),
            operator.class.as_str(),
            operator.method.as_str(),
        );
        description.connectivity = operator.connectivity;
        description.observation = operator.observation;
        builder.define_operator(
            &operator.name,
            description,
            ports(&operator.inputs, &operator.name)?,
            ports(&operator.outputs, &operator.name)?,
        )?;
    }
    for part in &definition.flow_parts {
        match (&part.graph, &part.reuses) {
            (Some(body), _) => {
                let nested = convert(body, &models)?;
                builder.define_flow_part(&part.name, &nested, part.inline)?;
            }
            (None, Some(other)) => {
                builder.reuse_flow_part(&part.name, other)?;
            }
            (None, None) => return Err(DefinitionError::FlowPartNotFound(part.name.clone())),
        }
    }
    for connection in &definition.connections {
        builder.connect(&connection.from, &connection.to)?;
    }
    Ok(builder.build())
}
