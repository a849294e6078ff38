use crate::compiler::CompilerOptions;
use crate::error::{CompileError, DefinitionError};
use crate::graph::{Connectivity, DataModel, Inline, ObservationCount, OperatorKind};
use crate::shuffle::KeyDeclaration;
use serde::{Deserialize, Serialize};

/// Serializable description of a flow graph.
///
/// Elements are referenced by name; connections use `"element.port"`
/// addresses, where the port may be omitted if the element has a single
/// port in that direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub name: String,
    #[serde(default)]
    pub models: Vec<DataModel>,
    #[serde(default)]
    pub inputs: Vec<ExternalDefinition>,
    #[serde(default)]
    pub outputs: Vec<ExternalDefinition>,
    #[serde(default)]
    pub operators: Vec<OperatorDefinition>,
    #[serde(default, alias = "flowParts")]
    pub flow_parts: Vec<FlowPartDefinition>,
    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDefinition {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub exchange: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorDefinition {
    pub name: String,
    pub kind: OperatorKind,
    #[serde(alias = "declaringClass")]
    pub class: String,
    pub method: String,
    #[serde(default)]
    pub inputs: Vec<PortDefinition>,
    #[serde(default)]
    pub outputs: Vec<PortDefinition>,
    #[serde(default)]
    pub connectivity: Option<Connectivity>,
    #[serde(default)]
    pub observation: Option<ObservationCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDefinition {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub key: Option<KeyDeclaration>,
}

/// A flow-part call. Either carries its own body in `graph`, or shares the
/// body of the earlier call named in `reuses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowPartDefinition {
    pub name: String,
    #[serde(default)]
    pub inline: Inline,
    #[serde(default)]
    pub graph: Option<Box<FlowDefinition>>,
    #[serde(default)]
    pub reuses: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDefinition {
    pub from: String,
    pub to: String,
}

/// A flow definition together with the identifiers of the jobflow it forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobflowDefinition {
    #[serde(alias = "batchId")]
    pub batch_id: String,
    #[serde(alias = "flowId")]
    pub flow_id: String,
    /// Compiler options in list form, e.g. `"+enableCombiner"`.
    #[serde(default)]
    pub options: Option<String>,
    pub graph: FlowDefinition,
}

impl FlowDefinition {
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(json).map_err(|e| DefinitionError::JsonParseError(e.to_string()))
    }
}

impl JobflowDefinition {
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(json).map_err(|e| DefinitionError::JsonParseError(e.to_string()))
    }

    /// The declared options applied over the defaults.
    pub fn compiler_options(&self) -> Result<CompilerOptions, CompileError> {
        match &self.options {
            Some(text) => CompilerOptions::parse(text),
            None => Ok(CompilerOptions::default()),
        }
    }
}
