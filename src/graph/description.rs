use crate::graph::ScopeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive type of a data model property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Text,
    Date,
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: PropertyType,
}

/// The record type flowing through a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataModel {
    pub name: String,
    pub properties: Vec<Property>,
}

impl DataModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        self.properties.push(Property {
            name: name.into(),
            ty,
        });
        self
    }

    /// Finds a property, ignoring case and underscores (`"STRING_VALUE"` matches `stringValue`).
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        let wanted = normalize_property_name(name);
        self.properties
            .iter()
            .find(|p| normalize_property_name(&p.name) == wanted)
    }
}

fn normalize_property_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether an element cuts the flow into separate stages or phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowBoundary {
    /// The element materializes its data (inputs, outputs, checkpoints).
    Stage,
    /// The element requires its inputs to be shuffled by key.
    Shuffle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Mandatory,
    Optional,
}

/// How often the observable effect of an element may happen per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationCount {
    #[default]
    DontCare,
    AtLeastOnce,
    AtMostOnce,
    ExactlyOnce,
}

impl ObservationCount {
    pub fn at_least_once(self) -> bool {
        matches!(
            self,
            ObservationCount::AtLeastOnce | ObservationCount::ExactlyOnce
        )
    }

    pub fn at_most_once(self) -> bool {
        matches!(
            self,
            ObservationCount::AtMostOnce | ObservationCount::ExactlyOnce
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialAggregation {
    #[default]
    Default,
    Total,
    Partial,
}

/// Buffering strategy of a grouping operator's input lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputBuffer {
    /// Keep each group on the heap.
    #[default]
    Expand,
    /// Spill large groups out of the heap.
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

/// Operator family together with its kind-specific metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorKind {
    Update,
    Convert,
    Extend,
    Project,
    Restructure,
    Branch,
    Split,
    Extract,
    Logging {
        #[serde(default)]
        level: LogLevel,
    },
    MasterCheck,
    MasterJoin,
    MasterBranch,
    MasterJoinUpdate,
    CoGroup {
        #[serde(default)]
        buffer: InputBuffer,
    },
    GroupSort {
        #[serde(default)]
        buffer: InputBuffer,
    },
    Fold {
        #[serde(default)]
        partial: PartialAggregation,
    },
    Summarize {
        #[serde(default)]
        partial: PartialAggregation,
    },
}

impl OperatorKind {
    /// Grouping operators need their inputs shuffled by key.
    pub fn is_shuffle(&self) -> bool {
        matches!(
            self,
            OperatorKind::MasterCheck
                | OperatorKind::MasterJoin
                | OperatorKind::MasterBranch
                | OperatorKind::MasterJoinUpdate
                | OperatorKind::CoGroup { .. }
                | OperatorKind::GroupSort { .. }
                | OperatorKind::Fold { .. }
                | OperatorKind::Summarize { .. }
        )
    }

    /// Operators that may be moved below a checkpoint without changing semantics.
    pub fn is_push_down_target(&self) -> bool {
        matches!(
            self,
            OperatorKind::Branch
                | OperatorKind::Split
                | OperatorKind::Project
                | OperatorKind::Restructure
                | OperatorKind::Logging { .. }
        )
    }

    pub fn partial_aggregation(&self) -> Option<PartialAggregation> {
        match self {
            OperatorKind::Fold { partial } | OperatorKind::Summarize { partial } => Some(*partial),
            _ => None,
        }
    }

    pub fn input_buffer(&self) -> Option<InputBuffer> {
        match self {
            OperatorKind::CoGroup { buffer } | OperatorKind::GroupSort { buffer } => Some(*buffer),
            _ => None,
        }
    }

    fn default_connectivity(&self) -> Connectivity {
        match self {
            OperatorKind::Logging { .. } => Connectivity::Optional,
            _ => Connectivity::Mandatory,
        }
    }

    fn default_observation(&self) -> ObservationCount {
        match self {
            OperatorKind::Logging { .. } => ObservationCount::AtLeastOnce,
            _ => ObservationCount::DontCare,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OperatorKind::Update => "Update",
            OperatorKind::Convert => "Convert",
            OperatorKind::Extend => "Extend",
            OperatorKind::Project => "Project",
            OperatorKind::Restructure => "Restructure",
            OperatorKind::Branch => "Branch",
            OperatorKind::Split => "Split",
            OperatorKind::Extract => "Extract",
            OperatorKind::Logging { .. } => "Logging",
            OperatorKind::MasterCheck => "MasterCheck",
            OperatorKind::MasterJoin => "MasterJoin",
            OperatorKind::MasterBranch => "MasterBranch",
            OperatorKind::MasterJoinUpdate => "MasterJoinUpdate",
            OperatorKind::CoGroup { .. } => "CoGroup",
            OperatorKind::GroupSort { .. } => "GroupSort",
            OperatorKind::Fold { .. } => "Fold",
            OperatorKind::Summarize { .. } => "Summarize",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user operator: its family plus the method implementing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorDescription {
    pub kind: OperatorKind,
    pub declaring_class: String,
    pub method: String,
    pub connectivity: Option<Connectivity>,
    pub observation: Option<ObservationCount>,
}

impl OperatorDescription {
    pub fn new(
        kind: OperatorKind,
        declaring_class: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            declaring_class: declaring_class.into(),
            method: method.into(),
            connectivity: None,
            observation: None,
        }
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn with_observation(mut self, observation: ObservationCount) -> Self {
        self.observation = Some(observation);
        self
    }
}

/// Describes a flow input (importer) or flow output (exporter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDescription {
    pub name: String,
    pub model: DataModel,
    /// Kind of the external exchange, `None` for flow-internal ports.
    pub exchange: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inline {
    /// Follow the `compress_flow_part` option.
    #[default]
    Default,
    /// Merge the flow-part into its caller without extra boundaries.
    ForceAggregate,
    /// Keep the flow-part apart by placing checkpoints on its ports.
    KeepSegregated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPartDescription {
    pub name: String,
    pub scope: ScopeId,
    pub inline: Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PseudoKind {
    Identity,
    Checkpoint,
    Stop,
}

impl PseudoKind {
    pub fn name(self) -> &'static str {
        match self {
            PseudoKind::Identity => "identity",
            PseudoKind::Checkpoint => "checkpoint",
            PseudoKind::Stop => "implicit-stop",
        }
    }
}

/// Coarse classification of a `FlowElement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Input,
    Output,
    Operator,
    FlowPart,
    Pseudo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementDescription {
    Input(ExternalDescription),
    Output(ExternalDescription),
    Operator(OperatorDescription),
    FlowPart(FlowPartDescription),
    Pseudo(PseudoKind),
}

impl ElementDescription {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementDescription::Input(_) => ElementKind::Input,
            ElementDescription::Output(_) => ElementKind::Output,
            ElementDescription::Operator(_) => ElementKind::Operator,
            ElementDescription::FlowPart(_) => ElementKind::FlowPart,
            ElementDescription::Pseudo(_) => ElementKind::Pseudo,
        }
    }

    pub fn boundary(&self) -> Option<FlowBoundary> {
        match self {
            ElementDescription::Input(_) | ElementDescription::Output(_) => {
                Some(FlowBoundary::Stage)
            }
            ElementDescription::Pseudo(PseudoKind::Checkpoint | PseudoKind::Stop) => {
                Some(FlowBoundary::Stage)
            }
            ElementDescription::Operator(op) if op.kind.is_shuffle() => Some(FlowBoundary::Shuffle),
            _ => None,
        }
    }

    pub fn connectivity(&self) -> Connectivity {
        match self {
            ElementDescription::Operator(op) => op
                .connectivity
                .unwrap_or_else(|| op.kind.default_connectivity()),
            _ => Connectivity::Mandatory,
        }
    }

    pub fn observation_count(&self) -> ObservationCount {
        match self {
            ElementDescription::Operator(op) => op
                .observation
                .unwrap_or_else(|| op.kind.default_observation()),
            _ => ObservationCount::DontCare,
        }
    }

    pub fn operator(&self) -> Option<&OperatorDescription> {
        match self {
            ElementDescription::Operator(op) => Some(op),
            _ => None,
        }
    }

    pub fn pseudo(&self) -> Option<PseudoKind> {
        match self {
            ElementDescription::Pseudo(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn flow_part(&self) -> Option<&FlowPartDescription> {
        match self {
            ElementDescription::FlowPart(part) => Some(part),
            _ => None,
        }
    }
}
