use std::fmt;
use thiserror::Error;

/// Errors raised while resolving a `@Key` declaration against a data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("property '{property}' is not declared in data model '{model}'")]
    PropertyNotFound { model: String, property: String },

    #[error("grouping property '{property}' appears more than once in key for '{model}'")]
    DuplicateGroupProperty { model: String, property: String },

    #[error("malformed ordering '{entry}', expected \"name\", \"name ASC\" or \"name DESC\"")]
    MalformedOrdering { entry: String },
}

/// Declaration and structural errors found while planning a flow graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("input port '{element}.{port}' is not connected")]
    OrphanedInput { element: String, port: String },

    #[error("output port '{element}.{port}' is not connected")]
    OrphanedOutput { element: String, port: String },

    #[error("flow graph must be acyclic, but contains a circuit through [{}]", .elements.join(", "))]
    CyclicFlow { elements: Vec<String> },

    #[error("shuffle operator '{element}' requires a key on input '{port}'")]
    MissingShuffleKey { element: String, port: String },

    #[error("invalid key on '{element}.{port}': {source}")]
    InvalidKey {
        element: String,
        port: String,
        #[source]
        source: KeyError,
    },

    #[error(
        "shuffle keys of '{element}' are incompatible: input '{port}' does not match grouping of '{expected_port}'"
    )]
    IncompatibleShuffleKey {
        element: String,
        port: String,
        expected_port: String,
    },

    #[error("external port '{element}' uses unregistered exchange kind '{kind}'")]
    UnknownExchange { element: String, kind: String },

    #[error("internal planner error: {0}")]
    Internal(String),
}

impl PlanningError {
    /// Names of the elements this error is about.
    pub fn elements(&self) -> Vec<String> {
        match self {
            PlanningError::OrphanedInput { element, .. }
            | PlanningError::OrphanedOutput { element, .. }
            | PlanningError::MissingShuffleKey { element, .. }
            | PlanningError::InvalidKey { element, .. }
            | PlanningError::IncompatibleShuffleKey { element, .. }
            | PlanningError::UnknownExchange { element, .. } => vec![element.clone()],
            PlanningError::CyclicFlow { elements } => elements.clone(),
            PlanningError::Internal(_) => Vec::new(),
        }
    }
}

/// A planning error bound to the flow graph in which it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub flow: String,
    /// Elements the error refers to, empty for internal errors.
    pub elements: Vec<String>,
    pub error: PlanningError,
}

impl Diagnostic {
    pub fn new(flow: impl Into<String>, error: PlanningError) -> Self {
        Self {
            flow: flow.into(),
            elements: error.elements(),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.error, self.flow)
    }
}

impl std::error::Error for Diagnostic {}

/// Errors raised while turning a flow definition into a `FlowGraph`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Failed to parse flow definition JSON: {0}")]
    JsonParseError(String),

    #[error("Element '{0}' is already defined in flow '{1}'")]
    DuplicateElement(String, String),

    #[error("Element '{element}' not found, which is required by connection '{connection}'")]
    ElementNotFound { element: String, connection: String },

    #[error("Element '{element}' has no {direction} port named '{port}'")]
    PortNotFound {
        element: String,
        port: String,
        direction: &'static str,
    },

    #[error("Element '{element}' has several {direction} ports, one must be named explicitly")]
    AmbiguousPort {
        element: String,
        direction: &'static str,
    },

    #[error("Data model '{model}' referenced by '{element}' is not defined")]
    ModelNotFound { model: String, element: String },

    #[error("Flow part '{0}' has not been defined")]
    FlowPartNotFound(String),
}

/// Errors produced by the top-level `FlowCompiler`.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    #[error("flow '{flow_id}' could not be planned ({} error(s))", .diagnostics.len())]
    Planning {
        flow_id: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("invalid compiler option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

impl CompileError {
    /// Returns the planning diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Planning { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}
