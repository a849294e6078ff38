use super::{ClassNaming, CompiledStage};
use crate::graph::ExternalDescription;

/// What an I/O processor gets to know about the jobflow it contributes to.
pub struct IoContext<'a> {
    pub batch_id: &'a str,
    pub flow_id: &'a str,
    pub naming: &'a dyn ClassNaming,
}

/// Handles the flow inputs and outputs of one exchange kind (for example a
/// file importer), contributing the stages that run before and after the
/// planned stages.
///
/// Processors are registered on the `FlowCompilerBuilder`; a flow port whose
/// exchange kind has no processor is reported as an error.
pub trait ExternalIoProcessor: Send + Sync {
    /// The exchange kind this processor is responsible for.
    fn kind(&self) -> &str;

    /// Stages that must finish before the first planned stage starts.
    fn prologues(
        &self,
        _context: &IoContext<'_>,
        _inputs: &[&ExternalDescription],
    ) -> Vec<CompiledStage> {
        Vec::new()
    }

    /// Stages that run after the last planned stage.
    fn epilogues(
        &self,
        _context: &IoContext<'_>,
        _outputs: &[&ExternalDescription],
    ) -> Vec<CompiledStage> {
        Vec::new()
    }
}
