use crate::jobflow::{CompiledStage, JobflowModel};
use crate::plan::StageGraph;
use std::fmt::{self, Write};

/// Formats a compiled jobflow into a human-readable plan listing.
pub fn format_jobflow(model: &JobflowModel) -> String {
    let mut output = String::new();
    // writing into a String cannot fail
    let _ = write_jobflow(&mut output, model);
    output
}

pub fn write_jobflow(out: &mut impl Write, model: &JobflowModel) -> fmt::Result {
    writeln!(
        out,
        "======== JOBFLOW {}.{} ========",
        model.batch_id(),
        model.flow_id()
    )?;

    if !model.prologues().is_empty() {
        writeln!(out, "\n--- PROLOGUES ---")?;
        write_stages(out, model.prologues())?;
    }

    writeln!(out, "\n--- STAGES ---")?;
    write_stages(out, model.stages())?;

    if !model.epilogues().is_empty() {
        writeln!(out, "\n--- EPILOGUES ---")?;
        write_stages(out, model.epilogues())?;
    }

    writeln!(out, "\n--- BLOCKS ---")?;
    write_blocks(out, model.stage_graph())?;

    writeln!(out, "\n================ END OF JOBFLOW ================")
}

fn write_stages(out: &mut impl Write, stages: &[CompiledStage]) -> fmt::Result {
    for (i, stage) in stages.iter().enumerate() {
        let dependencies = if stage.dependencies.is_empty() {
            "-".to_string()
        } else {
            stage.dependencies.join(", ")
        };
        writeln!(out, "{:04}: {:<20} after {}", i + 1, stage.name, dependencies)?;
        writeln!(out, "      {:<12} {}", "client", stage.client_class)?;
        for mapper in &stage.mapper_classes {
            writeln!(out, "      {:<12} {}", "mapper", mapper)?;
        }
        if let Some(shuffle) = &stage.shuffle {
            writeln!(out, "      {:<12} {}", "key", shuffle.key_class)?;
            writeln!(out, "      {:<12} {}", "reducer", shuffle.reducer_class)?;
            if let Some(combiner) = &shuffle.combiner_class {
                writeln!(out, "      {:<12} {}", "combiner", combiner)?;
            }
        }
    }
    Ok(())
}

fn write_blocks(out: &mut impl Write, stage_graph: &StageGraph) -> fmt::Result {
    let graph = stage_graph.flow_graph();
    for block in stage_graph.blocks() {
        writeln!(out, "{} in {}", block, stage_graph.stage_of(block.id()))?;
        for element in block.elements() {
            writeln!(out, "    {}", graph.element(*element))?;
        }
        for input in block.inputs() {
            if let Some(key) = input.shuffle_key() {
                let port = graph.port(input.port());
                let owner = graph.element(port.owner()).name();
                writeln!(out, "    key {}.{} {}", owner, port.name(), key)?;
            }
        }
    }
    Ok(())
}
