use asakusa_flow::prelude::*;
use clap::{Parser, ValueEnum};
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable plan listing
    Text,
    /// JSON manifest of the compiled stages
    Json,
}

/// Plans and compiles a jobflow definition into MapReduce stages
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the jobflow definition JSON file
    definition_path: String,

    /// Compiler options, e.g. "+enableCombiner,-compressConcurrentStage".
    /// Overrides the options stored in the definition.
    #[arg(short, long)]
    options: Option<String>,

    /// Write the planned stage graph as Graphviz DOT to this path
    #[arg(long)]
    dot: Option<String>,

    /// Write the flow graph as declared, before planning, as DOT to this path
    #[arg(long)]
    flow_dot: Option<String>,

    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log planner steps to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let total_start = Instant::now();
    let json = fs::read_to_string(&cli.definition_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read definition file '{}': {}",
            cli.definition_path, e
        ))
    });
    let definition = JobflowDefinition::from_json(&json)
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    let options = match &cli.options {
        Some(text) => CompilerOptions::parse(text),
        None => definition.compiler_options(),
    }
    .unwrap_or_else(|e| exit_with_error(&e.to_string()));

    let JobflowDefinition {
        batch_id,
        flow_id,
        graph,
        ..
    } = definition;
    let graph = graph
        .into_flow_graph()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to build flow graph: {}", e)));

    if let Some(path) = &cli.flow_dot {
        let dot = emit_dot(&visualize_flow_graph(&graph))
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to render flow graph: {}", e)));
        write_file(path, &dot);
    }

    let jobflow = FlowCompiler::builder(batch_id, flow_id, graph)
        .with_options(options)
        .build()
        .compile()
        .unwrap_or_else(|e| {
            for diagnostic in e.diagnostics() {
                eprintln!("  - {}", diagnostic);
            }
            exit_with_error(&e.to_string())
        });

    if let Some(path) = &cli.dot {
        let dot = emit_dot(&visualize_stage_graph(jobflow.stage_graph()))
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to render stage graph: {}", e)));
        write_file(path, &dot);
    }

    match cli.format {
        OutputFormat::Text => {
            print!("{}", format_jobflow(&jobflow));
            println!("Compiled {} stage(s) in {:?}", jobflow.stages().len(), total_start.elapsed());
        }
        OutputFormat::Json => {
            let manifest = serde_json::to_string_pretty(&jobflow.manifest())
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode manifest: {}", e)));
            println!("{}", manifest);
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "asakusa_flow=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_file(path: &str, contents: &str) {
    fs::write(path, contents)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", path, e)));
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
