//! CLI entrypoint for markovload workloads.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use markovload_harness::report::ArtifactIndex;
use markovload_harness::runner::{self, RunOptions};
use markovload_harness::spec::{self, GraphSpec, LinearSpec, MatrixSpec, RunSpec};
use markovload_harness::structured_log::{LogEmitter, validate_log_file};
use markovload_harness::{HarnessError, RunReport};

/// Deterministic allocation traffic for allocator and collector benchmarking.
#[derive(Debug, Parser)]
#[command(name = "markovload")]
#[command(about = "Markov-chain allocation traffic generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the linear alloc/dealloc workload.
    Linear {
        #[arg(long, value_parser = parse_u64)]
        seed: Option<u64>,
        #[arg(long)]
        ops: Option<u64>,
        /// Slot-table size (defaults to --ops).
        #[arg(long)]
        slots: Option<usize>,
        #[arg(long)]
        budget_bytes: Option<usize>,
        /// Matrix preset: ver-1 or ver-2.
        #[arg(long)]
        matrix: Option<String>,
        /// system, libc or counting (falls back to MARKOVLOAD_ALLOCATOR).
        #[arg(long)]
        allocator: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the object-graph workload against the cycle-collecting heap.
    Graph {
        #[arg(long, value_parser = parse_u64)]
        seed: Option<u64>,
        #[arg(long)]
        ops: Option<u64>,
        #[arg(long)]
        slots: Option<usize>,
        #[arg(long)]
        clusters: Option<usize>,
        /// Probability that a setup slot stays empty.
        #[arg(long)]
        graph_density: Option<f64>,
        /// Probability that a setup edge slot stays empty.
        #[arg(long)]
        vertex_density: Option<f64>,
        /// Matrix preset: norm-workload or gc-heavy.
        #[arg(long)]
        matrix: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Validate a 4x4 or 7x7 transition matrix file.
    CheckMatrix { path: PathBuf },
    /// Validate a structured JSONL log file.
    ValidateLog { path: PathBuf },
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// JSON run spec; flags given here override it.
    #[arg(long)]
    spec: Option<PathBuf>,
    /// Structured JSONL log output path.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Run report output path (JSON). Prints to stdout when omitted.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Record the per-step journal and log one line per event.
    #[arg(long)]
    trace: bool,
    #[arg(long)]
    run_id: Option<String>,
}

impl OutputArgs {
    fn load_spec(&self) -> Result<RunSpec, HarnessError> {
        self.spec
            .as_deref()
            .map_or_else(|| Ok(RunSpec::default()), RunSpec::from_file)
    }

    fn emitter(&self, run_id: &str, workload: &str) -> Result<LogEmitter, HarnessError> {
        match &self.log {
            Some(path) => Ok(LogEmitter::to_file(path, run_id, workload)?),
            None => Ok(LogEmitter::discard(run_id, workload)),
        }
    }

    fn trace_flag(&self) -> Option<bool> {
        self.trace.then_some(true)
    }
}

/// Accepts decimal or `0x`-prefixed hex.
fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid integer '{s}': {e}"))
}

fn write_outputs(output: &OutputArgs, report: &RunReport) -> Result<(), HarnessError> {
    let json = report.to_json()?;
    let Some(path) = &output.report else {
        println!("{json}");
        return Ok(());
    };
    std::fs::write(path, format!("{json}\n"))?;

    let mut index = ArtifactIndex::new(&report.run_id);
    index.add_file(path, "report")?;
    if let Some(log) = &output.log {
        index.add_file(log, "log")?;
    }
    std::fs::write(index_path(path), format!("{}\n", index.to_json()?))?;
    eprintln!("report written to {}", path.display());
    Ok(())
}

fn index_path(report: &Path) -> PathBuf {
    report.with_extension("artifacts.json")
}

fn run(cli: Cli) -> Result<bool, HarnessError> {
    match cli.command {
        Command::Linear {
            seed,
            ops,
            slots,
            budget_bytes,
            matrix,
            allocator,
            output,
        } => {
            let file = output.load_spec()?;
            let flags = LinearSpec {
                seed,
                ops,
                slots,
                budget_bytes,
                matrix: matrix.map(MatrixSpec::Preset),
                trace: output.trace_flag(),
                ..LinearSpec::default()
            };
            let config = file.linear.unwrap_or_default().overlay(flags).to_config()?;
            let kind = runner::resolve_allocator(allocator.as_deref(), file.allocator.as_deref())?;
            let run_id = output.run_id.clone().unwrap_or_else(runner::default_run_id);
            let mut log = output.emitter(&run_id, "linear")?;
            let run = runner::run_linear(config, &RunOptions::new(&run_id, kind), &mut log)?;
            write_outputs(&output, &run.to_report(&run_id))?;
            Ok(run.passed())
        }
        Command::Graph {
            seed,
            ops,
            slots,
            clusters,
            graph_density,
            vertex_density,
            matrix,
            output,
        } => {
            let file = output.load_spec()?;
            let flags = GraphSpec {
                seed,
                ops,
                slots,
                clusters,
                graph_density,
                vertex_density,
                matrix: matrix.map(MatrixSpec::Preset),
                trace: output.trace_flag(),
            };
            let config = file.graph.unwrap_or_default().overlay(flags).to_config()?;
            let run_id = output.run_id.clone().unwrap_or_else(runner::default_run_id);
            let mut log = output.emitter(&run_id, "graph")?;
            let run = runner::run_graph(config, &mut log)?;
            write_outputs(&output, &run.to_report(&run_id))?;
            Ok(run.passed())
        }
        Command::CheckMatrix { path } => {
            let check = spec::check_matrix_file(&path)?;
            println!("{}", serde_json::to_string(&check)?);
            Ok(true)
        }
        Command::ValidateLog { path } => {
            let (lines, errors) = validate_log_file(&path)?;
            for error in &errors {
                eprintln!("{error}");
            }
            println!(
                "{}",
                serde_json::json!({ "lines": lines, "violations": errors.len() })
            );
            if errors.is_empty() {
                Ok(true)
            } else {
                Err(HarnessError::LogViolations {
                    count: errors.len(),
                })
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("markovload: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
