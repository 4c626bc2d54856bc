//! Medir CLI - task-polymorphic inference benchmarking harness
//!
//! # Commands
//!
//! - `run` - Execute a benchmark run against the built-in demo backend
//! - `tasks` - List supported task types

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::warn;

use medir::engine::{self, RunOptions};
use medir::metrics;
use medir::mock_model::{DemoSource, MockModel};
use medir::output::format_output;
use medir::report::ReportWriter;
use medir::{Device, Result, TaskType};

/// Medir - task-polymorphic inference benchmarking harness
#[derive(Parser)]
#[command(name = "medir")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a benchmark run
    ///
    /// Examples:
    ///   medir run --task classification --iterations 100
    ///   medir run --task text-generation --iterations 0 --time 10
    ///   medir run --task speech-to-text --iterations 1
    Run(RunArgs),
    /// List supported task types
    Tasks,
}

#[derive(Args)]
struct RunArgs {
    /// Task type to benchmark
    #[arg(short, long, default_value = "feedforward")]
    task: TaskType,

    /// Number of inference iterations (0 = run until --time expires)
    #[arg(short = 'n', long, default_value = "1")]
    iterations: usize,

    /// Wall-clock budget in seconds (0 = unbounded)
    #[arg(long, default_value = "0")]
    time: u64,

    /// Target device (cpu or gpu)
    #[arg(short, long, default_value = "cpu")]
    device: String,

    /// Batch size used for throughput normalization
    #[arg(short, long, default_value = "1")]
    batch_size: usize,

    /// Comma-separated input tensor names
    #[arg(long, default_value = "input", value_delimiter = ',')]
    input_names: Vec<String>,

    /// Comma-separated output tensor names
    #[arg(long, default_value = "output", value_delimiter = ',')]
    output_names: Vec<String>,

    /// Report file path
    #[arg(long, default_value = "medir_report.json")]
    report: PathBuf,

    /// Suppress result display
    #[arg(long)]
    raw_output: bool,

    /// Disable the inference-mode execution hint
    #[arg(long)]
    no_inference_mode: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run_benchmark(&args),
        Commands::Tasks => {
            for task in TaskType::ALL {
                println!("{task}");
            }
            Ok(())
        }
    }
}

fn run_benchmark(args: &RunArgs) -> Result<()> {
    let device = Device::parse(&args.device)?;
    let model = MockModel::new();
    let mut source = DemoSource::new(args.task, args.batch_size, args.input_names.clone());

    let options = RunOptions::new(args.task)
        .with_iterations(args.iterations)
        .with_duration(Duration::from_secs(args.time))
        .with_device(device)
        .with_input_names(args.input_names.clone())
        .with_inference_mode(!args.no_inference_mode);
    options.validate()?;

    let mut report_writer = ReportWriter::new();
    report_writer.update_framework_info("medir", medir::VERSION);
    report_writer.update_configuration_setup(args.batch_size, args.iterations, device.as_str());

    let outcome = engine::run(&model, &mut source, &options)?;
    let metrics = metrics::aggregate(
        args.batch_size,
        &outcome.latencies,
        &outcome.token_counts,
        &outcome.audio_lengths,
        outcome.sample_rate,
    )?;

    report_writer.update_execution_results(metrics.clone());
    report_writer.write_report(&args.report)?;

    // Result display is limited to single-shot runs; formatting problems are
    // reported but never fail a run that already produced metrics.
    if !args.raw_output && args.iterations == 1 {
        if let Some(raw) = &outcome.output {
            match format_output(raw, &args.output_names, args.task) {
                Ok(display) => println!("{}", serde_json::to_string_pretty(&display)?),
                Err(e) => warn!("error when printing inference results: {e}"),
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
