//! Cross-Database Latency Benchmark CLI
//!
//! Generates the library dataset, loads it into a database and times the
//! benchmark queries.

mod commands;
mod formatter;

use clap::Parser;
use commands::Command;
use formatter::OutputFormat;

/// Cross-database latency benchmark
#[derive(Parser, Debug)]
#[command(name = "lendbench")]
#[command(version, about = "Cross-database query latency benchmark")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so that json/csv output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lendbench=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let formatter = formatter::create_formatter(args.format);
    commands::execute(&args.command, &*formatter)
}
