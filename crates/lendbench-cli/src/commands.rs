//! Subcommand arguments and handlers.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use lendbench::backends::{self, BackendKind};
use lendbench::dataset::generator::{generate, GeneratorConfig};
use lendbench::dataset::subsets::create_subsets;
use lendbench::dataset::{DatasetFiles, DatasetSize};
use lendbench::report::{append_csv, first_time_chart, read_csv};
use lendbench::runner::{matching_names, run_suite};
use lendbench::sampler::DEFAULT_WARM_RUNS;
use lendbench::{AdapterConfig, QueryId};

use crate::formatter::Formatter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the base books, borrowers and transactions CSV files
    Generate(GenerateArgs),

    /// Write the 25/50/75/100% subsets of the base files
    Subsets {
        /// Directory holding books.csv, borrowers.csv and transactions.csv
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Load one dataset subset into a backend
    Load(BackendArgs),

    /// Load a backend and measure the benchmark queries
    Run(RunArgs),

    /// Print accumulated results
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Number of books
    #[arg(long, default_value_t = 1000)]
    pub books: usize,

    /// Number of borrowers
    #[arg(long, default_value_t = 1000)]
    pub borrowers: usize,

    /// Number of lending transactions
    #[arg(long, default_value_t = 2000)]
    pub transactions: usize,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Date the borrow window ends on (YYYY-MM-DD, default today)
    #[arg(long)]
    pub reference_date: Option<NaiveDate>,
}

impl From<&GenerateArgs> for GeneratorConfig {
    fn from(args: &GenerateArgs) -> Self {
        let mut config = GeneratorConfig::new(args.books, args.borrowers, args.transactions);
        if let Some(seed) = args.seed {
            config = config.with_seed(seed);
        }
        if let Some(date) = args.reference_date {
            config = config.with_reference_date(date);
        }
        config
    }
}

#[derive(Args, Debug)]
pub struct BackendArgs {
    /// Database backend
    #[arg(short, long)]
    pub backend: BackendKind,

    /// Dataset size (250k, 500k, 750k or 1000k)
    #[arg(short, long, default_value = "250k")]
    pub size: DatasetSize,

    /// Directory holding the subset CSV files
    #[arg(long, default_value = lendbench::config::DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Connection target (defaults to the backend's local address)
    #[arg(long)]
    pub target: Option<String>,
}

impl From<&BackendArgs> for AdapterConfig {
    fn from(args: &BackendArgs) -> Self {
        let config = match &args.target {
            Some(target) => AdapterConfig::new(target.clone()),
            None => AdapterConfig::for_backend(args.backend),
        };
        config
            .with_dataset_size(args.size)
            .with_data_dir(args.data_dir.clone())
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Borrower name prefix for query 1
    #[arg(short, long)]
    pub pattern: String,

    /// Warm runs per query
    #[arg(long, default_value_t = DEFAULT_WARM_RUNS)]
    pub warm_runs: usize,

    /// Queries to run (1 to 4, repeatable; default all)
    #[arg(short, long = "query")]
    pub queries: Vec<QueryId>,

    /// Measure against data that is already loaded
    #[arg(long)]
    pub skip_load: bool,

    /// Append result rows to this CSV file
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Print the borrower names matched by query 1
    #[arg(long)]
    pub show_matches: bool,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Results CSV file
    #[arg(short, long, default_value = "query_results.csv")]
    pub results: PathBuf,

    /// Only show rows for this database
    #[arg(short, long)]
    pub database: Option<String>,

    /// Also draw the first-execution-time chart
    #[arg(long)]
    pub chart: bool,
}

/// Execute one subcommand, printing its output.
pub fn execute(command: &Command, formatter: &dyn Formatter) -> CliResult {
    match command {
        Command::Generate(args) => generate_dataset(args, formatter),
        Command::Subsets { dir } => {
            let files = create_subsets(dir)?;
            println!("{}", formatter.format_subsets(&files));
            Ok(())
        }
        Command::Load(args) => load(args, formatter),
        Command::Run(args) => run(args, formatter),
        Command::Report(args) => report(args, formatter),
    }
}

fn generate_dataset(args: &GenerateArgs, formatter: &dyn Formatter) -> CliResult {
    fs::create_dir_all(&args.out)?;
    let dataset = generate(&GeneratorConfig::from(args));
    dataset.write(&DatasetFiles::base(&args.out))?;

    println!(
        "{}",
        formatter.format_message(&format!(
            "wrote {} books, {} borrowers and {} transactions to {}",
            dataset.books.len(),
            dataset.borrowers.len(),
            dataset.transactions.len(),
            args.out.display()
        ))
    );
    Ok(())
}

fn load(args: &BackendArgs, formatter: &dyn Formatter) -> CliResult {
    let config = AdapterConfig::from(args);
    let mut backend = backends::open(args.backend, &config)?;
    let summary = backend.load_dataset(&config)?;

    println!(
        "{}",
        formatter.format_message(&format!(
            "loaded {} records ({} books, {} borrowers, {} transactions) into {}",
            summary.total(),
            summary.books,
            summary.borrowers,
            summary.transactions,
            args.backend
        ))
    );
    Ok(())
}

fn run(args: &RunArgs, formatter: &dyn Formatter) -> CliResult {
    let config = AdapterConfig::from(&args.backend).with_name_pattern(args.pattern.clone());
    let queries = if args.queries.is_empty() {
        QueryId::ALL.to_vec()
    } else {
        args.queries.clone()
    };

    let mut backend = backends::open(args.backend.backend, &config)?;
    if !args.skip_load {
        backend.load_dataset(&config)?;
    }

    let rows = run_suite(backend.as_mut(), &config, &queries, args.warm_runs)?;
    println!("{}", formatter.format_run(&rows));

    if let Some(path) = &args.results {
        append_csv(path, &rows)?;
        tracing::info!(path = %path.display(), rows = rows.len(), "results saved");
    }

    if args.show_matches {
        let names = matching_names(backend.as_mut(), &config.query_params())?;
        println!("{}", formatter.format_names(&names));
    }
    Ok(())
}

fn report(args: &ReportArgs, formatter: &dyn Formatter) -> CliResult {
    let mut rows = read_csv(&args.results)?;
    if let Some(database) = &args.database {
        rows.retain(|r| &r.database == database);
    }
    println!("{}", formatter.format_results(&rows));

    if args.chart {
        let databases: BTreeSet<&str> = rows.iter().map(|r| r.database.as_str()).collect();
        for database in databases {
            println!("\n{}", first_time_chart(&rows, database));
        }
    }
    Ok(())
}
