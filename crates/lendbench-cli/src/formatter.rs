//! Output formatters for benchmark results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use lendbench::dataset::subsets::SubsetFile;
use lendbench::ResultRow;
use serde::Serialize;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format measured result rows.
    fn format_results(&self, rows: &[ResultRow]) -> String;

    /// Format the rows measured by one `run`.
    fn format_run(&self, rows: &[ResultRow]) -> String {
        self.format_results(rows)
    }

    /// Format the borrower names matched by query 1.
    fn format_names(&self, names: &[String]) -> String;

    /// Format the files written by the subset step.
    fn format_subsets(&self, files: &[SubsetFile]) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

const RESULT_COLUMNS: [&str; 6] = [
    "database",
    "query_number",
    "dataset_size",
    "first_time",
    "avg_time",
    "ci95",
];

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_results(&self, rows: &[ResultRow]) -> String {
        if rows.is_empty() {
            return "No results".to_string();
        }

        let mut table = Table::new();
        table.set_header(RESULT_COLUMNS.iter().map(Cell::new).collect::<Vec<_>>());
        for row in rows {
            table.add_row(vec![
                Cell::new(&row.database),
                Cell::new(row.query_number),
                Cell::new(&row.dataset_size),
                Cell::new(format!("{:.3}", row.first_time)),
                Cell::new(format!("{:.3}", row.avg_time)),
                Cell::new(format!("{:.3}", row.ci95)),
            ]);
        }

        format!("{}\n{} row(s)", table, rows.len())
    }

    fn format_run(&self, rows: &[ResultRow]) -> String {
        let mut out = String::new();
        for row in rows {
            out.push_str(&format!(
                "Query{} on {} ({})\n{}\n\n",
                row.query_number,
                row.database,
                row.dataset_size,
                row.summary()
            ));
        }
        out.push_str(&self.format_results(rows));
        out
    }

    fn format_names(&self, names: &[String]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["name"]);
        for name in names {
            table.add_row(vec![name]);
        }
        format!("{}\n{} match(es)", table, names.len())
    }

    fn format_subsets(&self, files: &[SubsetFile]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["file", "rows"]);
        for file in files {
            table.add_row(vec![
                Cell::new(file.path.display()),
                Cell::new(file.rows),
            ]);
        }
        table.to_string()
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_results(&self, rows: &[ResultRow]) -> String {
        serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_names(&self, names: &[String]) -> String {
        serde_json::to_string_pretty(names).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_subsets(&self, files: &[SubsetFile]) -> String {
        let entries: Vec<serde_json::Value> = files
            .iter()
            .map(|f| {
                serde_json::json!({
                    "file": f.path.display().to_string(),
                    "rows": f.rows,
                })
            })
            .collect();
        serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({
            "message": message
        })
        .to_string()
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_results(&self, rows: &[ResultRow]) -> String {
        write_csv(&RESULT_COLUMNS, rows)
    }

    fn format_names(&self, names: &[String]) -> String {
        write_csv(&["name"], names.iter().map(|name| (name,)))
    }

    fn format_subsets(&self, files: &[SubsetFile]) -> String {
        write_csv(
            &["file", "rows"],
            files.iter().map(|f| (f.path.display().to_string(), f.rows)),
        )
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// Serialize `records` under `header`. The header is written even when there
/// are no records.
fn write_csv<I>(header: &[&str], records: I) -> String
where
    I: IntoIterator,
    I::Item: Serialize,
{
    let to_bytes = || -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(header)?;
        for record in records {
            writer.serialize(record)?;
        }
        Ok(writer.into_inner().map_err(|e| e.error().to_string())?)
    };

    match to_bytes().map(String::from_utf8) {
        Ok(Ok(text)) => text,
        _ => format!("{}\n", header.join(",")),
    }
}
