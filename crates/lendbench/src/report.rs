//! Results table, CSV persistence and the cold-time chart.

use std::fs::OpenOptions;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::dataset::DatasetSize;
use crate::error::Result;
use crate::query::QueryId;
use crate::sampler::MeasurementResult;

/// Width of the longest bar in [`first_time_chart`].
const CHART_WIDTH: usize = 40;

/// One row of the results table.
///
/// Field names are the CSV column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub database: String,
    pub query_number: u8,
    pub dataset_size: String,
    pub first_time: f64,
    pub avg_time: f64,
    pub ci95: f64,
}

impl ResultRow {
    pub fn new(database: &str, size: DatasetSize, measurement: &Measurement) -> Self {
        Self {
            database: database.to_string(),
            query_number: measurement.query.number(),
            dataset_size: size.label().to_string(),
            first_time: measurement.result.cold_ms(),
            avg_time: measurement.result.warm_mean_ms(),
            ci95: measurement.result.warm_ci95_ms(),
        }
    }

    /// Three-line human summary of the row's timings.
    pub fn summary(&self) -> String {
        format!(
            "First Execution Time: {:.3} ms\n\
             Average Execution Time: {:.3} ms\n\
             95% Confidence Interval: ±{:.3} ms",
            self.first_time, self.avg_time, self.ci95
        )
    }
}

/// A measured query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub query: QueryId,
    pub result: MeasurementResult,
}

/// Append `rows` to the results file, writing the header only when the file
/// is new or empty.
pub fn append_csv(path: &Path, rows: &[ResultRow]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let write_header = file.metadata()?.len() == 0;

    let mut writer = WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "results appended");
    Ok(())
}

/// Read every row of a results file.
pub fn read_csv(path: &Path) -> Result<Vec<ResultRow>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ResultRow>, csv::Error>>()?;
    Ok(rows)
}

/// Text bar chart of cold times for `database`, grouped by dataset size.
///
/// Sizes appear in ascending order with one bar per query; bars are scaled
/// to the slowest cold run. Returns an empty string when `database` has no
/// rows.
pub fn first_time_chart(rows: &[ResultRow], database: &str) -> String {
    let selected: Vec<&ResultRow> = rows.iter().filter(|r| r.database == database).collect();
    if selected.is_empty() {
        return String::new();
    }

    let max = selected
        .iter()
        .map(|r| r.first_time)
        .fold(0.0_f64, f64::max);

    let mut out = format!("{} first execution time (ms)\n", database);
    for size in DatasetSize::ALL {
        let mut group: Vec<&&ResultRow> = selected
            .iter()
            .filter(|r| r.dataset_size == size.label())
            .collect();
        if group.is_empty() {
            continue;
        }
        group.sort_by_key(|r| r.query_number);

        out.push_str(&format!("{}\n", size.label()));
        for row in group {
            let width = if max > 0.0 {
                ((row.first_time / max) * CHART_WIDTH as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "  Query{} |{:<w$}| {:.3}\n",
                row.query_number,
                "#".repeat(width),
                row.first_time,
                w = CHART_WIDTH
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::measure;
    use std::convert::Infallible;
    use tempfile::tempdir;

    fn row(database: &str, query: u8, size: &str, first: f64) -> ResultRow {
        ResultRow {
            database: database.to_string(),
            query_number: query,
            dataset_size: size.to_string(),
            first_time: first,
            avg_time: first / 2.0,
            ci95: 0.1,
        }
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");

        append_csv(&path, &[row("MySQL", 1, "250k", 4.0)]).unwrap();
        append_csv(&path, &[row("Redis", 2, "500k", 8.0)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("database,query_number,dataset_size,first_time,avg_time,ci95")
        );
        assert_eq!(text.matches("database").count(), 1);

        let rows = read_csv(&path).unwrap();
        assert_eq!(rows, vec![row("MySQL", 1, "250k", 4.0), row("Redis", 2, "500k", 8.0)]);
    }

    #[test]
    fn test_row_from_measurement() {
        let result = measure(|| Ok::<_, Infallible>(()), 3).unwrap();
        let m = Measurement {
            query: QueryId::ActiveBorrowerHistory,
            result,
        };
        let r = ResultRow::new("Neo4j", DatasetSize::K1000, &m);
        assert_eq!(r.query_number, 4);
        assert_eq!(r.dataset_size, "1000k");
        assert_eq!(r.first_time, m.result.cold_ms());

        let summary = r.summary();
        assert!(summary.starts_with("First Execution Time: "));
        assert!(summary.contains("95% Confidence Interval: ±"));
        assert_eq!(summary.lines().count(), 3);
    }

    #[test]
    fn test_chart_orders_sizes_and_scales_bars() {
        let rows = vec![
            row("MongoDB", 2, "1000k", 10.0),
            row("MongoDB", 1, "1000k", 20.0),
            row("MongoDB", 1, "250k", 5.0),
            row("MySQL", 1, "250k", 99.0),
        ];
        let chart = first_time_chart(&rows, "MongoDB");

        let small = chart.find("250k").unwrap();
        let large = chart.find("1000k").unwrap();
        assert!(small < large);
        assert!(!chart.contains("99.000"));

        let bars: Vec<usize> = chart
            .lines()
            .filter(|l| l.trim_start().starts_with("Query"))
            .map(|l| l.matches('#').count())
            .collect();
        assert_eq!(bars, vec![10, 40, 20]);
    }

    #[test]
    fn test_chart_unknown_database() {
        assert!(first_time_chart(&[row("MySQL", 1, "250k", 1.0)], "Redis").is_empty());
    }
}
