//! Benchmark runner.
//!
//! Drives the sampler over each query against one loaded backend and turns
//! the measurements into result rows.

use crate::backends::{probe, Backend};
use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::query::{QueryId, QueryParams, QueryRows};
use crate::report::{Measurement, ResultRow};
use crate::sampler::{measure, MeasureError};

/// Measure every query in `queries` against an already loaded `backend`.
///
/// Stops at the first failing query.
pub fn run_suite(
    backend: &mut dyn Backend,
    config: &AdapterConfig,
    queries: &[QueryId],
    warm_runs: usize,
) -> Result<Vec<ResultRow>> {
    let params = config.query_params();
    let database = backend.kind().display_name();
    let mut rows = Vec::with_capacity(queries.len());

    for &query in queries {
        let measurement = measure_query(backend, query, &params, warm_runs)?;

        for (iteration, elapsed_ms) in measurement.result.samples().iter().enumerate() {
            tracing::debug!(%query, iteration = iteration + 1, elapsed_ms, "iteration complete");
        }
        tracing::info!(
            backend = database,
            size = %config.dataset_size,
            %query,
            first_ms = measurement.result.cold_ms(),
            avg_ms = measurement.result.warm_mean_ms(),
            ci95_ms = measurement.result.warm_ci95_ms(),
            "query measured"
        );

        rows.push(ResultRow::new(database, config.dataset_size, &measurement));
    }
    Ok(rows)
}

/// Measure a single query, mapping probe failures to [`Error::Probe`].
pub fn measure_query(
    backend: &mut dyn Backend,
    query: QueryId,
    params: &QueryParams,
    warm_runs: usize,
) -> Result<Measurement> {
    let result = measure(probe(backend, query, params), warm_runs).map_err(|e| match e {
        MeasureError::Config(e) => Error::Sampler(e),
        MeasureError::Probe(source) => Error::Probe {
            query,
            source: Box::new(source),
        },
    })?;
    Ok(Measurement { query, result })
}

/// Borrower names matching the query 1 pattern.
pub fn matching_names(backend: &mut dyn Backend, params: &QueryParams) -> Result<Vec<String>> {
    match backend.run_query(QueryId::NamePrefix, params)? {
        QueryRows::Names(names) => Ok(names),
        other => Err(Error::InvalidData(format!(
            "{} returned {} rows of the wrong kind",
            QueryId::NamePrefix,
            other.len()
        ))),
    }
}
