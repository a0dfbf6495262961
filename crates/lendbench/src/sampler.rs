//! Cold/warm latency sampling.
//!
//! A probe is run once as a cold run, then `warm_runs` more times. The cold
//! time is reported on its own; the warm samples feed the mean and a 95%
//! confidence half-width. Every invocation happens sequentially on the
//! calling thread.

use std::hint::black_box;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

/// Number of warm runs used by every benchmark suite.
pub const DEFAULT_WARM_RUNS: usize = 30;

/// Two-sided z-value for a 95% confidence level under the normal approximation.
pub const Z_95: f64 = 1.96;

/// Rejected sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The sample standard deviation needs at least two warm samples.
    #[error("warm_runs must be at least 2 (got {0})")]
    TooFewWarmRuns(usize),
}

/// Failure of a single measurement.
#[derive(Debug, Error)]
pub enum MeasureError<E> {
    /// Raised before the probe is ever invoked.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The probe failed; the measurement was abandoned.
    #[error("probe failed: {0}")]
    Probe(E),
}

impl<E> MeasureError<E> {
    /// The probe's own error, if the probe is what failed.
    pub fn into_probe_error(self) -> Option<E> {
        match self {
            MeasureError::Probe(err) => Some(err),
            MeasureError::Config(_) => None,
        }
    }
}

/// Outcome of measuring one probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementResult {
    cold_ms: f64,
    warm_mean_ms: f64,
    warm_ci95_ms: f64,
    samples: Vec<f64>,
}

impl MeasurementResult {
    /// Duration of the first invocation.
    pub fn cold_ms(&self) -> f64 {
        self.cold_ms
    }

    /// Arithmetic mean of the warm samples.
    pub fn warm_mean_ms(&self) -> f64 {
        self.warm_mean_ms
    }

    /// Half-width of the 95% confidence interval around [`warm_mean_ms`].
    ///
    /// Computed as `1.96 * stdev / sqrt(n)`, which assumes warm timings are
    /// roughly normal. Treat it as a coarse bound, not a rigorous guarantee.
    ///
    /// [`warm_mean_ms`]: MeasurementResult::warm_mean_ms
    pub fn warm_ci95_ms(&self) -> f64 {
        self.warm_ci95_ms
    }

    /// Warm samples in invocation order.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of warm runs behind the statistics.
    pub fn warm_runs(&self) -> usize {
        self.samples.len()
    }
}

/// Sampler with a fixed warm-run count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    warm_runs: usize,
}

impl Sampler {
    /// Create a sampler, rejecting counts that leave the CI undefined.
    pub fn new(warm_runs: usize) -> Result<Self, ConfigError> {
        check_warm_runs(warm_runs)?;
        Ok(Self { warm_runs })
    }

    /// Configured number of warm runs.
    pub fn warm_runs(&self) -> usize {
        self.warm_runs
    }

    /// Measure `probe` with this sampler's warm-run count.
    pub fn measure<F, T, E>(&self, probe: F) -> Result<MeasurementResult, MeasureError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        measure(probe, self.warm_runs)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            warm_runs: DEFAULT_WARM_RUNS,
        }
    }
}

/// Run `probe` once cold and `warm_runs` times warm.
///
/// The first probe error aborts the measurement and is returned as
/// [`MeasureError::Probe`]; samples gathered so far are dropped.
pub fn measure<F, T, E>(probe: F, warm_runs: usize) -> Result<MeasurementResult, MeasureError<E>>
where
    F: FnMut() -> Result<T, E>,
{
    measure_with(probe, warm_runs, time_once::<F, T, E>)
}

/// [`measure`] with the clock supplied by `time`, which invokes the probe
/// once and returns the elapsed milliseconds.
fn measure_with<F, E, C>(
    mut probe: F,
    warm_runs: usize,
    mut time: C,
) -> Result<MeasurementResult, MeasureError<E>>
where
    C: FnMut(&mut F) -> Result<f64, E>,
{
    check_warm_runs(warm_runs)?;

    let cold_ms = time(&mut probe).map_err(MeasureError::Probe)?;

    let mut samples = Vec::with_capacity(warm_runs);
    for _ in 0..warm_runs {
        samples.push(time(&mut probe).map_err(MeasureError::Probe)?);
    }

    let warm_mean_ms = mean(&samples);
    let stdev = sample_stdev(&samples).ok_or(ConfigError::TooFewWarmRuns(samples.len()))?;

    Ok(MeasurementResult {
        cold_ms,
        warm_mean_ms,
        warm_ci95_ms: ci95_half_width(stdev, samples.len()),
        samples,
    })
}

fn check_warm_runs(warm_runs: usize) -> Result<(), ConfigError> {
    if warm_runs < 2 {
        return Err(ConfigError::TooFewWarmRuns(warm_runs));
    }
    Ok(())
}

fn time_once<F, T, E>(probe: &mut F) -> Result<f64, E>
where
    F: FnMut() -> Result<T, E>,
{
    let start = Instant::now();
    let output = probe()?;
    let elapsed = start.elapsed();
    black_box(output);
    Ok(elapsed.as_secs_f64() * 1000.0)
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Bessel-corrected standard deviation. `None` below two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// `1.96 * stdev / sqrt(n)`.
pub fn ci95_half_width(stdev: f64, n: usize) -> f64 {
    Z_95 * stdev / (n as f64).sqrt()
}
