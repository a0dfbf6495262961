//! Sized subsets of the generated CSV files.
//!
//! Each base file is sampled independently with the same fixed seed, so
//! equally long files keep the same row positions.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use super::{DatasetSize, BOOKS_FILE, BORROWERS_FILE, TRANSACTIONS_FILE};
use crate::error::{Error, Result};

/// Seed shared by every subset draw.
pub const SUBSET_SEED: u64 = 42;

/// One written subset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetFile {
    pub path: PathBuf,
    pub rows: usize,
}

/// Write `_25`, `_50`, `_75` and `_100` variants of the three base files in `dir`.
pub fn create_subsets(dir: &Path) -> Result<Vec<SubsetFile>> {
    let mut written = Vec::new();

    for base in [BOOKS_FILE, BORROWERS_FILE, TRANSACTIONS_FILE] {
        let source = dir.join(format!("{}.csv", base));
        let (headers, records) = read_all(&source)?;

        for size in DatasetSize::ALL {
            let rows = sample_rows(&records, size.fraction());
            let path = dir.join(format!("{}_{}.csv", base, size.suffix()));

            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(&headers)?;
            for record in &rows {
                writer.write_record(*record)?;
            }
            writer.flush()?;

            tracing::debug!(file = %path.display(), rows = rows.len(), "subset written");
            written.push(SubsetFile {
                path,
                rows: rows.len(),
            });
        }
    }

    Ok(written)
}

fn read_all(path: &Path) -> Result<(csv::StringRecord, Vec<csv::StringRecord>)> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        Error::InvalidData(format!("cannot open {}: {}", path.display(), e))
    })?;
    let headers = reader.headers()?.clone();
    let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((headers, records))
}

/// Uniform sample without replacement of `round(len * fraction)` rows.
fn sample_rows(records: &[csv::StringRecord], fraction: f64) -> Vec<&csv::StringRecord> {
    if fraction >= 1.0 {
        return records.iter().collect();
    }

    let amount = (records.len() as f64 * fraction).round() as usize;
    let mut rng = StdRng::seed_from_u64(SUBSET_SEED);
    index::sample(&mut rng, records.len(), amount.min(records.len()))
        .into_iter()
        .map(|i| &records[i])
        .collect()
}
