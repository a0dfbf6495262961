//! Library-lending dataset: records, sizes and CSV files.
//!
//! Every backend is loaded from the same three CSV files (books, borrowers,
//! transactions). The benchmark runs against four subsets of the generated
//! data, labelled by the record count they represent.

pub mod generator;
pub mod subsets;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Genres assigned to generated books.
pub const GENRES: [&str; 5] = ["Fiction", "Non-Fiction", "Science", "History", "Biography"];

/// Base file names (without subset suffix).
pub const BOOKS_FILE: &str = "books";
pub const BORROWERS_FILE: &str = "borrowers";
pub const TRANSACTIONS_FILE: &str = "transactions";

/// A book in the library catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub genre: String,
}

/// A library member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    pub borrower_id: i64,
    pub name: String,
    pub email: String,
}

/// One lending of one book. Dates are ISO `YYYY-MM-DD` strings, so they
/// compare correctly as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: i64,
    pub book_id: i64,
    pub borrower_id: i64,
    pub borrow_date: String,
    pub return_date: String,
}

/// Dataset size label selecting one of the subset files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetSize {
    /// 25% subset.
    #[serde(rename = "250k")]
    K250,
    /// 50% subset.
    #[serde(rename = "500k")]
    K500,
    /// 75% subset.
    #[serde(rename = "750k")]
    K750,
    /// Full dataset.
    #[serde(rename = "1000k")]
    K1000,
}

impl DatasetSize {
    /// All sizes, smallest first.
    pub const ALL: [DatasetSize; 4] = [
        DatasetSize::K250,
        DatasetSize::K500,
        DatasetSize::K750,
        DatasetSize::K1000,
    ];

    /// Label used in results tables.
    pub fn label(&self) -> &'static str {
        match self {
            DatasetSize::K250 => "250k",
            DatasetSize::K500 => "500k",
            DatasetSize::K750 => "750k",
            DatasetSize::K1000 => "1000k",
        }
    }

    /// Suffix of the CSV subset files.
    pub fn suffix(&self) -> &'static str {
        match self {
            DatasetSize::K250 => "25",
            DatasetSize::K500 => "50",
            DatasetSize::K750 => "75",
            DatasetSize::K1000 => "100",
        }
    }

    /// Fraction of the full dataset kept in this subset.
    pub fn fraction(&self) -> f64 {
        match self {
            DatasetSize::K250 => 0.25,
            DatasetSize::K500 => 0.50,
            DatasetSize::K750 => 0.75,
            DatasetSize::K1000 => 1.0,
        }
    }
}

impl Default for DatasetSize {
    fn default() -> Self {
        DatasetSize::K250
    }
}

impl fmt::Display for DatasetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DatasetSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DatasetSize::ALL
            .into_iter()
            .find(|size| size.label().eq_ignore_ascii_case(s) || size.suffix() == s)
            .ok_or_else(|| {
                Error::Config(format!(
                    "unknown dataset size '{}' (expected 250k, 500k, 750k or 1000k)",
                    s
                ))
            })
    }
}

/// Paths of the three CSV files making up one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFiles {
    pub books: PathBuf,
    pub borrowers: PathBuf,
    pub transactions: PathBuf,
}

impl DatasetFiles {
    /// Unsuffixed files as written by the generator (`books.csv`, ...).
    pub fn base(dir: &Path) -> Self {
        Self {
            books: dir.join(format!("{}.csv", BOOKS_FILE)),
            borrowers: dir.join(format!("{}.csv", BORROWERS_FILE)),
            transactions: dir.join(format!("{}.csv", TRANSACTIONS_FILE)),
        }
    }

    /// Subset files for `size` (`books_25.csv`, ...).
    pub fn for_size(dir: &Path, size: DatasetSize) -> Self {
        Self::with_suffix(dir, size.suffix())
    }

    fn with_suffix(dir: &Path, suffix: &str) -> Self {
        Self {
            books: dir.join(format!("{}_{}.csv", BOOKS_FILE, suffix)),
            borrowers: dir.join(format!("{}_{}.csv", BORROWERS_FILE, suffix)),
            transactions: dir.join(format!("{}_{}.csv", TRANSACTIONS_FILE, suffix)),
        }
    }
}

/// An in-memory copy of the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub books: Vec<Book>,
    pub borrowers: Vec<Borrower>,
    pub transactions: Vec<Transaction>,
}

impl Dataset {
    /// Read the subset files for `size` from `dir`.
    pub fn load(dir: &Path, size: DatasetSize) -> Result<Self> {
        Self::read(&DatasetFiles::for_size(dir, size))
    }

    /// Read the three files named by `files`.
    pub fn read(files: &DatasetFiles) -> Result<Self> {
        Ok(Self {
            books: read_records(&files.books)?,
            borrowers: read_records(&files.borrowers)?,
            transactions: read_records(&files.transactions)?,
        })
    }

    /// Write the three files named by `files`, with headers.
    pub fn write(&self, files: &DatasetFiles) -> Result<()> {
        write_records(&files.books, &self.books)?;
        write_records(&files.borrowers, &self.borrowers)?;
        write_records(&files.transactions, &self.transactions)?;
        Ok(())
    }

    /// Total number of records across the three tables.
    pub fn len(&self) -> usize {
        self.books.len() + self.borrowers.len() + self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        Error::InvalidData(format!("cannot open {}: {}", path.display(), e))
    })?;
    let records = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(records)
}

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_labels() {
        assert_eq!(DatasetSize::K250.suffix(), "25");
        assert_eq!(DatasetSize::K1000.label(), "1000k");
        assert_eq!("750k".parse::<DatasetSize>().unwrap(), DatasetSize::K750);
        assert_eq!("50".parse::<DatasetSize>().unwrap(), DatasetSize::K500);
        assert!("300k".parse::<DatasetSize>().is_err());
    }

    #[test]
    fn test_file_names() {
        let files = DatasetFiles::for_size(Path::new("/data"), DatasetSize::K500);
        assert_eq!(files.books, PathBuf::from("/data/books_50.csv"));
        assert_eq!(files.transactions, PathBuf::from("/data/transactions_50.csv"));

        let base = DatasetFiles::base(Path::new("/data"));
        assert_eq!(base.borrowers, PathBuf::from("/data/borrowers.csv"));
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset {
            books: vec![Book {
                book_id: 1,
                title: "Quiet rivers run deep.".to_string(),
                author: "Ada Stone".to_string(),
                year: 1999,
                genre: "Fiction".to_string(),
            }],
            borrowers: vec![Borrower {
                borrower_id: 1,
                name: "Jane Doe".to_string(),
                email: "jane.doe1@example.com".to_string(),
            }],
            transactions: vec![Transaction {
                transaction_id: 1,
                book_id: 1,
                borrower_id: 1,
                borrow_date: "2023-02-01".to_string(),
                return_date: "2023-02-14".to_string(),
            }],
        };

        dataset
            .write(&DatasetFiles::for_size(dir.path(), DatasetSize::K250))
            .unwrap();
        let loaded = Dataset::load(dir.path(), DatasetSize::K250).unwrap();

        assert_eq!(loaded, dataset);
        assert_eq!(loaded.len(), 3);

        let header = std::fs::read_to_string(dir.path().join("transactions_25.csv")).unwrap();
        assert!(header.starts_with("transaction_id,book_id,borrower_id,borrow_date,return_date"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::load(dir.path(), DatasetSize::K1000).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }
}
