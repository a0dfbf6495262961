//! Adapter configuration.

use std::path::PathBuf;

use crate::backends::BackendKind;
use crate::dataset::DatasetSize;
use crate::query::QueryParams;

/// Default directory holding the dataset CSV files.
pub const DEFAULT_DATA_DIR: &str = ".";

/// Settings for one backend adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Connection URL, address or path understood by the backend's driver.
    pub connection_target: String,

    /// Which subset of the dataset to load.
    pub dataset_size: DatasetSize,

    /// Borrower name prefix used by query 1.
    pub name_pattern: String,

    /// Directory containing the `*_<suffix>.csv` files.
    pub data_dir: PathBuf,
}

impl AdapterConfig {
    /// Create a configuration with the given connection target.
    pub fn new(connection_target: impl Into<String>) -> Self {
        Self {
            connection_target: connection_target.into(),
            dataset_size: DatasetSize::default(),
            name_pattern: String::new(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }

    /// Create a configuration pointing at the backend's usual local address.
    pub fn for_backend(kind: BackendKind) -> Self {
        Self::new(kind.default_target())
    }

    /// Set the dataset size.
    pub fn with_dataset_size(mut self, size: DatasetSize) -> Self {
        self.dataset_size = size;
        self
    }

    /// Set the query 1 name pattern.
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = pattern.into();
        self
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Query parameters derived from this configuration.
    pub fn query_params(&self) -> QueryParams {
        QueryParams::new(self.name_pattern.clone())
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::for_backend(BackendKind::Sqlite)
    }
}
