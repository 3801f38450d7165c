//! Ingestion: providers, CSV import, synthetic data and the Parquet cache.

pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod download;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use cache::{CacheMeta, CacheStatus, CoverageResult, ParquetCache};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::{read_points, CsvProvider};
pub use download::{download_symbols, DownloadSummary};
pub use provider::{
    DataError, DataProvider, DataSource, DownloadProgress, FetchResult, StdoutProgress,
};
pub use synthetic::{synthetic_points, SyntheticProvider};
pub use yahoo::YahooProvider;
