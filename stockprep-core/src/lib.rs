//! stockprep core: domain types, ingestion, cleaning and feature derivation.
//!
//! - Domain types (`PricePoint`, `RawPoint`, `DateWindow`)
//! - Data providers (Yahoo Finance, CSV import, synthetic) and the Parquet cache
//! - Cleaning stage producing a validated, strictly increasing series
//! - Feature trait and the standard set (SMA, EMA, RSI, MACD, returns)

pub mod clean;
pub mod data;
pub mod dataset;
pub mod domain;
pub mod features;

pub use clean::{CleanError, CleanOptions, Cleaned, Cleaner, CleaningReport, FillPolicy};
pub use dataset::CuratedDataset;
pub use domain::{DatasetHash, DateWindow, PricePoint, RawPoint};
pub use features::{Feature, FeatureError, FeatureFrame, FeatureParams, FeatureSet};
