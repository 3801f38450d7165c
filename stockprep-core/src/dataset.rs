//! CuratedDataset: cleaned points joined with their derived features.

use crate::domain::{DatasetHash, PricePoint};
use crate::features::{FeatureFrame, FeatureSet};

#[derive(Debug, Clone)]
pub struct CuratedDataset {
    pub symbol: String,
    pub points: Vec<PricePoint>,
    pub features: FeatureFrame,
}

impl CuratedDataset {
    /// Derive `set` over `points`.
    pub fn build(symbol: impl Into<String>, points: Vec<PricePoint>, set: &FeatureSet) -> Self {
        let features = set.compute(&points);
        Self {
            symbol: symbol.into(),
            points,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Rows where every feature is defined; warmup rows are dropped.
    pub fn clean(&self) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.features.is_row_complete(i))
            .collect();
        Self {
            symbol: self.symbol.clone(),
            points: keep.iter().map(|&i| self.points[i]).collect(),
            features: self.features.select_rows(&keep),
        }
    }

    pub fn hash(&self) -> DatasetHash {
        DatasetHash::of_points(&self.symbol, &self.points)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}
