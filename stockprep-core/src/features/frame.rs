//! Named feature columns aligned with a point series.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    rows: usize,
    columns: Vec<(String, Vec<f64>)>,
    index: HashMap<String, usize>,
}

impl FeatureFrame {
    /// Build from ordered columns. Every column must have `rows` values.
    pub(crate) fn from_columns(rows: usize, columns: Vec<(String, Vec<f64>)>) -> Self {
        debug_assert!(columns.iter().all(|(_, v)| v.len() == rows));
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self {
            rows,
            columns,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&i| self.columns[i].1.as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn get(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name).and_then(|c| c.get(row).copied())
    }

    /// All feature values of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|(_, v)| v[row]).collect()
    }

    /// True when every feature is defined (finite) at `row`.
    pub fn is_row_complete(&self, row: usize) -> bool {
        self.columns.iter().all(|(_, v)| v[row].is_finite())
    }

    pub fn first_complete_row(&self) -> Option<usize> {
        (0..self.rows).find(|&r| self.is_row_complete(r))
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|(n, v)| (n.clone(), rows.iter().map(|&r| v[r]).collect()))
            .collect();
        Self::from_columns(rows.len(), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FeatureFrame {
        FeatureFrame::from_columns(
            3,
            vec![
                ("A".into(), vec![f64::NAN, 1.0, 2.0]),
                ("B".into(), vec![f64::NAN, f64::NAN, 5.0]),
            ],
        )
    }

    #[test]
    fn lookup_by_name() {
        let f = frame();
        assert_eq!(f.names(), ["A", "B"]);
        assert_eq!(f.get("A", 1), Some(1.0));
        assert_eq!(f.get("C", 1), None);
        assert_eq!(f.get("A", 9), None);
    }

    #[test]
    fn completeness() {
        let f = frame();
        assert!(!f.is_row_complete(1));
        assert!(f.is_row_complete(2));
        assert_eq!(f.first_complete_row(), Some(2));
    }

    #[test]
    fn select_rows_keeps_columns() {
        let f = frame().select_rows(&[2]);
        assert_eq!(f.len(), 1);
        assert_eq!(f.row(0), vec![2.0, 5.0]);
    }
}
