//! The normalized experiment envelope returned to callers.
//!
//! The JSON shape is fixed: an `experiment_info` object, optional
//! `experiment_summary` and `auxiliary_table` tables, and the raw
//! `experiment_data` table. Tabular sections use split-array orientation
//! (`columns` / `index` / `data`) so existing consumers of the service can
//! ingest them unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A table in split-array orientation.
///
/// `data` is row-major; every row has exactly `columns.len()` cells and
/// `index` carries one label per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularData {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Ordered row labels.
    pub index: Vec<i64>,
    /// Row-major data matrix.
    pub data: Vec<Vec<Value>>,
}

impl TabularData {
    /// Build a table with a 0-based range index.
    pub fn from_rows(columns: Vec<String>, data: Vec<Vec<Value>>) -> Self {
        let index = (0..data.len() as i64).collect();
        Self {
            columns,
            index,
            data,
        }
    }

    /// Build a table with an explicit row index.
    ///
    /// Used by the cycler summary, whose rows are labeled by cycle number
    /// rather than by ordinal position.
    pub fn with_index(columns: Vec<String>, index: Vec<i64>, data: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            index,
            data,
        }
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.data.len()
    }

    /// True if the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check the split-orientation shape invariants: one index label per
    /// row, one cell per column in every row.
    pub fn is_well_formed(&self) -> bool {
        self.index.len() == self.data.len()
            && self.data.iter().all(|row| row.len() == self.columns.len())
    }
}

/// The normalized output of a conversion.
///
/// Constructed fresh per request by the converter that handled the file;
/// never persisted by the core itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentEnvelope {
    /// Free-form experiment metadata.
    pub experiment_info: serde_json::Map<String, Value>,
    /// Per-cycle summary, when the format provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_summary: Option<TabularData>,
    /// Auxiliary channel readings (e.g. temperature), when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary_table: Option<TabularData>,
    /// Raw per-sample readings.
    pub experiment_data: TabularData,
}

impl ExperimentEnvelope {
    /// Create an envelope holding only metadata and raw data.
    pub fn new(
        experiment_info: serde_json::Map<String, Value>,
        experiment_data: TabularData,
    ) -> Self {
        Self {
            experiment_info,
            experiment_summary: None,
            auxiliary_table: None,
            experiment_data,
        }
    }

    /// Attach a per-cycle summary table.
    pub fn with_summary(mut self, summary: TabularData) -> Self {
        self.experiment_summary = Some(summary);
        self
    }

    /// Attach an auxiliary channel table.
    pub fn with_auxiliary(mut self, auxiliary: TabularData) -> Self {
        self.auxiliary_table = Some(auxiliary);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_table() -> TabularData {
        TabularData::from_rows(
            vec!["2theta".to_string(), "intensity".to_string()],
            vec![
                vec![json!(10.0), json!(0.5)],
                vec![json!(10.5), json!(1.0)],
            ],
        )
    }

    #[test]
    fn test_range_index() {
        let table = sample_table();
        assert_eq!(table.index, vec![0, 1]);
        assert!(table.is_well_formed());
    }

    #[test]
    fn test_split_orientation_shape() {
        let table = sample_table();
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(
            value,
            json!({
                "columns": ["2theta", "intensity"],
                "index": [0, 1],
                "data": [[10.0, 0.5], [10.5, 1.0]],
            })
        );
    }

    #[test]
    fn test_optional_sections_omitted() {
        let envelope = ExperimentEnvelope::new(serde_json::Map::new(), sample_table());
        let value = serde_json::to_value(&envelope).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["experiment_data", "experiment_info"]);
    }

    #[test]
    fn test_optional_sections_present() {
        let envelope = ExperimentEnvelope::new(serde_json::Map::new(), sample_table())
            .with_summary(sample_table())
            .with_auxiliary(sample_table());
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("experiment_summary").is_some());
        assert!(value.get("auxiliary_table").is_some());
    }

    #[test]
    fn test_ragged_rows_not_well_formed() {
        let table = TabularData::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![json!(1)], vec![json!(1), json!(2)]],
        );
        assert!(!table.is_well_formed());
    }
}
