//! Normalized in-memory form of decoded cycler data.
//!
//! Every cycler driver emits the same normalized column names so the
//! summary builder and the unit scaling work identically across vendors.

use serde_json::{Map, Value};

use labhub_core::types::TabularData;

/// Normalized raw column names shared by all cycler drivers.
pub const DATA_POINT: &str = "data_point";
pub const TEST_TIME: &str = "test_time";
pub const DATE_TIME: &str = "date_time";
pub const STEP_TIME: &str = "step_time";
pub const STEP_INDEX: &str = "step_index";
pub const CYCLE_INDEX: &str = "cycle_index";
pub const CURRENT: &str = "current";
pub const VOLTAGE: &str = "voltage";
pub const CHARGE_CAPACITY: &str = "charge_capacity";
pub const DISCHARGE_CAPACITY: &str = "discharge_capacity";
pub const CHARGE_ENERGY: &str = "charge_energy";
pub const DISCHARGE_ENERGY: &str = "discharge_energy";
pub const INTERNAL_RESISTANCE: &str = "internal_resistance";
pub const TEMPERATURE: &str = "temperature";

/// A named-column table of JSON cells (numbers, or null for values the
/// decoder could not represent, e.g. an unparseable timestamp).
#[derive(Debug, Clone, Default)]
pub struct NumericTable {
    /// Column names in output order.
    pub columns: Vec<String>,
    /// Row-major cells.
    pub rows: Vec<Vec<Value>>,
}

impl NumericTable {
    /// Create a table with the given columns and no rows.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Numeric cell value, if the column exists and the cell is a number.
    pub fn number(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.column_index(name)?;
        self.rows.get(row)?.get(col)?.as_f64()
    }

    /// Multiply every numeric cell of a column by `factor`. Returns false
    /// if the column does not exist (callers scale optional columns
    /// unconditionally).
    pub fn scale_column(&mut self, name: &str, factor: f64) -> bool {
        let Some(col) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            if let Some(value) = row[col].as_f64() {
                row[col] = crate::context::json_num(value * factor);
            }
        }
        true
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Convert into the envelope's split-array form with a range index.
    pub fn into_tabular(self) -> TabularData {
        TabularData::from_rows(self.columns, self.rows)
    }
}

/// Decoded cycler data: experiment metadata, the normalized raw table, and
/// the auxiliary channel table when the export carries one.
#[derive(Debug, Clone)]
pub struct CyclerData {
    /// Experiment metadata extracted by the driver.
    pub info: Map<String, Value>,
    /// Normalized per-sample readings.
    pub raw: NumericTable,
    /// Auxiliary channels (e.g. temperature), same row count as `raw`.
    pub aux: Option<NumericTable>,
}
