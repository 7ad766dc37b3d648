//! Per-cycle summary derived from the normalized raw table.

use std::collections::BTreeMap;

use anyhow::Context;
use serde_json::Value;

use labhub_core::types::TabularData;

use crate::cellpy::raw::{self, NumericTable};
use crate::context::json_num;

/// Summary table columns, in output order.
const SUMMARY_COLUMNS: &[&str] = &[
    raw::CYCLE_INDEX,
    raw::DATA_POINT,
    raw::TEST_TIME,
    "end_voltage_charge",
    "end_voltage_discharge",
    raw::CHARGE_CAPACITY,
    raw::DISCHARGE_CAPACITY,
    "coulombic_efficiency",
];

/// A built summary, indexed by cycle number.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// Summary rows, one per cycle.
    pub table: NumericTable,
    /// Cycle numbers, used as the envelope row index.
    pub index: Vec<i64>,
}

impl CycleSummary {
    /// Convert into the envelope's split-array form, indexed by cycle.
    pub fn into_tabular(self) -> TabularData {
        TabularData::with_index(self.table.columns, self.index, self.table.rows)
    }
}

/// Running aggregate for one cycle.
#[derive(Debug, Default, Clone)]
struct CycleAgg {
    last_data_point: f64,
    last_test_time: f64,
    end_voltage_charge: Option<f64>,
    end_voltage_discharge: Option<f64>,
    charge_capacity: f64,
    discharge_capacity: f64,
}

/// Build the per-cycle summary.
///
/// Capacities are the cycle maxima of the cumulative capacity channels;
/// end voltages are the voltage at the last charging/discharging sample
/// of the cycle (current sign decides direction, rest samples contribute
/// nothing).
pub fn build(table: &NumericTable) -> anyhow::Result<CycleSummary> {
    table
        .column_index(raw::CYCLE_INDEX)
        .context("raw table has no cycle index")?;

    let mut cycles: BTreeMap<i64, CycleAgg> = BTreeMap::new();

    for row in 0..table.num_rows() {
        let cycle = table
            .number(row, raw::CYCLE_INDEX)
            .with_context(|| format!("missing cycle index in row {row}"))?
            as i64;
        let agg = cycles.entry(cycle).or_default();

        if let Some(point) = table.number(row, raw::DATA_POINT) {
            agg.last_data_point = agg.last_data_point.max(point);
        }
        if let Some(time) = table.number(row, raw::TEST_TIME) {
            agg.last_test_time = agg.last_test_time.max(time);
        }
        if let Some(cap) = table.number(row, raw::CHARGE_CAPACITY) {
            agg.charge_capacity = agg.charge_capacity.max(cap);
        }
        if let Some(cap) = table.number(row, raw::DISCHARGE_CAPACITY) {
            agg.discharge_capacity = agg.discharge_capacity.max(cap);
        }
        if let (Some(current), Some(voltage)) = (
            table.number(row, raw::CURRENT),
            table.number(row, raw::VOLTAGE),
        ) {
            if current > 0.0 {
                agg.end_voltage_charge = Some(voltage);
            } else if current < 0.0 {
                agg.end_voltage_discharge = Some(voltage);
            }
        }
    }

    let mut summary = NumericTable::new(SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect());
    let mut index = Vec::with_capacity(cycles.len());

    for (cycle, agg) in cycles {
        let efficiency = if agg.charge_capacity > 0.0 {
            json_num(100.0 * agg.discharge_capacity / agg.charge_capacity)
        } else {
            Value::Null
        };
        summary.rows.push(vec![
            json_num(cycle as f64),
            json_num(agg.last_data_point),
            json_num(agg.last_test_time),
            agg.end_voltage_charge.map(json_num).unwrap_or(Value::Null),
            agg.end_voltage_discharge.map(json_num).unwrap_or(Value::Null),
            json_num(agg.charge_capacity),
            json_num(agg.discharge_capacity),
            efficiency,
        ]);
        index.push(cycle);
    }

    Ok(CycleSummary {
        table: summary,
        index,
    })
}
