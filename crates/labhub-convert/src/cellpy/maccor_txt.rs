//! Maccor S4000 text-export decoder.
//!
//! Every site exports the same underlying channels but with its own header
//! names, preamble length, and timestamp format. A [`ColumnProfile`] per
//! format variant captures those differences; decoding is otherwise
//! identical: one reading per line, a state column marking
//! charge/discharge/rest, and a single capacity column that is split into
//! charge and discharge capacity by state.

use std::collections::HashMap;

use anyhow::{Context, ensure};
use chrono::NaiveDateTime;
use serde_json::{Map, Value, json};

use labhub_registry::FormatVariant;

use crate::cellpy::raw::{self, CyclerData, NumericTable};
use crate::context::json_num;

/// Vendor header layout for one export variant.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    /// Preamble lines before the header row.
    skip_lines: usize,
    cycle: &'static str,
    step: &'static str,
    test_time: &'static str,
    step_time: &'static str,
    current: &'static str,
    voltage: &'static str,
    capacity: &'static str,
    energy: Option<&'static str>,
    state: &'static str,
    /// Timestamp column and its chrono format string.
    datetime: Option<(&'static str, &'static str)>,
    temperature: Option<&'static str>,
}

/// The layout profile for a format variant.
pub fn profile_for(variant: FormatVariant) -> &'static ColumnProfile {
    match variant {
        FormatVariant::WmgSimba => &WMG_SIMBA,
        FormatVariant::S4000Wmg => &S4000_WMG,
        FormatVariant::S4000Ubham => &S4000_UBHAM,
        FormatVariant::S4000Kit => &S4000_KIT,
    }
}

/// Default profile for unsuffixed S4000 exports.
static WMG_SIMBA: ColumnProfile = ColumnProfile {
    skip_lines: 2,
    cycle: "Cyc#",
    step: "Step",
    test_time: "TestTime(s)",
    step_time: "StepTime(s)",
    current: "Amps",
    voltage: "Volts",
    capacity: "Cap.(Ah)",
    energy: Some("En.(Wh)"),
    state: "Md",
    datetime: Some(("DPt Time", "%m/%d/%Y %H:%M:%S")),
    temperature: Some("Temp 1"),
};

static S4000_WMG: ColumnProfile = ColumnProfile {
    skip_lines: 1,
    cycle: "Cycle",
    step: "Step",
    test_time: "Test Time (s)",
    step_time: "Step Time (s)",
    current: "Current (A)",
    voltage: "Voltage (V)",
    capacity: "Capacity (Ah)",
    energy: Some("Energy (Wh)"),
    state: "State",
    datetime: Some(("DPT Time", "%d/%m/%Y %H:%M:%S")),
    temperature: Some("Temp 1 (C)"),
};

static S4000_UBHAM: ColumnProfile = ColumnProfile {
    skip_lines: 0,
    cycle: "Cyc#",
    step: "Step",
    test_time: "TestTime",
    step_time: "StepTime",
    current: "Current",
    voltage: "Voltage",
    capacity: "Cap.",
    energy: None,
    state: "State",
    datetime: None,
    temperature: None,
};

static S4000_KIT: ColumnProfile = ColumnProfile {
    skip_lines: 0,
    cycle: "cycle",
    step: "step",
    test_time: "test_time_s",
    step_time: "step_time_s",
    current: "current_A",
    voltage: "voltage_V",
    capacity: "capacity_Ah",
    energy: Some("energy_Wh"),
    state: "state",
    datetime: Some(("timestamp", "%Y-%m-%d %H:%M:%S")),
    temperature: Some("temp_C"),
};

/// Decode a Maccor text export with the given variant profile.
pub fn decode(text: &str, variant: FormatVariant, separator: u8) -> anyhow::Result<CyclerData> {
    let profile = profile_for(variant);

    // Split off the preamble; the remainder starts at the header row.
    let mut preamble = Vec::with_capacity(profile.skip_lines);
    let mut rest = text;
    for _ in 0..profile.skip_lines {
        let (line, remainder) = rest
            .split_once('\n')
            .context("export shorter than its preamble")?;
        preamble.push(line.trim_end().to_string());
        rest = remainder;
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .flexible(true)
        .from_reader(rest.as_bytes());

    let headers = reader.headers().context("missing header row")?.clone();
    let position: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();

    let col = |name: &'static str| -> anyhow::Result<usize> {
        position
            .get(name)
            .copied()
            .with_context(|| format!("export is missing the '{name}' column"))
    };

    let cycle_col = col(profile.cycle)?;
    let step_col = col(profile.step)?;
    let test_time_col = col(profile.test_time)?;
    let step_time_col = col(profile.step_time)?;
    let current_col = col(profile.current)?;
    let voltage_col = col(profile.voltage)?;
    let capacity_col = col(profile.capacity)?;
    let state_col = col(profile.state)?;
    let energy_col = profile.energy.map(&col).transpose()?;
    let datetime_col = profile
        .datetime
        .map(|(name, format)| col(name).map(|idx| (idx, format)))
        .transpose()?;
    let temperature_col = profile.temperature.map(&col).transpose()?;

    let mut columns = vec![
        raw::DATA_POINT.to_string(),
        raw::TEST_TIME.to_string(),
    ];
    if datetime_col.is_some() {
        columns.push(raw::DATE_TIME.to_string());
    }
    columns.extend([
        raw::STEP_TIME.to_string(),
        raw::STEP_INDEX.to_string(),
        raw::CYCLE_INDEX.to_string(),
        raw::CURRENT.to_string(),
        raw::VOLTAGE.to_string(),
        raw::CHARGE_CAPACITY.to_string(),
        raw::DISCHARGE_CAPACITY.to_string(),
    ]);
    if energy_col.is_some() {
        columns.push(raw::CHARGE_ENERGY.to_string());
        columns.push(raw::DISCHARGE_ENERGY.to_string());
    }

    let mut table = NumericTable::new(columns);
    let mut aux = temperature_col.map(|_| {
        NumericTable::new(vec![raw::TEST_TIME.to_string(), raw::TEMPERATURE.to_string()])
    });

    for (line_no, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("bad record on data line {}", line_no + 1))?;
        let field = |idx: usize| -> anyhow::Result<&str> {
            record
                .get(idx)
                .map(str::trim)
                .with_context(|| format!("short record on data line {}", line_no + 1))
        };
        let num = |idx: usize| -> anyhow::Result<f64> {
            let text = field(idx)?;
            text.parse().with_context(|| {
                format!("non-numeric value '{text}' on data line {}", line_no + 1)
            })
        };

        let state = CyclerState::parse(field(state_col)?);
        let current = num(current_col)?;
        let capacity = num(capacity_col)?;

        // Maccor exports report magnitudes; the state column fixes the
        // sign convention and splits the shared capacity channel.
        let signed_current = match state {
            CyclerState::Discharge => -current.abs(),
            _ => current,
        };
        let (charge_cap, discharge_cap) = state.split(capacity);

        let mut row = vec![
            json!(line_no as i64 + 1),
            json_num(num(test_time_col)?),
        ];
        if let Some((idx, format)) = datetime_col {
            row.push(parse_timestamp(field(idx)?, format));
        }
        row.extend([
            json_num(num(step_time_col)?),
            json_num(num(step_col)?),
            json_num(num(cycle_col)?),
            json_num(signed_current),
            json_num(num(voltage_col)?),
            json_num(charge_cap),
            json_num(discharge_cap),
        ]);
        if let Some(idx) = energy_col {
            let (charge_en, discharge_en) = state.split(num(idx)?);
            row.push(json_num(charge_en));
            row.push(json_num(discharge_en));
        }
        table.rows.push(row);

        if let (Some(aux), Some(idx)) = (aux.as_mut(), temperature_col) {
            aux.rows
                .push(vec![json_num(num(test_time_col)?), json_num(num(idx)?)]);
        }
    }

    ensure!(table.num_rows() > 0, "export contains no data rows");

    let mut info = Map::new();
    info.insert("source_format".to_string(), json!("Maccor TXT"));
    info.insert("data_format_model".to_string(), json!(variant.as_str()));
    if !preamble.is_empty() {
        info.insert("export_header".to_string(), json!(preamble.join("\n")));
    }

    Ok(CyclerData {
        info,
        raw: table,
        aux,
    })
}

/// Charge/discharge/rest marker from the export's state column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclerState {
    Charge,
    Discharge,
    Rest,
}

impl CyclerState {
    fn parse(field: &str) -> Self {
        match field.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => Self::Charge,
            Some('D') => Self::Discharge,
            _ => Self::Rest,
        }
    }

    /// Split a shared magnitude channel into (charge, discharge) parts.
    fn split(self, value: f64) -> (f64, f64) {
        match self {
            Self::Charge => (value, 0.0),
            Self::Discharge => (0.0, value),
            Self::Rest => (0.0, 0.0),
        }
    }
}

/// Parse a vendor timestamp to epoch milliseconds; unparseable stamps
/// become null rather than failing the whole export.
fn parse_timestamp(field: &str, format: &str) -> Value {
    match NaiveDateTime::parse_from_str(field, format) {
        Ok(dt) => json!(dt.and_utc().timestamp_millis()),
        Err(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WMG_SIMBA_SAMPLE: &str = "\
Today's Date\t10/31/2019
Filename\tcell_42.txt
Cyc#\tStep\tTestTime(s)\tStepTime(s)\tAmps\tVolts\tCap.(Ah)\tEn.(Wh)\tMd\tDPt Time\tTemp 1
1\t1\t0.0\t0.0\t0.5\t3.60\t0.000\t0.000\tC\t10/30/2019 15:47:26\t24.9
1\t1\t10.0\t10.0\t0.5\t3.72\t0.00139\t0.005\tC\t10/30/2019 15:47:36\t25.1
1\t2\t20.0\t0.0\t0.5\t3.55\t0.00139\t0.005\tD\t10/30/2019 15:47:46\t25.3
";

    #[test]
    fn test_decode_wmg_simba_profile() {
        let data = decode(WMG_SIMBA_SAMPLE, FormatVariant::WmgSimba, b'\t').unwrap();

        assert_eq!(data.raw.num_rows(), 3);
        assert_eq!(data.raw.number(0, raw::DATA_POINT), Some(1.0));
        assert_eq!(data.raw.number(1, raw::VOLTAGE), Some(3.72));
        assert_eq!(data.raw.number(1, raw::CYCLE_INDEX), Some(1.0));
        // Preamble captured into metadata.
        assert!(
            data.info["export_header"]
                .as_str()
                .unwrap()
                .contains("cell_42.txt")
        );
    }

    #[test]
    fn test_state_splits_capacity_and_signs_current() {
        let data = decode(WMG_SIMBA_SAMPLE, FormatVariant::WmgSimba, b'\t').unwrap();

        // Charging row: capacity goes to the charge column.
        assert_eq!(data.raw.number(1, raw::CHARGE_CAPACITY), Some(0.00139));
        assert_eq!(data.raw.number(1, raw::DISCHARGE_CAPACITY), Some(0.0));
        assert_eq!(data.raw.number(1, raw::CURRENT), Some(0.5));
        // Discharging row: capacity flips column and current flips sign.
        assert_eq!(data.raw.number(2, raw::CHARGE_CAPACITY), Some(0.0));
        assert_eq!(data.raw.number(2, raw::DISCHARGE_CAPACITY), Some(0.00139));
        assert_eq!(data.raw.number(2, raw::CURRENT), Some(-0.5));
    }

    #[test]
    fn test_timestamps_become_epoch_millis() {
        let data = decode(WMG_SIMBA_SAMPLE, FormatVariant::WmgSimba, b'\t').unwrap();
        let col = data.raw.column_index(raw::DATE_TIME).unwrap();
        let first = data.raw.rows[0][col].as_i64().unwrap();
        let second = data.raw.rows[1][col].as_i64().unwrap();
        assert_eq!(second - first, 10_000);
    }

    #[test]
    fn test_temperature_goes_to_aux_table() {
        let data = decode(WMG_SIMBA_SAMPLE, FormatVariant::WmgSimba, b'\t').unwrap();
        let aux = data.aux.unwrap();
        assert_eq!(aux.columns, [raw::TEST_TIME, raw::TEMPERATURE]);
        assert_eq!(aux.num_rows(), 3);
        assert_eq!(aux.number(2, raw::TEMPERATURE), Some(25.3));
    }

    #[test]
    fn test_decode_ubham_profile_without_optional_columns() {
        let sample = "\
Cyc#\tStep\tTestTime\tStepTime\tCurrent\tVoltage\tCap.\tState
1\t1\t0.0\t0.0\t0.1\t3.6\t0.0\tC
1\t1\t5.0\t5.0\t0.1\t3.7\t0.0001\tC
";
        let data = decode(sample, FormatVariant::S4000Ubham, b'\t').unwrap();
        assert!(data.aux.is_none());
        assert!(data.raw.column_index(raw::DATE_TIME).is_none());
        assert!(data.raw.column_index(raw::CHARGE_ENERGY).is_none());
        assert_eq!(data.raw.number(1, raw::CHARGE_CAPACITY), Some(0.0001));
    }

    #[test]
    fn test_decode_kit_profile() {
        let sample = "\
cycle\tstep\ttest_time_s\tstep_time_s\tcurrent_A\tvoltage_V\tcapacity_Ah\tenergy_Wh\tstate\ttimestamp\ttemp_C
2\t4\t100.0\t1.0\t1.5\t4.1\t0.2\t0.8\tD\t2019-10-30 15:47:26\t30.0
";
        let data = decode(sample, FormatVariant::S4000Kit, b'\t').unwrap();
        assert_eq!(data.raw.number(0, raw::CYCLE_INDEX), Some(2.0));
        assert_eq!(data.raw.number(0, raw::DISCHARGE_ENERGY), Some(0.8));
        assert_eq!(data.raw.number(0, raw::CHARGE_ENERGY), Some(0.0));
        assert_eq!(data.raw.number(0, raw::CURRENT), Some(-1.5));
    }

    #[test]
    fn test_missing_column_is_reported_by_name() {
        let sample = "Cyc#\tStep\tTestTime(s)\n1\t1\t0.0\n";
        let err = decode(sample, FormatVariant::WmgSimba, b'\t').unwrap_err();
        // Preamble eats the first two lines, so the header row is gone too;
        // the first missing mapped column is reported.
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_empty_export_rejected() {
        let sample = "\
Today's Date\t10/31/2019
Filename\tcell_42.txt
Cyc#\tStep\tTestTime(s)\tStepTime(s)\tAmps\tVolts\tCap.(Ah)\tEn.(Wh)\tMd\tDPt Time\tTemp 1
";
        let err = decode(sample, FormatVariant::WmgSimba, b'\t').unwrap_err();
        assert!(err.to_string().contains("no data rows"));
    }
}
