//! Arbin `.res` decoder.
//!
//! Arbin cyclers store their results in an Access database. The decoder
//! exports the two tables it needs through the configured `mdb-export`
//! command — `Global_Table` for experiment metadata and
//! `Channel_Normal_Table` for the per-sample readings — and parses the
//! resulting CSV.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, anyhow, bail, ensure};
use chrono::NaiveDateTime;
use serde_json::{Map, Value, json};

use labhub_core::config::convert::ConverterConfig;

use crate::cellpy::raw::{self, CyclerData, NumericTable};
use crate::context::json_num;

/// Date format passed to `mdb-export -D` and used to parse it back.
const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Arbin column headers in `Channel_Normal_Table`, paired with the
/// normalized names they map to. Energy and resistance columns are absent
/// from older schedule files.
const REQUIRED_COLUMNS: &[(&str, &str)] = &[
    ("Data_Point", raw::DATA_POINT),
    ("Test_Time", raw::TEST_TIME),
    ("Step_Time", raw::STEP_TIME),
    ("Step_Index", raw::STEP_INDEX),
    ("Cycle_Index", raw::CYCLE_INDEX),
    ("Current", raw::CURRENT),
    ("Voltage", raw::VOLTAGE),
    ("Charge_Capacity", raw::CHARGE_CAPACITY),
    ("Discharge_Capacity", raw::DISCHARGE_CAPACITY),
];

const OPTIONAL_COLUMNS: &[(&str, &str)] = &[
    ("Charge_Energy", raw::CHARGE_ENERGY),
    ("Discharge_Energy", raw::DISCHARGE_ENERGY),
    ("Internal_Resistance", raw::INTERNAL_RESISTANCE),
];

/// Decode an Arbin `.res` file via the external export tool.
pub async fn decode(path: &Path, config: &ConverterConfig) -> anyhow::Result<CyclerData> {
    let global_csv = run_export(config, path, "Global_Table").await?;
    let normal_csv = run_export(config, path, "Channel_Normal_Table").await?;

    let info = parse_global_table(&global_csv)?;
    let raw = parse_normal_table(&normal_csv)?;

    Ok(CyclerData {
        info,
        raw,
        aux: None,
    })
}

/// Export one table as CSV, with a timeout.
async fn run_export(config: &ConverterConfig, path: &Path, table: &str) -> anyhow::Result<String> {
    let timeout = Duration::from_secs(config.command_timeout_seconds);

    tracing::debug!(
        command = %config.mdb_export_command,
        table,
        file = %path.display(),
        "exporting cycler table"
    );

    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(&config.mdb_export_command)
            .arg("-D")
            .arg(EXPORT_DATE_FORMAT)
            .arg(path)
            .arg(table)
            .output(),
    )
    .await
    .map_err(|_| {
        anyhow!(
            "{} timed out after {}s exporting {table}",
            config.mdb_export_command,
            timeout.as_secs()
        )
    })?
    .with_context(|| format!("failed to launch {}", config.mdb_export_command))?;

    ensure!(
        output.status.success(),
        "{} failed exporting {table}: {}",
        config.mdb_export_command,
        String::from_utf8_lossy(&output.stderr).trim()
    );

    String::from_utf8(output.stdout).context("export produced non-UTF-8 output")
}

/// Pull experiment metadata out of the exported `Global_Table`.
pub(crate) fn parse_global_table(csv_text: &str) -> anyhow::Result<Map<String, Value>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader.headers().context("Global_Table has no header")?.clone();
    let record = reader
        .records()
        .next()
        .context("Global_Table is empty")?
        .context("bad Global_Table record")?;

    let lookup: HashMap<&str, &str> = headers.iter().zip(record.iter()).collect();

    let mut info = Map::new();
    if let Some(channel) = lookup.get("Channel_Number") {
        let value = channel
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| json!(channel));
        info.insert("channel_number".to_string(), value);
    }
    if let Some(schedule) = lookup.get("Schedule_File_Name") {
        info.insert("schedule_file_name".to_string(), json!(schedule));
    }
    info.insert("source_format".to_string(), json!("Arbin RES"));
    Ok(info)
}

/// Parse the exported `Channel_Normal_Table` into the normalized raw table.
pub(crate) fn parse_normal_table(csv_text: &str) -> anyhow::Result<NumericTable> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader
        .headers()
        .context("Channel_Normal_Table has no header")?
        .clone();
    let position: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();

    let mut mapping: Vec<(usize, &str)> = Vec::new();
    for &(vendor, normalized) in REQUIRED_COLUMNS {
        let idx = *position
            .get(vendor)
            .with_context(|| format!("export is missing the '{vendor}' column"))?;
        mapping.push((idx, normalized));
    }
    for &(vendor, normalized) in OPTIONAL_COLUMNS {
        if let Some(idx) = position.get(vendor) {
            mapping.push((*idx, normalized));
        }
    }
    let datetime_idx = position.get("DateTime").copied();

    let mut columns: Vec<String> = mapping.iter().map(|(_, name)| name.to_string()).collect();
    if datetime_idx.is_some() {
        columns.push(raw::DATE_TIME.to_string());
    }

    let mut table = NumericTable::new(columns);

    for (line_no, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("bad record on data line {}", line_no + 1))?;

        let mut row = Vec::with_capacity(table.columns.len());
        for (idx, name) in &mapping {
            let text = record
                .get(*idx)
                .map(str::trim)
                .with_context(|| format!("short record on data line {}", line_no + 1))?;
            let value: f64 = text.parse().with_context(|| {
                format!("non-numeric '{name}' value '{text}' on data line {}", line_no + 1)
            })?;
            row.push(json_num(value));
        }
        if let Some(idx) = datetime_idx {
            let text = record.get(idx).map(str::trim).unwrap_or_default();
            row.push(parse_export_timestamp(text));
        }
        table.rows.push(row);
    }

    if table.num_rows() == 0 {
        bail!("Channel_Normal_Table contains no data rows");
    }
    Ok(table)
}

/// Exported timestamps become epoch milliseconds; anything unparseable
/// becomes null.
fn parse_export_timestamp(text: &str) -> Value {
    match NaiveDateTime::parse_from_str(text, EXPORT_DATE_FORMAT) {
        Ok(dt) => json!(dt.and_utc().timestamp_millis()),
        Err(_) => Value::Null,
    }
}
