//! Diffraction text converter.
//!
//! STOE STADI P exports a whitespace-separated two-column table (angle,
//! counts) with a single header line. The converter normalizes the
//! intensity column to its maximum so downstream plots are comparable
//! across acquisitions.

use std::path::Path;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::{Map, json};

use labhub_core::types::{ExperimentEnvelope, TabularData};
use labhub_registry::ConverterId;

use crate::context::{ConversionContext, ConversionError, json_num, remove_input};
use crate::dispatch::FileConverter;

/// Converter for diffraction text tables.
#[derive(Debug, Default)]
pub struct XrdConverter;

impl XrdConverter {
    /// Create the converter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileConverter for XrdConverter {
    fn id(&self) -> ConverterId {
        ConverterId::XrdCustom
    }

    async fn convert(
        &self,
        input: &Path,
        _ctx: &ConversionContext,
    ) -> Result<ExperimentEnvelope, ConversionError> {
        let text = tokio::fs::read_to_string(input).await?;

        let table = parse_diffraction_table(&text).map_err(ConversionError::decode)?;

        // Acquisition metadata is not present in the text export.
        let mut info = Map::new();
        info.insert("device name".to_string(), json!("unknown"));
        info.insert("X-ray tube".to_string(), json!("unknown"));
        info.insert("Position sensitive detector".to_string(), json!("unknown"));
        info.insert("Spinning/non-spinning".to_string(), json!("unknown"));

        remove_input(input).await;
        Ok(ExperimentEnvelope::new(info, table))
    }
}

/// Parse the two-column text table and normalize intensity to its maximum.
fn parse_diffraction_table(text: &str) -> anyhow::Result<TabularData> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    // First non-empty line is the export's own header; column names are
    // fixed by the envelope contract.
    let _header = lines.next().context("diffraction table is empty")?;

    let mut angles: Vec<f64> = Vec::new();
    let mut intensities: Vec<f64> = Vec::new();

    for (line_no, line) in lines.enumerate() {
        let mut fields = line.split_whitespace();
        let angle: f64 = fields
            .next()
            .with_context(|| format!("missing angle on data line {}", line_no + 1))?
            .parse()
            .with_context(|| format!("bad angle on data line {}", line_no + 1))?;
        let intensity: f64 = fields
            .next()
            .with_context(|| format!("missing intensity on data line {}", line_no + 1))?
            .parse()
            .with_context(|| format!("bad intensity on data line {}", line_no + 1))?;
        angles.push(angle);
        intensities.push(intensity);
    }

    if angles.is_empty() {
        bail!("diffraction table has a header but no data rows");
    }

    let max = intensities.iter().cloned().fold(f64::MIN, f64::max);
    if max <= 0.0 {
        bail!("diffraction table has no positive intensity");
    }

    let data = angles
        .iter()
        .zip(&intensities)
        .map(|(angle, intensity)| vec![json_num(*angle), json_num(intensity / max)])
        .collect();

    Ok(TabularData::from_rows(
        vec!["2theta".to_string(), "intensity".to_string()],
        data,
    ))
}
