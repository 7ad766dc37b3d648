//! BioLogic MPR converter.

mod mpr;

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, json};

use labhub_core::types::{ExperimentEnvelope, TabularData};
use labhub_registry::ConverterId;

use crate::context::{ConversionContext, ConversionError, json_num, remove_input};
use crate::dispatch::FileConverter;

/// Converter for BioLogic potentiostat `.mpr` files.
#[derive(Debug, Default)]
pub struct GalvaniConverter;

impl GalvaniConverter {
    /// Create the converter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileConverter for GalvaniConverter {
    fn id(&self) -> ConverterId {
        ConverterId::Galvani
    }

    async fn convert(
        &self,
        input: &Path,
        ctx: &ConversionContext,
    ) -> Result<ExperimentEnvelope, ConversionError> {
        let bytes = tokio::fs::read(input).await?;

        let mpr = mpr::parse(&bytes).map_err(ConversionError::decode)?;
        tracing::debug!(
            columns = mpr.columns.len(),
            rows = mpr.rows.len(),
            version = mpr.version,
            "decoded MPR data module"
        );

        let data = TabularData::from_rows(
            mpr.columns,
            mpr.rows
                .into_iter()
                .map(|row| row.into_iter().map(json_num).collect())
                .collect(),
        );

        let mut info = Map::new();
        info.insert("test_type".to_string(), json!(ctx.test_type.as_str()));
        info.insert("instrument".to_string(), json!(ctx.instrument.as_str()));
        info.insert("source_format".to_string(), json!("BioLogic MPR"));
        info.insert("format_version".to_string(), json!(mpr.version));
        info.insert("acquisition_date".to_string(), json!(mpr.date));

        remove_input(input).await;
        Ok(ExperimentEnvelope::new(info, data))
    }
}

#[cfg(test)]
mod tests {
    use super::mpr::testutil::synthetic_mpr;
    use super::*;
    use labhub_registry::{FileExtension, Instrument, TestType};

    fn ctx() -> ConversionContext {
        ConversionContext::new(
            Instrument::BiologicVmp3,
            TestType::CyclicVoltammetry,
            FileExtension::Mpr,
        )
    }

    #[tokio::test]
    async fn test_convert_produces_envelope_and_deletes_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cv.mpr");
        let rows = vec![vec![0.0, 3.1, -0.5], vec![0.1, 3.2, -0.4]];
        std::fs::write(&input, synthetic_mpr(&[4, 6, 8], &rows)).unwrap();

        let envelope = GalvaniConverter::new().convert(&input, &ctx()).await.unwrap();

        assert_eq!(
            envelope.experiment_info["instrument"],
            serde_json::json!("BIOLOGIC-VMP3")
        );
        assert_eq!(
            envelope.experiment_data.columns,
            ["time/s", "Ewe/V", "I/mA"]
        );
        assert_eq!(envelope.experiment_data.num_rows(), 2);
        assert!(envelope.experiment_summary.is_none());
        assert!(!input.exists());
    }

    #[tokio::test]
    async fn test_convert_rejects_non_mpr_bytes_and_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cv.mpr");
        std::fs::write(&input, b"definitely not binary modules").unwrap();

        let result = GalvaniConverter::new().convert(&input, &ctx()).await;

        assert!(result.is_err());
        assert!(input.exists());
    }
}
