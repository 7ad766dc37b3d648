//! Cycler converter (Arbin RES, Maccor TXT).
//!
//! One converter identifier fans out to several vendor sub-formats. The
//! instrument model resolver pins a driver and layout profile where the
//! combination implies one; otherwise the converter sniffs the file
//! content and lets the matching decoder take it. Readings are rescaled
//! to milli-units (mA, mAh, mWh) before serialization.

pub mod arbin_res;
pub mod maccor_txt;
pub mod raw;
pub mod summary;

use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use labhub_core::config::convert::ConverterConfig;
use labhub_core::types::ExperimentEnvelope;
use labhub_registry::{ConverterId, DriverId, FormatVariant, InstrumentModelResolver};

use crate::context::{ConversionContext, ConversionError, remove_input};
use crate::dispatch::FileConverter;

/// Raw columns rescaled from source units to milli-units.
const SCALED_RAW_COLUMNS: &[&str] = &[
    raw::CURRENT,
    raw::CHARGE_CAPACITY,
    raw::DISCHARGE_CAPACITY,
    raw::CHARGE_ENERGY,
    raw::DISCHARGE_ENERGY,
];

/// Summary columns rescaled from source units to milli-units.
const SCALED_SUMMARY_COLUMNS: &[&str] = &[raw::CHARGE_CAPACITY, raw::DISCHARGE_CAPACITY];

/// Converter for battery cycler files.
pub struct CellpyConverter {
    config: ConverterConfig,
    resolver: InstrumentModelResolver,
}

impl CellpyConverter {
    /// Create the converter.
    pub fn new(config: ConverterConfig, resolver: InstrumentModelResolver) -> Self {
        Self { config, resolver }
    }

    /// Column separator for text exports: request option first, then the
    /// configured default. The escaped form `\t` is accepted for callers
    /// that cannot put a literal tab in a form field.
    fn separator(&self, ctx: &ConversionContext) -> u8 {
        let sep = ctx
            .options
            .get("sep")
            .map(String::as_str)
            .unwrap_or(&self.config.default_separator);
        match sep {
            "\\t" => b'\t',
            other => other.bytes().next().unwrap_or(b'\t'),
        }
    }
}

#[async_trait]
impl FileConverter for CellpyConverter {
    fn id(&self) -> ConverterId {
        ConverterId::Cellpy
    }

    async fn convert(
        &self,
        input: &Path,
        ctx: &ConversionContext,
    ) -> Result<ExperimentEnvelope, ConversionError> {
        let hint = self
            .resolver
            .resolve_model(ctx.instrument, ctx.test_type, ctx.extension);

        // An explicit request override beats the resolved profile.
        let variant = match &ctx.model_override {
            Some(tag) => Some(FormatVariant::parse(tag).ok_or_else(|| {
                ConversionError::new(format!("unknown data format model '{tag}'"))
            })?),
            None => hint.variant,
        };

        let driver = match hint.driver {
            Some(driver) => driver,
            None => detect_driver(input).await?,
        };
        tracing::debug!(%driver, ?variant, "running cycler conversion");

        let mut data = match driver {
            DriverId::ArbinRes => arbin_res::decode(input, &self.config)
                .await
                .map_err(ConversionError::decode)?,
            DriverId::MaccorTxt => {
                let text = tokio::fs::read_to_string(input).await?;
                let variant = variant.unwrap_or(FormatVariant::WmgSimba);
                maccor_txt::decode(&text, variant, self.separator(ctx))
                    .map_err(ConversionError::decode)?
            }
        };

        // Summary is computed in source units, then both tables move to
        // milli-units together.
        let mut cycle_summary = summary::build(&data.raw).map_err(ConversionError::decode)?;
        for column in SCALED_RAW_COLUMNS {
            data.raw.scale_column(column, 1000.0);
        }
        for column in SCALED_SUMMARY_COLUMNS {
            cycle_summary.table.scale_column(column, 1000.0);
        }

        let mut envelope = ExperimentEnvelope::new(data.info, data.raw.into_tabular())
            .with_summary(cycle_summary.into_tabular());
        if let Some(aux) = data.aux {
            envelope = envelope.with_auxiliary(aux.into_tabular());
        }

        remove_input(input).await;
        Ok(envelope)
    }
}

/// Sniff the staged file when the resolver pinned no driver.
///
/// Access containers carry their signature at a fixed offset; Maccor text
/// exports are tab-separated from the first line.
async fn detect_driver(path: &Path) -> Result<DriverId, ConversionError> {
    let mut head = vec![0u8; 512];
    let mut file = tokio::fs::File::open(path).await?;
    let read = file.read(&mut head).await?;
    head.truncate(read);

    if head.len() >= 19
        && (head[4..19] == *b"Standard Jet DB" || head[4..19] == *b"Standard ACE DB")
    {
        return Ok(DriverId::ArbinRes);
    }

    if let Ok(text) = std::str::from_utf8(&head) {
        let first_line = text.lines().next().unwrap_or_default();
        if first_line.contains('\t') {
            return Ok(DriverId::MaccorTxt);
        }
    }

    Err(ConversionError::new(
        "unable to auto-detect cycler file format",
    ))
}
