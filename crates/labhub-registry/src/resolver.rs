//! Instrument model resolution for the cycler converter.
//!
//! Orthogonal to combination validation: validation answers "is this
//! combination allowed", resolution answers "which decoding profile should
//! the cycler converter use". A combination can be allowed while resolution
//! yields no profile — the decoder then auto-detects.

use std::fmt;

use crate::tokens::{FileExtension, Instrument, TestType};

/// Selects the decoding routine inside the cycler converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverId {
    /// Arbin Access-database reader.
    ArbinRes,
    /// Maccor text-export reader.
    MaccorTxt,
}

impl DriverId {
    /// The canonical driver identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArbinRes => "arbin_res",
            Self::MaccorTxt => "maccor_txt",
        }
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Selects a vendor-specific column/layout profile within a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVariant {
    /// Maccor S4000, WMG site export.
    S4000Wmg,
    /// Maccor S4000, UBham site export.
    S4000Ubham,
    /// Maccor S4000, KIT site export.
    S4000Kit,
    /// Default profile for unsuffixed Maccor S4000 exports.
    WmgSimba,
}

impl FormatVariant {
    /// Parse a variant tag, e.g. from an explicit request override.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "S4000-WMG" => Some(Self::S4000Wmg),
            "S4000-UBHAM" => Some(Self::S4000Ubham),
            "S4000-KIT" => Some(Self::S4000Kit),
            "WMG_SIMBA" => Some(Self::WmgSimba),
            _ => None,
        }
    }

    /// The canonical variant tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S4000Wmg => "S4000-WMG",
            Self::S4000Ubham => "S4000-UBHAM",
            Self::S4000Kit => "S4000-KIT",
            Self::WmgSimba => "WMG_SIMBA",
        }
    }
}

impl fmt::Display for FormatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The resolver's answer: a driver and layout profile, either of which may
/// be absent. `ModelHint::none()` means "let the decoder auto-detect".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHint {
    /// Decoding routine to use, if one is pinned.
    pub driver: Option<DriverId>,
    /// Layout profile within the driver, if one is pinned.
    pub variant: Option<FormatVariant>,
}

impl ModelHint {
    /// No hint: the decoder auto-detects.
    pub fn none() -> Self {
        Self {
            driver: None,
            variant: None,
        }
    }

    /// A driver with no layout profile.
    pub fn driver(driver: DriverId) -> Self {
        Self {
            driver: Some(driver),
            variant: None,
        }
    }

    /// A driver with a pinned layout profile.
    pub fn with_variant(driver: DriverId, variant: FormatVariant) -> Self {
        Self {
            driver: Some(driver),
            variant: Some(variant),
        }
    }
}

/// Maps (instrument, test type, extension) to a decoding profile.
///
/// Two rules, tried in order: an exact-triple table, then the
/// MACCOR-S4000 family rule which derives the layout profile from the
/// instrument suffix. No match is not an error.
#[derive(Debug, Clone, Default)]
pub struct InstrumentModelResolver;

/// Instrument-token prefix shared by the Maccor S4000 family.
const MACCOR_S4000_FAMILY: &str = "MACCOR-S4000";

impl InstrumentModelResolver {
    /// Create a resolver.
    pub fn new() -> Self {
        Self
    }

    /// Resolve the decoding profile for an accepted combination.
    pub fn resolve_model(
        &self,
        instrument: Instrument,
        test_type: TestType,
        extension: FileExtension,
    ) -> ModelHint {
        // Rule 1: exact triples.
        if (instrument, test_type, extension)
            == (
                Instrument::ArbinBt2000,
                TestType::GalvanostaticCycling,
                FileExtension::Res,
            )
        {
            return ModelHint::driver(DriverId::ArbinRes);
        }

        // Rule 2: text exports of the Maccor S4000 family share one driver;
        // the instrument suffix picks the site profile.
        if test_type == TestType::GalvanostaticCycling
            && extension == FileExtension::Txt
            && instrument.as_str().starts_with(MACCOR_S4000_FAMILY)
        {
            let variant = match instrument {
                Instrument::MaccorS4000Wmg => FormatVariant::S4000Wmg,
                Instrument::MaccorS4000Ubham => FormatVariant::S4000Ubham,
                Instrument::MaccorS4000Kit => FormatVariant::S4000Kit,
                _ => FormatVariant::WmgSimba,
            };
            let hint = ModelHint::with_variant(DriverId::MaccorTxt, variant);
            tracing::debug!(%instrument, driver = %DriverId::MaccorTxt, variant = %variant, "resolved cycler model");
            return hint;
        }

        ModelHint::none()
    }
}
