//! Token enums for the supported-combination tables.
//!
//! Every token has a canonical uppercase string form — the exact form the
//! caller boundary produces after normalization. The enums themselves key
//! the combination table, so adding a token is an append-only edit here
//! plus a table entry; nothing depends on declaration order.

use std::fmt;

/// Normalized file-type token derived from the uploaded file's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileExtension {
    /// BioLogic binary cycler format.
    Mpr,
    /// Arbin Access-database cycler format.
    Res,
    /// Text export (cycler TSV or diffraction table).
    Txt,
}

impl FileExtension {
    /// Parse a normalized (uppercase) extension token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "MPR" => Some(Self::Mpr),
            "RES" => Some(Self::Res),
            "TXT" => Some(Self::Txt),
            _ => None,
        }
    }

    /// The canonical token string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mpr => "MPR",
            Self::Res => "RES",
            Self::Txt => "TXT",
        }
    }
}

impl fmt::Display for FileExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The class of electrochemical/structural experiment.
///
/// Tokens are composed at the caller boundary from a primary category and
/// an optional subcategory joined by `-`; XRD is the one category without
/// a subcategory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestType {
    /// Cyclic voltammetry.
    CyclicVoltammetry,
    /// Galvanostatic charge/discharge cycling.
    GalvanostaticCycling,
    /// Electrochemical impedance spectroscopy.
    Eis,
    /// X-ray diffraction.
    Xrd,
}

impl TestType {
    /// Parse a normalized (uppercase) test-type token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "VOLTAMMETRY-CYCLIC VOLTAMMETRY (CV)" => Some(Self::CyclicVoltammetry),
            "CHARGE-DISCHARGE-GALVANOSTATIC CYCLING" => Some(Self::GalvanostaticCycling),
            "EIS" => Some(Self::Eis),
            "XRD" => Some(Self::Xrd),
            _ => None,
        }
    }

    /// The canonical token string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CyclicVoltammetry => "VOLTAMMETRY-CYCLIC VOLTAMMETRY (CV)",
            Self::GalvanostaticCycling => "CHARGE-DISCHARGE-GALVANOSTATIC CYCLING",
            Self::Eis => "EIS",
            Self::Xrd => "XRD",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Brand+model token identifying the originating hardware.
///
/// The Maccor S4000 entries form a family: a shared base model with
/// site-specific export variants distinguished by suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instrument {
    /// Arbin BT-2000 cycler.
    ArbinBt2000,
    /// BioLogic VMP3 potentiostat.
    BiologicVmp3,
    /// BioLogic MPG2 potentiostat.
    BiologicMpg2,
    /// STOE STADI P diffractometer.
    StoeStadiP,
    /// Maccor S4000 cycler, default export.
    MaccorS4000,
    /// Maccor S4000, WMG export variant.
    MaccorS4000Wmg,
    /// Maccor S4000, UBham export variant.
    MaccorS4000Ubham,
    /// Maccor S4000, KIT export variant.
    MaccorS4000Kit,
}

impl Instrument {
    /// Parse a normalized (uppercase) instrument token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ARBIN-BT-2000" => Some(Self::ArbinBt2000),
            "BIOLOGIC-VMP3" => Some(Self::BiologicVmp3),
            "BIOLOGIC-MPG2" => Some(Self::BiologicMpg2),
            "STOE-STADI P" => Some(Self::StoeStadiP),
            "MACCOR-S4000" => Some(Self::MaccorS4000),
            "MACCOR-S4000-WMG" => Some(Self::MaccorS4000Wmg),
            "MACCOR-S4000-UBHAM" => Some(Self::MaccorS4000Ubham),
            "MACCOR-S4000-KIT" => Some(Self::MaccorS4000Kit),
            _ => None,
        }
    }

    /// The canonical token string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArbinBt2000 => "ARBIN-BT-2000",
            Self::BiologicVmp3 => "BIOLOGIC-VMP3",
            Self::BiologicMpg2 => "BIOLOGIC-MPG2",
            Self::StoeStadiP => "STOE-STADI P",
            Self::MaccorS4000 => "MACCOR-S4000",
            Self::MaccorS4000Wmg => "MACCOR-S4000-WMG",
            Self::MaccorS4000Ubham => "MACCOR-S4000-UBHAM",
            Self::MaccorS4000Kit => "MACCOR-S4000-KIT",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier of a registered converter.
///
/// Closed set: dispatch over this enum is exhaustive, so a combination
/// table can never reference a converter that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConverterId {
    /// BioLogic MPR converter.
    Galvani,
    /// Cycler converter (Arbin RES, Maccor TXT).
    Cellpy,
    /// Diffraction text converter.
    XrdCustom,
}

impl ConverterId {
    /// Parse a converter identifier.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "galvani" => Some(Self::Galvani),
            "cellpy" => Some(Self::Cellpy),
            "xrd_custom" => Some(Self::XrdCustom),
            _ => None,
        }
    }

    /// The canonical identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Galvani => "galvani",
            Self::Cellpy => "cellpy",
            Self::XrdCustom => "xrd_custom",
        }
    }
}

impl fmt::Display for ConverterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips() {
        for ext in [FileExtension::Mpr, FileExtension::Res, FileExtension::Txt] {
            assert_eq!(FileExtension::parse(ext.as_str()), Some(ext));
        }
        for tt in [
            TestType::CyclicVoltammetry,
            TestType::GalvanostaticCycling,
            TestType::Eis,
            TestType::Xrd,
        ] {
            assert_eq!(TestType::parse(tt.as_str()), Some(tt));
        }
        for inst in [
            Instrument::ArbinBt2000,
            Instrument::BiologicVmp3,
            Instrument::BiologicMpg2,
            Instrument::StoeStadiP,
            Instrument::MaccorS4000,
            Instrument::MaccorS4000Wmg,
            Instrument::MaccorS4000Ubham,
            Instrument::MaccorS4000Kit,
        ] {
            assert_eq!(Instrument::parse(inst.as_str()), Some(inst));
        }
        for conv in [ConverterId::Galvani, ConverterId::Cellpy, ConverterId::XrdCustom] {
            assert_eq!(ConverterId::parse(conv.as_str()), Some(conv));
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        // Normalization happens at the caller boundary; tokens here are
        // already uppercase.
        assert_eq!(FileExtension::parse("mpr"), None);
        assert_eq!(Instrument::parse("arbin-bt-2000"), None);
    }

    #[test]
    fn test_unknown_tokens_rejected() {
        assert_eq!(FileExtension::parse("CSV"), None);
        assert_eq!(TestType::parse("DILATOMETRY"), None);
        assert_eq!(Instrument::parse("NEWARE-CT-4008"), None);
        assert_eq!(ConverterId::parse("neware"), None);
    }
}
