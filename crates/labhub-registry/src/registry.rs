//! The capability registry: accepted tokens and the combination table.

use std::collections::HashMap;

use labhub_core::error::AppError;
use labhub_core::result::AppResult;

use crate::tokens::{ConverterId, FileExtension, Instrument, TestType};

/// Nested combination table: extension → test type → instrument →
/// converter. Most cells of the full cross product are invalid, so the
/// supported surface grows sparsely while each lookup level stays O(1).
pub type CombinationTable =
    HashMap<FileExtension, HashMap<TestType, HashMap<Instrument, ConverterId>>>;

/// Immutable description of what the service accepts.
///
/// The ordered lists drive user-facing "supported" listings and error
/// messages; the combination table is the single source of truth for
/// whether a triple is accepted and which converter handles it.
/// Constructed once at startup and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    extensions: Vec<FileExtension>,
    test_types: Vec<TestType>,
    instruments: Vec<Instrument>,
    converters: Vec<ConverterId>,
    combinations: CombinationTable,
}

impl CapabilityRegistry {
    /// Build a registry from explicit parts.
    ///
    /// Exposed so tests can construct reduced or alternate registries; the
    /// server uses [`CapabilityRegistry::standard`].
    pub fn new(
        extensions: Vec<FileExtension>,
        test_types: Vec<TestType>,
        instruments: Vec<Instrument>,
        converters: Vec<ConverterId>,
        combinations: CombinationTable,
    ) -> Self {
        Self {
            extensions,
            test_types,
            instruments,
            converters,
            combinations,
        }
    }

    /// The standard production registry.
    pub fn standard() -> Self {
        use ConverterId::*;
        use FileExtension::*;
        use Instrument::*;
        use TestType::*;

        let mut combinations: CombinationTable = HashMap::new();

        combinations.entry(Mpr).or_default().insert(
            CyclicVoltammetry,
            HashMap::from([(BiologicVmp3, Galvani), (BiologicMpg2, Galvani)]),
        );

        combinations
            .entry(Res)
            .or_default()
            .insert(GalvanostaticCycling, HashMap::from([(ArbinBt2000, Cellpy)]));

        let txt = combinations.entry(Txt).or_default();
        txt.insert(
            GalvanostaticCycling,
            HashMap::from([
                (MaccorS4000, Cellpy),
                (MaccorS4000Wmg, Cellpy),
                (MaccorS4000Ubham, Cellpy),
                (MaccorS4000Kit, Cellpy),
            ]),
        );
        txt.insert(Xrd, HashMap::from([(StoeStadiP, XrdCustom)]));

        Self::new(
            vec![Mpr, Res, Txt],
            vec![CyclicVoltammetry, GalvanostaticCycling, Eis, Xrd],
            vec![
                ArbinBt2000,
                BiologicVmp3,
                BiologicMpg2,
                StoeStadiP,
                MaccorS4000,
                MaccorS4000Wmg,
                MaccorS4000Ubham,
                MaccorS4000Kit,
            ],
            vec![Galvani, Cellpy, XrdCustom],
            combinations,
        )
    }

    /// Accepted file extensions, in listing order.
    pub fn extensions(&self) -> &[FileExtension] {
        &self.extensions
    }

    /// Accepted test types, in listing order.
    pub fn test_types(&self) -> &[TestType] {
        &self.test_types
    }

    /// Accepted instruments, in listing order.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Registered converter identifiers, in listing order.
    pub fn converters(&self) -> &[ConverterId] {
        &self.converters
    }

    /// The test-type rows registered under an extension.
    pub fn tests_for(
        &self,
        extension: FileExtension,
    ) -> Option<&HashMap<TestType, HashMap<Instrument, ConverterId>>> {
        self.combinations.get(&extension)
    }

    /// Full-triple lookup.
    pub fn lookup(
        &self,
        extension: FileExtension,
        test_type: TestType,
        instrument: Instrument,
    ) -> Option<ConverterId> {
        self.combinations
            .get(&extension)?
            .get(&test_type)?
            .get(&instrument)
            .copied()
    }

    /// Iterate every registered combination with its converter.
    pub fn combinations(
        &self,
    ) -> impl Iterator<Item = (FileExtension, TestType, Instrument, ConverterId)> + '_ {
        self.combinations.iter().flat_map(|(ext, tests)| {
            tests.iter().flat_map(move |(test, instruments)| {
                instruments
                    .iter()
                    .map(move |(instrument, converter)| (*ext, *test, *instrument, *converter))
            })
        })
    }

    /// Startup sweep over the combination table.
    ///
    /// Every key of the table must be a member of the corresponding ordered
    /// list and every leaf converter must be registered. A failure here
    /// means the deployed tables have drifted and the process must not
    /// serve traffic.
    pub fn verify_consistency(&self) -> AppResult<()> {
        for (ext, test, instrument, converter) in self.combinations() {
            if !self.extensions.contains(&ext) {
                return Err(AppError::internal(format!(
                    "combination table references unlisted extension {ext}"
                )));
            }
            if !self.test_types.contains(&test) {
                return Err(AppError::internal(format!(
                    "combination table references unlisted test type {test}"
                )));
            }
            if !self.instruments.contains(&instrument) {
                return Err(AppError::internal(format!(
                    "combination table references unlisted instrument {instrument}"
                )));
            }
            if !self.converters.contains(&converter) {
                return Err(AppError::internal(format!(
                    "combination table references unregistered converter {converter}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_is_consistent() {
        CapabilityRegistry::standard().verify_consistency().unwrap();
    }

    #[test]
    fn test_standard_combination_count() {
        let registry = CapabilityRegistry::standard();
        assert_eq!(registry.combinations().count(), 8);
    }

    #[test]
    fn test_lookup_present() {
        let registry = CapabilityRegistry::standard();
        assert_eq!(
            registry.lookup(
                FileExtension::Mpr,
                TestType::CyclicVoltammetry,
                Instrument::BiologicVmp3,
            ),
            Some(ConverterId::Galvani)
        );
    }

    #[test]
    fn test_lookup_absent_instrument() {
        let registry = CapabilityRegistry::standard();
        assert_eq!(
            registry.lookup(
                FileExtension::Mpr,
                TestType::CyclicVoltammetry,
                Instrument::ArbinBt2000,
            ),
            None
        );
    }

    #[test]
    fn test_inconsistent_registry_detected() {
        // A table referencing a converter missing from the registered list.
        let mut combinations: CombinationTable = HashMap::new();
        combinations.entry(FileExtension::Txt).or_default().insert(
            TestType::Xrd,
            HashMap::from([(Instrument::StoeStadiP, ConverterId::XrdCustom)]),
        );
        let registry = CapabilityRegistry::new(
            vec![FileExtension::Txt],
            vec![TestType::Xrd],
            vec![Instrument::StoeStadiP],
            vec![ConverterId::Galvani, ConverterId::Cellpy],
            combinations,
        );
        assert!(registry.verify_consistency().is_err());
    }
}
