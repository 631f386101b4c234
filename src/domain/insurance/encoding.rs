//! Categorical encodings fed to the regression model.
//!
//! The model only ever sees integers, so the label→code tables used at
//! training time and at serving time must be identical. The region table
//! travels inside the model artifact and the serving path always encodes
//! with the artifact's table.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Region, Sex, Smoker};

/// male → 1, female → 0
pub fn encode_sex(sex: Sex) -> u8 {
    match sex {
        Sex::Male => 1,
        Sex::Female => 0,
    }
}

/// yes → 1, no → 0
pub fn encode_smoker(smoker: Smoker) -> u8 {
    match smoker {
        Smoker::Yes => 1,
        Smoker::No => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegionEncoding {
    /// northeast 0, northwest 1, southeast 2, southwest 3
    #[default]
    Alphabetical,
    /// southeast 0, southwest 1, northeast 2, northwest 3.
    ///
    /// Produced by older training runs. Accepted when loading an artifact
    /// so that such a model is fed the codes it was fitted on.
    LegacyTraining,
}

impl RegionEncoding {
    pub fn encode(&self, region: Region) -> u8 {
        match (self, region) {
            (RegionEncoding::Alphabetical, Region::Northeast) => 0,
            (RegionEncoding::Alphabetical, Region::Northwest) => 1,
            (RegionEncoding::Alphabetical, Region::Southeast) => 2,
            (RegionEncoding::Alphabetical, Region::Southwest) => 3,
            (RegionEncoding::LegacyTraining, Region::Southeast) => 0,
            (RegionEncoding::LegacyTraining, Region::Southwest) => 1,
            (RegionEncoding::LegacyTraining, Region::Northeast) => 2,
            (RegionEncoding::LegacyTraining, Region::Northwest) => 3,
        }
    }

    /// `(label, code)` pairs sorted by code.
    pub fn table(&self) -> Vec<(Region, u8)> {
        let mut table: Vec<_> = Region::ALL.iter().map(|r| (*r, self.encode(*r))).collect();
        table.sort_by_key(|(_, code)| *code);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_encodings() {
        assert_eq!(encode_sex(Sex::Male), 1);
        assert_eq!(encode_sex(Sex::Female), 0);
        assert_eq!(encode_smoker(Smoker::Yes), 1);
        assert_eq!(encode_smoker(Smoker::No), 0);
    }

    #[test]
    fn serving_region_map() {
        let enc = RegionEncoding::Alphabetical;
        assert_eq!(enc.encode(Region::Northeast), 0);
        assert_eq!(enc.encode(Region::Northwest), 1);
        assert_eq!(enc.encode(Region::Southeast), 2);
        assert_eq!(enc.encode(Region::Southwest), 3);
    }

    #[test]
    fn legacy_map_differs_from_serving_map() {
        let legacy = RegionEncoding::LegacyTraining;
        assert_eq!(legacy.encode(Region::Southeast), 0);
        assert_eq!(legacy.encode(Region::Northwest), 3);
        assert_ne!(
            legacy.encode(Region::Northeast),
            RegionEncoding::Alphabetical.encode(Region::Northeast)
        );
    }

    #[test]
    fn tables_are_bijective() {
        for enc in [RegionEncoding::Alphabetical, RegionEncoding::LegacyTraining] {
            let codes: Vec<u8> = enc.table().iter().map(|(_, c)| *c).collect();
            assert_eq!(codes, vec![0, 1, 2, 3]);
        }
    }
}
