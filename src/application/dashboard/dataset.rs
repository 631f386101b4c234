//! Static insurance dataset, loaded once and shared read-only.

use std::path::Path;

use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::insurance::encoding::{encode_sex, encode_smoker};
use crate::domain::{InsuranceRecord, RegionEncoding};
use crate::shared::AppError;

pub const DATASET_COLUMNS: [&str; 7] = ["age", "sex", "bmi", "children", "smoker", "region", "charges"];

#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<InsuranceRecord>,
    sha256: String,
}

impl Dataset {
    /// Read `age,sex,bmi,children,smoker,region,charges` rows. A missing or
    /// malformed file is an error; an empty one too.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::Dataset(format!("{}: {}", path.display(), e)))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes.as_slice());

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<InsuranceRecord>().enumerate() {
            let record = row.map_err(|e| {
                AppError::Dataset(format!("{} row {}: {}", path.display(), line + 1, e))
            })?;
            records.push(record);
        }
        if records.is_empty() {
            return Err(AppError::Dataset(format!("{} has no rows", path.display())));
        }

        let sha256 = hex::encode(Sha256::digest(&bytes));
        info!(path = %path.display(), rows = records.len(), sha256 = %sha256, "Dataset loaded");
        Ok(Self { records, sha256 })
    }

    pub fn from_records(records: Vec<InsuranceRecord>) -> Self {
        Self {
            records,
            sha256: String::new(),
        }
    }

    pub fn records(&self) -> &[InsuranceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hex SHA-256 of the file the rows came from; empty for in-memory data.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn ages(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.age as f64).collect()
    }

    pub fn bmis(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.bmi).collect()
    }

    pub fn children(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.children as f64).collect()
    }

    pub fn charges(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.charges).collect()
    }

    /// Every column as numbers, categoricals replaced by their codes.
    /// Builds new vectors; the records themselves are untouched.
    pub fn encoded_columns(&self, regions: RegionEncoding) -> Vec<(&'static str, Vec<f64>)> {
        let r = &self.records;
        vec![
            ("age", self.ages()),
            ("sex", r.iter().map(|x| encode_sex(x.sex) as f64).collect()),
            ("bmi", self.bmis()),
            ("children", self.children()),
            ("smoker", r.iter().map(|x| encode_smoker(x.smoker) as f64).collect()),
            ("region", r.iter().map(|x| regions.encode(x.region) as f64).collect()),
            ("charges", self.charges()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Region, Sex, Smoker};

    const SAMPLE: &str = "age,sex,bmi,children,smoker,region,charges\n\
        19,female,27.9,0,yes,southwest,16884.924\n\
        18,male,33.77,1,no,southeast,1725.5523\n";

    #[test]
    fn loads_rows_and_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insurance.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let ds = Dataset::load(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[0].sex, Sex::Female);
        assert_eq!(ds.records()[0].smoker, Smoker::Yes);
        assert_eq!(ds.records()[1].region, Region::Southeast);
        assert_eq!(ds.sha256().len(), 64);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Dataset::load(Path::new("/nope/insurance.csv")).unwrap_err();
        assert!(matches!(err, AppError::Dataset(_)));
    }

    #[test]
    fn bad_label_names_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insurance.csv");
        std::fs::write(
            &path,
            "age,sex,bmi,children,smoker,region,charges\n19,other,27.9,0,yes,southwest,1.0\n",
        )
        .unwrap();
        let err = Dataset::load(&path).unwrap_err().to_string();
        assert!(err.contains("row 1"));
    }

    #[test]
    fn encoded_columns_leave_records_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insurance.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        let ds = Dataset::load(&path).unwrap();

        let cols = ds.encoded_columns(RegionEncoding::Alphabetical);
        assert_eq!(cols.len(), DATASET_COLUMNS.len());
        assert_eq!(cols[1].1, vec![0.0, 1.0]);
        assert_eq!(cols[5].1, vec![3.0, 2.0]);
        assert_eq!(ds.records()[0].region, Region::Southwest);
    }
}
