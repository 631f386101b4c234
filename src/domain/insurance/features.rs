use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

use super::encoding::{encode_sex, encode_smoker, RegionEncoding};
use super::{Region, Sex, Smoker};

/// Column order the model was fitted on.
pub const FEATURE_NAMES: [&str; 6] = ["age", "sex", "bmi", "children", "smoker", "region"];

pub const AGE_RANGE: (u32, u32) = (18, 100);
pub const BMI_RANGE: (f64, f64) = (10.0, 60.0);
pub const CHILDREN_RANGE: (u32, u32) = (0, 10);

/// Six encoded model inputs, built fresh for every prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    age: u32,
    sex: u8,
    bmi: f64,
    children: u32,
    smoker: u8,
    region: u8,
}

impl FeatureVector {
    pub fn encode(
        age: u32,
        sex: Sex,
        bmi: f64,
        children: u32,
        smoker: Smoker,
        region: Region,
        regions: RegionEncoding,
    ) -> Self {
        Self {
            age,
            sex: encode_sex(sex),
            bmi,
            children,
            smoker: encode_smoker(smoker),
            region: regions.encode(region),
        }
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub fn as_row(&self) -> [f64; 6] {
        [
            self.age as f64,
            self.sex as f64,
            self.bmi,
            self.children as f64,
            self.smoker as f64,
            self.region as f64,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PredictionResult {
    pub cost_estimate: f64,
}

impl PredictionResult {
    /// Currency display, e.g. `$12,345.68`.
    pub fn display(&self) -> String {
        let Some(amount) = Decimal::from_f64(self.cost_estimate) else {
            return format!("${:.2}", self.cost_estimate);
        };
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let text = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        format!("{}${}.{}", sign, grouped, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_follows_feature_order() {
        let fv = FeatureVector::encode(
            25,
            Sex::Male,
            25.0,
            0,
            Smoker::No,
            Region::Northeast,
            RegionEncoding::Alphabetical,
        );
        assert_eq!(fv.as_row(), [25.0, 1.0, 25.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn row_uses_given_region_table() {
        let fv = FeatureVector::encode(
            40,
            Sex::Female,
            31.5,
            2,
            Smoker::Yes,
            Region::Northeast,
            RegionEncoding::LegacyTraining,
        );
        assert_eq!(fv.as_row(), [40.0, 0.0, 31.5, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn currency_display() {
        assert_eq!(PredictionResult { cost_estimate: 1234.567 }.display(), "$1,234.57");
        assert_eq!(PredictionResult { cost_estimate: 999.0 }.display(), "$999.00");
        assert_eq!(PredictionResult { cost_estimate: 1_000_000.0 }.display(), "$1,000,000.00");
        assert_eq!(PredictionResult { cost_estimate: -1500.5 }.display(), "-$1,500.50");
        assert_eq!(PredictionResult { cost_estimate: 0.0 }.display(), "$0.00");
    }
}
