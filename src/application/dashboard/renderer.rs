//! Dashboard renderer
//!
//! Turns the static dataset into the chart data behind each tab. Output is
//! plain data (bins, quartiles, matrices); drawing it is up to the client.
//! Rendering is deterministic and never mutates the dataset.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::dataset::Dataset;
use super::stats::{
    box_stats, correlation_matrix, describe, gaussian_kde, histogram, mean, pearson, BoxStats,
    DensityCurve, Histogram, Summary,
};
use crate::config::DashboardConfig;
use crate::domain::{InsuranceRecord, RegionEncoding, Smoker, TabKind};

// ── Views ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TabView {
    Statistics(StatisticsView),
    Distribution(DistributionView),
    Grouped(GroupedView),
    Insights(InsightsView),
    Report(ReportView),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatisticsView {
    pub rows: usize,
    pub preview: Vec<InsuranceRecord>,
    pub summary: Vec<ColumnSummary>,
    pub value_counts: Vec<ValueCounts>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ColumnSummary {
    pub column: String,
    pub summary: Summary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValueCounts {
    pub column: String,
    /// Most frequent first
    pub counts: Vec<LabelCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DistributionView {
    pub column: String,
    pub histogram: Histogram,
    pub kde: DensityCurve,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupedView {
    pub group_by: String,
    pub hue: String,
    pub counts: Vec<GroupCount>,
    pub charges_box: Vec<GroupBox>,
    pub bmi_box: Vec<GroupBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GroupCount {
    pub group: String,
    pub hue: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupBox {
    pub group: String,
    pub stats: BoxStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InsightsView {
    pub regional_average_charges: Vec<LabelValue>,
    pub smoker_share: Vec<LabelShare>,
    pub scatter: ScatterMatrix,
    pub correlation: CorrelationMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LabelValue {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LabelShare {
    pub label: String,
    pub count: usize,
    pub share: f64,
}

/// Pairwise scatter data: one point per record, values in `columns` order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScatterMatrix {
    pub columns: Vec<String>,
    pub points: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportView {
    pub rows: usize,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Finding {
    pub title: String,
    pub detail: String,
}

// ── Renderer ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DashboardRenderer {
    dataset: Arc<Dataset>,
    options: DashboardConfig,
    regions: RegionEncoding,
}

impl DashboardRenderer {
    pub fn new(dataset: Arc<Dataset>, options: DashboardConfig, regions: RegionEncoding) -> Self {
        Self {
            dataset,
            options,
            regions,
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn render(&self, tab: TabKind) -> TabView {
        match tab {
            TabKind::Statistics => TabView::Statistics(self.statistics()),
            TabKind::Age => TabView::Distribution(self.distribution("age", self.dataset.ages())),
            TabKind::Bmi => TabView::Distribution(self.distribution("bmi", self.dataset.bmis())),
            TabKind::Charges => {
                TabView::Distribution(self.distribution("charges", self.dataset.charges()))
            }
            TabKind::Gender => TabView::Grouped(self.grouped(
                "sex",
                |r| r.sex.to_string(),
                "smoker",
                |r| r.smoker.to_string(),
            )),
            TabKind::Children => TabView::Grouped(self.grouped(
                "children",
                |r| format!("{:02}", r.children),
                "smoker",
                |r| r.smoker.to_string(),
            )),
            TabKind::Smoker => TabView::Grouped(self.grouped(
                "smoker",
                |r| r.smoker.to_string(),
                "sex",
                |r| r.sex.to_string(),
            )),
            TabKind::Region => TabView::Grouped(self.grouped(
                "region",
                |r| r.region.to_string(),
                "smoker",
                |r| r.smoker.to_string(),
            )),
            TabKind::Insights => TabView::Insights(self.insights()),
            TabKind::Report => TabView::Report(self.report()),
        }
    }

    fn statistics(&self) -> StatisticsView {
        let records = self.dataset.records();
        let summary = [
            ("age", self.dataset.ages()),
            ("bmi", self.dataset.bmis()),
            ("children", self.dataset.children()),
            ("charges", self.dataset.charges()),
        ]
        .into_iter()
        .map(|(column, values)| ColumnSummary {
            column: column.to_string(),
            summary: describe(&values),
        })
        .collect();

        StatisticsView {
            rows: records.len(),
            preview: records.iter().take(self.options.preview_rows).cloned().collect(),
            summary,
            value_counts: vec![
                value_counts("sex", records.iter().map(|r| r.sex.to_string())),
                value_counts("smoker", records.iter().map(|r| r.smoker.to_string())),
                value_counts("region", records.iter().map(|r| r.region.to_string())),
            ],
        }
    }

    fn distribution(&self, column: &str, values: Vec<f64>) -> DistributionView {
        DistributionView {
            column: column.to_string(),
            histogram: histogram(&values, self.options.histogram_bins),
            kde: gaussian_kde(&values, self.options.kde_points),
        }
    }

    fn grouped(
        &self,
        group_by: &str,
        group: impl Fn(&InsuranceRecord) -> String,
        hue_by: &str,
        hue: impl Fn(&InsuranceRecord) -> String,
    ) -> GroupedView {
        let records = self.dataset.records();

        let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
        let mut charges: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut bmis: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for r in records {
            let g = group(r);
            *counts.entry((g.clone(), hue(r))).or_default() += 1;
            charges.entry(g.clone()).or_default().push(r.charges);
            bmis.entry(g).or_default().push(r.bmi);
        }

        let to_boxes = |m: BTreeMap<String, Vec<f64>>| -> Vec<GroupBox> {
            m.into_iter()
                .map(|(group, values)| GroupBox {
                    group: trim_group(group),
                    stats: box_stats(&values),
                })
                .collect()
        };

        GroupedView {
            group_by: group_by.to_string(),
            hue: hue_by.to_string(),
            counts: counts
                .into_iter()
                .map(|((group, hue), count)| GroupCount {
                    group: trim_group(group),
                    hue,
                    count,
                })
                .collect(),
            charges_box: to_boxes(charges),
            bmi_box: to_boxes(bmis),
        }
    }

    fn insights(&self) -> InsightsView {
        let records = self.dataset.records();
        let regional_average_charges = self.regional_averages();

        let total = records.len().max(1) as f64;
        let smoker_share = value_counts("smoker", records.iter().map(|r| r.smoker.to_string()))
            .counts
            .into_iter()
            .map(|c| LabelShare {
                share: c.count as f64 / total,
                label: c.label,
                count: c.count,
            })
            .collect();

        let scatter = ScatterMatrix {
            columns: ["age", "bmi", "children", "charges"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            points: records
                .iter()
                .map(|r| vec![r.age as f64, r.bmi, r.children as f64, r.charges])
                .collect(),
        };

        let encoded = self.dataset.encoded_columns(self.regions);
        let correlation = CorrelationMatrix {
            columns: encoded.iter().map(|(name, _)| name.to_string()).collect(),
            matrix: correlation_matrix(&encoded),
        };

        InsightsView {
            regional_average_charges,
            smoker_share,
            scatter,
            correlation,
        }
    }

    fn regional_averages(&self) -> Vec<LabelValue> {
        let mut by_region: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for r in self.dataset.records() {
            by_region.entry(r.region.to_string()).or_default().push(r.charges);
        }
        by_region
            .into_iter()
            .map(|(label, values)| LabelValue {
                label,
                value: mean(&values),
            })
            .collect()
    }

    fn mean_charges_where(&self, pred: impl Fn(&InsuranceRecord) -> bool) -> f64 {
        let values: Vec<f64> = self
            .dataset
            .records()
            .iter()
            .filter(|r| pred(r))
            .map(|r| r.charges)
            .collect();
        mean(&values)
    }

    fn report(&self) -> ReportView {
        let records = self.dataset.records();

        let mut findings = Vec::new();

        let smokers = self.mean_charges_where(|r| r.smoker == Smoker::Yes);
        let non_smokers = self.mean_charges_where(|r| r.smoker == Smoker::No);
        if non_smokers > 0.0 {
            findings.push(Finding {
                title: "Smoking".into(),
                detail: format!(
                    "Smokers are charged ${:.2} on average against ${:.2} for non-smokers, {:.1}x as much.",
                    smokers,
                    non_smokers,
                    smokers / non_smokers
                ),
            });
        }

        let charges = self.dataset.charges();
        let age_corr = pearson(&self.dataset.ages(), &charges);
        let strongest = [
            pearson(&self.dataset.bmis(), &charges),
            pearson(&self.dataset.children(), &charges),
        ]
        .iter()
        .all(|other| age_corr.abs() > other.abs());
        findings.push(Finding {
            title: "Age".into(),
            detail: age_finding(age_corr, strongest),
        });

        let obese = self.mean_charges_where(|r| r.bmi >= 30.0);
        let not_obese = self.mean_charges_where(|r| r.bmi < 30.0);
        findings.push(Finding {
            title: "BMI".into(),
            detail: format!(
                "Policy holders with a BMI of 30 or more average ${:.2} against ${:.2} below 30.",
                obese, not_obese
            ),
        });

        let highest = self
            .regional_averages()
            .into_iter()
            .max_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(top) = highest {
            findings.push(Finding {
                title: "Region".into(),
                detail: format!(
                    "The {} region has the highest average charges at ${:.2}.",
                    top.label, top.value
                ),
            });
        }

        let by_sex = value_counts("sex", records.iter().map(|r| r.sex.to_string()));
        let split = by_sex
            .counts
            .iter()
            .map(|c| format!("{} {}", c.count, c.label))
            .collect::<Vec<_>>()
            .join(", ");
        let smallest = by_sex.counts.iter().map(|c| c.count).min().unwrap_or(0);
        let balanced = by_sex.counts.len() > 1 && smallest as f64 >= 0.4 * records.len() as f64;
        findings.push(Finding {
            title: "Gender".into(),
            detail: if balanced {
                format!("The dataset is close to balanced by sex ({}).", split)
            } else {
                format!("The dataset is skewed by sex ({}).", split)
            },
        });

        ReportView {
            rows: records.len(),
            findings,
        }
    }
}

/// |r| below this reads as no trend.
const WEAK_CORRELATION: f64 = 0.1;

fn age_finding(corr: f64, strongest_numeric: bool) -> String {
    let trend = if corr.abs() < WEAK_CORRELATION {
        "Charges show no clear trend with age"
    } else if corr > 0.0 {
        "Charges rise with age"
    } else {
        "Charges fall with age"
    };
    if strongest_numeric && corr.abs() >= WEAK_CORRELATION {
        format!(
            "{} (correlation {:.2}); age is the strongest numeric driver of charges.",
            trend, corr
        )
    } else {
        format!("{} (correlation {:.2}).", trend, corr)
    }
}

/// Children groups are zero-padded so the map sorts numerically.
fn trim_group(group: String) -> String {
    match group.parse::<u32>() {
        Ok(n) => n.to_string(),
        Err(_) => group,
    }
}

fn value_counts(column: &str, labels: impl Iterator<Item = String>) -> ValueCounts {
    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *tally.entry(label).or_default() += 1;
    }
    let mut counts: Vec<LabelCount> = tally
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();
    // Stable sort keeps ties alphabetical.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    ValueCounts {
        column: column.to_string(),
        counts,
    }
}
