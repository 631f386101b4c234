//! Descriptive statistics over plain `f64` columns.
//!
//! Conventions follow the usual dataframe defaults: standard deviation uses
//! n-1, quantiles interpolate linearly between order statistics.

use serde::Serialize;
use utoipa::ToSchema;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample variance (n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v
}

/// Quantile of already sorted values, `q` in `[0, 1]`.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn quantile(values: &[f64], q: f64) -> f64 {
    quantile_sorted(&sorted(values), q)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q1: f64,
    #[serde(rename = "50%")]
    pub median: f64,
    #[serde(rename = "75%")]
    pub q3: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Summary {
    let s = sorted(values);
    Summary {
        count: s.len(),
        mean: mean(&s),
        std: std_dev(&s),
        min: s.first().copied().unwrap_or(0.0),
        q1: quantile_sorted(&s, 0.25),
        median: quantile_sorted(&s, 0.5),
        q3: quantile_sorted(&s, 0.75),
        max: s.last().copied().unwrap_or(0.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Histogram {
    /// `bins + 1` edges, first is the minimum, last the maximum
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Equal-width histogram. The last bin is closed on the right so the
/// maximum lands in it.
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    if values.is_empty() {
        return Histogram {
            edges: vec![0.0; bins + 1],
            counts: vec![0; bins],
        };
    }

    let (mut lo, mut hi) = min_max(values);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Histogram { edges, counts }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DensityCurve {
    pub bandwidth: f64,
    pub xs: Vec<f64>,
    pub density: Vec<f64>,
}

/// Gaussian kernel density estimate on `points` evenly spaced samples
/// spanning the data range, bandwidth by Scott's rule.
pub fn gaussian_kde(values: &[f64], points: usize) -> DensityCurve {
    let n = values.len();
    let points = points.max(2);
    if n == 0 {
        return DensityCurve {
            bandwidth: 0.0,
            xs: Vec::new(),
            density: Vec::new(),
        };
    }

    let sd = std_dev(values);
    let mut bandwidth = sd * (n as f64).powf(-0.2);
    if bandwidth <= 0.0 || !bandwidth.is_finite() {
        bandwidth = 1.0;
    }

    let (lo, hi) = min_max(values);
    let step = (hi - lo) / (points - 1) as f64;
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    let xs: Vec<f64> = (0..points).map(|i| lo + step * i as f64).collect();
    let density = xs
        .iter()
        .map(|x| {
            values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm
        })
        .collect();

    DensityCurve { bandwidth, xs, density }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Lowest value within `q1 - 1.5 * IQR`
    pub whisker_low: f64,
    /// Highest value within `q3 + 1.5 * IQR`
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

pub fn box_stats(values: &[f64]) -> BoxStats {
    let s = sorted(values);
    let q1 = quantile_sorted(&s, 0.25);
    let median = quantile_sorted(&s, 0.5);
    let q3 = quantile_sorted(&s, 0.75);
    let iqr = q3 - q1;
    let (fence_lo, fence_hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let inside = s.iter().copied().filter(|v| *v >= fence_lo && *v <= fence_hi);
    let whisker_low = inside.clone().next().unwrap_or(q1);
    let whisker_high = inside.last().unwrap_or(q3);
    let outliers = s
        .iter()
        .copied()
        .filter(|v| *v < fence_lo || *v > fence_hi)
        .collect();

    BoxStats {
        q1,
        median,
        q3,
        whisker_low,
        whisker_high,
        outliers,
    }
}

/// Pearson correlation; 0 when either side has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (mx, my) = (mean(&xs[..n]), mean(&ys[..n]));
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx == 0.0 || vy == 0.0 {
        return 0.0;
    }
    cov / (vx.sqrt() * vy.sqrt())
}

/// Square correlation matrix in column order.
pub fn correlation_matrix(columns: &[(&str, Vec<f64>)]) -> Vec<Vec<f64>> {
    columns
        .iter()
        .enumerate()
        .map(|(i, (_, a))| {
            columns
                .iter()
                .enumerate()
                .map(|(j, (_, b))| if i == j { 1.0 } else { pearson(a, b) })
                .collect()
        })
        .collect()
}
