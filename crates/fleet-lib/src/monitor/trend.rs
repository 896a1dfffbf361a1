//! Normalized trend of a metric series
//!
//! The least-squares slope of the series (one unit per sample) is divided
//! by `stddev / len` and clipped to `[-1, 1]`, so a value near 1 means the
//! series rises steadily relative to its own spread.

/// Trend analyzer with a minimum sample floor
#[derive(Debug, Clone, Copy)]
pub struct TrendAnalyzer {
    min_points: usize,
}

impl TrendAnalyzer {
    pub fn new(min_points: usize) -> Self {
        Self { min_points }
    }

    /// Normalized trend in `[-1, 1]`
    ///
    /// Returns exactly 0 for series shorter than the floor and for flat
    /// series.
    pub fn trend(&self, values: &[f64]) -> f64 {
        if values.len() < self.min_points || values.len() < 2 {
            return 0.0;
        }

        let std_dev = population_std_dev(values);
        if std_dev < f64::EPSILON {
            return 0.0;
        }

        let slope = linear_regression_slope(values);
        let scale = std_dev / values.len() as f64;
        (slope / scale).clamp(-1.0, 1.0)
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(30)
    }
}

/// Slope of the least-squares line through `(i, values[i])`
fn linear_regression_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;

    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}

fn population_std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
