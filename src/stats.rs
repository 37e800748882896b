//! Statistical primitives shared by every aggregation level.
//!
//! Any average taken over zero weight comes back as `None`. Callers must carry
//! that through to the report instead of substituting `0.0`.

use std::cmp::Ordering;

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean after dropping `floor(n * trim_fraction)` values from each end.
///
/// If trimming leaves nothing, the median element (`sorted[n / 2]`) is returned.
/// Empty input yields `None`.
pub fn trimmed_mean(values: &[f64], trim_fraction: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let sorted = sorted_copy(values);
    let n = sorted.len();
    let drop = (n as f64 * trim_fraction).floor() as usize;

    if drop * 2 >= n {
        return Some(sorted[n / 2]);
    }

    mean(&sorted[drop..n - drop])
}

/// `Σ(value·weight) / Σweight`, or `None` when the total weight is zero.
pub fn weighted_mean<I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for (value, weight) in pairs {
        weighted_sum += value * weight;
        total_weight += weight;
    }

    safe_ratio(weighted_sum, total_weight)
}

/// Bessel-corrected standard deviation around `mean`. Zero for fewer than two values.
pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}

pub fn min_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// `numerator / denominator`, or `None` when the denominator is zero or the result is not finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}
