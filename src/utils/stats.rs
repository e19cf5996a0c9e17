//! NaN-aware summary statistics
//!
//! Missing values are represented as `NaN` once a column has been extracted
//! from Arrow; every function here skips them.

/// Iterate over the finite-or-infinite (non-NaN) values of a slice
fn present(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Number of non-missing values
#[must_use]
pub fn count_present(values: &[f64]) -> usize {
    present(values).count()
}

/// Mean of the non-missing values, `NaN` if there are none
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = present(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Sample standard deviation (n - 1 denominator), `NaN` for fewer than two values
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let (ss, n) = present(values).fold((0.0, 0usize), |(s, n), v| (s + (v - m).powi(2), n + 1));
    if n < 2 { f64::NAN } else { (ss / (n - 1) as f64).sqrt() }
}

/// Population standard deviation (n denominator)
#[must_use]
pub fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let (ss, n) = present(values).fold((0.0, 0usize), |(s, n), v| (s + (v - m).powi(2), n + 1));
    if n == 0 { f64::NAN } else { (ss / n as f64).sqrt() }
}

fn sorted_present(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = present(values).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile with linear interpolation between closest ranks
#[must_use]
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let sorted = sorted_present(values);
    quantile_sorted(&sorted, q)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Median of the non-missing values
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Minimum and maximum of the non-missing values
#[must_use]
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    present(values).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Percentage of missing values in a column
#[must_use]
pub fn missing_pct(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.len() - count_present(values)) as f64 / values.len() as f64 * 100.0
}

/// Pearson correlation, `None` when either side has zero variance
#[must_use]
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let ma = a[..n].iter().sum::<f64>() / n as f64;
    let mb = b[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for i in 0..n {
        let da = a[i] - ma;
        let db = b[i] - mb;
        cov += da * db;
        va += da * da;
        vb += db * db;
    }
    if va <= f64::EPSILON || vb <= f64::EPSILON {
        return None;
    }
    Some(cov / (va.sqrt() * vb.sqrt()))
}
