//! Regression metrics

/// Coefficient of determination
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
#[must_use]
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[must_use]
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    let mse = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum::<f64>() / y_true.len() as f64;
    mse.sqrt()
}

#[must_use]
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum::<f64>() / y_true.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let t = [1.0, 2.0, 3.0, 4.0];
        let p = [1.0, 2.0, 3.0, 6.0];
        assert!((r2_score(&t, &p) - (1.0 - 4.0 / 5.0)).abs() < 1e-12);
        assert!((rmse(&t, &p) - 1.0).abs() < 1e-12);
        assert!((mae(&t, &p) - 0.5).abs() < 1e-12);
        assert_eq!(r2_score(&t, &t), 1.0);
    }

    #[test]
    fn test_constant_target_convention() {
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 3.0]), 0.0);
    }
}
