//! Elastic-net linear regression by cyclic coordinate descent
//!
//! Minimizes `1/(2n)·‖y − Xβ‖² + α·ρ·‖β‖₁ + α·(1−ρ)/2·‖β‖²` on standardized
//! predictors, then maps coefficients back to the original scale.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::{FitError, Regressor, validate_training_data};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetParams {
    pub alpha: f64,
    /// Mix between L1 (1.0) and L2 (0.0) penalties
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for ElasticNetParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            l1_ratio: 0.5,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElasticNet {
    intercept: f64,
    /// Coefficients on the original predictor scale
    coef: Array1<f64>,
    /// Coefficients on the standardized scale
    standardized_coef: Array1<f64>,
    n_iter: usize,
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl ElasticNet {
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: &ElasticNetParams) -> Result<Self, FitError> {
        validate_training_data(x, y)?;
        if !(params.alpha >= 0.0) || !(0.0..=1.0).contains(&params.l1_ratio) {
            return Err(FitError::InvalidParameter(format!(
                "alpha {} / l1_ratio {} out of range",
                params.alpha, params.l1_ratio
            )));
        }

        let n = x.nrows() as f64;
        let p = x.ncols();

        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        let scales = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 0.0 { s } else { 1.0 });
        let z = (&x - &means) / &scales;

        let y_mean = y.iter().sum::<f64>() / n;
        let mut residual: Array1<f64> = y.iter().map(|v| v - y_mean).collect();

        let col_sq: Vec<f64> = z.axis_iter(Axis(1)).map(|c| c.dot(&c) / n).collect();
        let l1 = params.alpha * params.l1_ratio;
        let l2 = params.alpha * (1.0 - params.l1_ratio);

        let mut beta = Array1::<f64>::zeros(p);
        let mut n_iter = 0;
        for iter in 0..params.max_iter {
            n_iter = iter + 1;
            let mut max_delta: f64 = 0.0;
            for j in 0..p {
                if col_sq[j] == 0.0 {
                    continue;
                }
                let column = z.column(j);
                let old = beta[j];
                let rho = column.dot(&residual) / n + col_sq[j] * old;
                let new = soft_threshold(rho, l1) / (col_sq[j] + l2);
                if new != old {
                    residual.scaled_add(old - new, &column);
                    beta[j] = new;
                    max_delta = max_delta.max((new - old).abs());
                }
            }
            if max_delta < params.tol {
                break;
            }
        }

        let coef = &beta / &scales;
        let intercept = y_mean - coef.dot(&means);

        Ok(Self {
            intercept,
            coef,
            standardized_coef: beta,
            n_iter,
        })
    }

    #[must_use]
    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coef.view()
    }

    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    #[must_use]
    pub const fn n_iter(&self) -> usize {
        self.n_iter
    }
}

impl Regressor for ElasticNet {
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.intercept + self.coef.dot(&row)
    }

    /// Absolute standardized coefficients
    fn feature_importance(&self) -> Vec<f64> {
        self.standardized_coef.iter().map(|c| c.abs()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_recovers_linear_relationship() {
        let x = Array2::from_shape_fn((50, 2), |(i, j)| if j == 0 { i as f64 } else { ((i * 7) % 11) as f64 });
        let y: Vec<f64> = x.outer_iter().map(|r| 3.0 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let params = ElasticNetParams {
            alpha: 1e-6,
            l1_ratio: 0.5,
            max_iter: 10_000,
            tol: 1e-10,
        };
        let model = ElasticNet::fit(x.view(), &y, &params).unwrap();
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-3);
        assert!((model.coefficients()[1] + 0.5).abs() < 1e-3);
        assert!((model.intercept() - 3.0).abs() < 1e-2);
        let importance = model.feature_importance();
        assert!(importance[0] > importance[1]);
    }

    #[test]
    fn test_strong_penalty_shrinks_to_intercept() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f64);
        let y: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let params = ElasticNetParams {
            alpha: 100.0,
            l1_ratio: 1.0,
            ..ElasticNetParams::default()
        };
        let model = ElasticNet::fit(x.view(), &y, &params).unwrap();
        assert_eq!(model.coefficients()[0], 0.0);
        assert!((model.predict_row(x.row(0)) - 9.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_is_ignored() {
        let x = Array2::from_shape_fn((10, 2), |(i, j)| if j == 0 { i as f64 } else { 4.0 });
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let model = ElasticNet::fit(x.view(), &y, &ElasticNetParams::default()).unwrap();
        assert_eq!(model.coefficients()[1], 0.0);
    }
}
