//! Spending forecasts: ridge regression over lag features
//!
//! A monthly series becomes supervised samples by sliding a window over it:
//! the previous `window` months predict the next one. Ridge keeps the tiny
//! design matrices well conditioned, and the closed-form solve makes
//! training deterministic.

use serde::{Deserialize, Serialize};

use super::{mean, r2_score, split_indices, std_dev};
use crate::error::{Error, Result};

/// Default lag window in months
pub const DEFAULT_WINDOW: usize = 3;

/// Ridge penalty
const LAMBDA: f64 = 1.0;

/// Hold out every 5th sliding-window sample (20%) for scoring
const HOLDOUT_EVERY: usize = 5;

/// A fitted forecaster for one monthly series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeForecaster {
    /// Number of lag months used as features
    pub window: usize,
    /// Whether window mean and std are appended to the lag features
    pub with_stats: bool,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// R² on held-out sliding-window samples
    pub r2: f64,
    /// Number of training samples the fit saw
    pub samples: usize,
}

impl RidgeForecaster {
    /// Fit on a monthly series, oldest first
    ///
    /// Needs at least `window + 2` months so there are two supervised samples.
    pub fn fit(series: &[f64], window: usize, with_stats: bool) -> Result<Self> {
        if series.len() < window + 2 {
            return Err(Error::Training(format!(
                "Need at least {} months of history, have {}",
                window + 2,
                series.len()
            )));
        }
        let (lags, targets) = sliding_windows(series, window);
        Self::fit_samples(&lags, &targets, window, with_stats)
    }

    /// Fit on pooled (lag window, next month) samples, e.g. stacked across users
    pub fn fit_samples(
        lags: &[Vec<f64>],
        targets: &[f64],
        window: usize,
        with_stats: bool,
    ) -> Result<Self> {
        if window == 0 {
            return Err(Error::Training("Lag window must be at least 1".to_string()));
        }
        if lags.len() < 2 {
            return Err(Error::Training(format!(
                "Need at least 2 training samples, have {}",
                lags.len()
            )));
        }

        let xs: Vec<Vec<f64>> = lags.iter().map(|l| build_features(l, with_stats)).collect();
        let ys: Vec<f64> = targets.to_vec();

        let (train_idx, test_idx) = split_indices(xs.len(), HOLDOUT_EVERY);
        let train_x: Vec<&[f64]> = train_idx.iter().map(|&i| xs[i].as_slice()).collect();
        let train_y: Vec<f64> = train_idx.iter().map(|&i| ys[i]).collect();

        let params = ridge_fit(&train_x, &train_y, LAMBDA)?;
        let (intercept, coefficients) = (params[0], params[1..].to_vec());

        let model = Self {
            window,
            with_stats,
            intercept,
            coefficients,
            r2: 0.0,
            samples: train_x.len(),
        };

        // Score on held-out samples when there are any, else on the fit set
        let score_idx = if test_idx.is_empty() { &train_idx } else { &test_idx };
        let actual: Vec<f64> = score_idx.iter().map(|&i| ys[i]).collect();
        let predicted: Vec<f64> = score_idx
            .iter()
            .map(|&i| model.predict_features(&xs[i]))
            .collect();

        Ok(Self {
            r2: r2_score(&actual, &predicted),
            ..model
        })
    }

    /// Predict the next month from recent history (oldest first)
    ///
    /// Uses the last `window` values; predictions are floored at zero.
    pub fn predict_next(&self, recent: &[f64]) -> Result<f64> {
        if recent.len() < self.window {
            return Err(Error::InvalidData(format!(
                "Need {} months of recent history, have {}",
                self.window,
                recent.len()
            )));
        }
        let lags = &recent[recent.len() - self.window..];
        let features = build_features(lags, self.with_stats);
        Ok(self.predict_features(&features).max(0.0))
    }

    fn predict_features(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, f)| c * f)
                .sum::<f64>()
    }
}

/// Turn a monthly series into (lag window, next month) training pairs
pub fn sliding_windows(series: &[f64], window: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut lags = Vec::new();
    let mut targets = Vec::new();
    if series.len() > window {
        for i in window..series.len() {
            lags.push(series[i - window..i].to_vec());
            targets.push(series[i]);
        }
    }
    (lags, targets)
}

fn build_features(lags: &[f64], with_stats: bool) -> Vec<f64> {
    let mut features = lags.to_vec();
    if with_stats {
        features.push(mean(lags));
        features.push(std_dev(lags));
    }
    features
}

/// Mean of the last `n` values, floored at zero
///
/// The fallback when a series is too short to carry a fitted model.
pub fn heuristic_forecast(series: &[f64], n: usize) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let tail = &series[series.len().saturating_sub(n)..];
    mean(tail).max(0.0)
}

/// Solve ridge regression in closed form, returning [intercept, coefs...]
///
/// The intercept column is not penalized.
fn ridge_fit(xs: &[&[f64]], ys: &[f64], lambda: f64) -> Result<Vec<f64>> {
    if xs.is_empty() {
        return Err(Error::Training("Empty design matrix".to_string()));
    }
    let dim = xs[0].len() + 1;

    // Normal equations: (X'X + λI) w = X'y, with a leading 1s column
    let mut xtx = vec![vec![0.0; dim]; dim];
    let mut xty = vec![0.0; dim];
    for (x, &y) in xs.iter().zip(ys) {
        let mut row = Vec::with_capacity(dim);
        row.push(1.0);
        row.extend_from_slice(x);
        for i in 0..dim {
            xty[i] += row[i] * y;
            for j in 0..dim {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, row) in xtx.iter_mut().enumerate().skip(1) {
        row[i] += lambda;
    }

    solve_linear(xtx, xty)
}

/// Gaussian elimination with partial pivoting
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(Error::Training(
                "Singular design matrix; not enough variation in the data".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in (row + 1)..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_rejects_short_series() {
        let short = [100.0, 110.0, 120.0, 130.0];
        assert!(RidgeForecaster::fit(&short, 3, false).is_err());
    }

    #[test]
    fn test_forecaster_tracks_steady_series() {
        // 12 months of roughly flat spending around 500
        let series = [
            510.0, 495.0, 505.0, 500.0, 490.0, 508.0, 502.0, 497.0, 503.0, 499.0, 505.0, 501.0,
        ];
        let model = RidgeForecaster::fit(&series, 3, false).unwrap();
        let pred = model.predict_next(&series).unwrap();
        assert!(pred > 400.0 && pred < 600.0, "prediction was {}", pred);
    }

    #[test]
    fn test_forecaster_follows_trend() {
        let series: Vec<f64> = (1..=14).map(|m| 100.0 * m as f64).collect();
        let model = RidgeForecaster::fit(&series, 3, false).unwrap();
        let pred = model.predict_next(&series).unwrap();
        // Next value in the ramp is 1500; ridge shrinks a little
        assert!(pred > 1200.0, "prediction was {}", pred);
    }

    #[test]
    fn test_prediction_floored_at_zero() {
        let series = [300.0, 200.0, 100.0, 50.0, 20.0, 10.0, 5.0, 2.0, 1.0, 0.0];
        let model = RidgeForecaster::fit(&series, 3, false).unwrap();
        let pred = model.predict_next(&[0.0, 0.0, 0.0]).unwrap();
        assert!(pred >= 0.0);
    }

    #[test]
    fn test_predict_requires_enough_history() {
        let series: Vec<f64> = (1..=10).map(|m| m as f64 * 10.0).collect();
        let model = RidgeForecaster::fit(&series, 3, false).unwrap();
        assert!(model.predict_next(&[100.0, 200.0]).is_err());
    }

    #[test]
    fn test_with_stats_features() {
        let series: Vec<f64> = (1..=12).map(|m| 50.0 + 10.0 * m as f64).collect();
        let model = RidgeForecaster::fit(&series, 3, true).unwrap();
        assert_eq!(model.coefficients.len(), 5);
        assert!(model.predict_next(&series).unwrap() > 0.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let series: Vec<f64> = (1..=12).map(|m| (m as f64 * 37.0) % 400.0 + 100.0).collect();
        let a = RidgeForecaster::fit(&series, 3, false).unwrap();
        let b = RidgeForecaster::fit(&series, 3, false).unwrap();
        assert_eq!(a.coefficients, b.coefficients);
        assert_eq!(a.r2, b.r2);
    }

    #[test]
    fn test_sliding_windows() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (lags, targets) = sliding_windows(&series, 3);
        assert_eq!(lags, vec![vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 4.0]]);
        assert_eq!(targets, vec![4.0, 5.0]);

        let (lags, _) = sliding_windows(&[1.0, 2.0], 3);
        assert!(lags.is_empty());
    }

    #[test]
    fn test_fit_samples_pooled_across_series() {
        // Two flat series from different "users" pooled together
        let mut lags = Vec::new();
        let mut targets = Vec::new();
        for base in [100.0, 900.0] {
            let series: Vec<f64> = (0..10).map(|_| base).collect();
            let (l, t) = sliding_windows(&series, 3);
            lags.extend(l);
            targets.extend(t);
        }
        let model = RidgeForecaster::fit_samples(&lags, &targets, 3, false).unwrap();
        let low = model.predict_next(&[100.0, 100.0, 100.0]).unwrap();
        let high = model.predict_next(&[900.0, 900.0, 900.0]).unwrap();
        assert!(low < high);
        assert!((low - 100.0).abs() < 60.0, "low was {}", low);
        assert!((high - 900.0).abs() < 60.0, "high was {}", high);
    }

    #[test]
    fn test_heuristic_forecast() {
        assert_eq!(heuristic_forecast(&[], 3), 0.0);
        assert_eq!(heuristic_forecast(&[100.0], 3), 100.0);
        assert_eq!(heuristic_forecast(&[10.0, 200.0, 300.0, 400.0], 3), 300.0);
    }

    #[test]
    fn test_solve_linear_known_system() {
        // 2x + y = 5, x + 3y = 10 -> x = 1, y = 3
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve_linear(a, vec![5.0, 10.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trips_through_json() {
        let series: Vec<f64> = (1..=12).map(|m| 100.0 * m as f64).collect();
        let model = RidgeForecaster::fit(&series, 3, false).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: RidgeForecaster = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.predict_next(&series).unwrap(),
            model.predict_next(&series).unwrap()
        );
    }
}
