//! In-process model training and inference
//!
//! All models are small, deterministic, and serialized as JSON artifacts:
//! - `text` - tokenization and TF-IDF vectorization
//! - `categorizer` - keyword rules plus a logistic-regression text classifier
//! - `forecast` - ridge regression over lag features for spending series
//! - `store` - artifact persistence under the models directory

pub mod categorizer;
pub mod forecast;
pub mod store;
pub mod text;

/// Mean of a slice, 0.0 when empty
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, 0.0 when empty
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Deterministic train/test split: every `holdout_every`-th sample is held out
///
/// Index-based rather than random so repeated training runs on the same data
/// produce the same models and the same reported scores.
pub(crate) fn split_indices(n: usize, holdout_every: usize) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::new();
    let mut test = Vec::new();
    for i in 0..n {
        if holdout_every > 1 && i % holdout_every == holdout_every - 1 {
            test.push(i);
        } else {
            train.push(i);
        }
    }
    (train, test)
}

/// Coefficient of determination of predictions against actuals
pub(crate) fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return 0.0;
    }
    let m = mean(actual);
    let ss_tot: f64 = actual.iter().map(|y| (y - m).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        // Constant target: perfect iff the residuals are zero too
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
