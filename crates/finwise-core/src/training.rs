//! Training pipelines for the model artifacts
//!
//! Three jobs, each reading the database and writing JSON artifacts through
//! the [`ModelStore`]:
//! - categorizer: TF-IDF text classifier from a labelled CSV plus stored titles
//! - spending: one global per-category forecaster, pooled across users
//! - insights: per-user monthly-expense forecasters plus a pooled global one

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::ml::categorizer::TextClassifier;
use crate::ml::forecast::{heuristic_forecast, sliding_windows, RidgeForecaster, DEFAULT_WINDOW};
use crate::ml::split_indices;
use crate::ml::store::ModelStore;
use crate::series::MonthlyCategoryMatrix;

/// Minimum pooled sliding-window samples before a category gets a model
pub const MIN_SPEND_SAMPLES: usize = 20;

/// Minimum months of history before a user gets an insight model
pub const MIN_INSIGHT_MONTHS: usize = 12;

/// Minimum sliding-window samples for a user insight model
pub const MIN_INSIGHT_SAMPLES: usize = 10;

/// Minimum series length for a user to contribute to the global insight model
pub const MIN_GLOBAL_CONTRIB_MONTHS: usize = DEFAULT_WINDOW + 6;

/// Seed labelled titles, written to the sample CSV when none exists
const SEED_SAMPLES: &[(&str, &str)] = &[
    ("Salary October", "Income"),
    ("Salary Nov", "Income"),
    ("Monthly Rent", "Housing"),
    ("House Rent payment", "Housing"),
    ("Uber ride home", "Transport"),
    ("Ola cab", "Transport"),
    ("Starbucks latte", "Food & Beverage"),
    ("Dominos order", "Food & Beverage"),
    ("Zomato food", "Food & Beverage"),
    ("Netflix subscription", "Entertainment"),
    ("Movie tickets", "Entertainment"),
    ("Amazon purchase: headphones", "Shopping"),
    ("Flipkart - shoes", "Shopping"),
    ("Electricity bill", "Utilities"),
    ("Water bill", "Utilities"),
    ("Mobile Phone bill", "Utilities"),
    ("Flight booking - NSE", "Travel"),
    ("Train ticket", "Travel"),
    ("Grocery at BigBasket", "Groceries"),
    ("Grocery at LocalStore", "Groceries"),
];

/// Outcome of a categorizer training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizerReport {
    pub samples: usize,
    pub classes: usize,
    /// Accuracy on the held-out split (or the full set when too small to split)
    pub accuracy: f64,
}

/// Outcome of one forecaster fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReport {
    pub name: String,
    pub samples: usize,
    pub r2: f64,
}

/// Outcome of a spending or insights training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained: Vec<ModelReport>,
    pub skipped: Vec<String>,
}

/// Write the seed CSV if it does not exist, then return all labelled samples in it
pub fn ensure_sample_csv(path: &Path) -> Result<Vec<(String, String)>> {
    if !path.exists() {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["description", "category"])?;
        for (description, category) in SEED_SAMPLES {
            writer.write_record([*description, *category])?;
        }
        writer.flush()?;
        info!(path = %path.display(), "Wrote seed categorizer samples");
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let (Some(description), Some(category)) = (record.get(0), record.get(1)) {
            if !description.is_empty() && !category.is_empty() {
                samples.push((description.to_string(), category.to_string()));
            }
        }
    }
    Ok(samples)
}

/// Train the transaction categorizer and save it
///
/// Training data is the sample CSV plus every labelled title already in the
/// database, so the model improves as categorized transactions accumulate.
pub fn train_categorizer(
    db: &Database,
    store: &ModelStore,
    sample_csv: &Path,
) -> Result<CategorizerReport> {
    let mut samples = ensure_sample_csv(sample_csv)?;
    samples.extend(db.labelled_titles()?);

    let model = TextClassifier::train(&samples)?;

    // Score on a deterministic holdout; tiny corpora score on the full set
    let (_, test_idx) = split_indices(samples.len(), 4);
    let accuracy = if test_idx.len() >= 4 {
        let holdout: Vec<(String, String)> =
            test_idx.iter().map(|&i| samples[i].clone()).collect();
        model.accuracy(&holdout)
    } else {
        model.accuracy(&samples)
    };

    store.save_categorizer(&model)?;
    info!(
        samples = samples.len(),
        classes = model.classes.len(),
        accuracy,
        "Trained categorizer"
    );

    Ok(CategorizerReport {
        samples: samples.len(),
        classes: model.classes.len(),
        accuracy,
    })
}

/// Train one global spending forecaster per category
///
/// Each user's month-by-category matrix contributes sliding-window samples;
/// categories with fewer than [`MIN_SPEND_SAMPLES`] pooled samples are skipped.
pub fn train_spending_models(db: &Database, store: &ModelStore) -> Result<TrainingReport> {
    use std::collections::BTreeMap;

    let mut pooled: BTreeMap<String, (Vec<Vec<f64>>, Vec<f64>)> = BTreeMap::new();

    for user_id in db.users_with_transactions()? {
        // Training pools all history; the serving window is applied per request
        let matrix =
            MonthlyCategoryMatrix::from_sparse(&db.monthly_category_expenses(user_id, None)?)?;
        for category in &matrix.categories {
            let series = match matrix.category_series(category) {
                Some(s) if s.iter().any(|&v| v != 0.0) => s,
                _ => continue,
            };
            let (lags, targets) = sliding_windows(&series, DEFAULT_WINDOW);
            let entry = pooled.entry(category.clone()).or_default();
            entry.0.extend(lags);
            entry.1.extend(targets);
        }
    }

    let mut report = TrainingReport::default();
    for (category, (lags, targets)) in pooled {
        if lags.len() < MIN_SPEND_SAMPLES {
            warn!(category, samples = lags.len(), "Skipping category, not enough samples");
            report.skipped.push(category);
            continue;
        }
        let model = RidgeForecaster::fit_samples(&lags, &targets, DEFAULT_WINDOW, false)?;
        store.save_spend_model(&category, &model)?;
        info!(category, samples = model.samples, r2 = model.r2, "Trained spending model");
        report.trained.push(ModelReport {
            name: category,
            samples: model.samples,
            r2: model.r2,
        });
    }
    Ok(report)
}

/// Train per-user insight forecasters plus the pooled global fallback
///
/// A user qualifies with at least [`MIN_INSIGHT_MONTHS`] months of non-zero
/// expense history yielding [`MIN_INSIGHT_SAMPLES`] samples. The global model
/// trains whenever any user has enough history to contribute.
pub fn train_insight_models(db: &Database, store: &ModelStore) -> Result<TrainingReport> {
    let mut report = TrainingReport::default();
    let mut global_lags: Vec<Vec<f64>> = Vec::new();
    let mut global_targets: Vec<f64> = Vec::new();

    for user_id in db.users_with_transactions()? {
        let matrix =
            MonthlyCategoryMatrix::from_sparse(&db.monthly_category_expenses(user_id, None)?)?;
        let expenses = matrix.monthly_totals();

        if expenses.len() >= MIN_GLOBAL_CONTRIB_MONTHS {
            let (lags, targets) = sliding_windows(&expenses, DEFAULT_WINDOW);
            global_lags.extend(lags);
            global_targets.extend(targets);
        }

        if expenses.iter().all(|&v| v == 0.0) || expenses.len() < MIN_INSIGHT_MONTHS {
            report.skipped.push(format!("user_{}", user_id));
            continue;
        }
        let (lags, targets) = sliding_windows(&expenses, DEFAULT_WINDOW);
        if lags.len() < MIN_INSIGHT_SAMPLES {
            report.skipped.push(format!("user_{}", user_id));
            continue;
        }

        let model = RidgeForecaster::fit_samples(&lags, &targets, DEFAULT_WINDOW, true)?;
        store.save_user_insight_model(user_id, &model)?;
        info!(user_id, samples = model.samples, r2 = model.r2, "Trained user insight model");
        report.trained.push(ModelReport {
            name: format!("user_{}", user_id),
            samples: model.samples,
            r2: model.r2,
        });
    }

    if global_lags.len() >= 2 {
        let model =
            RidgeForecaster::fit_samples(&global_lags, &global_targets, DEFAULT_WINDOW, true)?;
        store.save_global_insight_model(&model)?;
        info!(samples = model.samples, r2 = model.r2, "Trained global insight model");
        report.trained.push(ModelReport {
            name: "global".to_string(),
            samples: model.samples,
            r2: model.r2,
        });
    } else {
        warn!("Not enough pooled history for a global insight model");
        report.skipped.push("global".to_string());
    }

    Ok(report)
}

/// Heuristic next-month estimate when no model applies: mean of the last 3 months
pub fn heuristic_estimate(series: &[f64]) -> f64 {
    heuristic_forecast(series, 3)
}

/// Validate that a training run has anything to work with
pub fn check_training_data(db: &Database) -> Result<()> {
    if db.count_transactions(None)? == 0 {
        return Err(Error::Training(
            "No transactions in the database; nothing to train on".to_string(),
        ));
    }
    Ok(())
}
