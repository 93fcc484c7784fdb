//! Model training command implementations

use std::path::{Path, PathBuf};

use anyhow::Result;

use finwise_core::db::Database;
use finwise_core::ml::store::ModelStore;
use finwise_core::training::{
    check_training_data, train_categorizer, train_insight_models, train_spending_models,
    TrainingReport,
};

use crate::cli::TrainTask;

fn resolve_models_dir(arg: Option<&Path>) -> PathBuf {
    arg.map(Path::to_path_buf)
        .or_else(|| std::env::var("FINWISE_MODELS_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("models"))
}

fn print_report(report: &TrainingReport) {
    for model in &report.trained {
        println!(
            "   ✅ {} ({} samples, R² {:.3})",
            model.name, model.samples, model.r2
        );
    }
    for name in &report.skipped {
        println!("   ⏭️  {} (not enough data)", name);
    }
    if report.trained.is_empty() {
        println!("   ⚠️  No models trained. Add more transaction history first.");
    }
}

pub fn cmd_train(db: &Database, task: &TrainTask, models_dir: Option<&Path>) -> Result<()> {
    let base = resolve_models_dir(models_dir);
    let store = ModelStore::new(base.clone());
    let sample_csv = base.join("data/sample_txn_categories.csv");

    println!("🧠 Training models (artifacts in {})...", base.display());

    match task {
        TrainTask::Categorizer => {
            let report = train_categorizer(db, &store, &sample_csv)?;
            println!(
                "   ✅ categorizer ({} samples, {} classes, accuracy {:.3})",
                report.samples, report.classes, report.accuracy
            );
        }
        TrainTask::Spending => {
            check_training_data(db)?;
            println!("   Per-category spending forecasters:");
            print_report(&train_spending_models(db, &store)?);
        }
        TrainTask::Insights => {
            check_training_data(db)?;
            println!("   Monthly expense forecasters:");
            print_report(&train_insight_models(db, &store)?);
        }
        TrainTask::All => {
            let report = train_categorizer(db, &store, &sample_csv)?;
            println!(
                "   ✅ categorizer ({} samples, {} classes, accuracy {:.3})",
                report.samples, report.classes, report.accuracy
            );
            if check_training_data(db).is_ok() {
                println!("   Per-category spending forecasters:");
                print_report(&train_spending_models(db, &store)?);
                println!("   Monthly expense forecasters:");
                print_report(&train_insight_models(db, &store)?);
            } else {
                println!("   ⏭️  Skipping forecasters: no transactions yet");
            }
        }
    }

    Ok(())
}
