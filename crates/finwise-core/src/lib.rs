//! Core library for Finwise: storage, domain models, analytics, and the
//! model training/inference pipelines behind the API.

pub mod db;
pub mod error;
pub mod ml;
pub mod models;
pub mod series;
pub mod training;

pub use db::{CategoryTotal, Database, MonthlyTotals, SavingsSummary};
pub use error::{Error, Result};
pub use ml::categorizer::{categorize, CategoryPrediction, TextClassifier};
pub use ml::forecast::{heuristic_forecast, RidgeForecaster, DEFAULT_WINDOW};
pub use ml::store::ModelStore;
pub use models::{
    Budget, Goal, NewBudget, NewGoal, NewTransaction, NewUser, Role, Transaction, TxnKind, User,
};
