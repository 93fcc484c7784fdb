//! Model artifact persistence
//!
//! Artifacts are JSON files under the models directory:
//!
//! ```text
//! models/
//!   categorizer.json
//!   spend/global_cat_<category>.json
//!   insights/user_<id>.json
//!   insights/global.json
//! ```
//!
//! Writes go through a temp file and an atomic rename so a crash mid-write
//! never leaves a truncated artifact behind.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::categorizer::TextClassifier;
use super::forecast::RidgeForecaster;
use crate::error::Result;

/// Filesystem-safe name for a category ("Food & Beverage" -> "food___beverage")
pub fn safe_name(category: &str) -> String {
    category
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Reads and writes model artifacts under a base directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    base: PathBuf,
}

impl ModelStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn categorizer_path(&self) -> PathBuf {
        self.base.join("categorizer.json")
    }

    fn spend_path(&self, category: &str) -> PathBuf {
        self.base
            .join("spend")
            .join(format!("global_cat_{}.json", safe_name(category)))
    }

    fn user_insight_path(&self, user_id: i64) -> PathBuf {
        self.base.join("insights").join(format!("user_{}.json", user_id))
    }

    fn global_insight_path(&self) -> PathBuf {
        self.base.join("insights").join("global.json")
    }

    pub fn save_categorizer(&self, model: &TextClassifier) -> Result<()> {
        self.write_json(&self.categorizer_path(), model)
    }

    pub fn load_categorizer(&self) -> Result<Option<TextClassifier>> {
        self.read_json(&self.categorizer_path())
    }

    pub fn save_spend_model(&self, category: &str, model: &RidgeForecaster) -> Result<()> {
        self.write_json(&self.spend_path(category), model)
    }

    pub fn load_spend_model(&self, category: &str) -> Result<Option<RidgeForecaster>> {
        self.read_json(&self.spend_path(category))
    }

    pub fn save_user_insight_model(&self, user_id: i64, model: &RidgeForecaster) -> Result<()> {
        self.write_json(&self.user_insight_path(user_id), model)
    }

    pub fn load_user_insight_model(&self, user_id: i64) -> Result<Option<RidgeForecaster>> {
        self.read_json(&self.user_insight_path(user_id))
    }

    pub fn save_global_insight_model(&self, model: &RidgeForecaster) -> Result<()> {
        self.write_json(&self.global_insight_path(), model)
    }

    pub fn load_global_insight_model(&self) -> Result<Option<RidgeForecaster>> {
        self.read_json(&self.global_insight_path())
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let dir = path.parent().unwrap_or(&self.base);
        std::fs::create_dir_all(dir)?;

        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&tmp, value)?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(path = %path.display(), "Saved model artifact");
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecaster() -> RidgeForecaster {
        let series: Vec<f64> = (1..=12).map(|m| 100.0 * m as f64).collect();
        RidgeForecaster::fit(&series, 3, false).unwrap()
    }

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("Food & Beverage"), "food___beverage");
        assert_eq!(safe_name("Transport"), "transport");
        assert_eq!(safe_name("Home/Garden"), "home_garden");
    }

    #[test]
    fn test_spend_model_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());

        assert!(store.load_spend_model("Food & Beverage").unwrap().is_none());

        let model = forecaster();
        store.save_spend_model("Food & Beverage", &model).unwrap();

        let restored = store.load_spend_model("Food & Beverage").unwrap().unwrap();
        assert_eq!(restored.coefficients, model.coefficients);
        assert!(dir
            .path()
            .join("spend/global_cat_food___beverage.json")
            .exists());
    }

    #[test]
    fn test_insight_model_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());

        store.save_user_insight_model(42, &forecaster()).unwrap();
        store.save_global_insight_model(&forecaster()).unwrap();

        assert!(dir.path().join("insights/user_42.json").exists());
        assert!(dir.path().join("insights/global.json").exists());
        assert!(store.load_user_insight_model(42).unwrap().is_some());
        assert!(store.load_user_insight_model(7).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_artifact_is_an_error_not_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        std::fs::write(dir.path().join("categorizer.json"), b"not json").unwrap();
        assert!(store.load_categorizer().is_err());
    }
}
