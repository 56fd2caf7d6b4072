use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "STRESS_ANALYZER_HOME";
pub const REGRESSOR_FILE: &str = "rf_model.json";
pub const CLASSIFIER_FILE: &str = "xgb_model.json";
pub const DATASET_FILE: &str = "Combined_Student_Stress.csv";

/// Where the two model artifacts and the dashboard dataset live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub regressor_path: PathBuf,
    pub classifier_path: PathBuf,
    pub dataset_path: PathBuf,
}

impl AppConfig {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            regressor_path: dir.join(REGRESSOR_FILE),
            classifier_path: dir.join(CLASSIFIER_FILE),
            dataset_path: dir.join(DATASET_FILE),
        }
    }

    /// Explicit paths win; otherwise files are looked up in `home`
    /// (normally `$STRESS_ANALYZER_HOME`) or the working directory.
    pub fn resolve(
        home: Option<PathBuf>,
        regressor: Option<PathBuf>,
        classifier: Option<PathBuf>,
        dataset: Option<PathBuf>,
    ) -> Self {
        let defaults = Self::in_dir(&home.unwrap_or_else(|| PathBuf::from(".")));
        Self {
            regressor_path: regressor.unwrap_or(defaults.regressor_path),
            classifier_path: classifier.unwrap_or(defaults.classifier_path),
            dataset_path: dataset.unwrap_or(defaults.dataset_path),
        }
    }

    pub fn from_env(
        regressor: Option<PathBuf>,
        classifier: Option<PathBuf>,
        dataset: Option<PathBuf>,
    ) -> Self {
        let home = std::env::var_os(HOME_ENV).map(PathBuf::from);
        Self::resolve(home, regressor, classifier, dataset)
    }
}
