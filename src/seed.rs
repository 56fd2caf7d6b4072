//! Demo artifacts so the analyzer runs end to end without a training step.
//!
//! Every feature contributes a 1..=5 stress reading (sleep, academic
//! performance and extracurricular activity count inversely, study load
//! directly). The regressor averages those readings; the classifier scores
//! each class by its squared distance from them.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::config::AppConfig;
use crate::dataset::FEATURE_COLUMNS;
use crate::predictor::{
    save_artifact, BoostedClassifier, ClassTree, DecisionTree, RandomForestRegressor, TreeNode,
    STRESS_CLASSES,
};

/// Whether a high score on each feature raises stress.
const RAISES_STRESS: [bool; 4] = [false, false, true, false];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub config: AppConfig,
    pub rows: usize,
}

#[derive(Serialize)]
struct DatasetRow {
    #[serde(rename = "SleepQuality")]
    sleep: u8,
    #[serde(rename = "AcademicPerf")]
    academic: u8,
    #[serde(rename = "StudyLoad")]
    study: u8,
    #[serde(rename = "Extracurricular")]
    extracurricular: u8,
    #[serde(rename = "StressLevel")]
    stress_level: u8,
}

fn reading(feature: usize, value: u8) -> f64 {
    if RAISES_STRESS[feature] {
        f64::from(value)
    } else {
        f64::from(6 - value)
    }
}

/// A chain of splits at 1.5, 2.5, 3.5 and 4.5 with one leaf per score.
fn ladder(feature: usize, leaves: [f64; 5]) -> DecisionTree {
    let mut nodes = Vec::with_capacity(9);
    for (step, leaf) in leaves.iter().take(4).enumerate() {
        let here = nodes.len();
        nodes.push(TreeNode::Split {
            feature,
            threshold: step as f64 + 1.5,
            left: here + 1,
            right: here + 2,
        });
        nodes.push(TreeNode::Leaf { value: *leaf });
    }
    nodes.push(TreeNode::Leaf { value: leaves[4] });
    DecisionTree { nodes }
}

fn leaves(feature: usize, f: impl Fn(f64) -> f64) -> [f64; 5] {
    [1, 2, 3, 4, 5].map(|value| f(reading(feature, value)))
}

pub fn demo_regressor() -> RandomForestRegressor {
    RandomForestRegressor {
        n_features: FEATURE_COLUMNS.len(),
        feature_names: Some(FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()),
        feature_importances: vec![0.25; FEATURE_COLUMNS.len()],
        trees: (0..FEATURE_COLUMNS.len())
            .map(|feature| ladder(feature, leaves(feature, |r| r)))
            .collect(),
    }
}

pub fn demo_classifier() -> BoostedClassifier {
    let mut trees = Vec::new();
    for class in 0..STRESS_CLASSES {
        let category = class as f64 + 1.0;
        for feature in 0..FEATURE_COLUMNS.len() {
            trees.push(ClassTree {
                class,
                tree: ladder(feature, leaves(feature, |r| -(r - category).powi(2) / 4.0)),
            });
        }
    }
    BoostedClassifier {
        n_features: FEATURE_COLUMNS.len(),
        n_classes: STRESS_CLASSES,
        base_score: 0.5,
        trees,
    }
}

fn demo_rows() -> Vec<DatasetRow> {
    let mut rows = Vec::with_capacity(625);
    for sleep in 1..=5 {
        for academic in 1..=5 {
            for study in 1..=5 {
                for extracurricular in 1..=5 {
                    let values = [sleep, academic, study, extracurricular];
                    let mean = values
                        .iter()
                        .enumerate()
                        .map(|(feature, value)| reading(feature, *value))
                        .sum::<f64>()
                        / values.len() as f64;
                    rows.push(DatasetRow {
                        sleep,
                        academic,
                        study,
                        extracurricular,
                        stress_level: mean.round().clamp(1.0, 5.0) as u8,
                    });
                }
            }
        }
    }
    rows
}

pub fn seed(dir: &Path, force: bool) -> anyhow::Result<SeedSummary> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let config = AppConfig::in_dir(dir);

    if !force {
        for path in [&config.regressor_path, &config.classifier_path, &config.dataset_path] {
            if path.exists() {
                anyhow::bail!("{} already exists; pass --force to overwrite", path.display());
            }
        }
    }

    save_artifact(&config.regressor_path, &demo_regressor())
        .with_context(|| format!("failed to write {}", config.regressor_path.display()))?;
    save_artifact(&config.classifier_path, &demo_classifier())
        .with_context(|| format!("failed to write {}", config.classifier_path.display()))?;

    let rows = demo_rows();
    let mut writer = csv::Writer::from_path(&config.dataset_path)
        .with_context(|| format!("failed to write {}", config.dataset_path.display()))?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!(dir = %dir.display(), rows = rows.len(), "demo artifacts written");
    Ok(SeedSummary {
        config,
        rows: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::models::{FeatureVector, StressBand};
    use crate::predictor::{load_classifier, load_regressor, Classifier, Regressor};
    use crate::stress::compute_prediction;

    #[test]
    fn ladder_returns_one_leaf_per_score() {
        let tree = ladder(0, [10.0, 20.0, 30.0, 40.0, 50.0]);
        let model = RandomForestRegressor {
            n_features: 4,
            feature_names: None,
            feature_importances: vec![0.25; 4],
            trees: vec![tree],
        };
        model.validate().unwrap();
        for (value, expected) in [(1, 10.0), (3, 30.0), (5, 50.0)] {
            let features = FeatureVector::new(value, 1, 1, 1).unwrap();
            assert_eq!(model.predict(&features).unwrap(), expected);
        }
    }

    #[test]
    fn demo_models_validate() {
        demo_regressor().validate().unwrap();
        demo_classifier().validate().unwrap();
    }

    #[test]
    fn demo_models_agree_on_midpoint() {
        let features = FeatureVector::default();
        let result = compute_prediction(&features, &demo_regressor(), &demo_classifier()).unwrap();
        assert_eq!(result.regression_score, 3.0);
        assert_eq!(result.category, 3);
        assert_eq!(result.band, StressBand::Moderate);
    }

    #[test]
    fn demo_classifier_tracks_extremes() {
        let calm = FeatureVector::new(5, 5, 1, 5).unwrap();
        let strained = FeatureVector::new(1, 1, 5, 1).unwrap();
        assert_eq!(demo_classifier().predict_class(&calm).unwrap(), 0);
        assert_eq!(demo_classifier().predict_class(&strained).unwrap(), 4);
    }

    #[test]
    fn seed_writes_loadable_artifacts() {
        let dir = std::env::temp_dir().join(uuid::Uuid::new_v4().to_string());
        let summary = seed(&dir, false).unwrap();
        assert_eq!(summary.rows, 625);

        load_regressor(&summary.config.regressor_path).unwrap();
        load_classifier(&summary.config.classifier_path).unwrap();
        let dataset = Dataset::load(&summary.config.dataset_path).unwrap();
        dataset.validate().unwrap();
        assert_eq!(dataset.len(), 625);

        assert!(seed(&dir, false).is_err());
        assert!(seed(&dir, true).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }
}
