//! Pre-trained tree ensembles loaded from JSON artifacts.
//!
//! The regressor is a random forest (mean of tree outputs) and the classifier
//! a gradient-boosted softmax ensemble (argmax of per-class margins). Both are
//! validated on load so that a bad artifact fails at startup rather than on
//! the first request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::FEATURE_COLUMNS;
use crate::models::FeatureVector;

pub const STRESS_CLASSES: usize = 5;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact {path} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model artifact: {0}")]
    Invalid(String),
    #[error("classifier returned class {0}, expected 0..=4")]
    ClassOutOfRange(i64),
}

/// Anything that maps a feature vector to a continuous stress score.
pub trait Regressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// Per-feature weights, in model input order.
    fn feature_importances(&self) -> &[f64];
}

/// Anything that maps a feature vector to a zero-based class index.
pub trait Classifier {
    fn predict_class(&self, features: &FeatureVector) -> Result<i64, ModelError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitRule {
    /// sklearn: `x <= threshold` goes left.
    LessOrEqual,
    /// xgboost: `x < threshold` goes left.
    Less,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid("tree has no nodes".to_string()));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= n_features {
                    return Err(ModelError::Invalid(format!(
                        "node {index} splits on feature {feature} but model has {n_features}"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ModelError::Invalid(format!(
                        "node {index} has a non-finite threshold"
                    )));
                }
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(ModelError::Invalid(format!(
                            "node {index} has child {child} outside {}..{}",
                            index + 1,
                            self.nodes.len()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Children always point forward, so the walk terminates.
    fn evaluate(&self, row: &[f64], rule: SplitRule) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = row[*feature];
                    let go_left = match rule {
                        SplitRule::LessOrEqual => x <= *threshold,
                        SplitRule::Less => x < *threshold,
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForestRegressor {
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub feature_importances: Vec<f64>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForestRegressor {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".to_string()));
        }
        if self.n_features != FEATURE_COLUMNS.len() {
            return Err(ModelError::Invalid(format!(
                "regressor expects {} features, inputs have {}",
                self.n_features,
                FEATURE_COLUMNS.len()
            )));
        }
        if self.feature_importances.len() != self.n_features {
            return Err(ModelError::Invalid(format!(
                "{} feature importances for {} features",
                self.feature_importances.len(),
                self.n_features
            )));
        }
        if let Some(names) = &self.feature_names {
            if names.iter().map(String::as_str).ne(FEATURE_COLUMNS.iter().copied()) {
                return Err(ModelError::Invalid(format!(
                    "regressor was trained on {names:?}, expected {FEATURE_COLUMNS:?}"
                )));
            }
        }
        for tree in &self.trees {
            tree.validate(self.n_features)?;
        }
        Ok(())
    }
}

impl Regressor for RandomForestRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let row = features.as_row();
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.evaluate(&row, SplitRule::LessOrEqual))
            .sum();
        Ok(total / self.trees.len() as f64)
    }

    fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassTree {
    pub class: usize,
    #[serde(flatten)]
    pub tree: DecisionTree,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoostedClassifier {
    pub n_features: usize,
    pub n_classes: usize,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<ClassTree>,
}

impl BoostedClassifier {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_classes != STRESS_CLASSES {
            return Err(ModelError::Invalid(format!(
                "classifier has {} classes, expected {STRESS_CLASSES}",
                self.n_classes
            )));
        }
        if self.n_features != FEATURE_COLUMNS.len() {
            return Err(ModelError::Invalid(format!(
                "classifier expects {} features, inputs have {}",
                self.n_features,
                FEATURE_COLUMNS.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("booster has no trees".to_string()));
        }
        for entry in &self.trees {
            if entry.class >= self.n_classes {
                return Err(ModelError::Invalid(format!(
                    "tree assigned to class {} of {}",
                    entry.class, self.n_classes
                )));
            }
            entry.tree.validate(self.n_features)?;
        }
        Ok(())
    }

    pub fn margins(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
        let row = features.as_row();
        let mut margins = vec![self.base_score; self.n_classes];
        for entry in &self.trees {
            margins[entry.class] += entry.tree.evaluate(&row, SplitRule::Less);
        }
        Ok(margins)
    }
}

impl Classifier for BoostedClassifier {
    fn predict_class(&self, features: &FeatureVector) -> Result<i64, ModelError> {
        let margins = self.margins(features)?;
        let mut best = 0;
        for (class, margin) in margins.iter().enumerate() {
            if *margin > margins[best] {
                best = class;
            }
        }
        Ok(best as i64)
    }
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ModelError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_regressor(path: &Path) -> Result<RandomForestRegressor, ModelError> {
    let model: RandomForestRegressor = read_artifact(path)?;
    model.validate()?;
    tracing::info!(
        path = %path.display(),
        trees = model.trees.len(),
        "regressor loaded"
    );
    Ok(model)
}

pub fn load_classifier(path: &Path) -> Result<BoostedClassifier, ModelError> {
    let model: BoostedClassifier = read_artifact(path)?;
    model.validate()?;
    tracing::info!(
        path = %path.display(),
        trees = model.trees.len(),
        "classifier loaded"
    );
    Ok(model)
}

pub fn save_artifact<T: Serialize>(path: &Path, model: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(model)?;
    std::fs::write(path, json)?;
    Ok(())
}
