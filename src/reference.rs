#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelMetrics {
    pub name: &'static str,
    pub r2: f64,
    pub rmse: Option<f64>,
    pub accuracy: f64,
}

impl ModelMetrics {
    /// Larger is better, so RMSE can share an axis with R² and accuracy.
    pub fn inverted_rmse(&self) -> f64 {
        self.rmse.map_or(0.0, |rmse| 1.0 / rmse)
    }

    pub fn triple(&self) -> (f64, f64, f64) {
        (self.r2, self.inverted_rmse(), self.accuracy)
    }
}

pub const SERIES: [&str; 3] = ["R² Score", "RMSE (Inverted)", "Accuracy"];

/// Illustrative scores for ten model families, shown as-is on the comparison
/// chart. They are fixed constants and say nothing about the loaded artifacts.
pub const MODEL_COMPARISON: [ModelMetrics; 10] = [
    ModelMetrics { name: "Simple Linear Regression", r2: 0.121, rmse: Some(1.257), accuracy: 0.0 },
    ModelMetrics { name: "Multiple Linear Regression", r2: 0.1356, rmse: Some(1.2467), accuracy: 0.0 },
    ModelMetrics { name: "Polynomial Regression", r2: 0.1456, rmse: Some(1.2394), accuracy: 0.0 },
    ModelMetrics { name: "Decision Tree Regression", r2: 0.372, rmse: Some(1.096), accuracy: 0.0 },
    ModelMetrics { name: "Random Forest Regression", r2: 0.684, rmse: Some(0.777), accuracy: 0.0 },
    ModelMetrics { name: "Logistic Regression", r2: 0.0, rmse: None, accuracy: 0.7266 },
    ModelMetrics { name: "KNN Classifier", r2: 0.0, rmse: None, accuracy: 0.43 },
    ModelMetrics { name: "Naive Bayes", r2: 0.0, rmse: None, accuracy: 0.71 },
    ModelMetrics { name: "SVM Classifier", r2: 0.0, rmse: None, accuracy: 0.85 },
    ModelMetrics { name: "XGBoost Classifier", r2: 0.86, rmse: None, accuracy: 0.86 },
];

pub fn comparison_series() -> (Vec<&'static str>, [Vec<f64>; 3]) {
    let names = MODEL_COMPARISON.iter().map(|m| m.name).collect();
    let mut series: [Vec<f64>; 3] = Default::default();
    for (r2, rmse_inv, accuracy) in MODEL_COMPARISON.iter().map(ModelMetrics::triple) {
        series[0].push(r2);
        series[1].push(rmse_inv);
        series[2].push(accuracy);
    }
    (names, series)
}
