use crate::models::{FeatureVector, PredictionResult, StressBand};
use crate::predictor::{Classifier, ModelError, Regressor, STRESS_CLASSES};

pub fn compute_prediction(
    features: &FeatureVector,
    regressor: &dyn Regressor,
    classifier: &dyn Classifier,
) -> Result<PredictionResult, ModelError> {
    let regression_score = regressor.predict(features)?;
    let category = category_from_class(classifier.predict_class(features)?)?;
    let combined = combined_score(regression_score, category);

    Ok(PredictionResult {
        features: *features,
        regression_score,
        category,
        combined,
        band: StressBand::from_combined(combined),
    })
}

/// Rebases a zero-based class index onto the 1..=5 category scale.
pub fn category_from_class(class: i64) -> Result<u8, ModelError> {
    if (0..STRESS_CLASSES as i64).contains(&class) {
        Ok(class as u8 + 1)
    } else {
        Err(ModelError::ClassOutOfRange(class))
    }
}

pub fn combined_score(regression_score: f64, category: u8) -> f64 {
    (regression_score + f64::from(category)) / 2.0
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct FixedRegressor {
        score: f64,
        seen: RefCell<Vec<[f64; 4]>>,
    }

    impl FixedRegressor {
        fn new(score: f64) -> Self {
            Self {
                score,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Regressor for FixedRegressor {
        fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
            self.seen.borrow_mut().push(features.as_row());
            Ok(self.score)
        }

        fn feature_importances(&self) -> &[f64] {
            &[0.25; 4]
        }
    }

    struct FixedClassifier {
        class: i64,
        seen: RefCell<Vec<[f64; 4]>>,
    }

    impl FixedClassifier {
        fn new(class: i64) -> Self {
            Self {
                class,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn predict_class(&self, features: &FeatureVector) -> Result<i64, ModelError> {
            self.seen.borrow_mut().push(features.as_row());
            Ok(self.class)
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict_class(&self, _features: &FeatureVector) -> Result<i64, ModelError> {
            Err(ModelError::Invalid("booster has no trees".to_string()))
        }
    }

    fn predict(scores: [i64; 4], regression: f64, class: i64) -> PredictionResult {
        let features = FeatureVector::new(scores[0], scores[1], scores[2], scores[3]).unwrap();
        compute_prediction(
            &features,
            &FixedRegressor::new(regression),
            &FixedClassifier::new(class),
        )
        .unwrap()
    }

    #[test]
    fn midpoint_inputs_give_moderate_stress() {
        let result = predict([3, 3, 3, 3], 3.0, 2);
        assert_eq!(result.category, 3);
        assert_eq!(result.combined, 3.0);
        assert_eq!(result.label(), "Moderate Stress");
        assert_eq!(result.advice(), "Improve sleep & reduce workload where possible.");
    }

    #[test]
    fn best_inputs_give_very_low_stress() {
        let result = predict([5, 5, 5, 5], 1.0, 0);
        assert_eq!(result.category, 1);
        assert_eq!(result.combined, 1.0);
        assert_eq!(result.label(), "Very Low Stress");
        assert_eq!(result.advice(), "Maintain your routine; you're doing great!");
    }

    #[test]
    fn worst_inputs_give_very_high_stress() {
        let result = predict([1, 1, 1, 1], 5.0, 4);
        assert_eq!(result.category, 5);
        assert_eq!(result.combined, 5.0);
        assert_eq!(result.label(), "Very High Stress");
        assert_eq!(result.advice(), "Seek help immediately; prioritize your well-being.");
    }

    #[test]
    fn regression_score_is_not_clamped() {
        let result = predict([3, 3, 3, 3], 7.5, 4);
        assert_eq!(result.regression_score, 7.5);
        assert_eq!(result.combined, 6.25);
        assert_eq!(result.band, StressBand::VeryHigh);
    }

    #[test]
    fn both_models_see_the_same_ordered_row() {
        let regressor = FixedRegressor::new(2.0);
        let classifier = FixedClassifier::new(1);
        let features = FeatureVector::new(1, 2, 3, 4).unwrap();
        compute_prediction(&features, &regressor, &classifier).unwrap();
        assert_eq!(regressor.seen.borrow().as_slice(), &[[1.0, 2.0, 3.0, 4.0]]);
        assert_eq!(classifier.seen.borrow().as_slice(), &[[1.0, 2.0, 3.0, 4.0]]);
    }

    #[test]
    fn category_stays_within_scale() {
        for class in 0..5 {
            let category = category_from_class(class).unwrap();
            assert!((1..=5).contains(&category));
        }
        assert!(matches!(category_from_class(5), Err(ModelError::ClassOutOfRange(5))));
        assert!(matches!(category_from_class(-1), Err(ModelError::ClassOutOfRange(-1))));
    }

    #[test]
    fn classifier_failure_propagates() {
        let features = FeatureVector::default();
        let result = compute_prediction(&features, &FixedRegressor::new(3.0), &FailingClassifier);
        assert!(matches!(result, Err(ModelError::Invalid(_))));
    }
}
