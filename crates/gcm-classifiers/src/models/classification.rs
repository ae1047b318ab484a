use std::fmt;

use ndarray::{Array1, Array2};
use smartcore::error::Failed;

use crate::config::ClassifierConfig;
use crate::data::{shape_into_2d, LabelEncoder, Value};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::preprocessing::{apply_one_hot_encoding, fit_one_hot_encoders, OneHotEncoders};

/// The classification interface the causal-model layer programs against.
///
/// Features are `Array2<Value>` so categorical columns can be passed as-is;
/// labels may be numbers or strings.
pub trait ClassificationModel: fmt::Debug + Send {
    /// Train on `x` with one label per row, replacing any previous fit.
    fn fit(&mut self, x: &Array2<Value>, y: &Array1<Value>) -> Result<()>;

    /// Most probable label per sample as an `[n_samples, 1]` array.
    fn predict(&self, x: &Array2<Value>) -> Result<Array2<Value>>;

    /// `[n_samples, n_classes]` probabilities, columns ordered as `classes()`.
    fn predict_class_probabilities(&self, x: &Array2<Value>) -> Result<Array2<f64>>;

    /// Labels seen at fit time, in probability column order.
    fn classes(&self) -> Result<Vec<Value>>;

    /// An unfitted model with the same hyper-parameters.
    fn clone_model(&self) -> Box<dyn ClassificationModel>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct FittedState {
    encoders: OneHotEncoders,
    labels: LabelEncoder,
}

/// Wraps any [`TrainableClassifier`] behind [`ClassificationModel`].
///
/// The adapter owns the data-side work: categorical columns are one-hot
/// encoded with encoders fixed at fit time, and labels are mapped to the
/// dense class codes the estimator trains on.
#[derive(Debug)]
pub struct ClassifierAdapter {
    estimator: Box<dyn TrainableClassifier>,
    state: Option<FittedState>,
}

impl ClassifierAdapter {
    pub fn new(estimator: Box<dyn TrainableClassifier>) -> Self {
        ClassifierAdapter {
            estimator,
            state: None,
        }
    }

    /// Same as `clone_model`, keeping the concrete type.
    pub fn clone_unfitted(&self) -> ClassifierAdapter {
        ClassifierAdapter::new(self.estimator.clone_unfitted())
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn config(&self) -> ClassifierConfig {
        self.estimator.config()
    }

    fn fitted_state(&self) -> Result<&FittedState> {
        self.state
            .as_ref()
            .ok_or_else(|| ClassifierError::unfitted(self.estimator.name()))
    }

    fn encode_features(&self, state: &FittedState, x: &Array2<Value>) -> Result<Array2<f64>> {
        if x.nrows() == 0 {
            return Err(ClassifierError::invalid_input(format!(
                "{} cannot predict on an empty feature matrix",
                self.estimator.name()
            )));
        }
        let features = apply_one_hot_encoding(x, &state.encoders)?;
        if let Some(((r, c), v)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ClassifierError::invalid_input(format!(
                "{} received non-finite feature value {} at row {}, encoded column {}",
                self.estimator.name(),
                v,
                r,
                c
            )));
        }
        Ok(features)
    }
}

impl ClassificationModel for ClassifierAdapter {
    fn fit(&mut self, x: &Array2<Value>, y: &Array1<Value>) -> Result<()> {
        self.state = None;
        let name = self.estimator.name();
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ClassifierError::invalid_input(format!(
                "{} needs a non-empty feature matrix, got {:?}",
                name,
                x.dim()
            )));
        }
        if x.nrows() != y.len() {
            return Err(ClassifierError::invalid_input(format!(
                "{}: {} samples but {} labels",
                name,
                x.nrows(),
                y.len()
            )));
        }

        let labels = LabelEncoder::fit(y);
        if labels.n_classes() < 2 {
            return Err(ClassifierError::invalid_input(format!(
                "{} needs at least two distinct labels, got {}",
                name,
                labels.n_classes()
            )));
        }
        let encoders = fit_one_hot_encoders(x);
        let features = apply_one_hot_encoding(x, &encoders)?;
        let codes = labels.encode(y)?;

        log::debug!(
            "Fitting {} on {} samples: {} columns ({} categorical) -> {} features, {} classes",
            name,
            x.nrows(),
            x.ncols(),
            encoders.encoders.len(),
            features.ncols(),
            labels.n_classes()
        );

        self.estimator.fit(&features, &codes)?;
        self.state = Some(FittedState { encoders, labels });
        Ok(())
    }

    fn predict(&self, x: &Array2<Value>) -> Result<Array2<Value>> {
        let state = self.fitted_state()?;
        let features = self.encode_features(state, x)?;
        let predicted = self
            .estimator
            .predict(&features)?
            .into_iter()
            .map(|code| state.labels.decode(code).cloned())
            .collect::<Result<Vec<Value>>>()?;
        shape_into_2d(Array1::from(predicted))
    }

    fn predict_class_probabilities(&self, x: &Array2<Value>) -> Result<Array2<f64>> {
        let state = self.fitted_state()?;
        let features = self.encode_features(state, x)?;
        let proba = self.estimator.predict_probabilities(&features)?;
        let expected = (x.nrows(), state.labels.n_classes());
        if proba.dim() != expected {
            return Err(ClassifierError::prediction(
                self.estimator.name(),
                Failed::predict(&format!(
                    "probability output has shape {:?}, expected {:?}",
                    proba.dim(),
                    expected
                )),
            ));
        }
        Ok(proba)
    }

    fn classes(&self) -> Result<Vec<Value>> {
        let state = self.fitted_state()?;
        self.estimator
            .classes()?
            .iter()
            .map(|code| state.labels.decode(*code).cloned())
            .collect()
    }

    fn clone_model(&self) -> Box<dyn ClassificationModel> {
        Box::new(self.clone_unfitted())
    }

    fn name(&self) -> &'static str {
        self.estimator.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogisticRegressionParams;
    use crate::models::logistic::LogisticRegressionClassifier;
    use ndarray::{arr1, arr2};

    fn adapter() -> ClassifierAdapter {
        ClassifierAdapter::new(Box::new(LogisticRegressionClassifier::new(
            LogisticRegressionParams::default(),
        )))
    }

    #[test]
    fn test_string_labels_round_trip_through_codes() {
        let x = arr2(&[[0.0], [0.5], [1.0], [4.0], [4.5], [5.0]]).mapv(Value::Numeric);
        let y = arr1(&["low", "low", "low", "high", "high", "high"]).mapv(Value::from);
        let mut model = adapter();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.classes().unwrap(), vec![Value::from("high"), Value::from("low")]);

        let predicted = model.predict(&arr2(&[[0.2], [4.8]]).mapv(Value::Numeric)).unwrap();
        assert_eq!(predicted.dim(), (2, 1));
        assert_eq!(predicted[(0, 0)], Value::from("low"));
        assert_eq!(predicted[(1, 0)], Value::from("high"));
    }

    #[test]
    fn test_failed_fit_leaves_model_unfit() {
        let x = arr2(&[[0.0], [1.0]]).mapv(Value::Numeric);
        let mut model = adapter();
        model
            .fit(&x, &arr1(&[0.0, 1.0]).mapv(Value::Numeric))
            .unwrap();
        assert!(model.is_fitted());

        let err = model.fit(&x, &arr1(&[1.0, 1.0]).mapv(Value::Numeric));
        assert!(matches!(err, Err(ClassifierError::InvalidInput(_))));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_empty_predict_input() {
        let x = arr2(&[[0.0], [1.0], [2.0], [3.0]]).mapv(Value::Numeric);
        let mut model = adapter();
        model
            .fit(&x, &arr1(&[0.0, 0.0, 1.0, 1.0]).mapv(Value::Numeric))
            .unwrap();
        let empty = Array2::<Value>::from_shape_vec((0, 1), vec![]).unwrap();
        assert!(matches!(
            model.predict_class_probabilities(&empty),
            Err(ClassifierError::InvalidInput(_))
        ));
    }
}
