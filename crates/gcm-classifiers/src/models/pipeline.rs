use ndarray::Array2;

use crate::config::{ClassifierConfig, PolynomialLogisticParams};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::logistic::LogisticRegressionClassifier;
use crate::preprocessing::PolynomialFeatures;

const NAME: &str = "polynomial_logistic_regression";

/// Polynomial feature expansion followed by logistic regression.
///
/// Callers pass raw features; the expansion is part of the model and is
/// applied identically at fit and predict time.
#[derive(Debug)]
pub struct PolynomialLogisticRegression {
    params: PolynomialLogisticParams,
    expansion: PolynomialFeatures,
    logistic: LogisticRegressionClassifier,
    n_features: Option<usize>,
}

impl PolynomialLogisticRegression {
    pub fn new(params: PolynomialLogisticParams) -> Self {
        PolynomialLogisticRegression {
            expansion: PolynomialFeatures::new(params.degree),
            logistic: LogisticRegressionClassifier::new(params.logistic()),
            params,
            n_features: None,
        }
    }

    pub fn expansion(&self) -> &PolynomialFeatures {
        &self.expansion
    }
}

impl TrainableClassifier for PolynomialLogisticRegression {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::PolynomialLogisticRegression(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.n_features = None;
        let expanded = self.expansion.transform(x);
        log::trace!(
            "Polynomial expansion of degree {}: {} -> {} features",
            self.expansion.degree,
            x.ncols(),
            expanded.ncols()
        );
        self.logistic.fit(&expanded, y)?;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let n_features = self.n_features.ok_or_else(|| ClassifierError::unfitted(NAME))?;
        if x.ncols() != n_features {
            return Err(ClassifierError::invalid_input(format!(
                "{} was fitted on {} features, got {}",
                NAME,
                n_features,
                x.ncols()
            )));
        }
        self.logistic.predict_probabilities(&self.expansion.transform(x))
    }

    fn classes(&self) -> Result<&[u32]> {
        if self.n_features.is_none() {
            return Err(ClassifierError::unfitted(NAME));
        }
        self.logistic.classes()
    }

    fn is_fitted(&self) -> bool {
        self.n_features.is_some()
    }

    fn clone_unfitted(&self) -> Box<dyn TrainableClassifier> {
        Box::new(PolynomialLogisticRegression::new(self.params.clone()))
    }
}
