use ndarray::{Array1, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{
    LogisticRegression as SmartcoreLogistic, LogisticRegressionParameters,
};

use crate::config::{ClassifierConfig, LogisticRegressionParams};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{
    check_fit_input, check_n_features, from_dense, sigmoid, softmax, to_dense,
};

const NAME: &str = "logistic_regression";

#[derive(Debug, Clone)]
struct FittedLogistic {
    /// One row of weights for binary problems, one per class otherwise.
    coefficients: Array2<f64>,
    intercept: Array1<f64>,
    classes: Vec<u32>,
}

/// L2-regularised logistic regression.
///
/// smartcore fits the weights with L-BFGS; class probabilities are
/// recomputed here from the learned coefficients (sigmoid for two classes,
/// softmax otherwise).
#[derive(Debug)]
pub struct LogisticRegressionClassifier {
    params: LogisticRegressionParams,
    fitted: Option<FittedLogistic>,
}

impl LogisticRegressionClassifier {
    pub fn new(params: LogisticRegressionParams) -> Self {
        LogisticRegressionClassifier {
            params,
            fitted: None,
        }
    }

    /// Learned weights, `None` before fit.
    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.fitted.as_ref().map(|f| &f.coefficients)
    }
}

impl TrainableClassifier for LogisticRegressionClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::LogisticRegression(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.fitted = None;
        check_fit_input(NAME, x, y)?;
        let dense = to_dense(x).map_err(|e| ClassifierError::fit(NAME, e))?;
        let targets = y.to_vec();
        // sklearn's C scales the data term; smartcore's alpha scales the penalty
        let parameters = LogisticRegressionParameters::default().with_alpha(1.0 / self.params.c);

        log::debug!(
            "Fitting logistic regression (C={}) on {} samples x {} features",
            self.params.c,
            x.nrows(),
            x.ncols()
        );

        let model = SmartcoreLogistic::<f64, u32, DenseMatrix<f64>, Vec<u32>>::fit(
            &dense, &targets, parameters,
        )
        .map_err(|e| ClassifierError::fit(NAME, e))?;

        let coefficients = from_dense(model.coefficients());
        let intercept = from_dense(model.intercept()).column(0).to_owned();
        if coefficients.iter().chain(intercept.iter()).any(|w| !w.is_finite()) {
            return Err(ClassifierError::fit(
                NAME,
                smartcore::error::Failed::fit("optimizer produced non-finite weights"),
            ));
        }

        self.fitted = Some(FittedLogistic {
            coefficients,
            intercept,
            classes: model.classes().clone(),
        });
        Ok(())
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ClassifierError::unfitted(NAME))?;
        check_n_features(NAME, fitted.coefficients.ncols(), x)?;

        let scores = x.dot(&fitted.coefficients.t()) + &fitted.intercept;
        let n_classes = fitted.classes.len();
        let mut proba = Array2::<f64>::zeros((x.nrows(), n_classes));
        for (r, row) in scores.rows().into_iter().enumerate() {
            if n_classes == 2 {
                let p = sigmoid(row[0]);
                proba[(r, 0)] = 1.0 - p;
                proba[(r, 1)] = p;
            } else {
                for (c, p) in softmax(row).into_iter().enumerate() {
                    proba[(r, c)] = p;
                }
            }
        }
        Ok(proba)
    }

    fn classes(&self) -> Result<&[u32]> {
        self.fitted
            .as_ref()
            .map(|f| f.classes.as_slice())
            .ok_or_else(|| ClassifierError::unfitted(NAME))
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn clone_unfitted(&self) -> Box<dyn TrainableClassifier> {
        Box::new(LogisticRegressionClassifier::new(self.params.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_binary_probabilities_follow_the_margin() {
        let x = arr2(&[[-2.0], [-1.5], [-1.0], [-0.5], [0.5], [1.0], [1.5], [2.0]]);
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let mut lr = LogisticRegressionClassifier::new(LogisticRegressionParams::default());
        lr.fit(&x, &y).unwrap();
        assert_eq!(lr.coefficients().unwrap().dim(), (1, 1));

        let proba = lr.predict_probabilities(&arr2(&[[-3.0], [0.0], [3.0]])).unwrap();
        assert!(proba[(0, 0)] > 0.8);
        assert!(proba[(2, 1)] > 0.8);
        assert!((proba[(1, 1)] - 0.5).abs() < 0.1);
        assert_eq!(lr.predict(&arr2(&[[-3.0], [3.0]])).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_multiclass_softmax() {
        let x = arr2(&[
            [0.0, 0.0],
            [0.2, 0.1],
            [4.0, 0.0],
            [4.2, 0.1],
            [0.0, 4.0],
            [0.1, 4.2],
        ]);
        let y = vec![0, 0, 1, 1, 2, 2];
        let mut lr = LogisticRegressionClassifier::new(LogisticRegressionParams::default());
        lr.fit(&x, &y).unwrap();
        let proba = lr.predict_probabilities(&x).unwrap();
        assert_eq!(proba.dim(), (6, 3));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(lr.predict(&x).unwrap(), y);
    }
}
