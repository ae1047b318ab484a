use std::f64::consts::PI;

use ndarray::{Array2, Axis};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::naive_bayes::gaussian::{GaussianNB, GaussianNBParameters};

use crate::config::{ClassifierConfig, GaussianNbParams};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{check_fit_input, check_n_features, to_dense};

const NAME: &str = "gaussian_nb";

#[derive(Debug, Clone)]
struct FittedNb {
    /// Labels with at least one training sample; rows of `theta`/`var`.
    present: Vec<u32>,
    log_priors: Vec<f64>,
    theta: Vec<Vec<f64>>,
    /// Per-class feature variances with smoothing already added.
    var: Vec<Vec<f64>>,
    classes: Vec<u32>,
}

/// Gaussian naive Bayes.
///
/// Class means, variances and priors come from smartcore; the posterior is
/// evaluated here in log space so the variance smoothing can be applied and
/// probabilities stay finite for far-away points.
#[derive(Debug)]
pub struct GaussianNbClassifier {
    params: GaussianNbParams,
    fitted: Option<FittedNb>,
}

impl GaussianNbClassifier {
    pub fn new(params: GaussianNbParams) -> Self {
        GaussianNbClassifier {
            params,
            fitted: None,
        }
    }
}

impl TrainableClassifier for GaussianNbClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::GaussianNb(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.fitted = None;
        let n_classes = check_fit_input(NAME, x, y)?;
        let mut present = y.to_vec();
        present.sort_unstable();
        present.dedup();

        let mut parameters = <GaussianNBParameters as Default>::default();
        if let Some(priors) = &self.params.priors {
            if priors.len() != present.len() {
                return Err(ClassifierError::invalid_input(format!(
                    "{}: {} priors given for {} classes",
                    NAME,
                    priors.len(),
                    present.len()
                )));
            }
            parameters = parameters.with_priors(priors.clone());
        }

        let dense = to_dense(x).map_err(|e| ClassifierError::fit(NAME, e))?;
        let targets = y.to_vec();
        let model =
            GaussianNB::<f64, u32, DenseMatrix<f64>, Vec<u32>>::fit(&dense, &targets, parameters)
                .map_err(|e| ClassifierError::fit(NAME, e))?;

        let max_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .copied()
            .fold(0.0f64, f64::max);
        let epsilon = (self.params.var_smoothing * max_var).max(1e-12);
        log::debug!(
            "Fitting Gaussian naive Bayes on {} samples, variance smoothing {:e}",
            x.nrows(),
            epsilon
        );

        let var: Vec<Vec<f64>> = model
            .var()
            .iter()
            .map(|row| row.iter().map(|v| v + epsilon).collect())
            .collect();
        let log_priors: Vec<f64> = model
            .class_priors()
            .iter()
            .map(|p| if *p > 0.0 { p.ln() } else { f64::NEG_INFINITY })
            .collect();

        self.fitted = Some(FittedNb {
            present: model.classes().clone(),
            log_priors,
            theta: model.theta().clone(),
            var,
            classes: (0..n_classes as u32).collect(),
        });
        Ok(())
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ClassifierError::unfitted(NAME))?;
        let n_features = fitted.theta.first().map_or(0, Vec::len);
        check_n_features(NAME, n_features, x)?;

        let mut proba = Array2::<f64>::zeros((x.nrows(), fitted.classes.len()));
        for (r, row) in x.rows().into_iter().enumerate() {
            let joint: Vec<f64> = (0..fitted.present.len())
                .map(|c| {
                    let log_likelihood: f64 = row
                        .iter()
                        .zip(&fitted.theta[c])
                        .zip(&fitted.var[c])
                        .map(|((v, mean), var)| {
                            -0.5 * (2.0 * PI * var).ln() - (v - mean).powi(2) / (2.0 * var)
                        })
                        .sum();
                    fitted.log_priors[c] + log_likelihood
                })
                .collect();
            let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let total: f64 = joint.iter().map(|j| (j - max).exp()).sum();
            for (label, j) in fitted.present.iter().zip(&joint) {
                proba[(r, *label as usize)] = (j - max).exp() / total;
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
        Box::new(GaussianNbClassifier::new(self.params.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_posterior_near_class_means() {
        let x = arr2(&[[0.0, 1.0], [0.5, 0.8], [-0.3, 1.2], [5.0, -1.0], [5.4, -0.7], [4.8, -1.3]]);
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut nb = GaussianNbClassifier::new(GaussianNbParams::default());
        nb.fit(&x, &y).unwrap();
        let proba = nb
            .predict_probabilities(&arr2(&[[0.1, 1.0], [5.1, -1.0], [100.0, 100.0]]))
            .unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|p| p.is_finite()));
        }
        assert!(proba[(0, 0)] > 0.99);
        assert!(proba[(1, 1)] > 0.99);
    }

    #[test]
    fn test_priors_shift_the_posterior() {
        let x = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
        let y = vec![0, 0, 1, 1];
        let mut flat = GaussianNbClassifier::new(GaussianNbParams::default());
        flat.fit(&x, &y).unwrap();
        let mut skewed =
            GaussianNbClassifier::new(GaussianNbParams::default().with_priors(vec![0.9, 0.1]));
        skewed.fit(&x, &y).unwrap();

        let query = arr2(&[[1.5]]);
        let p_flat = flat.predict_probabilities(&query).unwrap();
        let p_skewed = skewed.predict_probabilities(&query).unwrap();
        assert!(p_skewed[(0, 0)] > p_flat[(0, 0)]);
    }

    #[test]
    fn test_prior_count_must_match() {
        let x = arr2(&[[0.0], [1.0], [2.0]]);
        let mut nb = GaussianNbClassifier::new(GaussianNbParams::default().with_priors(vec![1.0]));
        assert!(matches!(
            nb.fit(&x, &[0, 1, 1]),
            Err(ClassifierError::InvalidInput(_))
        ));
    }
}
