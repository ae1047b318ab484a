use ndarray::{Array2, Axis};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters,
};

use crate::config::{AdaBoostParams, ClassifierConfig};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{check_fit_input, check_n_features, resolve_seed, softmax, to_dense};

const NAME: &str = "ada_boost";

type Tree = DecisionTreeClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug)]
struct FittedAdaBoost {
    learners: Vec<(Tree, f64)>,
    classes: Vec<u32>,
    n_features: usize,
}

/// Discrete AdaBoost (SAMME) over shallow smartcore decision trees.
///
/// smartcore trees take no sample weights, so every round trains on a
/// bootstrap drawn with the current boosting weights. A draw that holds a
/// single class falls back to the full training set.
#[derive(Debug)]
pub struct AdaBoostClassifier {
    params: AdaBoostParams,
    fitted: Option<FittedAdaBoost>,
}

impl AdaBoostClassifier {
    pub fn new(params: AdaBoostParams) -> Self {
        AdaBoostClassifier {
            params,
            fitted: None,
        }
    }

    /// Number of boosting rounds kept after early stopping.
    pub fn n_learners(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.learners.len())
    }
}

impl TrainableClassifier for AdaBoostClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::AdaBoost(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.fitted = None;
        let n_classes = check_fit_input(NAME, x, y)?;
        let n_samples = x.nrows();
        let k = n_classes as f64;
        let dense = to_dense(x).map_err(|e| ClassifierError::fit(NAME, e))?;
        let mut rng = StdRng::seed_from_u64(resolve_seed(self.params.random_state));
        let tree_params = DecisionTreeClassifierParameters {
            max_depth: Some(self.params.max_depth),
            ..Default::default()
        };

        log::debug!(
            "Fitting AdaBoost: up to {} rounds on {} samples, {} classes",
            self.params.n_estimators,
            n_samples,
            n_classes
        );

        let mut weights = vec![1.0 / n_samples as f64; n_samples];
        let mut learners: Vec<(Tree, f64)> = Vec::with_capacity(self.params.n_estimators);

        for round in 0..self.params.n_estimators {
            let sampler = WeightedIndex::new(&weights).map_err(|e| {
                ClassifierError::fit(NAME, smartcore::error::Failed::fit(&e.to_string()))
            })?;
            let rows: Vec<usize> = (0..n_samples).map(|_| sampler.sample(&mut rng)).collect();
            let sample_y: Vec<u32> = rows.iter().map(|&r| y[r]).collect();

            let single_class = sample_y.iter().all(|&c| c == sample_y[0]);
            let learner_params = DecisionTreeClassifierParameters {
                seed: Some(rng.gen()),
                ..tree_params.clone()
            };
            let learner = if single_class {
                log::trace!("AdaBoost round {} drew a single class, using all samples", round);
                Tree::fit(&dense, &y.to_vec(), learner_params)
            } else {
                let sample_x = to_dense(&x.select(Axis(0), &rows))
                    .map_err(|e| ClassifierError::fit(NAME, e))?;
                Tree::fit(&sample_x, &sample_y, learner_params)
            }
            .map_err(|e| ClassifierError::fit(NAME, e))?;

            let predicted = learner
                .predict(&dense)
                .map_err(|e| ClassifierError::fit(NAME, e))?;
            let total: f64 = weights.iter().sum();
            let error: f64 = predicted
                .iter()
                .zip(y)
                .zip(&weights)
                .filter(|((p, t), _)| p != t)
                .map(|(_, w)| w)
                .sum::<f64>()
                / total;

            if error <= 0.0 {
                log::trace!("AdaBoost round {} fits the training set exactly", round);
                learners.push((learner, 1.0));
                break;
            }
            if error >= 1.0 - 1.0 / k {
                if learners.is_empty() {
                    return Err(ClassifierError::fit(
                        NAME,
                        smartcore::error::Failed::fit(
                            "base learner is no better than chance on the first round",
                        ),
                    ));
                }
                log::warn!(
                    "AdaBoost stopped after {} rounds: weighted error {:.3} is not above chance",
                    round,
                    error
                );
                break;
            }

            let alpha = self.params.learning_rate * (((1.0 - error) / error).ln() + (k - 1.0).ln());
            for ((w, p), t) in weights.iter_mut().zip(&predicted).zip(y) {
                if p != t {
                    *w *= alpha.exp();
                }
            }
            let total: f64 = weights.iter().sum();
            weights.iter_mut().for_each(|w| *w /= total);
            learners.push((learner, alpha));
        }

        self.fitted = Some(FittedAdaBoost {
            learners,
            classes: (0..n_classes as u32).collect(),
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ClassifierError::unfitted(NAME))?;
        check_n_features(NAME, fitted.n_features, x)?;
        let dense = to_dense(x).map_err(|e| ClassifierError::prediction(NAME, e))?;

        let n_classes = fitted.classes.len();
        let k = n_classes as f64;
        // SAMME codes: 1 for the voted class, -1/(k-1) for the others
        let mut decision = Array2::<f64>::from_elem((x.nrows(), n_classes), 0.0);
        let mut total_alpha = 0.0;
        for (learner, alpha) in &fitted.learners {
            let predicted = learner
                .predict(&dense)
                .map_err(|e| ClassifierError::prediction(NAME, e))?;
            for (r, class) in predicted.iter().enumerate() {
                for c in 0..n_classes {
                    decision[(r, c)] += if c == *class as usize {
                        *alpha
                    } else {
                        -alpha / (k - 1.0)
                    };
                }
            }
            total_alpha += alpha;
        }
        decision.mapv_inplace(|d| d / total_alpha / (k - 1.0));

        let mut proba = Array2::<f64>::zeros(decision.dim());
        for (r, row) in decision.rows().into_iter().enumerate() {
            for (c, p) in softmax(row).into_iter().enumerate() {
                proba[(r, c)] = p;
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
        Box::new(AdaBoostClassifier::new(self.params.clone()))
    }
}
