use ndarray::{Array1, Array2, Axis};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

use crate::config::{ClassifierConfig, HistGradientBoostingParams};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{check_fit_input, check_n_features, sigmoid, softmax, to_dense};

const NAME: &str = "hist_gradient_boost";

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Per-feature bin edges.
///
/// A value maps to the number of edges strictly below it, so bins are
/// `0..=edges.len()`. NaN maps to a dedicated last bin.
#[derive(Clone, Debug, PartialEq)]
struct BinMapper {
    edges: Vec<Vec<f64>>,
}

impl BinMapper {
    fn fit(x: &Array2<f64>, max_bins: usize) -> Self {
        let edges = x
            .axis_iter(Axis(1))
            .map(|column| {
                let mut values: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();
                if values.len() <= max_bins {
                    values.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
                } else {
                    let mut edges: Vec<f64> = (1..max_bins)
                        .map(|b| {
                            let q = b as f64 / max_bins as f64 * (values.len() - 1) as f64;
                            let lo = q.floor() as usize;
                            let hi = q.ceil() as usize;
                            0.5 * (values[lo] + values[hi])
                        })
                        .collect();
                    edges.dedup();
                    edges
                }
            })
            .collect();
        BinMapper { edges }
    }

    fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut binned = Array2::<f64>::zeros(x.dim());
        for ((r, c), v) in x.indexed_iter() {
            let edges = &self.edges[c];
            binned[(r, c)] = if v.is_nan() {
                (edges.len() + 1) as f64
            } else {
                edges.partition_point(|e| e < v) as f64
            };
        }
        binned
    }
}

#[derive(Debug)]
struct FittedBoosting {
    bins: BinMapper,
    /// Raw score of the empty model, one entry per output.
    baseline: Vec<f64>,
    /// `stages[i][j]` is the tree for output `j` at iteration `i`.
    stages: Vec<Vec<Tree>>,
    classes: Vec<u32>,
    n_features: usize,
}

/// Histogram gradient boosted trees with log-loss.
///
/// Features are quantile-binned once, then each iteration fits one
/// regression tree per output to the negative log-loss gradient. Binary
/// problems boost a single logit, multi-class problems one score per class
/// under a softmax link.
#[derive(Debug)]
pub struct HistGradientBoostingClassifier {
    params: HistGradientBoostingParams,
    fitted: Option<FittedBoosting>,
}

impl HistGradientBoostingClassifier {
    pub fn new(params: HistGradientBoostingParams) -> Self {
        HistGradientBoostingClassifier {
            params,
            fitted: None,
        }
    }

    fn tree_params(&self) -> DecisionTreeRegressorParameters {
        let mut params = DecisionTreeRegressorParameters::default()
            .with_min_samples_leaf(self.params.min_samples_leaf);
        if let Some(depth) = self.params.max_depth {
            params = params.with_max_depth(depth);
        }
        params
    }
}

/// Class probabilities from raw scores.
fn link(raw: &Array2<f64>, n_classes: usize) -> Array2<f64> {
    let mut proba = Array2::<f64>::zeros((raw.nrows(), n_classes));
    for (r, scores) in raw.rows().into_iter().enumerate() {
        if n_classes == 2 {
            let p = sigmoid(scores[0]);
            proba[(r, 0)] = 1.0 - p;
            proba[(r, 1)] = p;
        } else {
            for (c, p) in softmax(scores).into_iter().enumerate() {
                proba[(r, c)] = p;
            }
        }
    }
    proba
}

impl TrainableClassifier for HistGradientBoostingClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::HistGradientBoost(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.fitted = None;
        let n_classes = check_fit_input(NAME, x, y)?;
        let n_samples = x.nrows();
        let n_outputs = if n_classes == 2 { 1 } else { n_classes };

        let bins = BinMapper::fit(x, self.params.max_bins);
        let binned = to_dense(&bins.transform(x)).map_err(|e| ClassifierError::fit(NAME, e))?;

        let mut counts = vec![0.0f64; n_classes];
        for &c in y {
            counts[c as usize] += 1.0;
        }
        let priors: Vec<f64> = counts.iter().map(|c| c / n_samples as f64).collect();
        let baseline: Vec<f64> = if n_classes == 2 {
            vec![(priors[1] / priors[0]).ln()]
        } else {
            priors.iter().map(|p| p.ln()).collect()
        };

        let mut raw = Array2::<f64>::zeros((n_samples, n_outputs));
        for (j, b) in baseline.iter().enumerate() {
            raw.column_mut(j).fill(*b);
        }

        let onehot = {
            let mut t = Array2::<f64>::zeros((n_samples, n_classes));
            for (r, &c) in y.iter().enumerate() {
                t[(r, c as usize)] = 1.0;
            }
            t
        };

        log::debug!(
            "Fitting histogram gradient boosting: {} iterations, {} outputs, {} samples",
            self.params.max_iter,
            n_outputs,
            n_samples
        );

        let tree_params = self.tree_params();
        let lr = self.params.learning_rate;
        let mut stages = Vec::with_capacity(self.params.max_iter);
        for iteration in 0..self.params.max_iter {
            let proba = link(&raw, n_classes);
            let mut stage = Vec::with_capacity(n_outputs);
            let mut max_gradient = 0.0f64;
            for j in 0..n_outputs {
                // binary boosts the logit of the second class
                let class = if n_classes == 2 { 1 } else { j };
                let residual: Vec<f64> = (0..n_samples)
                    .map(|r| onehot[(r, class)] - proba[(r, class)])
                    .collect();
                max_gradient = residual.iter().fold(max_gradient, |m, g| m.max(g.abs()));
                let tree = Tree::fit(&binned, &residual, tree_params.clone())
                    .map_err(|e| ClassifierError::fit(NAME, e))?;
                let update = tree
                    .predict(&binned)
                    .map_err(|e| ClassifierError::fit(NAME, e))?;
                for (r, u) in update.iter().enumerate() {
                    raw[(r, j)] += lr * u;
                }
                stage.push(tree);
            }
            stages.push(stage);
            if max_gradient < 1e-8 {
                log::trace!("Gradients vanished after {} iterations", iteration + 1);
                break;
            }
        }

        self.fitted = Some(FittedBoosting {
            bins,
            baseline,
            stages,
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
        let binned = to_dense(&fitted.bins.transform(x))
            .map_err(|e| ClassifierError::prediction(NAME, e))?;

        let mut raw = Array2::<f64>::zeros((x.nrows(), fitted.baseline.len()));
        for (j, b) in fitted.baseline.iter().enumerate() {
            raw.column_mut(j).fill(*b);
        }
        for stage in &fitted.stages {
            for (j, tree) in stage.iter().enumerate() {
                let update = tree
                    .predict(&binned)
                    .map_err(|e| ClassifierError::prediction(NAME, e))?;
                let mut column = raw.column_mut(j);
                column += &(Array1::from(update) * self.params.learning_rate);
            }
        }
        Ok(link(&raw, fitted.classes.len()))
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
        Box::new(HistGradientBoostingClassifier::new(self.params.clone()))
    }
}
