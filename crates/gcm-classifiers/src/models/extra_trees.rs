use ndarray::{Array2, Axis};
use rayon::prelude::*;
use smartcore::ensemble::extra_trees_regressor::{
    ExtraTreesRegressor, ExtraTreesRegressorParameters,
};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::config::{ClassifierConfig, ExtraTreesParams};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{
    check_fit_input, check_n_features, normalize_rows, resolve_seed, to_dense,
};

const NAME: &str = "extra_trees";

type Tree = ExtraTreesRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug)]
struct FittedExtraTrees {
    /// `members[i][j]` scores indicator output `j` for ensemble member `i`.
    members: Vec<Vec<Tree>>,
    classes: Vec<u32>,
    n_features: usize,
}

/// Extremely randomized trees.
///
/// Each member is a randomized regression tree per class indicator; a leaf
/// value is the fraction of its samples in that class, so averaging members
/// gives class probabilities. Two-class problems grow one indicator (the
/// second class) per member.
#[derive(Debug)]
pub struct ExtraTreesClassifier {
    params: ExtraTreesParams,
    fitted: Option<FittedExtraTrees>,
}

impl ExtraTreesClassifier {
    pub fn new(params: ExtraTreesParams) -> Self {
        ExtraTreesClassifier {
            params,
            fitted: None,
        }
    }

    fn tree_params(&self, seed: u64) -> ExtraTreesRegressorParameters {
        let mut params = ExtraTreesRegressorParameters::default()
            .with_n_trees(1)
            .with_min_samples_leaf(self.params.min_samples_leaf)
            .with_min_samples_split(self.params.min_samples_split)
            .with_seed(seed);
        if let Some(depth) = self.params.max_depth {
            params = params.with_max_depth(depth);
        }
        if let Some(m) = self.params.max_features {
            params = params.with_m(m);
        }
        params
    }
}

fn indicator_targets(y: &[u32], n_classes: usize) -> Vec<Vec<f64>> {
    let outputs: Vec<u32> = if n_classes == 2 {
        vec![1]
    } else {
        (0..n_classes as u32).collect()
    };
    outputs
        .into_iter()
        .map(|c| y.iter().map(|&v| if v == c { 1.0 } else { 0.0 }).collect())
        .collect()
}

impl TrainableClassifier for ExtraTreesClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::ExtraTrees(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.fitted = None;
        let n_classes = check_fit_input(NAME, x, y)?;
        if let Some(m) = self.params.max_features {
            if m > x.ncols() {
                return Err(ClassifierError::invalid_input(format!(
                    "max_features={} exceeds the {} available features",
                    m,
                    x.ncols()
                )));
            }
        }

        let dense = to_dense(x).map_err(|e| ClassifierError::fit(NAME, e))?;
        let targets = indicator_targets(y, n_classes);
        let seed = resolve_seed(self.params.random_state);

        log::debug!(
            "Fitting extra trees: {} members x {} outputs on {} samples",
            self.params.n_estimators,
            targets.len(),
            x.nrows()
        );

        let template = self.tree_params(seed);
        let fit_member = |i: usize| -> std::result::Result<Vec<Tree>, Failed> {
            let params = template.clone().with_seed(seed.wrapping_add(i as u64));
            targets
                .iter()
                .map(|t| Tree::fit(&dense, t, params.clone()))
                .collect()
        };
        let members: std::result::Result<Vec<Vec<Tree>>, Failed> = if self.params.parallel {
            (0..self.params.n_estimators)
                .into_par_iter()
                .map(fit_member)
                .collect()
        } else {
            (0..self.params.n_estimators).map(fit_member).collect()
        };
        let members = members.map_err(|e| ClassifierError::fit(NAME, e))?;

        self.fitted = Some(FittedExtraTrees {
            members,
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
        let n_outputs = if n_classes == 2 { 1 } else { n_classes };
        let mut scores = Array2::<f64>::zeros((x.nrows(), n_outputs));
        for member in &fitted.members {
            for (j, tree) in member.iter().enumerate() {
                let pred = tree
                    .predict(&dense)
                    .map_err(|e| ClassifierError::prediction(NAME, e))?;
                for (row, value) in pred.iter().enumerate() {
                    scores[(row, j)] += value;
                }
            }
        }
        let n_members = fitted.members.len() as f64;
        scores.mapv_inplace(|v| (v / n_members).clamp(0.0, 1.0));

        let mut proba = if n_classes == 2 {
            let positive = scores.index_axis(Axis(1), 0);
            let mut proba = Array2::<f64>::zeros((x.nrows(), 2));
            proba.column_mut(0).assign(&positive.mapv(|p| 1.0 - p));
            proba.column_mut(1).assign(&positive);
            proba
        } else {
            scores
        };
        normalize_rows(&mut proba);
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
        Box::new(ExtraTreesClassifier::new(self.params.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_three_class_probabilities() {
        let x = arr2(&[
            [0.00, 0.05],
            [0.10, 0.20],
            [0.20, 0.15],
            [3.00, 0.00],
            [3.10, 0.25],
            [2.90, 0.10],
            [0.05, 3.00],
            [0.25, 3.10],
            [0.15, 2.90],
        ]);
        let y = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let mut et = ExtraTreesClassifier::new(
            ExtraTreesParams::default()
                .with_n_estimators(20)
                .with_random_state(11),
        );
        et.fit(&x, &y).unwrap();
        let proba = et.predict_probabilities(&x).unwrap();
        assert_eq!(proba.dim(), (9, 3));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(et.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_unfitted() {
        let et = ExtraTreesClassifier::new(ExtraTreesParams::default());
        assert!(matches!(
            et.predict_probabilities(&arr2(&[[0.0, 0.0]])),
            Err(ClassifierError::UnfittedModel { .. })
        ));
    }
}
