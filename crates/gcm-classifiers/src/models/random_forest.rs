use ndarray::Array2;
use rayon::prelude::*;
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier as SmartcoreForest, RandomForestClassifierParameters,
};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::SplitCriterion;

use crate::config::{ClassifierConfig, Criterion, RandomForestParams};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{check_fit_input, check_n_features, resolve_seed, to_dense};

const NAME: &str = "random_forest";

type Member = SmartcoreForest<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug)]
struct FittedForest {
    members: Vec<Member>,
    classes: Vec<u32>,
    n_features: usize,
}

/// Random forest classifier.
///
/// smartcore forests only vote, so each tree is held as its own one-tree
/// forest with a distinct seed and probabilities are the vote fractions
/// across trees.
#[derive(Debug)]
pub struct RandomForestClassifier {
    params: RandomForestParams,
    fitted: Option<FittedForest>,
}

impl RandomForestClassifier {
    pub fn new(params: RandomForestParams) -> Self {
        RandomForestClassifier {
            params,
            fitted: None,
        }
    }

    pub fn params(&self) -> &RandomForestParams {
        &self.params
    }

    fn member_params(&self) -> RandomForestClassifierParameters {
        let criterion = match self.params.criterion {
            Criterion::Gini => SplitCriterion::Gini,
            Criterion::Entropy => SplitCriterion::Entropy,
        };
        let mut params = RandomForestClassifierParameters::default()
            .with_n_trees(1)
            .with_criterion(criterion)
            .with_min_samples_leaf(self.params.min_samples_leaf)
            .with_min_samples_split(self.params.min_samples_split);
        if let Some(depth) = self.params.max_depth {
            params = params.with_max_depth(depth);
        }
        if let Some(m) = self.params.max_features {
            params = params.with_m(m);
        }
        params
    }
}

impl TrainableClassifier for RandomForestClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::RandomForest(self.params.clone())
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
        let targets = y.to_vec();
        let base = self.member_params();
        let seed = resolve_seed(self.params.random_state);

        log::debug!(
            "Fitting random forest: {} trees, {} samples, {} features, {} classes",
            self.params.n_estimators,
            x.nrows(),
            x.ncols(),
            n_classes
        );

        let fit_member = |i: usize| -> std::result::Result<Member, Failed> {
            Member::fit(&dense, &targets, base.clone().with_seed(seed.wrapping_add(i as u64)))
        };
        let members: std::result::Result<Vec<Member>, Failed> = if self.params.parallel {
            (0..self.params.n_estimators)
                .into_par_iter()
                .map(fit_member)
                .collect()
        } else {
            (0..self.params.n_estimators).map(fit_member).collect()
        };
        let members = members.map_err(|e| ClassifierError::fit(NAME, e))?;

        self.fitted = Some(FittedForest {
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

        let mut proba = Array2::<f64>::zeros((x.nrows(), fitted.classes.len()));
        for member in &fitted.members {
            let votes = member
                .predict(&dense)
                .map_err(|e| ClassifierError::prediction(NAME, e))?;
            for (row, class) in votes.iter().enumerate() {
                proba[(row, *class as usize)] += 1.0;
            }
        }
        let n_members = fitted.members.len() as f64;
        proba.mapv_inplace(|v| v / n_members);
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
        Box::new(RandomForestClassifier::new(self.params.clone()))
    }
}
