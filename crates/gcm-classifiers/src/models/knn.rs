use ndarray::Array2;
use smartcore::algorithm::neighbour::KNNAlgorithmName;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::distance::euclidian::Euclidian;
use smartcore::neighbors::knn_classifier::{KNNClassifier, KNNClassifierParameters};
use smartcore::neighbors::KNNWeightFunction;

use crate::config::{ClassifierConfig, KnnAlgorithm, KnnParams, KnnWeights};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{check_fit_input, check_n_features, to_dense};

const NAME: &str = "knn";

type Knn = KNNClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>, Euclidian<f64>>;

#[derive(Debug)]
struct FittedKnn {
    model: Knn,
    /// Labels seen at fit, in the order smartcore reports probabilities.
    present: Vec<u32>,
    classes: Vec<u32>,
    n_features: usize,
}

/// k-nearest-neighbour vote over Euclidean distance.
#[derive(Debug)]
pub struct KnnClassifier {
    params: KnnParams,
    fitted: Option<FittedKnn>,
}

impl KnnClassifier {
    pub fn new(params: KnnParams) -> Self {
        KnnClassifier {
            params,
            fitted: None,
        }
    }

    fn smartcore_params(&self) -> KNNClassifierParameters<f64, Euclidian<f64>> {
        let weight = match self.params.weights {
            KnnWeights::Uniform => KNNWeightFunction::Uniform,
            KnnWeights::Distance => KNNWeightFunction::Distance,
        };
        let algorithm = match self.params.search {
            KnnAlgorithm::CoverTree => KNNAlgorithmName::CoverTree,
            KnnAlgorithm::Brute => KNNAlgorithmName::LinearSearch,
        };
        KNNClassifierParameters::default()
            .with_k(self.params.n_neighbors)
            .with_weight(weight)
            .with_algorithm(algorithm)
    }
}

impl TrainableClassifier for KnnClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::Knn(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.fitted = None;
        let n_classes = check_fit_input(NAME, x, y)?;
        if self.params.n_neighbors > x.nrows() {
            return Err(ClassifierError::invalid_input(format!(
                "{} needs at least n_neighbors={} samples, got {}",
                NAME,
                self.params.n_neighbors,
                x.nrows()
            )));
        }

        log::debug!(
            "Fitting kNN (k={}, {:?} weights) on {} samples",
            self.params.n_neighbors,
            self.params.weights,
            x.nrows()
        );

        let dense = to_dense(x).map_err(|e| ClassifierError::fit(NAME, e))?;
        let targets = y.to_vec();
        let model = Knn::fit(&dense, &targets, self.smartcore_params())
            .map_err(|e| ClassifierError::fit(NAME, e))?;

        let mut present = targets;
        present.sort_unstable();
        present.dedup();

        self.fitted = Some(FittedKnn {
            model,
            present,
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
        let rows = fitted
            .model
            .predict_proba(&dense)
            .map_err(|e| ClassifierError::prediction(NAME, e))?;

        let mut proba = Array2::<f64>::zeros((x.nrows(), fitted.classes.len()));
        for (r, row) in rows.iter().enumerate() {
            for (label, p) in fitted.present.iter().zip(row) {
                proba[(r, *label as usize)] = *p;
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
        Box::new(KnnClassifier::new(self.params.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_vote_fractions() {
        let x = arr2(&[[0.0], [1.0], [2.0], [10.0], [11.0], [12.0]]);
        let y = vec![0, 0, 1, 1, 1, 1];
        let mut knn = KnnClassifier::new(KnnParams::default().with_n_neighbors(3));
        knn.fit(&x, &y).unwrap();
        let proba = knn.predict_probabilities(&arr2(&[[0.5], [11.0]])).unwrap();
        assert!((proba[(0, 0)] - 2.0 / 3.0).abs() < 1e-9);
        assert!((proba[(1, 1)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_weights_favour_exact_match() {
        let x = arr2(&[[0.0], [1.0], [5.0], [6.0]]);
        let y = vec![0, 1, 1, 1];
        let mut knn = KnnClassifier::new(
            KnnParams::default()
                .with_n_neighbors(2)
                .with_weights(KnnWeights::Distance),
        );
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&arr2(&[[0.0]])).unwrap(), vec![0]);
    }

    #[test]
    fn test_too_few_samples() {
        let x = arr2(&[[0.0], [1.0], [2.0]]);
        let mut knn = KnnClassifier::new(KnnParams::default());
        assert!(matches!(
            knn.fit(&x, &[0, 1, 1]),
            Err(ClassifierError::InvalidInput(_))
        ));
        assert!(!knn.is_fitted());
    }
}
