use std::fmt;

use ndarray::Array2;

use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::models::utils::argmax_rows;

/// The minimal capability set every wrapped algorithm provides.
///
/// Shims train on dense numeric features and class codes `0..k`, where every
/// code in that range occurs in `y`. Mapping labels to codes and encoding
/// categorical features is the adapter's job.
pub trait TrainableClassifier: fmt::Debug + Send {
    /// Short algorithm name used in logs and errors.
    fn name(&self) -> &'static str;

    /// The hyper-parameters this estimator was built with.
    fn config(&self) -> ClassifierConfig;

    /// Fit from scratch, discarding any previous learned state.
    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()>;

    /// Class probabilities, one row per sample and one column per class code.
    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Most probable class code per sample.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u32>> {
        let proba = self.predict_probabilities(x)?;
        let classes = self.classes()?;
        Ok(argmax_rows(&proba)
            .into_iter()
            .map(|idx| classes[idx as usize])
            .collect())
    }

    /// Class codes in probability column order.
    fn classes(&self) -> Result<&[u32]>;

    fn is_fitted(&self) -> bool;

    /// A fresh, unfitted estimator with the same hyper-parameters.
    fn clone_unfitted(&self) -> Box<dyn TrainableClassifier>;
}
