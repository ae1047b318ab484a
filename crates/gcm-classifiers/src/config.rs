use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

/// Impurity measure used to choose tree splits.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
}

/// Hyper-parameters for the random forest classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub criterion: Criterion,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` uses `sqrt(n_features)`.
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
    /// Fit trees on the rayon pool.
    pub parallel: bool,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            parallel: false,
        }
    }
}

impl RandomForestParams {
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_max_depth(mut self, max_depth: u16) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let algo = "random_forest";
        ensure(self.n_estimators >= 1, algo, "n_estimators must be at least 1")?;
        ensure(self.n_estimators <= u16::MAX as usize, algo, "n_estimators is too large")?;
        validate_tree_shape(algo, self.max_depth, self.min_samples_split, self.min_samples_leaf)?;
        ensure(self.max_features != Some(0), algo, "max_features must be at least 1")
    }
}

/// Hyper-parameters for the extra-trees classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtraTreesParams {
    pub n_estimators: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
    pub parallel: bool,
}

impl Default for ExtraTreesParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            parallel: false,
        }
    }
}

impl ExtraTreesParams {
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let algo = "extra_trees";
        ensure(self.n_estimators >= 1, algo, "n_estimators must be at least 1")?;
        validate_tree_shape(algo, self.max_depth, self.min_samples_split, self.min_samples_leaf)?;
        ensure(self.max_features != Some(0), algo, "max_features must be at least 1")
    }
}

/// Hyper-parameters for the histogram gradient boosting classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HistGradientBoostingParams {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    pub max_bins: usize,
}

impl Default for HistGradientBoostingParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 100,
            max_depth: None,
            min_samples_leaf: 20,
            max_bins: 255,
        }
    }
}

impl HistGradientBoostingParams {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let algo = "hist_gradient_boost";
        ensure(positive(self.learning_rate), algo, "learning_rate must be positive")?;
        ensure(self.max_iter >= 1, algo, "max_iter must be at least 1")?;
        ensure(self.max_depth != Some(0), algo, "max_depth must be at least 1")?;
        ensure(self.min_samples_leaf >= 1, algo, "min_samples_leaf must be at least 1")?;
        ensure(
            (2..=255).contains(&self.max_bins),
            algo,
            "max_bins must lie in 2..=255",
        )
    }
}

/// Hyper-parameters for L2-regularised logistic regression.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogisticRegressionParams {
    /// Inverse regularisation strength.
    #[serde(rename = "C", alias = "c")]
    pub c: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self { c: 1.0 }
    }
}

impl LogisticRegressionParams {
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure(positive(self.c), "logistic_regression", "C must be positive")
    }
}

/// Hyper-parameters for the polynomial features + logistic regression pipeline.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PolynomialLogisticParams {
    pub degree: usize,
    #[serde(rename = "C", alias = "c")]
    pub c: f64,
}

impl Default for PolynomialLogisticParams {
    fn default() -> Self {
        Self { degree: 3, c: 1.0 }
    }
}

impl PolynomialLogisticParams {
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn logistic(&self) -> LogisticRegressionParams {
        LogisticRegressionParams { c: self.c }
    }

    pub fn validate(&self) -> Result<()> {
        let algo = "polynomial_logistic_regression";
        ensure(self.degree >= 1, algo, "degree must be at least 1")?;
        ensure(positive(self.c), algo, "C must be positive")
    }
}

/// Hyper-parameters for SAMME AdaBoost over shallow trees.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AdaBoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Depth of each weak learner; 1 gives decision stumps.
    pub max_depth: u16,
    pub random_state: Option<u64>,
}

impl Default for AdaBoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 1.0,
            max_depth: 1,
            random_state: None,
        }
    }
}

impl AdaBoostParams {
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let algo = "ada_boost";
        ensure(self.n_estimators >= 1, algo, "n_estimators must be at least 1")?;
        ensure(positive(self.learning_rate), algo, "learning_rate must be positive")?;
        ensure(self.max_depth >= 1, algo, "max_depth must be at least 1")
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    Linear,
    #[default]
    Rbf,
    Poly,
    Sigmoid,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GammaMode {
    /// `1 / (n_features * X.var())`
    Scale,
    /// `1 / n_features`
    Auto,
}

/// Kernel coefficient for rbf, poly and sigmoid kernels.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum Gamma {
    Mode(GammaMode),
    Value(f64),
}

impl Default for Gamma {
    fn default() -> Self {
        Gamma::Mode(GammaMode::Scale)
    }
}

/// Hyper-parameters for the support-vector classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SvcParams {
    #[serde(rename = "C", alias = "c")]
    pub c: f64,
    pub kernel: KernelKind,
    pub gamma: Gamma,
    pub degree: f64,
    pub coef0: f64,
    pub tol: f64,
    /// Passes of the SMO optimizer over the data.
    pub epochs: usize,
    pub random_state: Option<u64>,
}

impl Default for SvcParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelKind::Rbf,
            gamma: Gamma::default(),
            degree: 3.0,
            coef0: 0.0,
            tol: 1e-3,
            epochs: 2,
            random_state: None,
        }
    }
}

impl SvcParams {
    pub fn with_kernel(mut self, kernel: KernelKind) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let algo = "support_vector";
        ensure(positive(self.c), algo, "C must be positive")?;
        ensure(positive(self.tol), algo, "tol must be positive")?;
        ensure(self.epochs >= 1, algo, "epochs must be at least 1")?;
        ensure(positive(self.degree), algo, "degree must be positive")?;
        ensure(self.coef0.is_finite(), algo, "coef0 must be finite")?;
        if let Gamma::Value(g) = self.gamma {
            ensure(positive(g), algo, "gamma must be positive")?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KnnWeights {
    #[default]
    Uniform,
    Distance,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KnnAlgorithm {
    #[default]
    CoverTree,
    #[serde(alias = "linear_search")]
    Brute,
}

/// Hyper-parameters for the k-nearest-neighbour classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KnnParams {
    pub n_neighbors: usize,
    pub weights: KnnWeights,
    /// Neighbour search structure. Not called `algorithm`, which is the
    /// config tag.
    pub search: KnnAlgorithm,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            weights: KnnWeights::Uniform,
            search: KnnAlgorithm::CoverTree,
        }
    }
}

impl KnnParams {
    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    pub fn with_weights(mut self, weights: KnnWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn validate(&self) -> Result<()> {
        // smartcore refuses k <= 1
        ensure(self.n_neighbors >= 2, "knn", "n_neighbors must be at least 2")
    }
}

/// Hyper-parameters for Gaussian naive Bayes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GaussianNbParams {
    /// Fraction of the largest feature variance added to every variance.
    pub var_smoothing: f64,
    pub priors: Option<Vec<f64>>,
}

impl Default for GaussianNbParams {
    fn default() -> Self {
        Self {
            var_smoothing: 1e-9,
            priors: None,
        }
    }
}

impl GaussianNbParams {
    pub fn with_priors(mut self, priors: Vec<f64>) -> Self {
        self.priors = Some(priors);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let algo = "gaussian_nb";
        ensure(
            self.var_smoothing >= 0.0 && self.var_smoothing.is_finite(),
            algo,
            "var_smoothing must be non-negative",
        )?;
        if let Some(priors) = &self.priors {
            ensure(!priors.is_empty(), algo, "priors must not be empty")?;
            ensure(priors.iter().all(|p| *p >= 0.0), algo, "priors must be non-negative")?;
            let total: f64 = priors.iter().sum();
            ensure((total - 1.0).abs() < 1e-6, algo, "priors must sum to 1")?;
        }
        Ok(())
    }
}

/// Hyper-parameters for the Laplace-approximated Gaussian process classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GaussianProcessParams {
    /// RBF kernel length scale.
    pub length_scale: f64,
    /// Constant kernel factor multiplying the RBF kernel.
    pub amplitude: f64,
    /// Newton iterations when locating the posterior mode.
    pub max_iter_predict: usize,
}

impl Default for GaussianProcessParams {
    fn default() -> Self {
        Self {
            length_scale: 1.0,
            amplitude: 1.0,
            max_iter_predict: 100,
        }
    }
}

impl GaussianProcessParams {
    pub fn with_length_scale(mut self, length_scale: f64) -> Self {
        self.length_scale = length_scale;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let algo = "gaussian_process";
        ensure(positive(self.length_scale), algo, "length_scale must be positive")?;
        ensure(positive(self.amplitude), algo, "amplitude must be positive")?;
        ensure(self.max_iter_predict >= 1, algo, "max_iter_predict must be at least 1")
    }
}

/// Supported classifier families and their hyper-parameters.
///
/// Serialized with an `algorithm` tag, e.g.
/// `{"algorithm": "random_forest", "n_estimators": 10}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ClassifierConfig {
    RandomForest(RandomForestParams),
    GaussianProcess(GaussianProcessParams),
    HistGradientBoost(HistGradientBoostingParams),
    LogisticRegression(LogisticRegressionParams),
    ExtraTrees(ExtraTreesParams),
    AdaBoost(AdaBoostParams),
    SupportVector(SvcParams),
    Knn(KnnParams),
    GaussianNb(GaussianNbParams),
    PolynomialLogisticRegression(PolynomialLogisticParams),
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig::RandomForest(RandomForestParams::default())
    }
}

impl ClassifierConfig {
    /// The serialized `algorithm` tag.
    pub fn algorithm(&self) -> &'static str {
        match self {
            ClassifierConfig::RandomForest(_) => "random_forest",
            ClassifierConfig::GaussianProcess(_) => "gaussian_process",
            ClassifierConfig::HistGradientBoost(_) => "hist_gradient_boost",
            ClassifierConfig::LogisticRegression(_) => "logistic_regression",
            ClassifierConfig::ExtraTrees(_) => "extra_trees",
            ClassifierConfig::AdaBoost(_) => "ada_boost",
            ClassifierConfig::SupportVector(_) => "support_vector",
            ClassifierConfig::Knn(_) => "knn",
            ClassifierConfig::GaussianNb(_) => "gaussian_nb",
            ClassifierConfig::PolynomialLogisticRegression(_) => "polynomial_logistic_regression",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ClassifierConfig::RandomForest(p) => p.validate(),
            ClassifierConfig::GaussianProcess(p) => p.validate(),
            ClassifierConfig::HistGradientBoost(p) => p.validate(),
            ClassifierConfig::LogisticRegression(p) => p.validate(),
            ClassifierConfig::ExtraTrees(p) => p.validate(),
            ClassifierConfig::AdaBoost(p) => p.validate(),
            ClassifierConfig::SupportVector(p) => p.validate(),
            ClassifierConfig::Knn(p) => p.validate(),
            ClassifierConfig::GaussianNb(p) => p.validate(),
            ClassifierConfig::PolynomialLogisticRegression(p) => p.validate(),
        }
    }

    /// Parse a tagged JSON object. Unknown algorithms and unknown or
    /// ill-typed hyper-parameters are `UnsupportedAlgorithm` errors.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            let algorithm = serde_json::from_str::<serde_json::Value>(json)
                .ok()
                .and_then(|v| v.get("algorithm").and_then(|a| a.as_str()).map(String::from))
                .unwrap_or_else(|| "<unknown>".to_string());
            ClassifierError::unsupported(algorithm, e.to_string())
        })
    }
}

impl FromStr for ClassifierConfig {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "random_forest" | "rf" => Ok(ClassifierConfig::RandomForest(Default::default())),
            "gaussian_process" | "gp" => Ok(ClassifierConfig::GaussianProcess(Default::default())),
            "hist_gradient_boost" | "hist_gradient_boosting" | "hgb" => {
                Ok(ClassifierConfig::HistGradientBoost(Default::default()))
            }
            "logistic_regression" | "logistic" => {
                Ok(ClassifierConfig::LogisticRegression(Default::default()))
            }
            "extra_trees" => Ok(ClassifierConfig::ExtraTrees(Default::default())),
            "ada_boost" | "adaboost" => Ok(ClassifierConfig::AdaBoost(Default::default())),
            "support_vector" | "svc" | "svm" => {
                Ok(ClassifierConfig::SupportVector(Default::default()))
            }
            "knn" | "k_nearest_neighbors" => Ok(ClassifierConfig::Knn(Default::default())),
            "gaussian_nb" | "naive_bayes" => Ok(ClassifierConfig::GaussianNb(Default::default())),
            "polynomial_logistic_regression" | "polynom_logistic_regression" => Ok(
                ClassifierConfig::PolynomialLogisticRegression(Default::default()),
            ),
            _ => Err(format!("Unknown classifier type: {}", s)),
        }
    }
}

/// Load a `ClassifierConfig` from a JSON file.
pub fn load_classifier_config<P: AsRef<Path>>(path: P) -> anyhow::Result<ClassifierConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read classifier config: {}", path.display()))?;
    let config = ClassifierConfig::from_json(&content)
        .with_context(|| format!("Failed to parse classifier config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid classifier config: {}", path.display()))?;
    Ok(config)
}

fn ensure(condition: bool, algorithm: &str, reason: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ClassifierError::unsupported(algorithm, reason))
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn validate_tree_shape(
    algorithm: &str,
    max_depth: Option<u16>,
    min_samples_split: usize,
    min_samples_leaf: usize,
) -> Result<()> {
    ensure(max_depth != Some(0), algorithm, "max_depth must be at least 1")?;
    ensure(min_samples_split >= 2, algorithm, "min_samples_split must be at least 2")?;
    ensure(min_samples_leaf >= 1, algorithm, "min_samples_leaf must be at least 1")
}
