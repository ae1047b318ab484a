use crate::config::{
    AdaBoostParams, ClassifierConfig, ExtraTreesParams, GaussianNbParams, GaussianProcessParams,
    HistGradientBoostingParams, KnnParams, LogisticRegressionParams, PolynomialLogisticParams,
    RandomForestParams, SvcParams,
};
use crate::error::Result;
use crate::models::adaboost::AdaBoostClassifier;
use crate::models::classification::ClassifierAdapter;
use crate::models::extra_trees::ExtraTreesClassifier;
use crate::models::gaussian_process::GaussianProcessClassifier;
use crate::models::hist_gradient_boosting::HistGradientBoostingClassifier;
use crate::models::knn::KnnClassifier;
use crate::models::logistic::LogisticRegressionClassifier;
use crate::models::naive_bayes::GaussianNbClassifier;
use crate::models::pipeline::PolynomialLogisticRegression;
use crate::models::random_forest::RandomForestClassifier;
use crate::models::svc::SupportVectorClassifier;

/// Build an unfitted classifier from a tagged config.
pub fn build_classifier(config: ClassifierConfig) -> Result<ClassifierAdapter> {
    match config {
        ClassifierConfig::RandomForest(p) => create_random_forest_classifier(p),
        ClassifierConfig::GaussianProcess(p) => create_gaussian_process_classifier(p),
        ClassifierConfig::HistGradientBoost(p) => create_hist_gradient_boost_classifier(p),
        ClassifierConfig::LogisticRegression(p) => create_logistic_regression_classifier(p),
        ClassifierConfig::ExtraTrees(p) => create_extra_trees_classifier(p),
        ClassifierConfig::AdaBoost(p) => create_ada_boost_classifier(p),
        ClassifierConfig::SupportVector(p) => create_support_vector_classifier(p),
        ClassifierConfig::Knn(p) => create_knn_classifier(p),
        ClassifierConfig::GaussianNb(p) => create_gaussian_nb_classifier(p),
        ClassifierConfig::PolynomialLogisticRegression(p) => {
            create_polynom_logistic_regression_classifier(p)
        }
    }
}

pub fn create_random_forest_classifier(params: RandomForestParams) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(RandomForestClassifier::new(params))))
}

pub fn create_gaussian_process_classifier(
    params: GaussianProcessParams,
) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(GaussianProcessClassifier::new(params))))
}

pub fn create_hist_gradient_boost_classifier(
    params: HistGradientBoostingParams,
) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(HistGradientBoostingClassifier::new(params))))
}

pub fn create_logistic_regression_classifier(
    params: LogisticRegressionParams,
) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(LogisticRegressionClassifier::new(params))))
}

pub fn create_extra_trees_classifier(params: ExtraTreesParams) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(ExtraTreesClassifier::new(params))))
}

pub fn create_ada_boost_classifier(params: AdaBoostParams) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(AdaBoostClassifier::new(params))))
}

pub fn create_support_vector_classifier(params: SvcParams) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(SupportVectorClassifier::new(params))))
}

pub fn create_knn_classifier(params: KnnParams) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(KnnClassifier::new(params))))
}

pub fn create_gaussian_nb_classifier(params: GaussianNbParams) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(GaussianNbClassifier::new(params))))
}

/// Polynomial expansion (no bias column) followed by logistic regression.
pub fn create_polynom_logistic_regression_classifier(
    params: PolynomialLogisticParams,
) -> Result<ClassifierAdapter> {
    params.validate()?;
    Ok(ClassifierAdapter::new(Box::new(PolynomialLogisticRegression::new(params))))
}
