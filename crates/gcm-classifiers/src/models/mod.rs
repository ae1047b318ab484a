pub mod adaboost;
pub mod calibration;
pub mod classification;
pub mod classifier_trait;
pub mod extra_trees;
pub mod factory;
pub mod gaussian_process;
pub mod hist_gradient_boosting;
pub mod knn;
pub mod logistic;
pub mod naive_bayes;
pub mod pipeline;
pub mod random_forest;
pub mod svc;
pub mod utils;
