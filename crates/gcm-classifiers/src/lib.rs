//! gcm-classifiers: uniform classifier adapters for graphical causal models.
//!
//! Every supported algorithm family is built by a factory in
//! [`models::factory`] and exposed through the [`ClassificationModel`]
//! trait: `fit`, `predict`, `predict_class_probabilities`, `classes` and
//! `clone_model`. The estimators themselves are trained by smartcore;
//! families smartcore does not ship as classifiers are assembled from its
//! trees, regressors and linear algebra.
//!
//! Feature matrices are `Array2<Value>`, so categorical columns can be
//! passed directly and are one-hot encoded by the adapter.
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod preprocessing;

pub use config::{load_classifier_config, ClassifierConfig};
pub use data::{shape_into_2d, Value};
pub use error::{ClassifierError, Result};
pub use models::classification::{ClassificationModel, ClassifierAdapter};
pub use models::factory::*;
pub use preprocessing::{apply_one_hot_encoding, fit_one_hot_encoders};
