use std::str::FromStr;

use anyhow::{Context, Result};
use log::LevelFilter;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gcm_classifiers::config::{load_classifier_config, ClassifierConfig};
use gcm_classifiers::data::Value;
use gcm_classifiers::models::classification::ClassificationModel;
use gcm_classifiers::models::factory::build_classifier;

const ALGORITHMS: [&str; 10] = [
    "random_forest",
    "gaussian_process",
    "hist_gradient_boost",
    "logistic_regression",
    "extra_trees",
    "ada_boost",
    "support_vector",
    "knn",
    "gaussian_nb",
    "polynomial_logistic_regression",
];

/// Three noisy clusters with string labels.
fn synthetic_dataset(n_per_class: usize, seed: u64) -> Result<(Array2<Value>, Array1<Value>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centres = [(0.0, 0.0, "alpha"), (3.0, 0.5, "beta"), (1.0, 3.0, "gamma")];
    let n = n_per_class * centres.len();

    let mut features = Vec::with_capacity(n * 2);
    let mut labels = Vec::with_capacity(n);
    for (cx, cy, label) in centres.iter() {
        for _ in 0..n_per_class {
            features.push(Value::Numeric(cx + rng.gen_range(-1.0..1.0)));
            features.push(Value::Numeric(cy + rng.gen_range(-1.0..1.0)));
            labels.push(Value::from(*label));
        }
    }
    let x = Array2::from_shape_vec((n, 2), features)?;
    Ok((x, Array1::from(labels)))
}

fn accuracy(predicted: &Array2<Value>, truth: &Array1<Value>) -> f64 {
    let hits = predicted
        .column(0)
        .iter()
        .zip(truth.iter())
        .filter(|(p, t)| p == t)
        .count();
    hits as f64 / truth.len() as f64
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("GCM_LOG", "info"))
        .init();

    // optional JSON config file: fit only that classifier
    let configs: Vec<ClassifierConfig> = match std::env::args().nth(1) {
        Some(path) => vec![load_classifier_config(&path)?],
        None => ALGORITHMS
            .iter()
            .map(|name| ClassifierConfig::from_str(name).map_err(anyhow::Error::msg))
            .collect::<Result<_>>()?,
    };

    let (x_train, y_train) = synthetic_dataset(40, 7)?;
    let (x_test, y_test) = synthetic_dataset(20, 8)?;

    for config in configs {
        let algorithm = config.algorithm();
        let mut model = build_classifier(config)
            .with_context(|| format!("Failed to build {}", algorithm))?;
        model
            .fit(&x_train, &y_train)
            .with_context(|| format!("Failed to fit {}", algorithm))?;

        let predicted = model.predict(&x_test)?;
        let proba = model.predict_class_probabilities(&x_test)?;
        let classes = model.classes()?;
        log::info!(
            "{:<32} accuracy {:.3}  classes {:?}  first row {:?}",
            algorithm,
            accuracy(&predicted, &y_test),
            classes.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            proba.row(0).to_vec()
        );
    }

    Ok(())
}
