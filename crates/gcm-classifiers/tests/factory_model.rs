use gcm_classifiers::config::{
    AdaBoostParams, ClassifierConfig, ExtraTreesParams, GaussianNbParams, GaussianProcessParams,
    HistGradientBoostingParams, KnnParams, LogisticRegressionParams, PolynomialLogisticParams,
    RandomForestParams, SvcParams,
};
use gcm_classifiers::data::Value;
use gcm_classifiers::error::ClassifierError;
use gcm_classifiers::models::classification::ClassificationModel;
use gcm_classifiers::models::factory;
use ndarray::{arr1, arr2, Array1, Array2};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Every family with small, seeded hyper-parameters.
fn all_configs() -> Vec<ClassifierConfig> {
    vec![
        ClassifierConfig::RandomForest(
            RandomForestParams::default()
                .with_n_estimators(20)
                .with_random_state(1),
        ),
        ClassifierConfig::GaussianProcess(GaussianProcessParams::default()),
        ClassifierConfig::HistGradientBoost(
            HistGradientBoostingParams::default().with_max_iter(20),
        ),
        ClassifierConfig::LogisticRegression(LogisticRegressionParams::default()),
        ClassifierConfig::ExtraTrees(
            ExtraTreesParams::default()
                .with_n_estimators(20)
                .with_random_state(2),
        ),
        ClassifierConfig::AdaBoost(AdaBoostParams::default().with_random_state(3)),
        ClassifierConfig::SupportVector(SvcParams::default().with_random_state(4)),
        ClassifierConfig::Knn(KnnParams::default()),
        ClassifierConfig::GaussianNb(GaussianNbParams::default()),
        ClassifierConfig::PolynomialLogisticRegression(
            PolynomialLogisticParams::default().with_degree(2),
        ),
    ]
}

/// `n_classes` well separated clusters of ten points each.
fn clusters(n_classes: usize) -> (Array2<Value>, Array1<Value>) {
    let n = 10 * n_classes;
    let x = Array2::from_shape_fn((n, 2), |(i, j)| {
        let class = (i / 10) as f64;
        let jitter = if j == 0 {
            ((i * 7) % 10) as f64 / 10.0 - 0.45
        } else {
            ((i * 3) % 10) as f64 / 10.0 - 0.45
        };
        let centre = if j == 0 { 4.0 * class } else { 4.0 * (class % 2.0) };
        Value::Numeric(centre + jitter + 0.001 * i as f64)
    });
    let y = Array1::from_shape_fn(n, |i| Value::Numeric((i / 10) as f64));
    (x, y)
}

fn assert_rows_sum_to_one(proba: &Array2<f64>) {
    for row in proba.rows() {
        assert!(
            (row.sum() - 1.0).abs() < 1e-6,
            "row {:?} does not sum to one",
            row
        );
        assert!(row.iter().all(|p| (0.0..=1.0 + 1e-9).contains(p)));
    }
}

#[test]
fn test_factories_return_unfit_models() {
    init_logging();
    for config in all_configs() {
        let model = factory::build_classifier(config.clone()).expect("valid config");
        assert!(!model.is_fitted(), "{} starts fitted", config.algorithm());
        assert!(matches!(
            model.classes(),
            Err(ClassifierError::UnfittedModel { .. })
        ));
        let (x, _) = clusters(2);
        assert!(matches!(
            model.predict_class_probabilities(&x),
            Err(ClassifierError::UnfittedModel { .. })
        ));
        assert!(matches!(
            model.predict(&x),
            Err(ClassifierError::UnfittedModel { .. })
        ));
    }
}

#[test]
fn test_binary_probabilities_for_every_factory() {
    init_logging();
    let (x, y) = clusters(2);
    for config in all_configs() {
        let mut model = factory::build_classifier(config.clone()).expect("valid config");
        model.fit(&x, &y).expect("fit failed");
        let classes = model.classes().expect("fitted model has classes");
        assert_eq!(classes, vec![Value::Numeric(0.0), Value::Numeric(1.0)]);

        let proba = model.predict_class_probabilities(&x).expect("predict_proba failed");
        assert_eq!(proba.dim(), (x.nrows(), classes.len()), "{}", config.algorithm());
        assert_rows_sum_to_one(&proba);

        let predicted = model.predict(&x).expect("predict failed");
        assert_eq!(predicted.dim(), (x.nrows(), 1));
    }
}

#[test]
fn test_multiclass_probabilities_for_every_factory() {
    init_logging();
    let (x, y) = clusters(3);
    for config in all_configs() {
        let mut model = factory::build_classifier(config.clone()).expect("valid config");
        model.fit(&x, &y).expect("fit failed");
        let proba = model.predict_class_probabilities(&x).expect("predict_proba failed");
        assert_eq!(proba.dim(), (30, 3), "{}", config.algorithm());
        assert_rows_sum_to_one(&proba);
    }
}

#[test]
fn test_clone_keeps_hyperparameters_and_drops_state() {
    init_logging();
    let (x, y) = clusters(2);
    for config in all_configs() {
        let mut model = factory::build_classifier(config.clone()).expect("valid config");
        model.fit(&x, &y).expect("fit failed");

        let clone = model.clone_unfitted();
        assert_eq!(clone.config(), config);
        assert!(!clone.is_fitted());
        assert!(model.is_fitted());

        let boxed = model.clone_model();
        assert_eq!(boxed.name(), model.name());
        assert!(matches!(
            boxed.classes(),
            Err(ClassifierError::UnfittedModel { .. })
        ));
    }
}

#[test]
fn test_random_forest_four_samples() {
    init_logging();
    let x = arr2(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]).mapv(Value::Numeric);
    let y = arr1(&[0.0, 0.0, 1.0, 1.0]).mapv(Value::Numeric);
    let mut model = factory::create_random_forest_classifier(
        RandomForestParams::default().with_n_estimators(10),
    )
    .expect("valid params");
    model.fit(&x, &y).expect("fit failed");
    assert_eq!(model.classes().unwrap().len(), 2);

    let proba = model
        .predict_class_probabilities(&arr2(&[[0.5, 0.5]]).mapv(Value::Numeric))
        .expect("predict_proba failed");
    assert_eq!(proba.dim(), (1, 2));
    assert!((proba.row(0).sum() - 1.0).abs() < 1e-9);
}

#[test]
fn test_polynomial_logistic_takes_raw_features() {
    init_logging();
    let (x, y) = clusters(2);
    let mut model = factory::create_polynom_logistic_regression_classifier(
        PolynomialLogisticParams::default().with_degree(2),
    )
    .expect("valid params");
    model.fit(&x, &y).expect("fit failed");
    let predicted = model
        .predict(&arr2(&[[0.0, 0.0], [4.0, 4.0]]).mapv(Value::Numeric))
        .expect("predict failed");
    assert_eq!(predicted[(0, 0)], Value::Numeric(0.0));
    assert_eq!(predicted[(1, 0)], Value::Numeric(1.0));
}

#[test]
fn test_polynomial_logistic_default_degree() {
    let model = factory::create_polynom_logistic_regression_classifier(Default::default())
        .expect("valid params");
    match model.config() {
        ClassifierConfig::PolynomialLogisticRegression(p) => assert_eq!(p.degree, 3),
        other => panic!("unexpected config {:?}", other),
    }
}

#[test]
fn test_categorical_features_are_encoded() {
    init_logging();
    let colours = ["red", "red", "red", "red", "blue", "blue", "blue", "blue"];
    let x = Array2::from_shape_fn((8, 2), |(i, j)| {
        if j == 0 {
            Value::from(colours[i])
        } else {
            Value::Numeric(i as f64 * 0.1)
        }
    });
    let y = arr1(&["warm", "warm", "warm", "warm", "cold", "cold", "cold", "cold"])
        .mapv(Value::from);

    let mut model = factory::create_logistic_regression_classifier(Default::default())
        .expect("valid params");
    model.fit(&x, &y).expect("fit failed");
    assert_eq!(
        model.classes().unwrap(),
        vec![Value::from("cold"), Value::from("warm")]
    );

    let query = arr2(&[
        [Value::from("red"), Value::Numeric(0.2)],
        [Value::from("blue"), Value::Numeric(0.5)],
        [Value::from("green"), Value::Numeric(0.3)],
    ]);
    let proba = model.predict_class_probabilities(&query).expect("predict_proba failed");
    assert_eq!(proba.dim(), (3, 2));
    assert_rows_sum_to_one(&proba);
    assert!(proba[(0, 1)] > 0.5);
    assert!(proba[(1, 0)] > 0.5);
}

#[test]
fn test_categorical_value_in_numeric_column_is_rejected() {
    let (x, y) = clusters(2);
    let mut model = factory::create_knn_classifier(Default::default()).expect("valid params");
    model.fit(&x, &y).expect("fit failed");
    let query = arr2(&[[Value::from("oops"), Value::Numeric(0.0)]]);
    assert!(matches!(
        model.predict_class_probabilities(&query),
        Err(ClassifierError::InvalidInput(_))
    ));
}

#[test]
fn test_wrong_feature_count_is_rejected() {
    let (x, y) = clusters(2);
    let mut model =
        factory::create_gaussian_nb_classifier(Default::default()).expect("valid params");
    model.fit(&x, &y).expect("fit failed");
    let query = arr2(&[[0.0, 0.0, 0.0]]).mapv(Value::Numeric);
    assert!(matches!(
        model.predict(&query),
        Err(ClassifierError::InvalidInput(_))
    ));
}

#[test]
fn test_invalid_hyperparameters_are_unsupported() {
    let err = factory::create_random_forest_classifier(
        RandomForestParams::default().with_n_estimators(0),
    )
    .unwrap_err();
    assert!(matches!(err, ClassifierError::UnsupportedAlgorithm { .. }));

    let err = factory::create_knn_classifier(KnnParams::default().with_n_neighbors(1)).unwrap_err();
    assert!(matches!(err, ClassifierError::UnsupportedAlgorithm { .. }));

    let err = factory::create_logistic_regression_classifier(
        LogisticRegressionParams::default().with_c(0.0),
    )
    .unwrap_err();
    assert!(matches!(err, ClassifierError::UnsupportedAlgorithm { .. }));
}

#[test]
fn test_non_finite_predict_input_is_invalid_for_every_factory() {
    init_logging();
    let (x, y) = clusters(2);
    let queries = [
        arr2(&[[f64::NAN, 0.5]]).mapv(Value::Numeric),
        arr2(&[[0.5, f64::INFINITY]]).mapv(Value::Numeric),
        arr2(&[[0.0, 0.0], [f64::NEG_INFINITY, 1.0]]).mapv(Value::Numeric),
    ];
    for config in all_configs() {
        let mut model = factory::build_classifier(config.clone()).expect("valid config");
        model.fit(&x, &y).expect("fit failed");
        for query in &queries {
            assert!(
                matches!(
                    model.predict_class_probabilities(query),
                    Err(ClassifierError::InvalidInput(_))
                ),
                "{} accepted {:?}",
                config.algorithm(),
                query
            );
            assert!(matches!(
                model.predict(query),
                Err(ClassifierError::InvalidInput(_))
            ));
        }
        // the model stays usable after a rejected query
        assert!(model.predict_class_probabilities(&x).is_ok());
    }
}

#[test]
fn test_mismatched_rows_are_invalid_input() {
    let (x, _) = clusters(2);
    let y = arr1(&[0.0, 1.0]).mapv(Value::Numeric);
    let mut model = factory::create_ada_boost_classifier(Default::default()).expect("valid params");
    assert!(matches!(
        model.fit(&x, &y),
        Err(ClassifierError::InvalidInput(_))
    ));
    assert!(!model.is_fitted());
}

#[test]
fn test_fit_twice_replaces_labels() {
    let (x, y) = clusters(2);
    let mut model =
        factory::create_gaussian_nb_classifier(Default::default()).expect("valid params");
    model.fit(&x, &y).expect("fit failed");

    let relabelled = y.mapv(|v| match v {
        Value::Numeric(c) if c == 0.0 => Value::from("a"),
        _ => Value::from("b"),
    });
    model.fit(&x, &relabelled).expect("refit failed");
    assert_eq!(model.classes().unwrap(), vec![Value::from("a"), Value::from("b")]);
}
