use gcm_classifiers::data::{numeric_matrix, shape_into_2d, Value};
use gcm_classifiers::error::ClassifierError;
use gcm_classifiers::preprocessing::{
    apply_one_hot_encoding, fit_one_hot_encoders, PolynomialFeatures,
};
use ndarray::{arr1, arr2};

fn mixed_matrix() -> ndarray::Array2<Value> {
    arr2(&[
        [Value::from(1.5), Value::from("b"), Value::from(10.0)],
        [Value::from(2.5), Value::from("a"), Value::from(20.0)],
        [Value::from(3.5), Value::from("c"), Value::from(30.0)],
    ])
}

#[test]
fn test_one_hot_encoders_cover_categorical_columns_only() {
    let encoders = fit_one_hot_encoders(&mixed_matrix());
    assert_eq!(encoders.encoders.len(), 1);
    assert_eq!(
        encoders.encoders[&1].categories,
        vec![Value::from("a"), Value::from("b"), Value::from("c")]
    );
    assert_eq!(encoders.n_output_features(), 5);
}

#[test]
fn test_indicators_replace_the_column_in_place() {
    let x = mixed_matrix();
    let encoders = fit_one_hot_encoders(&x);
    let encoded = apply_one_hot_encoding(&x, &encoders).unwrap();
    assert_eq!(
        encoded,
        arr2(&[
            [1.5, 0.0, 1.0, 0.0, 10.0],
            [2.5, 1.0, 0.0, 0.0, 20.0],
            [3.5, 0.0, 0.0, 1.0, 30.0],
        ])
    );
}

#[test]
fn test_unseen_category_encodes_as_zeros() {
    let encoders = fit_one_hot_encoders(&mixed_matrix());
    let query = arr2(&[[Value::from(0.0), Value::from("z"), Value::from(1.0)]]);
    let encoded = apply_one_hot_encoding(&query, &encoders).unwrap();
    assert_eq!(encoded, arr2(&[[0.0, 0.0, 0.0, 0.0, 1.0]]));
}

#[test]
fn test_column_count_must_match() {
    let encoders = fit_one_hot_encoders(&mixed_matrix());
    let query = numeric_matrix(&arr2(&[[1.0, 2.0]]));
    assert!(matches!(
        apply_one_hot_encoding(&query, &encoders),
        Err(ClassifierError::InvalidInput(_))
    ));
}

#[test]
fn test_mixed_column_is_categorical() {
    // a column with any string cell is encoded, numbers become categories too
    let x = arr2(&[[Value::from(1.0)], [Value::from("x")], [Value::from(1.0)]]);
    let encoders = fit_one_hot_encoders(&x);
    let encoded = apply_one_hot_encoding(&x, &encoders).unwrap();
    assert_eq!(encoded, arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 0.0]]));
}

#[test]
fn test_shape_into_2d_for_labels() {
    let labels = arr1(&[Value::from("a"), Value::from("b")]);
    let shaped = shape_into_2d(labels).unwrap();
    assert_eq!(shaped.dim(), (2, 1));
    assert_eq!(shaped[(1, 0)], Value::from("b"));
}

#[test]
fn test_polynomial_feature_counts() {
    assert_eq!(PolynomialFeatures::new(3).n_output_features(2), 9);
    assert_eq!(PolynomialFeatures::new(1).n_output_features(4), 4);
    let expanded = PolynomialFeatures::new(3).transform(&arr2(&[[2.0, -1.0]]));
    assert_eq!(
        expanded.row(0).to_vec(),
        vec![2.0, -1.0, 4.0, -2.0, 1.0, 8.0, -4.0, 2.0, -1.0]
    );
}
