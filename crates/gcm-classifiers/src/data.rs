//! Cell values, label encoding and shape helpers shared by the adapters.
//!
//! Feature matrices handed to a classifier are `Array2<Value>`: numeric
//! columns hold `Value::Numeric`, categorical columns hold
//! `Value::Categorical` and are one-hot encoded by the `preprocessing`
//! module before they reach an estimator. Labels use the same type so that
//! string and numeric class labels are handled alike.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use ndarray::{Array, Array1, Array2, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

/// A single feature cell or class label.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Numeric(f64),
    Categorical(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            Value::Categorical(_) => None,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, Value::Categorical(_))
    }
}

// Numbers sort before strings, numbers by total order so NaN is placeable.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Numeric(a), Value::Numeric(b)) => a.total_cmp(b),
            (Value::Numeric(_), Value::Categorical(_)) => Ordering::Less,
            (Value::Categorical(_), Value::Numeric(_)) => Ordering::Greater,
            (Value::Categorical(a), Value::Categorical(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(v) => write!(f, "{}", v),
            Value::Categorical(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Numeric(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Numeric(v as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Categorical(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Categorical(s)
    }
}

/// Lift a numeric matrix into a feature matrix.
pub fn numeric_matrix(x: &Array2<f64>) -> Array2<Value> {
    x.mapv(Value::Numeric)
}

/// Maps class labels to the dense codes `0..k` the estimators train on.
///
/// Codes follow the sorted label order, so code `i` indexes probability
/// column `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelEncoder {
    labels: Vec<Value>,
}

impl LabelEncoder {
    /// Collect the distinct labels of `y`.
    pub fn fit(y: &Array1<Value>) -> Self {
        let labels: BTreeSet<Value> = y.iter().cloned().collect();
        LabelEncoder {
            labels: labels.into_iter().collect(),
        }
    }

    pub fn labels(&self) -> &[Value] {
        &self.labels
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn encode(&self, y: &Array1<Value>) -> Result<Vec<u32>> {
        y.iter()
            .map(|label| {
                self.labels
                    .binary_search(label)
                    .map(|idx| idx as u32)
                    .map_err(|_| {
                        ClassifierError::invalid_input(format!("unknown class label {}", label))
                    })
            })
            .collect()
    }

    pub fn decode(&self, code: u32) -> Result<&Value> {
        self.labels.get(code as usize).ok_or_else(|| {
            ClassifierError::invalid_input(format!(
                "class code {} out of range for {} classes",
                code,
                self.labels.len()
            ))
        })
    }
}

/// Reshape an array of any rank up to two into a 2D array.
///
/// A scalar becomes `1 x 1` and a vector becomes a single column; 2D input
/// is returned with its shape intact.
pub fn shape_into_2d<T: Clone, D: Dimension>(array: Array<T, D>) -> Result<Array2<T>> {
    let shape = array.shape().to_vec();
    let (nrows, ncols) = match shape.as_slice() {
        [] => (1, 1),
        [n] => (*n, 1),
        [n, m] => (*n, *m),
        _ => {
            return Err(ClassifierError::invalid_input(format!(
                "expected at most 2 dimensions, got {}",
                shape.len()
            )))
        }
    };
    let values: Vec<T> = array.iter().cloned().collect();
    Array2::from_shape_vec((nrows, ncols), values)
        .map_err(|e| ClassifierError::invalid_input(e.to_string()))
}
