//! Feature preprocessing shared by the adapters and pipelines.
//!
//! Provides per-column one-hot encoders fitted once at training time and a
//! polynomial feature expansion used by the polynomial logistic regression
//! pipeline. Encoders operate on `Array2<Value>` and always produce the
//! dense `Array2<f64>` the smartcore estimators consume.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::Value;
use crate::error::{ClassifierError, Result};

/// Categories of one feature column, in sorted order.
#[derive(Clone, Debug, PartialEq)]
pub struct OneHotEncoder {
    pub categories: Vec<Value>,
}

impl OneHotEncoder {
    /// Indicator position of `value`, or `None` for a category unseen at fit time.
    pub fn position(&self, value: &Value) -> Option<usize> {
        self.categories.binary_search(value).ok()
    }
}

/// Encoders for every categorical column of a feature matrix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OneHotEncoders {
    pub n_features: usize,
    pub encoders: BTreeMap<usize, OneHotEncoder>,
}

impl OneHotEncoders {
    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Number of columns `apply_one_hot_encoding` produces.
    pub fn n_output_features(&self) -> usize {
        (0..self.n_features)
            .map(|c| self.encoders.get(&c).map_or(1, |e| e.categories.len()))
            .sum()
    }
}

/// Fit an encoder for every column holding at least one categorical cell.
pub fn fit_one_hot_encoders(x: &Array2<Value>) -> OneHotEncoders {
    let mut encoders = BTreeMap::new();
    for (c, column) in x.columns().into_iter().enumerate() {
        if !column.iter().any(Value::is_categorical) {
            continue;
        }
        let categories: BTreeSet<Value> = column.iter().cloned().collect();
        encoders.insert(
            c,
            OneHotEncoder {
                categories: categories.into_iter().collect(),
            },
        );
    }

    log::trace!(
        "Fitted one-hot encoders for {} of {} columns",
        encoders.len(),
        x.ncols()
    );

    OneHotEncoders {
        n_features: x.ncols(),
        encoders,
    }
}

/// Replace every encoded column by its indicator columns, in place order.
///
/// Categories unseen at fit time encode as all zeros. A categorical cell in
/// a column that was numeric at fit time is an `InvalidInput` error.
pub fn apply_one_hot_encoding(x: &Array2<Value>, encoders: &OneHotEncoders) -> Result<Array2<f64>> {
    let (nrows, ncols) = x.dim();
    if ncols != encoders.n_features {
        return Err(ClassifierError::invalid_input(format!(
            "expected {} feature columns, got {}",
            encoders.n_features, ncols
        )));
    }

    let width = encoders.n_output_features();
    let mut out = Array2::<f64>::zeros((nrows, width));

    for (r, row) in x.rows().into_iter().enumerate() {
        let mut offset = 0;
        for (c, value) in row.iter().enumerate() {
            match encoders.encoders.get(&c) {
                Some(encoder) => {
                    if let Some(pos) = encoder.position(value) {
                        out[(r, offset + pos)] = 1.0;
                    }
                    offset += encoder.categories.len();
                }
                None => {
                    out[(r, offset)] = value.as_f64().ok_or_else(|| {
                        ClassifierError::invalid_input(format!(
                            "column {} is numeric but row {} holds '{}'",
                            c, r, value
                        ))
                    })?;
                    offset += 1;
                }
            }
        }
    }

    Ok(out)
}

/// Polynomial and interaction features up to `degree`.
///
/// Terms are ordered by degree, then lexicographically by feature index,
/// so for `[a, b]` and degree 2 the output is `[a, b, a^2, ab, b^2]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    pub degree: usize,
    pub include_bias: bool,
}

impl PolynomialFeatures {
    pub fn new(degree: usize) -> Self {
        PolynomialFeatures {
            degree,
            include_bias: false,
        }
    }

    fn terms(&self, n_features: usize) -> Vec<Vec<usize>> {
        let mut terms = Vec::new();
        let mut current: Vec<Vec<usize>> = (0..n_features).map(|i| vec![i]).collect();
        for d in 1..=self.degree {
            if d > 1 {
                current = current
                    .iter()
                    .flat_map(|term| {
                        let last = term.last().copied().unwrap_or(0);
                        (last..n_features).map(move |j| {
                            let mut next = term.clone();
                            next.push(j);
                            next
                        })
                    })
                    .collect();
            }
            terms.extend(current.iter().cloned());
        }
        terms
    }

    pub fn n_output_features(&self, n_features: usize) -> usize {
        self.terms(n_features).len() + usize::from(self.include_bias)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let terms = self.terms(x.ncols());
        let bias = usize::from(self.include_bias);
        let mut out = Array2::<f64>::ones((x.nrows(), terms.len() + bias));
        for (r, row) in x.rows().into_iter().enumerate() {
            for (t, term) in terms.iter().enumerate() {
                out[(r, t + bias)] = term.iter().map(|&j| row[j]).product();
            }
        }
        out
    }
}
