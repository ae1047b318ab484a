use std::f64::consts::PI;

use ndarray::{Array1, Array2, Axis};
use smartcore::error::Failed;
use smartcore::linalg::traits::cholesky::CholeskyDecomposable;

use crate::config::{ClassifierConfig, GaussianProcessParams};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{
    check_fit_input, check_n_features, from_dense, normalize_rows, sigmoid, to_dense,
};

const NAME: &str = "gaussian_process";
const MODE_TOLERANCE: f64 = 1e-10;

/// Laplace approximation of one binary problem at the posterior mode.
#[derive(Debug, Clone)]
struct LaplaceMode {
    /// `t - pi` at the mode.
    residual: Array1<f64>,
    sqrt_w: Array1<f64>,
    /// `I + sqrt(W) K sqrt(W)`
    b: Array2<f64>,
}

#[derive(Debug)]
struct FittedGp {
    x_train: Array2<f64>,
    /// One mode for binary problems, one per class (one-vs-rest) otherwise.
    modes: Vec<LaplaceMode>,
    classes: Vec<u32>,
}

/// Gaussian process classifier with a logistic link.
///
/// The latent posterior is approximated with Laplace's method (Newton
/// iterations to the mode, then a Gaussian at the mode). Kernel
/// hyper-parameters are taken as configured.
#[derive(Debug)]
pub struct GaussianProcessClassifier {
    params: GaussianProcessParams,
    fitted: Option<FittedGp>,
}

fn log_sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        -(-z).exp().ln_1p()
    } else {
        z - z.exp().ln_1p()
    }
}

/// Solve `a x = rhs` for symmetric positive definite `a`.
fn solve_spd(a: &Array2<f64>, rhs: &Array2<f64>) -> std::result::Result<Array2<f64>, Failed> {
    let solution = to_dense(a)?.cholesky_solve_mut(to_dense(rhs)?)?;
    Ok(from_dense(&solution))
}

impl GaussianProcessClassifier {
    pub fn new(params: GaussianProcessParams) -> Self {
        GaussianProcessClassifier {
            params,
            fitted: None,
        }
    }

    /// `amplitude * exp(-|a_i - b_j|^2 / (2 l^2))`
    fn kernel(&self, a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
        let scale = 2.0 * self.params.length_scale.powi(2);
        Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
            let d2: f64 = a
                .row(i)
                .iter()
                .zip(b.row(j).iter())
                .map(|(u, v)| (u - v).powi(2))
                .sum();
            self.params.amplitude * (-d2 / scale).exp()
        })
    }

    fn laplace_at(k: &Array2<f64>, t: &Array1<f64>, f: &Array1<f64>) -> LaplaceMode {
        let pi = f.mapv(sigmoid);
        let sqrt_w = pi.mapv(|p| (p * (1.0 - p)).sqrt());
        let n = t.len();
        let b = Array2::from_shape_fn((n, n), |(i, j)| {
            let identity = if i == j { 1.0 } else { 0.0 };
            identity + sqrt_w[i] * k[(i, j)] * sqrt_w[j]
        });
        LaplaceMode {
            residual: t - &pi,
            sqrt_w,
            b,
        }
    }

    /// Newton iterations for the mode of `p(f | t)`.
    fn find_mode(
        &self,
        k: &Array2<f64>,
        t: &Array1<f64>,
    ) -> std::result::Result<LaplaceMode, Failed> {
        let mut f = Array1::<f64>::zeros(t.len());
        let mut objective = f64::NEG_INFINITY;
        for iteration in 0..self.params.max_iter_predict {
            let LaplaceMode { residual, sqrt_w, b } = Self::laplace_at(k, t, &f);
            let w = sqrt_w.mapv(|s| s * s);
            let rhs = &w * &f + &residual;
            let scaled = (&sqrt_w * &k.dot(&rhs)).insert_axis(Axis(1));
            let solved = solve_spd(&b, &scaled)?;
            let a = &rhs - &(&sqrt_w * &solved.column(0));
            f = k.dot(&a);

            let log_likelihood: f64 = f
                .iter()
                .zip(t.iter())
                .map(|(fi, ti)| log_sigmoid((2.0 * ti - 1.0) * fi))
                .sum();
            let next = -0.5 * a.dot(&f) + log_likelihood;
            if (next - objective).abs() < MODE_TOLERANCE {
                log::trace!("Laplace mode converged after {} iterations", iteration + 1);
                break;
            }
            objective = next;
        }
        if !f.iter().all(|v| v.is_finite()) {
            return Err(Failed::fit("Laplace iterations diverged"));
        }
        Ok(Self::laplace_at(k, t, &f))
    }

    fn positive_probability(
        &self,
        mode: &LaplaceMode,
        k_star: &Array2<f64>,
    ) -> Result<Array1<f64>> {
        let mean = k_star.t().dot(&mode.residual);
        let v = k_star * &mode.sqrt_w.view().insert_axis(Axis(1));
        let solved = solve_spd(&mode.b, &v).map_err(|e| ClassifierError::prediction(NAME, e))?;
        let reduction = (&v * &solved).sum_axis(Axis(0));
        Ok(ndarray::Zip::from(&mean)
            .and(&reduction)
            .map_collect(|m, r| {
                let var = (self.params.amplitude - r).max(0.0);
                sigmoid(m / (1.0 + PI * var / 8.0).sqrt())
            }))
    }
}

impl TrainableClassifier for GaussianProcessClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::GaussianProcess(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.fitted = None;
        let n_classes = check_fit_input(NAME, x, y)?;
        let k = self.kernel(x, x);

        let targets: Vec<Array1<f64>> = if n_classes == 2 {
            vec![y.iter().map(|&c| f64::from(c)).collect()]
        } else {
            (0..n_classes as u32)
                .map(|class| y.iter().map(|&c| if c == class { 1.0 } else { 0.0 }).collect())
                .collect()
        };

        log::debug!(
            "Fitting GP classifier (length_scale={}, amplitude={}): {} latent(s), {} samples",
            self.params.length_scale,
            self.params.amplitude,
            targets.len(),
            x.nrows()
        );

        let modes = targets
            .iter()
            .map(|t| self.find_mode(&k, t))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ClassifierError::fit(NAME, e))?;

        self.fitted = Some(FittedGp {
            x_train: x.to_owned(),
            modes,
            classes: (0..n_classes as u32).collect(),
        });
        Ok(())
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ClassifierError::unfitted(NAME))?;
        check_n_features(NAME, fitted.x_train.ncols(), x)?;
        let k_star = self.kernel(&fitted.x_train, x);

        let n_classes = fitted.classes.len();
        let mut proba = Array2::<f64>::zeros((x.nrows(), n_classes));
        if n_classes == 2 {
            let p = self.positive_probability(&fitted.modes[0], &k_star)?;
            proba.column_mut(0).assign(&p.mapv(|v| 1.0 - v));
            proba.column_mut(1).assign(&p);
        } else {
            for (c, mode) in fitted.modes.iter().enumerate() {
                proba
                    .column_mut(c)
                    .assign(&self.positive_probability(mode, &k_star)?);
            }
            normalize_rows(&mut proba);
        }
        Ok(proba)
    }

    fn classes(&self) -> Result<&[u32]> {
        self.fitted
            .as_ref()
            .map(|f| f.classes.as_slice())
            .ok_or_else(|| ClassifierError::unfitted(NAME))
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn clone_unfitted(&self) -> Box<dyn TrainableClassifier> {
        Box::new(GaussianProcessClassifier::new(self.params.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_binary_gp_follows_the_data() {
        let x = arr2(&[[-3.0], [-2.5], [-2.0], [-1.5], [1.5], [2.0], [2.5], [3.0]]);
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let mut gp = GaussianProcessClassifier::new(GaussianProcessParams::default());
        gp.fit(&x, &y).unwrap();
        let proba = gp.predict_probabilities(&arr2(&[[-2.5], [0.0], [2.5]])).unwrap();
        assert!(proba[(0, 0)] > 0.6);
        assert!(proba[(2, 1)] > 0.6);
        assert!((proba[(1, 1)] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_far_points_revert_to_even_odds() {
        let x = arr2(&[[0.0], [0.5], [1.0], [1.5]]);
        let y = vec![0, 0, 1, 1];
        let mut gp = GaussianProcessClassifier::new(
            GaussianProcessParams::default().with_length_scale(0.5),
        );
        gp.fit(&x, &y).unwrap();
        let proba = gp.predict_probabilities(&arr2(&[[100.0]])).unwrap();
        assert!((proba[(0, 0)] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_multiclass_rows_sum_to_one() {
        let x = arr2(&[[0.0, 0.0], [0.3, 0.1], [4.0, 0.0], [4.1, 0.3], [0.0, 4.0], [0.2, 4.1]]);
        let y = vec![0, 0, 1, 1, 2, 2];
        let mut gp = GaussianProcessClassifier::new(GaussianProcessParams::default());
        gp.fit(&x, &y).unwrap();
        let proba = gp.predict_probabilities(&x).unwrap();
        assert_eq!(proba.dim(), (6, 3));
        for (row, class) in proba.rows().into_iter().zip(&y) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert_eq!(
                row.iter()
                    .enumerate()
                    .fold((0, f64::MIN), |best, (i, p)| if *p > best.1 { (i, *p) } else { best })
                    .0,
                *class as usize
            );
        }
    }
}
