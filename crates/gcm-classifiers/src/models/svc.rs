use std::sync::Arc;

use ndarray::Array2;
use self_cell::self_cell;
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::svm::svc::{SVCParameters, SVC};
use smartcore::svm::Kernels;

use crate::config::{ClassifierConfig, Gamma, GammaMode, KernelKind, SvcParams};
use crate::error::{ClassifierError, Result};
use crate::models::calibration::PlattScaling;
use crate::models::classifier_trait::TrainableClassifier;
use crate::models::utils::{
    check_fit_input, check_n_features, normalize_rows, resolve_seed, to_dense,
};

const NAME: &str = "support_vector";

type BinarySvc<'a> = SVC<'a, f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Everything a smartcore `SVC` borrows while it is trained and used.
#[derive(Debug)]
struct MachineInputs {
    x: Arc<DenseMatrix<f64>>,
    /// 0/1 targets over the training rows.
    targets: Vec<u32>,
    parameters: SVCParameters<f64, u32, DenseMatrix<f64>, Vec<u32>>,
}

self_cell!(
    /// A fitted binary `SVC` stored next to the parameters it borrows.
    struct TrainedSvc {
        owner: MachineInputs,

        #[covariant]
        dependent: BinarySvc,
    }

    impl {Debug}
);

impl TrainedSvc {
    fn decision_function(&self, x: &DenseMatrix<f64>) -> std::result::Result<Vec<f64>, Failed> {
        self.with_dependent(|_, svc| decide(svc, x))
    }

    fn training_decisions(&self) -> std::result::Result<Vec<f64>, Failed> {
        self.with_dependent(|inputs, svc| decide(svc, &inputs.x))
    }
}

fn decide<'a>(
    svc: &BinarySvc<'a>,
    x: &'a DenseMatrix<f64>,
) -> std::result::Result<Vec<f64>, Failed> {
    svc.decision_function(x)
}

#[derive(Debug)]
struct Machine {
    svc: TrainedSvc,
    platt: PlattScaling,
}

#[derive(Debug)]
struct FittedSvc {
    machines: Vec<Machine>,
    classes: Vec<u32>,
    n_features: usize,
}

// SAFETY: the only field that is not `Send` is the `Box<dyn Kernel>` inside
// each machine's `SVCParameters`. It is always a `Kernels` value, which is
// plain data, and it is only reachable through the cell that owns it, so the
// machines move between threads together with everything that borrows them.
unsafe impl Send for FittedSvc {}

/// Support-vector classifier with Platt-scaled probabilities.
///
/// smartcore's `SVC` is binary and borrows its parameters, so every fitted
/// machine is kept in a self-referential cell together with them. More than
/// two classes are handled one-vs-rest and the calibrated scores are
/// renormalised.
#[derive(Debug)]
pub struct SupportVectorClassifier {
    params: SvcParams,
    fitted: Option<FittedSvc>,
}

impl SupportVectorClassifier {
    pub fn new(params: SvcParams) -> Self {
        SupportVectorClassifier {
            params,
            fitted: None,
        }
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols() as f64;
        match self.params.gamma {
            Gamma::Value(g) => g,
            Gamma::Mode(GammaMode::Auto) => 1.0 / n_features,
            Gamma::Mode(GammaMode::Scale) => {
                let n = x.len() as f64;
                let mean = x.sum() / n;
                let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }

    fn kernel(&self, gamma: f64) -> Kernels {
        match self.params.kernel {
            KernelKind::Linear => Kernels::linear(),
            KernelKind::Rbf => Kernels::rbf().with_gamma(gamma),
            KernelKind::Poly => Kernels::polynomial()
                .with_degree(self.params.degree)
                .with_gamma(gamma)
                .with_coef0(self.params.coef0),
            KernelKind::Sigmoid => Kernels::sigmoid()
                .with_gamma(gamma)
                .with_coef0(self.params.coef0),
        }
    }

    /// Train one binary machine on `targets`.
    fn train_machine(
        &self,
        x: &Arc<DenseMatrix<f64>>,
        kernel: &Kernels,
        seed: u64,
        targets: Vec<u32>,
    ) -> std::result::Result<TrainedSvc, Failed> {
        let inputs = MachineInputs {
            x: Arc::clone(x),
            targets,
            parameters: SVCParameters::default()
                .with_c(self.params.c)
                .with_tol(self.params.tol)
                .with_epoch(self.params.epochs)
                .with_kernel(kernel.clone())
                .with_seed(Some(seed)),
        };
        TrainedSvc::try_new(inputs, |inputs| {
            BinarySvc::fit(&inputs.x, &inputs.targets, &inputs.parameters)
        })
    }
}

impl TrainableClassifier for SupportVectorClassifier {
    fn name(&self) -> &'static str {
        NAME
    }

    fn config(&self) -> ClassifierConfig {
        ClassifierConfig::SupportVector(self.params.clone())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u32]) -> Result<()> {
        self.fitted = None;
        let n_classes = check_fit_input(NAME, x, y)?;
        let train_x = Arc::new(to_dense(x).map_err(|e| ClassifierError::fit(NAME, e))?);
        let gamma = self.resolve_gamma(x);
        let kernel = self.kernel(gamma);
        let seed = resolve_seed(self.params.random_state);

        let target_sets: Vec<Vec<u32>> = if n_classes == 2 {
            vec![y.to_vec()]
        } else {
            (0..n_classes as u32)
                .map(|class| y.iter().map(|&c| u32::from(c == class)).collect())
                .collect()
        };

        log::debug!(
            "Fitting SVC ({:?} kernel, gamma={:.4}, C={}): {} machine(s) on {} samples",
            self.params.kernel,
            gamma,
            self.params.c,
            target_sets.len(),
            x.nrows()
        );

        let mut machines = Vec::with_capacity(target_sets.len());
        for targets in target_sets {
            let labels: Vec<bool> = targets.iter().map(|&t| t == 1).collect();
            let svc = self
                .train_machine(&train_x, &kernel, seed, targets)
                .map_err(|e| ClassifierError::fit(NAME, e))?;
            let decisions = svc
                .training_decisions()
                .map_err(|e| ClassifierError::fit(NAME, e))?;
            let platt = PlattScaling::fit(&decisions, &labels);
            log::trace!("Platt scaling a={:.4}, b={:.4}", platt.a, platt.b);
            machines.push(Machine { svc, platt });
        }

        self.fitted = Some(FittedSvc {
            machines,
            classes: (0..n_classes as u32).collect(),
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict_probabilities(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ClassifierError::unfitted(NAME))?;
        check_n_features(NAME, fitted.n_features, x)?;
        let query = to_dense(x).map_err(|e| ClassifierError::prediction(NAME, e))?;

        let n_classes = fitted.classes.len();
        let mut proba = Array2::<f64>::zeros((x.nrows(), n_classes));
        for (m, machine) in fitted.machines.iter().enumerate() {
            let decisions = machine
                .svc
                .decision_function(&query)
                .map_err(|e| ClassifierError::prediction(NAME, e))?;
            for (r, d) in decisions.into_iter().enumerate() {
                let p = machine.platt.probability(d);
                if n_classes == 2 {
                    proba[(r, 0)] = 1.0 - p;
                    proba[(r, 1)] = p;
                } else {
                    proba[(r, m)] = p;
                }
            }
        }
        if n_classes > 2 {
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
        Box::new(SupportVectorClassifier::new(self.params.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn two_blobs() -> (Array2<f64>, Vec<u32>) {
        let x = arr2(&[
            [0.0, 0.1],
            [0.3, -0.2],
            [-0.2, 0.2],
            [0.1, 0.4],
            [-0.4, -0.1],
            [3.0, 3.1],
            [3.2, 2.8],
            [2.9, 3.3],
            [3.4, 3.0],
            [2.7, 2.9],
        ]);
        (x, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1])
    }

    #[test]
    fn test_binary_svc_is_calibrated() {
        let (x, y) = two_blobs();
        let mut svc = SupportVectorClassifier::new(SvcParams::default().with_random_state(3));
        svc.fit(&x, &y).unwrap();
        let proba = svc.predict_probabilities(&arr2(&[[0.0, 0.0], [3.0, 3.0]])).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(proba[(0, 0)] > 0.5);
        assert!(proba[(1, 1)] > 0.5);
    }

    #[test]
    fn test_predict_reuses_trained_machines() {
        let (x, y) = two_blobs();
        let mut svc = SupportVectorClassifier::new(
            SvcParams::default()
                .with_kernel(KernelKind::Linear)
                .with_random_state(11),
        );
        svc.fit(&x, &y).unwrap();

        let fitted = svc.fitted.as_ref().unwrap();
        assert_eq!(fitted.machines.len(), 1);
        let machine = &fitted.machines[0];
        let stored = machine.svc.training_decisions().unwrap();
        assert_eq!(stored.len(), x.nrows());

        let proba = svc.predict_probabilities(&x).unwrap();
        for (r, d) in stored.iter().enumerate() {
            assert_eq!(proba[(r, 1)], machine.platt.probability(*d));
        }
        assert_eq!(proba, svc.predict_probabilities(&x).unwrap());
    }

    #[test]
    fn test_fitted_classifier_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let (x, y) = two_blobs();
        let mut svc = SupportVectorClassifier::new(SvcParams::default().with_random_state(2));
        svc.fit(&x, &y).unwrap();
        assert_send(&svc);
        let handle = std::thread::spawn(move || svc.predict(&arr2(&[[3.0, 3.0]])).unwrap());
        assert_eq!(handle.join().unwrap(), vec![1]);
    }

    #[test]
    fn test_one_vs_rest_for_three_classes() {
        let x = arr2(&[
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.3],
            [5.0, 0.0],
            [5.2, 0.1],
            [4.9, 0.3],
            [0.0, 5.0],
            [0.1, 5.2],
            [0.3, 4.8],
        ]);
        let y = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let mut svc = SupportVectorClassifier::new(SvcParams::default().with_random_state(7));
        svc.fit(&x, &y).unwrap();
        let proba = svc.predict_probabilities(&x).unwrap();
        assert_eq!(proba.dim(), (9, 3));
        assert_eq!(svc.fitted.as_ref().unwrap().machines.len(), 3);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }
}
