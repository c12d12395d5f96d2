use crate::{
    Bounds, NLPBound, NLPFunctionTarget, NLPSolution, NLPSolver, NLPSolverOptions,
    utils::{IntoDVector, IntoFaerMat},
};
use faer::Mat;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Model of which predictions are fitted to observations.
pub trait ResidualModel {
    /// Predictions at the parameter vector x.
    fn predict(&self, x: &DVector<f64>) -> DVector<f64>;
    /// Jacobian of the predictions, one row per observation.
    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64>;
}

#[cfg_attr(doc, katexit::katexit)]
/// Sum of squares target $f(x) = \frac{1}{2} \lVert m(x) - y \rVert^2$ of a [ResidualModel].
///
/// The gradient is $J^T r$ and the hessian is approximated by the Gauss-Newton matrix
/// $J^T J + \lambda (1 + \max_i (J^T J)_{ii}) I$ with a small damping $\lambda$, which keeps it
/// positive definite when parameters are not identified by the data.
pub struct LeastSquaresTarget {
    model: Arc<dyn ResidualModel + Send + Sync>,
    observed: DVector<f64>,
    damping: f64,
}

impl LeastSquaresTarget {
    /// Creates the target of a model and its observations.
    pub fn new(model: Arc<dyn ResidualModel + Send + Sync>, observed: DVector<f64>) -> Self {
        Self {
            model,
            observed,
            damping: 1e-9,
        }
    }

    /// Sets the Levenberg damping of the Gauss-Newton hessian.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        self.model.predict(x) - &self.observed
    }
}

impl NLPFunctionTarget for LeastSquaresTarget {
    fn val(&self, x: &Mat<f64>) -> f64 {
        0.5 * self.residuals(&x.into_dvector()).norm_squared()
    }

    fn val_grad(&self, x: &Mat<f64>) -> (f64, Mat<f64>) {
        let x = x.into_dvector();
        let r = self.residuals(&x);
        let jac = self.model.jacobian(&x);
        let grad = jac.tr_mul(&r);
        (0.5 * r.norm_squared(), grad.into_faer_mat())
    }

    fn val_grad_hes(&self, x: &Mat<f64>) -> (f64, Mat<f64>, Mat<f64>) {
        let x = x.into_dvector();
        let r = self.residuals(&x);
        let jac = self.model.jacobian(&x);
        let grad = jac.tr_mul(&r);
        let mut hes = jac.tr_mul(&jac);
        let shift = self.damping * (1. + hes.diagonal().max());
        for i in 0..hes.nrows() {
            hes[(i, i)] += shift;
        }
        (
            0.5 * r.norm_squared(),
            grad.into_faer_mat(),
            hes.into_faer_mat(),
        )
    }
}

/// Minimizes the sum of squared residuals of a model within bounds, starting at x0.
///
/// x0 is moved into the strict interior of the bounds first.
pub fn fit_least_squares(
    model: Arc<dyn ResidualModel + Send + Sync>,
    observed: DVector<f64>,
    x0: &DVector<f64>,
    bounds: &Bounds,
    options: &NLPSolverOptions,
) -> NLPSolution {
    let target: Arc<_> = LeastSquaresTarget::new(model, observed).into();
    let solver = NLPSolver::new(options.clone(), Some(NLPBound::from(bounds)), target);
    solver.minimize(bounds.project_interior(x0))
}
