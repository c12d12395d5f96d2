use crate::{Bounds, utils::IntoDVector};
use faer::{Mat, linalg::solvers::Solve, unzip, zip};
use faer_ext::IntoFaer;
use nalgebra::DVector;
use std::sync::Arc;

/// Interface for functions of which values are minimized by proving value, gradient and hessian
/// methods.
pub trait NLPFunctionTarget {
    /// Returns the value of its function at x.
    fn val(&self, x: &Mat<f64>) -> f64;
    /// Returns the value and gradient of its function at x.
    fn val_grad(&self, x: &Mat<f64>) -> (f64, Mat<f64>);
    /// Returns the value, gradient and hessian of its function at x.
    fn val_grad_hes(&self, x: &Mat<f64>) -> (f64, Mat<f64>, Mat<f64>);
}

/// Ensures the consistency of of [NLPFunctionTarget] value, gradient and hessian methods.
#[macro_export]
macro_rules! assert_nlp_target_consistency {
    ($target:ident, $x:expr) => {
        let val = $target.val($x);
        let val_grad = $target.val_grad($x);
        let val_grad_hes = $target.val_grad_hes($x);
        assert_eq!(val, val_grad.0);
        assert_eq!(val, val_grad_hes.0);
        assert_eq!(val_grad.1, val_grad_hes.1);
    };
}

/// Configuration of [NLPSolver].
#[derive(Debug, Clone, PartialEq)]
pub struct NLPSolverOptions {
    barrier_prec: f64,
    newton_prec: f64,
    barrier_max_iter: u64,
    newton_max_iter: u64,
    backline_max_iter: u64,
    barrier_mu: f64,
    barrier_t0: f64,
    backline_a: f64,
    backline_b: f64,
}

impl Default for NLPSolverOptions {
    fn default() -> Self {
        Self {
            barrier_prec: 1e-8,
            newton_prec: 1e-8,
            barrier_max_iter: 1_000,
            newton_max_iter: 200,
            backline_max_iter: 40,
            barrier_mu: 5.,
            barrier_t0: 100.,
            backline_a: 1.,
            backline_b: 0.5,
        }
    }
}

impl NLPSolverOptions {
    /// Creates a new nlp solver Configuration with its default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximal number of newton iterations per barrier step.
    pub fn with_newton_max_iter(mut self, newton_max_iter: u64) -> Self {
        self.newton_max_iter = newton_max_iter;
        self
    }

    /// Sets the newton step norm at which a barrier step is considered solved.
    pub fn with_newton_prec(mut self, newton_prec: f64) -> Self {
        self.newton_prec = newton_prec;
        self
    }

    /// Sets the duality gap at which the barrier method stops.
    pub fn with_barrier_prec(mut self, barrier_prec: f64) -> Self {
        self.barrier_prec = barrier_prec;
        self
    }

    /// Sets the maximal number of step halvings of the backtracking line search.
    pub fn with_backline_max_iter(mut self, backline_max_iter: u64) -> Self {
        self.backline_max_iter = backline_max_iter;
        self
    }

    /// Maximal number of newton iterations per barrier step.
    pub fn newton_max_iter(&self) -> u64 {
        self.newton_max_iter
    }
}

/// Box constraint of [NLPSolver]. Infinite entries leave a coordinate unconstrained.
#[derive(Debug, Clone)]
pub struct NLPBound {
    /// Lower bound.
    pub lower: Mat<f64>,
    /// Upper bound.
    pub upper: Mat<f64>,
}

impl NLPBound {
    /// Creates a box constraint from lower and upper bound vectors.
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Self {
        let lower = lower.view_range(.., ..).into_faer().to_owned();
        let upper = upper.view_range(.., ..).into_faer().to_owned();
        Self { lower, upper }
    }
}

impl From<&Bounds> for NLPBound {
    fn from(bounds: &Bounds) -> Self {
        NLPBound::new(bounds.lower().clone(), bounds.upper().clone())
    }
}

/// Result of [NLPSolver::minimize].
#[derive(Debug, Clone, PartialEq)]
pub struct NLPSolution {
    /// Best iterate.
    pub x: DVector<f64>,
    /// False if a newton loop stopped at its iteration limit.
    pub converged: bool,
    /// Total number of newton iterations.
    pub iterations: u64,
}

/// Non linear programming solver that minimizes [NLPFunctionTarget] within an optional
/// [NLPBound] by a log barrier interior point method.
pub struct NLPSolver {
    options: NLPSolverOptions,
    bound: Option<NLPBound>,
    func: Arc<dyn NLPFunctionTarget + Send + Sync>,
}

struct NewtonReport {
    iterations: u64,
    limit_reached: bool,
}

impl NLPSolver {
    /// Initialize the NLP solver.
    pub fn new(
        options: NLPSolverOptions,
        bound: Option<NLPBound>,
        func: Arc<dyn NLPFunctionTarget + Send + Sync>,
    ) -> Self {
        Self {
            options,
            bound,
            func,
        }
    }

    /// Returns x that minimizes the [NLPFunctionTarget] within the given [NLPBound].
    ///
    /// x0 has to lie in the strict interior of the bound.
    pub fn minimize(&self, x0: DVector<f64>) -> NLPSolution {
        self.barrier_method(x0)
    }

    fn barrier_method(&self, x: DVector<f64>) -> NLPSolution {
        let mut x = x.view_range(.., ..).into_faer().to_owned();
        let x_size = x.nrows() as f64;
        let t0 = 200_f64.max((self.options.barrier_t0 * x_size.sqrt()).min(5e3));
        let mut t = t0;
        let mut i = 0;
        let mut iterations = 0;
        let mut converged = true;
        while i < self.options.barrier_max_iter && x_size / t >= self.options.barrier_prec {
            i += 1;
            let report = self.newton_method(&mut x, t, t0);
            iterations += report.iterations;
            converged &= !report.limit_reached;
            log::debug!(
                "barrier step {i}: t = {t:e}, newton iterations = {}",
                report.iterations
            );
            t *= self.options.barrier_mu;
        }
        NLPSolution {
            x: x.into_dvector(),
            converged,
            iterations,
        }
    }

    fn newton_method(&self, x: &mut Mat<f64>, t: f64, t0: f64) -> NewtonReport {
        let iter_barrier = (t / t0 / self.options.barrier_mu) as i32;

        let mut i = 0;
        let mut crit = 0.;
        let mut backline_exceeded: bool = false;
        let threshold = self.options.newton_prec * 1_f64.max(1e4 * 2_f64.powi(-iter_barrier));

        while i < self.options.newton_max_iter && (i == 0 || crit >= threshold) && !backline_exceeded
        {
            i += 1;
            let (func_val, mut func_grad, mut func_hes) = self.func.val_grad_hes(x);
            func_grad *= -t;
            func_hes *= t;

            if let Some(bound) = &self.bound {
                let (bound_grad, bound_hes) = self.log_barrier_bound_grad_hes(x, bound);
                func_grad -= bound_grad;
                func_hes += bound_hes;
            }

            let dx = func_hes.partial_piv_lu().solve(&func_grad);
            crit = dx.norm_l2();
            if !crit.is_finite() {
                break;
            }

            let old_val = t * func_val + self.log_barrier_bound_val(x);
            self.backline_search(x, dx, &mut backline_exceeded, old_val, t);
        }
        NewtonReport {
            iterations: i,
            limit_reached: i == self.options.newton_max_iter && crit >= threshold,
        }
    }

    #[inline(always)]
    fn backline_search(
        &self,
        x: &mut Mat<f64>,
        mut dx: Mat<f64>,
        backline_exceeded: &mut bool,
        old_val: f64,
        t: f64,
    ) {
        let dx_norm = dx.norm_l2();
        if dx_norm > 1. {
            dx /= dx_norm;
        }
        let mut a = self.options.backline_a;
        let mut iter = 0;
        let mut search = true;
        while iter < self.options.backline_max_iter && search {
            iter += 1;
            let x_tmp = &*x + a * &dx;
            if self.feasibility_check(&x_tmp) {
                let val = t * self.func.val(&x_tmp) + self.log_barrier_bound_val(&x_tmp);
                if val < old_val {
                    *x = x_tmp;
                    search = false;
                    continue;
                }
            }
            a *= self.options.backline_b;
        }
        if search {
            *backline_exceeded = true;
        }
    }

    #[inline(always)]
    fn mat_min(&self, x: &Mat<f64>) -> f64 {
        let mut min = f64::INFINITY;
        x.col_iter().for_each(|c| {
            c.iter().for_each(|&v| {
                if v < min {
                    min = v;
                }
            });
        });
        min
    }

    #[inline(always)]
    fn feasibility_check(&self, x: &Mat<f64>) -> bool {
        if let Some(bound) = &self.bound {
            return self.mat_min(&(x - &bound.lower)) > 0. && self.mat_min(&(&bound.upper - x)) > 0.;
        }
        true
    }

    fn log_barrier_bound_val(&self, x: &Mat<f64>) -> f64 {
        let mut val = 0.;
        if let Some(bound) = &self.bound {
            zip!(x, &bound.lower, &bound.upper).for_each(|unzip!(v, l, u)| {
                if u.is_finite() {
                    val -= (*u - *v).ln();
                }
                if l.is_finite() {
                    val -= (*v - *l).ln();
                }
            });
        }
        val
    }

    #[inline(always)]
    fn log_barrier_bound_grad_hes(&self, x: &Mat<f64>, bound: &NLPBound) -> (Mat<f64>, Mat<f64>) {
        let mut grad = Mat::<f64>::zeros(x.nrows(), 1);
        zip!(&mut grad, x, &bound.lower, &bound.upper)
            .for_each(|unzip!(g, v, l, u)| *g = 1.0 / (*u - *v) + 1.0 / (*l - *v));
        let mut hes = Mat::<f64>::zeros(x.nrows(), x.nrows());
        for i in 0..hes.nrows() {
            hes[(i, i)] = 1.0 / (bound.upper[(i, 0)] - x[(i, 0)]).powi(2)
                + 1.0 / (bound.lower[(i, 0)] - x[(i, 0)]).powi(2);
        }
        (grad, hes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use faer::mat;

    struct NLPTargetTest {}

    impl NLPFunctionTarget for NLPTargetTest {
        fn val(&self, x: &Mat<f64>) -> f64 {
            x[(0, 0)].powi(2)
        }

        fn val_grad(&self, x: &Mat<f64>) -> (f64, Mat<f64>) {
            (self.val(x), 2. * x)
        }
        fn val_grad_hes(&self, x: &Mat<f64>) -> (f64, Mat<f64>, Mat<f64>) {
            let vg = self.val_grad(x);
            (vg.0, vg.1, mat![[2.]])
        }
    }

    /// Convex quadratic with coupled coordinates and its minimum at (1, 1).
    struct Valley {}

    impl NLPFunctionTarget for Valley {
        fn val(&self, x: &Mat<f64>) -> f64 {
            let (a, b) = (x[(0, 0)], x[(1, 0)]);
            (a - 1.).powi(2) + 10. * (b - a).powi(2)
        }

        fn val_grad(&self, x: &Mat<f64>) -> (f64, Mat<f64>) {
            let (a, b) = (x[(0, 0)], x[(1, 0)]);
            let grad = mat![[2. * (a - 1.) - 20. * (b - a)], [20. * (b - a)]];
            (self.val(x), grad)
        }

        fn val_grad_hes(&self, x: &Mat<f64>) -> (f64, Mat<f64>, Mat<f64>) {
            let (val, grad) = self.val_grad(x);
            (val, grad, mat![[22., -20.], [-20., 20.]])
        }
    }

    #[test]
    fn test_nlp_solver() -> Result<()> {
        let size = 1;
        for i in 0..10 {
            let lower = (i as f64) / 20.;
            let bound = Some(NLPBound::new(
                DVector::from_element(size, lower),
                DVector::from_element(size, 1.),
            ));
            let options = NLPSolverOptions::new();

            let nlp_target: Arc<_> = NLPTargetTest {}.into();

            let solver = NLPSolver::new(options, bound, nlp_target);
            let x0 = DVector::from_vec(vec![0.9]);
            let solution = solver.minimize(x0);
            assert!(
                solution
                    .x
                    .relative_eq(&DVector::from_vec(vec![lower]), 1e-4, 1e-4)
            );
        }
        Ok(())
    }

    #[test]
    fn test_nlp_solver_infinite_bound() -> Result<()> {
        let bound = Some(NLPBound::new(
            DVector::from_vec(vec![f64::NEG_INFINITY]),
            DVector::from_vec(vec![f64::INFINITY]),
        ));
        let nlp_target: Arc<_> = NLPTargetTest {}.into();
        let solver = NLPSolver::new(NLPSolverOptions::new(), bound, nlp_target);
        let solution = solver.minimize(DVector::from_vec(vec![3.]));
        assert!(solution.converged);
        assert!(solution.x[0].abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_nlp_solver_valley() -> Result<()> {
        let nlp_target: Arc<_> = Valley {}.into();
        let solver = NLPSolver::new(NLPSolverOptions::new(), None, nlp_target.clone());
        let solution = solver.minimize(DVector::from_vec(vec![-1.2, 1.]));
        assert!(
            solution
                .x
                .relative_eq(&DVector::from_vec(vec![1., 1.]), 1e-4, 1e-4)
        );

        // the unconstrained minimum is cut off by the upper bound of the first coordinate
        let bound = Some(NLPBound::new(
            DVector::from_vec(vec![f64::NEG_INFINITY, f64::NEG_INFINITY]),
            DVector::from_vec(vec![0.5, f64::INFINITY]),
        ));
        let solver = NLPSolver::new(NLPSolverOptions::new(), bound, nlp_target);
        let solution = solver.minimize(DVector::from_vec(vec![0., 0.]));
        assert!(
            solution
                .x
                .relative_eq(&DVector::from_vec(vec![0.5, 0.5]), 1e-4, 1e-4)
        );
        Ok(())
    }

    #[test]
    fn test_nlp_solver_iteration_limit() -> Result<()> {
        let nlp_target: Arc<_> = Valley {}.into();
        let options = NLPSolverOptions::new().with_newton_max_iter(1);
        let solver = NLPSolver::new(options, None, nlp_target);
        let solution = solver.minimize(DVector::from_vec(vec![-1.2, 1.]));
        assert!(!solution.converged);
        assert!(solution.iterations > 0);
        Ok(())
    }

    #[test]
    fn test_log_barrier_bound() -> Result<()> {
        let bound = NLPBound::new(
            DVector::from_vec(vec![0., f64::NEG_INFINITY]),
            DVector::from_vec(vec![1., f64::INFINITY]),
        );
        let nlp_target: Arc<_> = NLPTargetTest {}.into();
        let solver = NLPSolver::new(NLPSolverOptions::new(), Some(bound.clone()), nlp_target);
        let x = mat![[0.5], [3.]];
        let (grad, hes) = solver.log_barrier_bound_grad_hes(&x, &bound);
        assert!((solver.log_barrier_bound_val(&x) - 2. * 2_f64.ln()).abs() < 1e-12);
        assert!(grad[(0, 0)].abs() < 1e-12);
        assert_eq!(grad[(1, 0)], 0.);
        assert!((hes[(0, 0)] - 8.).abs() < 1e-12);
        assert_eq!(hes[(1, 1)], 0.);
        assert!(!solver.feasibility_check(&mat![[1.], [0.]]));
        assert!(solver.feasibility_check(&mat![[0.9], [-1e300]]));
        Ok(())
    }
}
