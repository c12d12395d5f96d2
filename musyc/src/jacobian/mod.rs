mod analytic;
mod generic;

pub use analytic::AnalyticTwoDrug;
pub use generic::GenericJacobian;

use crate::SurfaceEvaluator;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Interface of jacobian providers.
///
/// The jacobian has one row per dose row and one column per parameter in registry order.
/// Derivatives are taken with respect to optimizer coordinates, i.e. with respect to the
/// natural logarithm of strictly positive parameters.
pub trait JacobianProvider {
    /// Returns the jacobian of the effect at every dose row.
    fn jacobian(&self, doses: &DMatrix<f64>, theta: &DVector<f64>) -> DMatrix<f64>;
}

/// Requested jacobian implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JacobianKind {
    /// Closed form for two drugs with fitted gamma, dual numbers otherwise.
    #[default]
    Auto,
    /// Always use dual numbers.
    Generic,
}

/// Jacobian provider chosen for a surface.
#[derive(Debug, Clone)]
pub enum Jacobian {
    /// Closed form of the two drug surface.
    AnalyticTwoDrug(AnalyticTwoDrug),
    /// Forward mode automatic differentiation of any surface.
    Generic(GenericJacobian),
}

impl Jacobian {
    /// Selects the provider of a surface.
    pub fn select(surface: Arc<SurfaceEvaluator>, kind: JacobianKind) -> Self {
        let registry = surface.registry();
        match kind {
            JacobianKind::Auto if registry.num_drugs() == 2 && registry.fit_gamma() => {
                Jacobian::AnalyticTwoDrug(AnalyticTwoDrug::new(surface))
            }
            _ => Jacobian::Generic(GenericJacobian::new(surface)),
        }
    }
}

impl JacobianProvider for Jacobian {
    fn jacobian(&self, doses: &DMatrix<f64>, theta: &DVector<f64>) -> DMatrix<f64> {
        match self {
            Jacobian::AnalyticTwoDrug(j) => j.jacobian(doses, theta),
            Jacobian::Generic(j) => j.jacobian(doses, theta),
        }
    }
}

/// Replaces NaN entries by zero.
///
/// Derivatives with respect to parameters of a drug at zero dose evaluate to `0 * -inf`, the
/// effect does not depend on them there.
pub fn sanitize(mut jac: DMatrix<f64>) -> DMatrix<f64> {
    jac.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = 0.);
    jac
}
