use super::{JacobianProvider, sanitize};
use crate::{SurfaceEvaluator, registry::Family};
use nalgebra::{DMatrix, DVector};
use num_dual::{Dual64, first_derivative};
use std::sync::Arc;

/// Jacobian of any surface by forward mode automatic differentiation.
///
/// The effect is linear in the state effects, their columns are the stationary occupancies.
/// Every other column is obtained by one pass of [Dual64] numbers through the surface.
#[derive(Debug, Clone)]
pub struct GenericJacobian {
    surface: Arc<SurfaceEvaluator>,
}

impl GenericJacobian {
    /// Creates the provider of a surface.
    pub fn new(surface: Arc<SurfaceEvaluator>) -> Self {
        Self { surface }
    }
}

impl JacobianProvider for GenericJacobian {
    fn jacobian(&self, doses: &DMatrix<f64>, theta: &DVector<f64>) -> DMatrix<f64> {
        let registry = self.surface.registry();
        let e_range = registry.family_range(Family::E);
        let mut jac = DMatrix::zeros(doses.nrows(), theta.len());
        let constant: Vec<Dual64> = theta.iter().map(|&v| Dual64::from(v)).collect();
        for row in 0..doses.nrows() {
            let dose: Vec<f64> = doses.row(row).iter().copied().collect();
            let occupancy = self.surface.occupancy(&dose, theta.as_slice());
            for (state, p) in occupancy.into_iter().enumerate() {
                jac[(row, registry.e_index(state))] = p;
            }
            for idx in (0..theta.len()).filter(|idx| !e_range.contains(idx)) {
                let (_, derivative) = first_derivative(
                    |v: Dual64| {
                        let mut dual_theta = constant.clone();
                        dual_theta[idx] = v;
                        self.surface.effect_at(&dose, &dual_theta)
                    },
                    theta[idx],
                );
                jac[(row, idx)] = derivative;
            }
        }
        sanitize(jac)
    }
}
