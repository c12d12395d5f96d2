use crate::{Error, ParameterRegistry, Result};
use nalgebra::{DMatrix, DVector};
use num_dual::DualNum;
use std::sync::Arc;

#[cfg_attr(doc, katexit::katexit)]
/// Evaluates the MuSyC dose-response surface.
///
/// Drug engagement is modelled as a continuous-time Markov chain over all $2^n$ drug states.
/// The edge engaging drug $k$ from parent state $p$ has the forward and reverse rates
///
/// $$ r^{+}_{p,k} = \rho_k^{\gamma} \left(\frac{\alpha d_k}{C_k}\right)^{\gamma h_k}, \quad
/// r^{-}_{p,k} = \rho_k^{\gamma}, $$
///
/// where $\rho_k$ is the reverse rate constant of drug $k$ and $\alpha = \gamma = 1$ on edges
/// leaving the origin. The predicted effect is $E(d) = \sum_s \pi_s(d) E_s$ with $\pi$ the
/// stationary distribution of the chain.
///
/// All evaluation methods take the parameter vector in optimizer coordinates and are generic
/// over [DualNum], so that the same code yields parameter derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEvaluator {
    registry: Arc<ParameterRegistry>,
    log_reverse_rates: Vec<f64>,
}

impl SurfaceEvaluator {
    /// Creates the surface of a registry with unit reverse rates.
    pub fn new(registry: Arc<ParameterRegistry>) -> Self {
        let n = registry.num_drugs();
        Self {
            registry,
            log_reverse_rates: vec![0.; n],
        }
    }

    /// Sets the reverse rate constants of every drug.
    pub fn with_reverse_rates(mut self, reverse_rates: &[f64]) -> Result<Self> {
        let n = self.registry.num_drugs();
        if reverse_rates.len() != n {
            return Err(Error::ShapeMismatch {
                mat1: "reverse_rates",
                mat2: "drugs",
                dim1: 0,
                dim2: 0,
                shape1: (reverse_rates.len(), 1),
                shape2: (n, 1),
            });
        }
        if let Some(drug) = reverse_rates
            .iter()
            .position(|&rr| !(rr.is_finite() && rr > 0.))
        {
            return Err(Error::InvalidBounds {
                name: format!("reverse rate of drug {}", drug + 1),
                lower: reverse_rates[drug],
                upper: f64::INFINITY,
            });
        }
        self.log_reverse_rates = reverse_rates.iter().map(|rr| rr.ln()).collect();
        Ok(self)
    }

    /// Parameter registry of the surface.
    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    /// Shared handle of the parameter registry.
    pub fn registry_arc(&self) -> Arc<ParameterRegistry> {
        self.registry.clone()
    }

    /// Number of drugs.
    pub fn num_drugs(&self) -> usize {
        self.registry.num_drugs()
    }

    /// Natural logarithm of the reverse rate constant of a drug.
    pub fn log_reverse_rate(&self, drug: usize) -> f64 {
        self.log_reverse_rates[drug]
    }

    /// Checks that every row of the dose matrix is a valid dose vector.
    pub fn validate_doses(&self, doses: &DMatrix<f64>) -> Result<()> {
        let n = self.num_drugs();
        if doses.ncols() != n {
            return Err(Error::ShapeMismatch {
                mat1: "doses",
                mat2: "drugs",
                dim1: 1,
                dim2: 0,
                shape1: doses.shape(),
                shape2: (n, 1),
            });
        }
        for col in 0..doses.ncols() {
            for row in 0..doses.nrows() {
                let value = doses[(row, col)];
                if !(value.is_finite() && value >= 0.) {
                    return Err(Error::InvalidDose { row, col, value });
                }
            }
        }
        Ok(())
    }

    /// Checks the length of a parameter vector.
    pub fn validate_parameters(&self, theta: &DVector<f64>) -> Result<()> {
        if theta.len() != self.registry.len() {
            return Err(Error::ShapeMismatch {
                mat1: "theta",
                mat2: "parameters",
                dim1: 0,
                dim2: 0,
                shape1: (theta.len(), 1),
                shape2: (self.registry.len(), 1),
            });
        }
        Ok(())
    }

    /// Forward and reverse rate of every edge in edge order at a single dose vector.
    ///
    /// The forward rate is exactly zero if the dose of the engaged drug is zero.
    pub fn transition_rates<D: DualNum<f64> + Copy>(&self, dose: &[f64], theta: &[D]) -> Vec<(D, D)> {
        let registry = &self.registry;
        registry
            .graph()
            .edges()
            .iter()
            .map(|e| {
                let k = e.drug;
                let log_rr = D::from(self.log_reverse_rates[k]);
                let (log_alpha, gamma) = match e.interaction {
                    Some(slot) => (
                        theta[registry.alpha_index(slot)],
                        match registry.gamma_index(slot) {
                            Some(idx) => theta[idx].exp(),
                            None => D::from(1.),
                        },
                    ),
                    None => (D::from(0.), D::from(1.)),
                };
                let reverse = (gamma * log_rr).exp();
                if dose[k] == 0. {
                    return (D::from(0.), reverse);
                }
                let h = theta[registry.h_index(k)].exp();
                let log_c = theta[registry.c_index(k)];
                let log_dose = D::from(dose[k].ln());
                let forward = (gamma * (log_rr + h * (log_dose + log_alpha - log_c))).exp();
                (forward, reverse)
            })
            .collect()
    }

    /// Stationary occupancy of every state at a single dose vector.
    ///
    /// Uses the Grassmann-Taksar-Heyman elimination, which only adds, multiplies and divides
    /// positive numbers and therefore stays accurate for rates spanning many orders of magnitude.
    pub fn occupancy<D: DualNum<f64> + Copy>(&self, dose: &[f64], theta: &[D]) -> Vec<D> {
        let graph = self.registry.graph();
        let s = graph.num_states();
        let zero = D::from(0.);
        let mut a = vec![vec![zero; s]; s];
        for (e, (forward, reverse)) in graph.edges().iter().zip(self.transition_rates(dose, theta)) {
            a[e.parent][e.child] = forward;
            a[e.child][e.parent] = reverse;
        }
        for k in (1..s).rev() {
            // contains the reverse rates to all parents of k, hence never zero
            let sum = (0..k).fold(zero, |acc, j| acc + a[k][j]);
            for i in 0..k {
                a[i][k] = a[i][k] / sum;
            }
            for i in 0..k {
                let aik = a[i][k];
                for j in 0..k {
                    if i != j {
                        a[i][j] = a[i][j] + aik * a[k][j];
                    }
                }
            }
        }
        let mut pi = vec![zero; s];
        if s == 0 {
            return pi;
        }
        pi[0] = D::from(1.);
        for j in 1..s {
            pi[j] = (0..j).fold(zero, |acc, i| acc + pi[i] * a[i][j]);
        }
        let total = pi.iter().fold(zero, |acc, &p| acc + p);
        pi.into_iter().map(|p| p / total).collect()
    }

    /// Predicted effect at a single dose vector.
    pub fn effect_at<D: DualNum<f64> + Copy>(&self, dose: &[f64], theta: &[D]) -> D {
        self.occupancy(dose, theta)
            .into_iter()
            .enumerate()
            .fold(D::from(0.), |acc, (state, p)| {
                acc + p * theta[self.registry.e_index(state)]
            })
    }

    /// Predicted effect of every dose row.
    pub fn effect(&self, doses: &DMatrix<f64>, theta: &DVector<f64>) -> Result<DVector<f64>> {
        self.validate_doses(doses)?;
        self.validate_parameters(theta)?;
        Ok(self.effect_unchecked(doses, theta))
    }

    /// Predicted effect of every dose row without validating the inputs.
    pub(crate) fn effect_unchecked(&self, doses: &DMatrix<f64>, theta: &DVector<f64>) -> DVector<f64> {
        let theta = theta.as_slice();
        DVector::from_iterator(
            doses.nrows(),
            (0..doses.nrows()).map(|row| {
                let dose: Vec<f64> = doses.row(row).iter().copied().collect();
                self.effect_at(&dose, theta)
            }),
        )
    }

    /// Largest disagreement of the log equilibrium constants `ln(forward / reverse)` along
    /// different paths to the same state.
    ///
    /// A residual of zero means that the chain satisfies detailed balance at this dose, i.e. the
    /// occupancy of every state is proportional to the product of equilibrium constants along
    /// any path from the origin.
    pub fn detailed_balance_residual(&self, dose: &[f64], theta: &DVector<f64>) -> f64 {
        let log_weights: Vec<f64> = self
            .transition_rates(dose, theta.as_slice())
            .into_iter()
            .map(|(forward, reverse)| forward.ln() - reverse.ln())
            .collect();
        self.registry.graph().path_disagreement(&log_weights)
    }
}
