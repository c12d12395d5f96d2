use super::{JacobianProvider, sanitize};
use crate::SurfaceEvaluator;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Rate constant with its log-derivatives `(parameter index, d ln(rate) / d theta)`.
struct Rate {
    value: f64,
    dlog: Vec<(usize, f64)>,
}

// rate ids
const A1: usize = 0;
const B1: usize = 1;
const A2: usize = 2;
const B2: usize = 3;
const C1: usize = 4;
const E1: usize = 5;
const C2: usize = 6;
const E2: usize = 7;

/// Spanning trees directed into each of the states U, A1, A2, A12.
const TREES: [[[usize; 3]; 4]; 4] = [
    [[C2, E1, B2], [C1, E2, B1], [B1, B2, E1], [B1, B2, E2]],
    [[A2, C1, E2], [A1, C1, E2], [A1, B2, E1], [A1, B2, E2]],
    [[A1, C2, E1], [A2, C2, E1], [A2, B1, E2], [A2, B1, E1]],
    [[C1, C2, A1], [C1, C2, A2], [A2, B1, C1], [A1, B2, C2]],
];

#[cfg_attr(doc, katexit::katexit)]
/// Closed form jacobian of the two drug surface with fitted gamma.
///
/// By the Markov chain tree theorem the stationary occupancy of a state is proportional to
/// $w_s$, the sum of rate products over all spanning trees directed into $s$. The effect
/// $E = \sum_s w_s E_s / W$ with $W = \sum_s w_s$ then has the derivatives
///
/// $$ \frac{\partial E}{\partial E_s} = \frac{w_s}{W}, \quad
/// \frac{\partial E}{\partial \theta} = \sum_s \frac{\partial w_s}{\partial \theta}
/// \frac{E_s - E}{W}. $$
#[derive(Debug, Clone)]
pub struct AnalyticTwoDrug {
    surface: Arc<SurfaceEvaluator>,
}

impl AnalyticTwoDrug {
    /// Creates the provider of a two drug surface.
    pub fn new(surface: Arc<SurfaceEvaluator>) -> Self {
        Self { surface }
    }

    fn rates(&self, dose: [f64; 2], theta: &DVector<f64>) -> [Rate; 8] {
        let registry = self.surface.registry();
        // interaction slot 0 engages drug 2 next to drug 1, slot 1 drug 1 next to drug 2
        let drug_rates = |drug: usize, slot: usize| -> [Rate; 4] {
            let log_rr = self.surface.log_reverse_rate(drug);
            let (h_idx, c_idx) = (registry.h_index(drug), registry.c_index(drug));
            let alpha_idx = registry.alpha_index(slot);
            let gamma_idx = registry.gamma_index(slot);
            let h = theta[h_idx].exp();
            let gamma = gamma_idx.map_or(1., |idx| theta[idx].exp());
            let log_ratio = dose[drug].ln() - theta[c_idx];
            let log_shifted = log_ratio + theta[alpha_idx];
            let value = |log_rate: f64| match dose[drug] == 0. {
                true => 0.,
                false => log_rate.exp(),
            };
            let log_a = log_rr + h * log_ratio;
            let log_c = gamma * (log_rr + h * log_shifted);
            let mut dlog_c = vec![
                (h_idx, gamma * h * log_shifted),
                (c_idx, -gamma * h),
                (alpha_idx, gamma * h),
            ];
            let mut dlog_e = vec![];
            if let Some(idx) = gamma_idx {
                dlog_c.push((idx, log_c));
                dlog_e.push((idx, gamma * log_rr));
            }
            [
                Rate {
                    value: value(log_a),
                    dlog: vec![(h_idx, h * log_ratio), (c_idx, -h)],
                },
                Rate {
                    value: log_rr.exp(),
                    dlog: vec![],
                },
                Rate {
                    value: value(log_c),
                    dlog: dlog_c,
                },
                Rate {
                    value: (gamma * log_rr).exp(),
                    dlog: dlog_e,
                },
            ]
        };
        let [a1, b1, c1, e1] = drug_rates(0, 1);
        let [a2, b2, c2, e2] = drug_rates(1, 0);
        [a1, b1, a2, b2, c1, e1, c2, e2]
    }

    fn jacobian_row(&self, dose: [f64; 2], theta: &DVector<f64>) -> DVector<f64> {
        let rates = self.rates(dose, theta);
        let mut weights = [0.; 4];
        let mut dweights = vec![[0.; 4]; theta.len()];
        for (s, trees) in TREES.iter().enumerate() {
            for tree in trees {
                let product: f64 = tree.iter().map(|&r| rates[r].value).product();
                weights[s] += product;
                for &r in tree {
                    for &(idx, dlog) in &rates[r].dlog {
                        dweights[idx][s] += product * dlog;
                    }
                }
            }
        }
        let total: f64 = weights.iter().sum();
        let effect: f64 = (0..4).map(|s| weights[s] * theta[s]).sum::<f64>() / total;
        DVector::from_fn(theta.len(), |idx, _| match idx < 4 {
            true => weights[idx] / total,
            false => {
                (0..4)
                    .map(|s| dweights[idx][s] * (theta[s] - effect))
                    .sum::<f64>()
                    / total
            }
        })
    }
}

impl JacobianProvider for AnalyticTwoDrug {
    fn jacobian(&self, doses: &DMatrix<f64>, theta: &DVector<f64>) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(doses.nrows(), theta.len());
        for row in 0..doses.nrows() {
            let dose = [doses[(row, 0)], doses[(row, 1)]];
            jac.set_row(row, &self.jacobian_row(dose, theta).transpose());
        }
        sanitize(jac)
    }
}
