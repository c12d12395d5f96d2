use crate::{
    Error, HillBounds, NLPSolverOptions, Response, ResponseCurve, ResponseFunction, Result,
    least_squares::fit_least_squares,
};
use nalgebra::{DVector, SVector};
use num_dual::DualNum;
use std::sync::Arc;

/// Minimal number of observations of a single drug fit.
pub const MIN_OBSERVATIONS: usize = 4;

/// Interface of models describing the response of a single drug.
pub trait SingleDrugModel {
    /// Parameter set of the model.
    type Parameters;
    /// Bounds of the parameter set.
    type Bounds;

    /// Effect at a dose.
    fn effect(&self, dose: f64) -> Result<f64>;
    /// Fits the model to observations and returns whether the optimizer converged.
    fn fit(&mut self, doses: &DVector<f64>, effects: &DVector<f64>) -> Result<bool>;
    /// Fitted or given parameters.
    fn parameters(&self) -> Option<&Self::Parameters>;
    /// Bounds used by the fit.
    fn bounds(&self) -> &Self::Bounds;
}

/// Parameters of the [Hill] equation in linear units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HillParameters {
    /// Effect without drug.
    pub e0: f64,
    /// Effect at saturating dose.
    pub emax: f64,
    /// Hill coefficient.
    pub h: f64,
    /// Potency, the dose of half maximal effect.
    pub c: f64,
}

impl HillParameters {
    /// Returns true if the effects are finite and h and C are positive and finite.
    pub fn is_valid(&self) -> bool {
        self.e0.is_finite()
            && self.emax.is_finite()
            && self.h.is_finite()
            && self.c.is_finite()
            && self.h > 0.
            && self.c > 0.
    }

    fn to_theta(self) -> DVector<f64> {
        DVector::from_vec(vec![self.e0, self.emax, self.h.ln(), self.c.ln()])
    }

    fn from_theta(theta: &DVector<f64>) -> Self {
        Self {
            e0: theta[0],
            emax: theta[1],
            h: theta[2].exp(),
            c: theta[3].exp(),
        }
    }
}

#[cfg_attr(doc, katexit::katexit)]
/// Hill equation $E(d) = E_0 + \frac{(E_{max} - E_0) d^h}{d^h + C^h}$ on the parameters
/// $(E_0, E_{max}, \ln h, \ln C)$.
#[derive(Response, Debug, Clone, Copy, Default)]
#[parameters = 4]
pub struct HillFunction;

impl ResponseFunction<4> for HillFunction {
    fn f<D: DualNum<f64>>(&self, dose: f64, theta: &SVector<D, 4>) -> D {
        if dose <= 0. {
            return theta[0].clone();
        }
        let z = theta[2].exp() * (D::from(dose.ln()) - theta[3].clone());
        theta[0].clone() + (theta[1].clone() - theta[0].clone()) / ((-z).exp() + 1.)
    }
}

/// Single drug Hill model.
#[derive(Debug, Clone, Default)]
pub struct Hill {
    parameters: Option<HillParameters>,
    bounds: HillBounds,
    options: NLPSolverOptions,
    converged: bool,
    iterations: u64,
}

impl Hill {
    /// Creates an unfitted Hill model without bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bounds of the fit.
    pub fn with_bounds(mut self, bounds: HillBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Sets the solver configuration of the fit.
    pub fn with_options(mut self, options: NLPSolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the parameters without fitting.
    pub fn with_parameters(mut self, parameters: HillParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Returns whether the last fit converged.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Newton iterations spent by the last fit.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub(crate) fn initial_guess(doses: &DVector<f64>, effects: &DVector<f64>) -> HillParameters {
        let (min, max) = (doses.min(), doses.max());
        let mean_at = |dose: f64| {
            let (sum, count) = doses
                .iter()
                .zip(effects.iter())
                .filter(|(d, _)| **d == dose)
                .fold((0., 0), |(sum, count), (_, e)| (sum + e, count + 1));
            sum / count as f64
        };
        HillParameters {
            e0: mean_at(min),
            emax: mean_at(max),
            h: 1.,
            c: geometric_mean_positive(doses.as_slice()).unwrap_or(1.),
        }
    }
}

/// Geometric mean of the positive values, `None` if there are none.
pub fn geometric_mean_positive(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| **v > 0. && v.is_finite())
        .fold((0., 0), |(sum, count), v| (sum + v.ln(), count + 1));
    match count {
        0 => None,
        _ => Some((sum / count as f64).exp()),
    }
}

impl SingleDrugModel for Hill {
    type Parameters = HillParameters;
    type Bounds = HillBounds;

    fn effect(&self, dose: f64) -> Result<f64> {
        let parameters = self.parameters.ok_or(Error::NotFitted)?;
        Ok(HillFunction.val(dose, &SVector::from_column_slice(parameters.to_theta().as_slice())))
    }

    fn fit(&mut self, doses: &DVector<f64>, effects: &DVector<f64>) -> Result<bool> {
        if doses.len() != effects.len() {
            return Err(Error::ShapeMismatch {
                mat1: "doses",
                mat2: "effects",
                dim1: 0,
                dim2: 0,
                shape1: (doses.len(), 1),
                shape2: (effects.len(), 1),
            });
        }
        if doses.len() < MIN_OBSERVATIONS {
            return Err(Error::MinValue {
                name: "single drug observations",
                value: doses.len(),
                ge_value: MIN_OBSERVATIONS,
            });
        }
        let x0 = Hill::initial_guess(doses, effects).to_theta();
        let curve = ResponseCurve::new(HillFunction, doses.clone());
        let solution = fit_least_squares(
            Arc::new(curve),
            effects.clone(),
            &x0,
            &self.bounds.to_bounds(),
            &self.options,
        );
        self.parameters = Some(HillParameters::from_theta(&solution.x));
        self.converged = solution.converged;
        self.iterations = solution.iterations;
        Ok(solution.converged)
    }

    fn parameters(&self) -> Option<&HillParameters> {
        self.parameters.as_ref()
    }

    fn bounds(&self) -> &HillBounds {
        &self.bounds
    }
}
