use crate::{
    Bounds, Error, FitStage, FitWarning, JacobianKind, NLPSolverOptions, Result,
    SurfaceEvaluator, musyc::fit_surface, synergy::betas,
};
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use std::{fmt::Display, sync::Arc};

/// Resampling scheme of bootstrap replicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Resampling {
    /// Residuals of the fit drawn with replacement and added back onto the fitted surface.
    #[default]
    Residuals,
    /// Observations drawn with replacement.
    Rows,
}

/// Quantile of sorted data via linear interpolation, NaN for empty input.
pub fn quantile_linear_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    let j = pos.ceil() as usize;
    if i == j {
        return sorted[i];
    }
    let t = pos - i as f64;
    (1.0 - t) * sorted[i] + t * sorted[j]
}

/// Percentile interval of the central `level` percent of the samples.
///
/// NaN samples are ignored. The interval of a lower level is always contained in the interval
/// of a higher level.
pub fn percentile_interval(samples: &[f64], level: f64) -> Result<(f64, f64)> {
    if !(level.is_finite() && level > 0. && level <= 100.) {
        return Err(Error::InvalidConfidenceLevel { level });
    }
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    let alpha = (100. - level) / 200.;
    Ok((
        quantile_linear_sorted(&sorted, alpha),
        quantile_linear_sorted(&sorted, 1. - alpha),
    ))
}

/// Parameter and synergy values of every bootstrap replicate in linear units.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSamples {
    names: Vec<String>,
    samples: Vec<Vec<f64>>,
}

impl BootstrapSamples {
    /// Names of the sampled values: all parameters followed by `beta_*`.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of replicates.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there are no replicates.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Values of replicate `i` ordered like [names](Self::names).
    pub fn replicate(&self, i: usize) -> Option<&[f64]> {
        self.samples.get(i).map(|s| s.as_slice())
    }

    /// All replicate values of a named parameter or beta.
    pub fn values(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.samples.iter().map(|s| s[idx]).collect())
    }

    /// Percentile intervals of every sampled value.
    pub fn confidence_intervals(&self, level: f64) -> Result<ConfidenceIntervals> {
        if !(level.is_finite() && level > 0. && level <= 100.) {
            return Err(Error::InvalidConfidenceLevel { level });
        }
        if self.samples.is_empty() {
            return Err(Error::NoBootstrap);
        }
        let intervals = (0..self.names.len())
            .map(|idx| {
                let column: Vec<f64> = self.samples.iter().map(|s| s[idx]).collect();
                Ok((self.names[idx].clone(), percentile_interval(&column, level)?))
            })
            .collect::<Result<Vec<(String, (f64, f64))>>>()?;
        Ok(ConfidenceIntervals { level, intervals })
    }
}

/// Percentile confidence intervals of parameters and synergies.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceIntervals {
    level: f64,
    intervals: Vec<(String, (f64, f64))>,
}

impl ConfidenceIntervals {
    /// Confidence level in percent.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Interval of a named parameter or beta.
    pub fn get(&self, name: &str) -> Option<(f64, f64)> {
        self.intervals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, interval)| *interval)
    }

    /// All intervals in parameter order followed by the betas.
    pub fn iter(&self) -> impl Iterator<Item = &(String, (f64, f64))> {
        self.intervals.iter()
    }
}

impl Display for ConfidenceIntervals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}% confidence intervals", self.level)?;
        for (name, (lower, upper)) in &self.intervals {
            writeln!(f, "{name}: ({lower:.6}, {upper:.6})")?;
        }
        Ok(())
    }
}

/// Inputs of a bootstrap run around a joint fit.
pub(crate) struct BootstrapJob<'a> {
    pub surface: Arc<SurfaceEvaluator>,
    pub jacobian: JacobianKind,
    pub doses: &'a DMatrix<f64>,
    pub effects: &'a DVector<f64>,
    pub theta: &'a DVector<f64>,
    pub bounds: &'a Bounds,
    pub solver: &'a NLPSolverOptions,
    pub resampling: Resampling,
    pub seed: u64,
    pub iterations: usize,
}

struct Replicate {
    values: Vec<f64>,
    warning: Option<FitWarning>,
}

impl BootstrapJob<'_> {
    /// Refits every replicate, in parallel but collected in replicate order.
    pub fn run(&self) -> Result<(BootstrapSamples, Vec<FitWarning>)> {
        let registry = self.surface.registry();
        let fitted = self.surface.effect_unchecked(self.doses, self.theta);
        let residuals = self.effects - &fitted;
        let replicates = (0..self.iterations)
            .into_par_iter()
            .map(|i| self.replicate(i, &fitted, &residuals))
            .collect::<Result<Vec<Replicate>>>()?;

        let e_values: Vec<f64> = self.theta.iter().take(registry.graph().num_states()).copied().collect();
        let mut names = registry.names();
        names.extend(betas(registry, &e_values)?.into_iter().map(|(name, _)| name));

        let mut warnings = vec![];
        let mut samples = Vec::with_capacity(replicates.len());
        for replicate in replicates {
            if let Some(warning) = replicate.warning {
                log::warn!("{warning}");
                warnings.push(warning);
            }
            samples.push(replicate.values);
        }
        Ok((BootstrapSamples { names, samples }, warnings))
    }

    fn replicate(&self, i: usize, fitted: &DVector<f64>, residuals: &DVector<f64>) -> Result<Replicate> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
        let n = self.effects.len();
        let (doses, effects) = match self.resampling {
            Resampling::Residuals => {
                let effects = DVector::from_fn(n, |row, _| {
                    fitted[row] + residuals[rng.random_range(0..n)]
                });
                (self.doses.clone(), effects)
            }
            Resampling::Rows => {
                let rows: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                let doses = self.doses.select_rows(rows.iter());
                let effects = DVector::from_fn(n, |row, _| self.effects[rows[row]]);
                (doses, effects)
            }
        };
        let solution = fit_surface(
            self.surface.clone(),
            self.jacobian,
            &doses,
            &effects,
            self.theta,
            self.bounds,
            self.solver,
        );
        let warning = match solution.converged {
            true => None,
            false => Some(FitWarning::NotConverged {
                stage: FitStage::Bootstrap(i),
                iterations: solution.iterations,
            }),
        };
        let registry = self.surface.registry();
        let mut values = registry.to_linear(&solution.x);
        let e_values: Vec<f64> = solution.x.iter().take(registry.graph().num_states()).copied().collect();
        values.extend(betas(registry, &e_values)?.into_iter().map(|(_, beta)| beta));
        Ok(Replicate { values, warning })
    }
}
