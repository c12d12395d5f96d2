use crate::{
    BootstrapSamples, Bounds, BoundsConfig, ConfidenceIntervals, Error, Family, FitStage, FitWarning,
    Hill, HillParameters, Jacobian, JacobianKind, JacobianProvider, NLPSolution,
    NLPSolverOptions, ParameterRegistry, Resampling, Result, SingleDrugModel, SurfaceEvaluator,
    bootstrap::BootstrapJob,
    least_squares::{ResidualModel, fit_least_squares},
    state::popcount,
    synergy,
};
use nalgebra::{DMatrix, DVector};
use std::{fmt::Display, sync::Arc};

/// Configuration of [MuSyC::fit].
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    bootstrap_iterations: usize,
    resampling: Resampling,
    seed: u64,
    solver: NLPSolverOptions,
    jacobian: JacobianKind,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            bootstrap_iterations: 0,
            resampling: Resampling::default(),
            seed: 0,
            solver: NLPSolverOptions::default(),
            jacobian: JacobianKind::default(),
        }
    }
}

impl FitOptions {
    /// Creates the default options: no bootstrap, residual resampling, seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of bootstrap replicates, 0 disables the bootstrap.
    pub fn with_bootstrap_iterations(mut self, bootstrap_iterations: usize) -> Self {
        self.bootstrap_iterations = bootstrap_iterations;
        self
    }

    /// Sets the resampling scheme of the bootstrap.
    pub fn with_resampling(mut self, resampling: Resampling) -> Self {
        self.resampling = resampling;
        self
    }

    /// Sets the base seed of the bootstrap, replicate i uses `seed + i`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the solver options of every fit.
    pub fn with_solver(mut self, solver: NLPSolverOptions) -> Self {
        self.solver = solver;
        self
    }

    /// Sets the jacobian implementation of the joint fit.
    pub fn with_jacobian(mut self, jacobian: JacobianKind) -> Self {
        self.jacobian = jacobian;
        self
    }

    /// Number of bootstrap replicates.
    pub fn bootstrap_iterations(&self) -> usize {
        self.bootstrap_iterations
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Progress of a [MuSyC] fit.
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> Unfit
///     Unfit --> SingleDrugSeeded: single drug fits
///     SingleDrugSeeded --> JointFitDone: joint least squares
///     JointFitDone --> SingleDrugSeeded: refit
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FitState {
    /// No fit has been run.
    #[default]
    Unfit,
    /// Marginal Hill models are fitted, the joint fit has not finished.
    SingleDrugSeeded,
    /// Full parameter vector is fitted.
    JointFitDone,
}

/// Named parameter values in linear units.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    names: Vec<String>,
    values: Vec<f64>,
}

impl Parameters {
    /// Value of a named parameter.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Names in registry order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values in registry order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Pairs of name and value in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(|n| n.as_str())
            .zip(self.values.iter().copied())
    }
}

impl Display for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.names.iter().map(|n| n.len()).max().unwrap_or(0);
        let rows: String = self
            .iter()
            .map(|(name, value)| format!("{name:<width$}\t{value:>+.6e}"))
            .collect::<Vec<String>>()
            .join("\n");
        write!(f, "{:-^1$}\n{rows}", " Parameters ", (width + 16).max(28))
    }
}

/// Predictions of the MuSyC surface at fixed doses.
pub(crate) struct SurfaceModel {
    surface: Arc<SurfaceEvaluator>,
    jacobian: Jacobian,
    doses: DMatrix<f64>,
}

impl ResidualModel for SurfaceModel {
    fn predict(&self, x: &DVector<f64>) -> DVector<f64> {
        self.surface.effect_unchecked(&self.doses, x)
    }

    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        self.jacobian.jacobian(&self.doses, x)
    }
}

/// Bounded least squares fit of the surface to observations, starting at x0.
pub(crate) fn fit_surface(
    surface: Arc<SurfaceEvaluator>,
    kind: JacobianKind,
    doses: &DMatrix<f64>,
    effects: &DVector<f64>,
    x0: &DVector<f64>,
    bounds: &Bounds,
    solver: &NLPSolverOptions,
) -> NLPSolution {
    let model = SurfaceModel {
        jacobian: Jacobian::select(surface.clone(), kind),
        surface,
        doses: doses.clone(),
    };
    fit_least_squares(Arc::new(model), effects.clone(), x0, bounds, solver)
}

/// Multidimensional synergy of combinations model of n drugs.
///
/// ```
/// use musyc::{MuSyC, BoundsConfig, Family};
/// use nalgebra::DMatrix;
///
/// let model = MuSyC::new(2)?
///     .with_bounds(BoundsConfig::new().with_family(Family::E, (0., 1.)))?
///     .with_parameters([
///         ("E_0", 1.), ("E_1", 0.5), ("E_2", 0.4), ("E_1,2", 0.1),
///         ("h_1", 1.), ("h_2", 1.), ("C_1", 1.), ("C_2", 1.),
///         ("alpha_1_2", 1.), ("alpha_2_1", 1.), ("gamma_1_2", 1.), ("gamma_2_1", 1.),
///     ])?;
/// let effect = model.effect(&DMatrix::from_row_slice(1, 2, &[0., 0.]))?;
/// assert_eq!(effect[0], 1.);
/// # Ok::<(), musyc::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MuSyC {
    surface: Arc<SurfaceEvaluator>,
    bounds_config: BoundsConfig,
    bounds: Bounds,
    options: FitOptions,
    theta: Option<DVector<f64>>,
    state: FitState,
    converged: bool,
    single_drug_models: Vec<Hill>,
    warnings: Vec<FitWarning>,
    bootstrap: Option<BootstrapSamples>,
}

impl MuSyC {
    /// Creates an unfitted model of n drugs with fitted cooperativity shifts and default bounds.
    pub fn new(n: usize) -> Result<Self> {
        let registry = Arc::new(ParameterRegistry::new(n, true)?);
        let bounds = registry.default_bounds(&BoundsConfig::new())?;
        Ok(Self {
            surface: Arc::new(SurfaceEvaluator::new(registry)),
            bounds_config: BoundsConfig::new(),
            bounds,
            options: FitOptions::default(),
            theta: None,
            state: FitState::Unfit,
            converged: false,
            single_drug_models: vec![],
            warnings: vec![],
            bootstrap: None,
        })
    }

    /// Enables or disables the gamma parameters. Resets given parameters.
    pub fn with_fit_gamma(mut self, fit_gamma: bool) -> Result<Self> {
        let registry = Arc::new(ParameterRegistry::new(self.num_drugs(), fit_gamma)?);
        self.bounds = registry.default_bounds(&self.bounds_config)?;
        let reverse_rates: Vec<f64> = (0..self.num_drugs())
            .map(|drug| self.surface.log_reverse_rate(drug).exp())
            .collect();
        self.surface = Arc::new(SurfaceEvaluator::new(registry).with_reverse_rates(&reverse_rates)?);
        Ok(self.reset())
    }

    /// Resolves and validates bounds overrides.
    pub fn with_bounds(mut self, config: BoundsConfig) -> Result<Self> {
        self.bounds = self.registry().default_bounds(&config)?;
        self.bounds_config = config;
        Ok(self)
    }

    /// Sets the reverse rate constant of every drug.
    pub fn with_reverse_rates(mut self, reverse_rates: &[f64]) -> Result<Self> {
        let surface = SurfaceEvaluator::new(self.surface.registry_arc());
        self.surface = Arc::new(surface.with_reverse_rates(reverse_rates)?);
        Ok(self)
    }

    /// Sets the fit configuration.
    pub fn with_options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets every parameter by name in linear units, e.g. to use the model as pure surface.
    pub fn with_parameters<K, I>(mut self, values: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let registry = self.registry();
        let mut linear: Vec<Option<f64>> = vec![None; registry.len()];
        for (name, value) in values {
            let name = name.into();
            let idx = registry
                .index_of(&name)
                .ok_or(Error::UnknownParameter { name })?;
            linear[idx] = Some(value);
        }
        let linear = linear
            .into_iter()
            .zip(registry.specs())
            .map(|(v, spec)| {
                v.ok_or_else(|| Error::MissingParameter {
                    name: spec.name.clone(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        let theta = registry.from_linear(&linear)?;
        self = self.reset();
        self.theta = Some(theta);
        Ok(self)
    }

    fn reset(mut self) -> Self {
        self.theta = None;
        self.state = FitState::Unfit;
        self.converged = false;
        self.single_drug_models.clear();
        self.warnings.clear();
        self.bootstrap = None;
        self
    }

    /// Number of drugs.
    pub fn num_drugs(&self) -> usize {
        self.registry().num_drugs()
    }

    /// Parameter layout of the model.
    pub fn registry(&self) -> &ParameterRegistry {
        self.surface.registry()
    }

    /// Surface evaluator of the model.
    pub fn surface(&self) -> &SurfaceEvaluator {
        &self.surface
    }

    /// Resolved bounds in optimizer coordinates.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Fit configuration.
    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Fits the model to a dose matrix (observations x drugs) and the observed effects.
    ///
    /// Each drug is first fitted on its own by a [Hill] model to seed the joint fit. Seeding
    /// failures and non-converged optimizations are recorded as [warnings](Self::warnings);
    /// only invalid input is an error.
    pub fn fit(&mut self, doses: &DMatrix<f64>, effects: &DVector<f64>) -> Result<()> {
        self.validate_data(doses, effects)?;
        let mut fitted = self.clone().reset();

        let seeds = fitted.seed(doses, effects);
        fitted.state = FitState::SingleDrugSeeded;

        let x0 = fitted.initial_guess(&seeds)?;
        log::debug!("joint fit of {} parameters", x0.len());
        let solution = fit_surface(
            fitted.surface.clone(),
            fitted.options.jacobian,
            doses,
            effects,
            &x0,
            &fitted.bounds,
            &fitted.options.solver,
        );
        if !solution.converged {
            fitted.warn(FitWarning::NotConverged {
                stage: FitStage::Joint,
                iterations: solution.iterations,
            });
        }
        fitted.converged = solution.converged;
        fitted.state = FitState::JointFitDone;

        if fitted.options.bootstrap_iterations > 0 {
            let job = BootstrapJob {
                surface: fitted.surface.clone(),
                jacobian: fitted.options.jacobian,
                doses,
                effects,
                theta: &solution.x,
                bounds: &fitted.bounds,
                solver: &fitted.options.solver,
                resampling: fitted.options.resampling,
                seed: fitted.options.seed,
                iterations: fitted.options.bootstrap_iterations,
            };
            let (samples, warnings) = job.run()?;
            fitted.warnings.extend(warnings);
            fitted.bootstrap = Some(samples);
        }
        fitted.theta = Some(solution.x);
        *self = fitted;
        Ok(())
    }

    fn validate_data(&self, doses: &DMatrix<f64>, effects: &DVector<f64>) -> Result<()> {
        self.surface.validate_doses(doses)?;
        if doses.nrows() != effects.len() {
            return Err(Error::ShapeMismatch {
                mat1: "doses",
                mat2: "effects",
                dim1: 0,
                dim2: 0,
                shape1: doses.shape(),
                shape2: effects.shape(),
            });
        }
        if doses.nrows() == 0 {
            return Err(Error::MinValue {
                name: "observations",
                value: 0,
                ge_value: 1,
            });
        }
        if let Some((row, &value)) = effects.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidEffect { row, value });
        }
        Ok(())
    }

    fn warn(&mut self, warning: FitWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Fits the marginal Hill model of every drug on the rows in which all other drugs are at
    /// their minimal dose.
    fn seed(&mut self, doses: &DMatrix<f64>, effects: &DVector<f64>) -> Vec<HillParameters> {
        let n = self.num_drugs();
        let minima: Vec<f64> = doses.column_iter().map(|c| c.min()).collect();
        let mut seeds = Vec::with_capacity(n);
        for drug in 0..n {
            let rows: Vec<usize> = (0..doses.nrows())
                .filter(|&row| (0..n).all(|col| col == drug || doses[(row, col)] == minima[col]))
                .collect();
            let drug_doses = DVector::from_iterator(rows.len(), rows.iter().map(|&r| doses[(r, drug)]));
            let drug_effects = DVector::from_iterator(rows.len(), rows.iter().map(|&r| effects[r]));

            let bounds = self.registry().single_drug_bounds(&self.bounds, drug);
            let mut model = Hill::new()
                .with_bounds(bounds)
                .with_options(self.options.solver.clone());
            let fallback = match model.fit(&drug_doses, &drug_effects) {
                Ok(converged) => match model.parameters() {
                    Some(p) if p.is_valid() => {
                        if !converged {
                            self.warn(FitWarning::NotConverged {
                                stage: FitStage::SingleDrug(drug),
                                iterations: model.iterations(),
                            });
                        }
                        None
                    }
                    _ => Some("non-finite parameters".to_string()),
                },
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = fallback {
                self.warn(FitWarning::SingleDrugFallback { drug, reason });
                let guess = match rows.is_empty() {
                    true => Hill::initial_guess(&doses.column(drug).into_owned(), effects),
                    false => Hill::initial_guess(&drug_doses, &drug_effects),
                };
                model = model.with_parameters(guess);
            }
            log::debug!("seed of drug {}: {:?}", drug + 1, model.parameters());
            if let Some(p) = model.parameters() {
                seeds.push(*p);
            }
            self.single_drug_models.push(model);
        }
        seeds
    }

    /// Combines the seeds to a start vector: E from the single drug effects, alpha and gamma
    /// neutral at 1.
    fn initial_guess(&self, seeds: &[HillParameters]) -> Result<DVector<f64>> {
        let registry = self.registry();
        let e0 = seeds.iter().map(|s| s.e0).sum::<f64>() / seeds.len().max(1) as f64;
        let linear: Vec<f64> = registry
            .specs()
            .iter()
            .map(|spec| match (spec.state, spec.drug) {
                (Some(0), _) => e0,
                (Some(state), _) if popcount(state) == 1 => {
                    seeds[state.trailing_zeros() as usize].emax
                }
                (Some(state), _) => seeds
                    .iter()
                    .enumerate()
                    .filter(|&(drug, _)| state >> drug & 1 == 1)
                    .map(|(_, s)| s.emax)
                    .fold(e0, |farthest, emax| match (emax - e0).abs() > (farthest - e0).abs() {
                        true => emax,
                        false => farthest,
                    }),
                (None, Some(drug)) if spec.interaction.is_none() => match spec.family {
                    Family::H => seeds[drug].h,
                    _ => seeds[drug].c,
                },
                _ => 1.,
            })
            .collect();
        let x0 = registry.from_linear(&linear)?;
        Ok(self.bounds.project_interior(&x0))
    }

    fn theta(&self) -> Result<&DVector<f64>> {
        self.theta.as_ref().ok_or(Error::NotFitted)
    }

    /// Fitted or given parameters in linear units.
    pub fn parameters(&self) -> Result<Parameters> {
        let theta = self.theta()?;
        Ok(Parameters {
            names: self.registry().names(),
            values: self.registry().to_linear(theta),
        })
    }

    /// Synergistic efficacy `beta_<label>` of every state with at least two drugs.
    pub fn betas(&self) -> Result<Vec<(String, f64)>> {
        let theta = self.theta()?;
        let e = self.registry().family_range(Family::E);
        synergy::betas(self.registry(), &theta.as_slice()[e])
    }

    /// Bootstrap percentile intervals of all parameters and betas at `level` percent.
    pub fn confidence_intervals(&self, level: f64) -> Result<ConfidenceIntervals> {
        self.bootstrap
            .as_ref()
            .ok_or(Error::NoBootstrap)?
            .confidence_intervals(level)
    }

    /// Predicted effect of every row of a dose matrix.
    pub fn effect(&self, doses: &DMatrix<f64>) -> Result<DVector<f64>> {
        self.surface.effect(doses, self.theta()?)
    }

    /// Progress of the fit.
    pub fn state(&self) -> FitState {
        self.state
    }

    /// Non-fatal problems of the last fit.
    pub fn warnings(&self) -> &[FitWarning] {
        &self.warnings
    }

    /// Returns whether the joint fit converged.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Marginal models of the last fit, one per drug.
    pub fn single_drug_models(&self) -> &[Hill] {
        &self.single_drug_models
    }

    /// Bootstrap replicates of the last fit.
    pub fn bootstrap_samples(&self) -> Option<&BootstrapSamples> {
        self.bootstrap.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;

    fn two_drug_truth() -> [(&'static str, f64); 12] {
        [
            ("E_0", 1.),
            ("E_1", 0.6),
            ("E_2", 0.5),
            ("E_1,2", 0.1),
            ("h_1", 1.5),
            ("h_2", 0.8),
            ("C_1", 0.5),
            ("C_2", 2.),
            ("alpha_1_2", 2.),
            ("alpha_2_1", 0.5),
            ("gamma_1_2", 1.),
            ("gamma_2_1", 1.),
        ]
    }

    fn checkerboard(levels: &[f64]) -> DMatrix<f64> {
        let k = levels.len();
        DMatrix::from_fn(k * k, 2, |row, col| match col {
            0 => levels[row % k],
            _ => levels[row / k],
        })
    }

    #[test]
    fn test_with_parameters() -> Result<()> {
        let model = MuSyC::new(2)?.with_parameters(two_drug_truth())?;
        let parameters = model.parameters()?;
        assert_eq!(parameters.names().len(), 12);
        assert!((parameters.get("C_2").unwrap_or(0.) - 2.).abs() < 1e-12);
        assert_eq!(parameters.get("gamma_3_1"), None);
        assert_eq!(model.state(), FitState::Unfit);
        assert!(parameters.to_string().contains("alpha_1_2"));

        let doses = DMatrix::from_row_slice(2, 2, &[0., 0., 1e9, 1e9]);
        let effect = model.effect(&doses)?;
        assert_eq!(effect[0], 1.);
        assert!((effect[1] - 0.1).abs() < 1e-6);

        let betas = model.betas()?;
        assert_eq!(betas.len(), 1);
        assert_eq!(betas[0].0, "beta_1,2");
        assert!((betas[0].1 - 0.8).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_with_parameters_errors() -> Result<()> {
        let mut values = two_drug_truth().to_vec();
        values.pop();
        assert_eq!(
            MuSyC::new(2)?.with_parameters(values.clone()).err(),
            Some(Error::MissingParameter {
                name: "gamma_2_1".to_string()
            })
        );
        values.push(("gamma_1_3", 1.));
        assert_eq!(
            MuSyC::new(2)?.with_parameters(values).err(),
            Some(Error::UnknownParameter {
                name: "gamma_1_3".to_string()
            })
        );
        let mut values = two_drug_truth();
        values[6].1 = -1.;
        assert_eq!(
            MuSyC::new(2)?.with_parameters(values).err(),
            Some(Error::InvalidParameterValue {
                name: "C_1".to_string(),
                value: -1.
            })
        );
        Ok(())
    }

    #[test]
    fn test_unfitted_outputs() -> Result<()> {
        let model = MuSyC::new(3)?;
        assert_eq!(model.parameters().err(), Some(Error::NotFitted));
        assert_eq!(model.betas().err(), Some(Error::NotFitted));
        assert_eq!(model.confidence_intervals(95.).err(), Some(Error::NoBootstrap));
        assert_eq!(
            model.effect(&DMatrix::zeros(1, 3)).err(),
            Some(Error::NotFitted)
        );
        assert!(model.bootstrap_samples().is_none());
        assert!(model.warnings().is_empty());
        assert_eq!(model.registry().len(), 8 + 6 + 18);
        assert_eq!(model.with_fit_gamma(false)?.registry().len(), 8 + 6 + 9);
        Ok(())
    }

    #[test]
    fn test_configuration_errors() -> Result<()> {
        assert!(matches!(
            MuSyC::new(2)?.with_bounds(BoundsConfig::new().with_key("h_1_bounds", (2., 1.))),
            Err(Error::InvalidBounds { .. })
        ));
        assert!(matches!(
            MuSyC::new(2)?.with_bounds(BoundsConfig::new().with_key("gamma_bounds", (-1., 1.))),
            Err(Error::NegativeBound { .. })
        ));
        let gamma_bounds = BoundsConfig::new().with_key("gamma_1_2_bounds", (0.5, 2.));
        let model = MuSyC::new(2)?.with_bounds(gamma_bounds)?;
        assert!(matches!(
            model.with_fit_gamma(false),
            Err(Error::UnknownBoundsKey { .. })
        ));
        assert!(MuSyC::new(2)?.with_reverse_rates(&[1., 0.]).is_err());
        assert!(MuSyC::new(2)?.with_reverse_rates(&[1.]).is_err());
        Ok(())
    }

    #[test]
    fn test_fit_input_errors() -> Result<()> {
        let mut model = MuSyC::new(2)?;
        let doses = checkerboard(&[0., 1.]);
        assert!(matches!(
            model.fit(&doses, &DVector::zeros(3)),
            Err(Error::ShapeMismatch { .. })
        ));
        let mut effects = DVector::from_element(4, 1.);
        effects[2] = f64::NAN;
        assert!(matches!(
            model.fit(&doses, &effects),
            Err(Error::InvalidEffect { row: 2, .. })
        ));
        let mut bad_doses = doses.clone();
        bad_doses[(1, 1)] = -1.;
        assert!(matches!(
            model.fit(&bad_doses, &DVector::from_element(4, 1.)),
            Err(Error::InvalidDose { row: 1, col: 1, .. })
        ));
        assert!(matches!(
            model.fit(&DMatrix::zeros(4, 3), &DVector::from_element(4, 1.)),
            Err(Error::ShapeMismatch { .. })
        ));
        assert_eq!(model.state(), FitState::Unfit);
        Ok(())
    }

    #[test]
    fn test_fit_two_drugs() -> Result<()> {
        let truth = MuSyC::new(2)?.with_parameters(two_drug_truth())?;
        let levels = [0., 0.01, 0.05, 0.2, 0.5, 1., 2., 5., 20., 100.];
        let doses = checkerboard(&levels);
        let effects = truth.effect(&doses)?;

        let mut model = MuSyC::new(2)?;
        model.fit(&doses, &effects)?;
        assert_eq!(model.state(), FitState::JointFitDone);
        assert_eq!(model.single_drug_models().len(), 2);
        let fitted = model.effect(&doses)?;
        assert!((fitted - &effects).amax() < 1e-3);

        let parameters = model.parameters()?;
        for (name, expected) in truth.parameters()?.iter() {
            let value = parameters.get(name).unwrap_or(f64::NAN);
            assert!(
                (value - expected).abs() < 0.05 * expected.abs().max(0.1),
                "{name}: {value} vs {expected}"
            );
        }
        Ok(())
    }

    #[test]
    fn test_seed_fallback() -> Result<()> {
        // Only three single drug observations of drug 2.
        let doses = DMatrix::from_row_slice(
            8,
            2,
            &[
                0., 0., 0.1, 0., 1., 0., 10., 0., 0., 1., 0., 10., 1., 1., 10., 10.,
            ],
        );
        let effects = DVector::from_vec(vec![1., 0.9, 0.6, 0.3, 0.7, 0.4, 0.3, 0.1]);
        let bounds = BoundsConfig::new()
            .with_family(Family::E, (0., 1.5))
            .with_family(Family::H, (0.1, 10.))
            .with_family(Family::C, (1e-3, 1e3))
            .with_family(Family::Alpha, (1e-3, 1e3))
            .with_family(Family::Gamma, (0.1, 10.));
        let mut model = MuSyC::new(2)?.with_bounds(bounds)?;
        model.fit(&doses, &effects)?;
        assert_eq!(model.state(), FitState::JointFitDone);
        assert!(model.bounds().contains(model.theta()?));
        assert!(model.warnings().iter().any(|w| matches!(
            w,
            FitWarning::SingleDrugFallback { drug: 1, .. }
        )));
        let seed = model.single_drug_models()[1]
            .parameters()
            .copied()
            .ok_or(Error::NotFitted)?;
        assert_eq!(seed.h, 1.);
        assert!((seed.e0 - 1.).abs() < 1e-12);
        assert!((seed.emax - 0.4).abs() < 1e-12);
        assert!(model.parameters()?.values().iter().all(|v| v.is_finite()));
        Ok(())
    }

    #[test]
    fn test_seed_reports_spent_iterations() -> Result<()> {
        let truth = MuSyC::new(2)?.with_parameters(two_drug_truth())?;
        let doses = checkerboard(&[0., 0.01, 0.1, 1., 10., 100.]);
        let effects = truth.effect(&doses)?;
        let options =
            FitOptions::new().with_solver(NLPSolverOptions::new().with_newton_max_iter(1));
        let mut model = MuSyC::new(2)?.with_options(options);
        model.fit(&doses, &effects)?;
        for warning in model.warnings() {
            if let FitWarning::NotConverged {
                stage: FitStage::SingleDrug(drug),
                iterations,
            } = warning
            {
                let seed = &model.single_drug_models()[*drug];
                assert!(!seed.converged());
                assert_eq!(*iterations, seed.iterations());
            }
        }
        assert!(model.single_drug_models().iter().all(|m| m.iterations() > 0));
        Ok(())
    }

    #[test]
    fn test_fit_options() -> Result<()> {
        let options = FitOptions::new()
            .with_bootstrap_iterations(10)
            .with_resampling(Resampling::Rows)
            .with_seed(7)
            .with_jacobian(JacobianKind::Generic)
            .with_solver(NLPSolverOptions::new().with_newton_max_iter(50));
        assert_eq!(options.bootstrap_iterations(), 10);
        let model = MuSyC::new(2)?.with_options(options.clone());
        assert_eq!(model.options(), &options);
        Ok(())
    }
}
