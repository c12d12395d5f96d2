use approx::assert_relative_eq;
use musyc::{
    BoundsConfig, DoseGrid, Family, FitOptions, FitState, MuSyC, Resampling, Result,
    SingleDrugModel,
};
use nalgebra::{DMatrix, DVector};

const TWO_DRUG_TRUTH: [(&str, f64); 12] = [
    ("E_0", 1.),
    ("E_1", 0.6),
    ("E_2", 0.45),
    ("E_1,2", 0.1),
    ("h_1", 1.3),
    ("h_2", 0.9),
    ("C_1", 0.4),
    ("C_2", 2.),
    ("alpha_1_2", 2.),
    ("alpha_2_1", 0.7),
    ("gamma_1_2", 1.),
    ("gamma_2_1", 1.),
];

fn grid(n: usize, q: usize) -> Result<DoseGrid> {
    DoseGrid::new(
        DVector::from_element(n, 0.01),
        DVector::from_element(n, 100.),
        vec![q; n],
        true,
    )
}

fn assert_recovered(model: &MuSyC, truth: &MuSyC, names: &[&str]) -> Result<()> {
    let fitted = model.parameters()?;
    let expected = truth.parameters()?;
    for name in names {
        let value = fitted.get(name).unwrap_or(f64::NAN);
        let target = expected.get(name).unwrap_or(f64::NAN);
        assert!(
            (value - target).abs() <= 0.05 * target.abs().max(0.1),
            "{name}: fitted {value}, expected {target}"
        );
    }
    Ok(())
}

#[test]
fn test_fit_two_drugs_recovers_truth() -> Result<()> {
    let truth = MuSyC::new(2)?.with_parameters(TWO_DRUG_TRUTH)?;
    let doses = grid(2, 8)?.points;
    let effects = truth.effect(&doses)?;

    let mut model = MuSyC::new(2)?;
    model.fit(&doses, &effects)?;
    assert_eq!(model.state(), FitState::JointFitDone);
    let names: Vec<&str> = TWO_DRUG_TRUTH.iter().map(|(name, _)| *name).collect();
    assert_recovered(&model, &truth, &names)?;
    let residual = (model.effect(&doses)? - &effects).amax();
    assert!(residual < 1e-3);

    let beta = model.betas()?[0].1;
    assert_relative_eq!(beta, (0.45 - 0.1) / (1. - 0.45), max_relative = 0.05);
    Ok(())
}

#[test]
fn test_fit_two_drugs_seeds_single_drug_models() -> Result<()> {
    let truth = MuSyC::new(2)?.with_parameters(TWO_DRUG_TRUTH)?;
    let doses = grid(2, 6)?.points;
    let effects = truth.effect(&doses)?;

    let bounds = BoundsConfig::new()
        .with_key("E_0_bounds", (0.9, 1.1))
        .with_key("E_1_bounds", (0.5, 0.7))
        .with_key("E_2_bounds", (0.4, 0.5))
        .with_family(Family::E, (0., 1.2));
    let mut model = MuSyC::new(2)?.with_fit_gamma(false)?.with_bounds(bounds)?;
    model.fit(&doses, &effects)?;
    let seeds = model.single_drug_models();
    assert_eq!(seeds.len(), 2);
    // E bounds of the origin and the single drug states reach the marginal fits.
    assert_eq!(seeds[0].bounds().e0, (0.9, 1.1));
    assert_eq!(seeds[0].bounds().emax, (0.5, 0.7));
    assert_eq!(seeds[1].bounds().e0, (0.9, 1.1));
    assert_eq!(seeds[1].bounds().emax, (0.4, 0.5));
    // Marginals of the chain are exact Hill curves.
    let drug1 = seeds[0].parameters().copied().ok_or(musyc::Error::NotFitted)?;
    assert_relative_eq!(drug1.e0, 1., epsilon = 1e-3);
    assert_relative_eq!(drug1.emax, 0.6, epsilon = 1e-3);
    assert_relative_eq!(drug1.c, 0.4, max_relative = 1e-2);
    let drug2 = seeds[1].parameters().copied().ok_or(musyc::Error::NotFitted)?;
    assert_relative_eq!(drug2.h, 0.9, max_relative = 1e-2);
    assert_eq!(model.parameters()?.names().len(), 10);
    let names: Vec<&str> = TWO_DRUG_TRUTH[..10].iter().map(|(name, _)| *name).collect();
    assert_recovered(&model, &truth, &names)?;
    Ok(())
}

#[test]
fn test_fit_three_drugs_recovers_truth() -> Result<()> {
    let mut truth = vec![
        ("E_0", 1.),
        ("E_1", 0.7),
        ("E_2", 0.6),
        ("E_1,2", 0.4),
        ("E_3", 0.5),
        ("E_1,3", 0.3),
        ("E_2,3", 0.25),
        ("E_1,2,3", 0.05),
        ("h_1", 1.),
        ("h_2", 1.5),
        ("h_3", 0.8),
        ("C_1", 0.5),
        ("C_2", 1.),
        ("C_3", 2.),
    ];
    let alphas = [
        "alpha_1_3",
        "alpha_1_2",
        "alpha_2_3",
        "alpha_2_1",
        "alpha_1,2_3",
        "alpha_3_2",
        "alpha_3_1",
        "alpha_1,3_2",
        "alpha_2,3_1",
    ];
    truth.extend(alphas.into_iter().zip([1.5, 0.8, 1.2, 1., 2., 1., 0.7, 1.3, 1.]));
    let truth = MuSyC::new(3)?.with_fit_gamma(false)?.with_parameters(truth)?;
    let doses = grid(3, 5)?.points;
    let effects = truth.effect(&doses)?;

    let bounds = BoundsConfig::new()
        .with_family(Family::E, (-0.5, 1.5))
        .with_family(Family::H, (0.1, 10.))
        .with_family(Family::C, (1e-3, 1e3))
        .with_family(Family::Alpha, (1e-2, 1e2));
    let mut model = MuSyC::new(3)?.with_fit_gamma(false)?.with_bounds(bounds)?;
    model.fit(&doses, &effects)?;
    assert_eq!(model.state(), FitState::JointFitDone);
    let mut names = vec![
        "E_0", "E_1", "E_2", "E_1,2", "E_3", "E_1,3", "E_2,3", "E_1,2,3", "h_1", "h_2", "h_3",
        "C_1", "C_2", "C_3",
    ];
    names.extend(alphas);
    assert_recovered(&model, &truth, &names)?;
    let names: Vec<String> = model.betas()?.into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["beta_1,2", "beta_1,3", "beta_2,3", "beta_1,2,3"]);
    Ok(())
}

#[test]
fn test_asymptotic_limits() -> Result<()> {
    let model = MuSyC::new(2)?.with_parameters(TWO_DRUG_TRUTH)?;
    let doses = DMatrix::from_row_slice(4, 2, &[0., 0., 1e9, 0., 0., 1e9, 1e9, 1e9]);
    let effect = model.effect(&doses)?;
    assert_eq!(effect[0], 1.);
    assert_relative_eq!(effect[1], 0.6, epsilon = 1e-6);
    assert_relative_eq!(effect[2], 0.45, epsilon = 1e-6);
    assert_relative_eq!(effect[3], 0.1, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_asymptotic_limits_three_drugs() -> Result<()> {
    let registry = musyc::ParameterRegistry::new(3, true)?;
    let values: Vec<(String, f64)> = registry
        .specs()
        .iter()
        .map(|spec| {
            let value = match spec.state {
                Some(state) => 1. - 0.1 * state as f64,
                None => 1.,
            };
            (spec.name.clone(), value)
        })
        .collect();
    let model = MuSyC::new(3)?.with_parameters(values)?;
    for state in 0..8_usize {
        // position 0 of a dose row is drug 1
        let dose: Vec<f64> = (0..3)
            .map(|drug| match state >> drug & 1 {
                1 => 1e9,
                _ => 0.,
            })
            .collect();
        let effect = model.effect(&DMatrix::from_row_slice(1, 3, &dose))?;
        assert_relative_eq!(effect[0], 1. - 0.1 * state as f64, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_asymptotic_half_way_limits_three_drugs() -> Result<()> {
    let state_effects = [
        ("E_0", 1.),
        ("E_1", 0.6),
        ("E_2", 0.5),
        ("E_1,2", 0.7),
        ("E_3", 0.2),
        ("E_1,3", 0.2),
        ("E_2,3", 0.15),
        ("E_1,2,3", 0.),
    ];
    let mut values: Vec<(&str, f64)> = state_effects.to_vec();
    values.extend([
        ("h_1", 1.),
        ("h_2", 2.),
        ("h_3", 0.5),
        ("C_1", 1.),
        ("C_2", 1.),
        ("C_3", 1.),
    ]);
    let names = musyc::ParameterRegistry::new(3, false)?.names();
    values.extend(
        names
            .iter()
            .filter(|name| name.starts_with("alpha_"))
            .map(|name| (name.as_str(), 1.)),
    );
    let model = MuSyC::new(3)?.with_fit_gamma(false)?.with_parameters(values)?;
    let e = |name: &str| {
        state_effects
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(f64::NAN, |(_, v)| *v)
    };
    let half = |a: &str, b: &str| (e(a) + e(b)) / 2.;

    // a dose of 1 = C half engages a drug, M saturates it
    let m = 1e9;
    let table = [
        ([0., 0., 0.], e("E_0")),
        ([1., 0., 0.], half("E_0", "E_1")),
        ([0., 1., 0.], half("E_0", "E_2")),
        ([0., 0., 1.], half("E_0", "E_3")),
        ([m, 0., 0.], e("E_1")),
        ([0., m, 0.], e("E_2")),
        ([0., 0., m], e("E_3")),
        ([m, 1., 0.], half("E_1", "E_1,2")),
        ([m, 0., 1.], half("E_1", "E_1,3")),
        ([1., m, 0.], half("E_2", "E_1,2")),
        ([0., m, 1.], half("E_2", "E_2,3")),
        ([1., 0., m], half("E_3", "E_1,3")),
        ([0., 1., m], half("E_3", "E_2,3")),
        ([m, m, 0.], e("E_1,2")),
        ([m, 0., m], e("E_1,3")),
        ([0., m, m], e("E_2,3")),
        ([m, m, 1.], half("E_1,2", "E_1,2,3")),
        ([m, 1., m], half("E_1,3", "E_1,2,3")),
        ([1., m, m], half("E_2,3", "E_1,2,3")),
        ([m, m, m], e("E_1,2,3")),
    ];
    let doses = DMatrix::from_fn(table.len(), 3, |row, col| table[row].0[col]);
    let effect = model.effect(&doses)?;
    for (row, (dose, expected)) in table.iter().enumerate() {
        assert!(
            (effect[row] - expected).abs() < 1e-4,
            "{dose:?}: {} vs {expected}",
            effect[row]
        );
    }
    Ok(())
}

#[test]
fn test_fit_respects_bounds() -> Result<()> {
    let truth = MuSyC::new(2)?.with_parameters(TWO_DRUG_TRUTH)?;
    let doses = grid(2, 6)?.points;
    let effects = truth.effect(&doses)?;

    let bounds = BoundsConfig::new()
        .with_key("E_1,2_bounds", (0.2, 0.3))
        .with_drug(Family::C, 1, (0.5, 1.))
        .with_family(Family::E, (0., 1.2));
    let mut model = MuSyC::new(2)?.with_bounds(bounds)?;
    model.fit(&doses, &effects)?;
    let parameters = model.parameters()?;
    let e12 = parameters.get("E_1,2").unwrap_or(f64::NAN);
    let c1 = parameters.get("C_1").unwrap_or(f64::NAN);
    assert!((0.2..=0.3).contains(&e12));
    assert!((0.5..=1.).contains(&c1));
    assert!(parameters.values()[..4].iter().all(|e| (0. ..=1.2).contains(e)));
    Ok(())
}

#[test]
fn test_bootstrap_intervals_nested() -> Result<()> {
    let truth = MuSyC::new(2)?.with_parameters(TWO_DRUG_TRUTH)?;
    let doses = grid(2, 6)?.points;
    let clean = truth.effect(&doses)?;
    let effects = DVector::from_fn(clean.len(), |i, _| clean[i] + 0.02 * (7.3 * i as f64).sin());

    let options = FitOptions::new().with_bootstrap_iterations(16).with_seed(42);
    let mut model = MuSyC::new(2)?.with_options(options.clone());
    model.fit(&doses, &effects)?;
    let samples = model.bootstrap_samples().ok_or(musyc::Error::NoBootstrap)?;
    assert_eq!(samples.len(), 16);
    assert_eq!(samples.names().last().map(|n| n.as_str()), Some("beta_1,2"));

    let ci50 = model.confidence_intervals(50.)?;
    let ci95 = model.confidence_intervals(95.)?;
    for ((name, inner), (_, outer)) in ci50.iter().zip(ci95.iter()) {
        assert!(
            outer.0 <= inner.0 && inner.1 <= outer.1,
            "{name}: {inner:?} not within {outer:?}"
        );
    }
    assert!(ci95.get("beta_1,2").is_some());
    assert!(model.confidence_intervals(0.).is_err());

    let mut again = MuSyC::new(2)?.with_options(options);
    again.fit(&doses, &effects)?;
    assert_eq!(again.bootstrap_samples(), Some(samples));
    Ok(())
}

#[test]
fn test_bootstrap_rows() -> Result<()> {
    let truth = MuSyC::new(2)?.with_parameters(TWO_DRUG_TRUTH)?;
    let doses = grid(2, 5)?.points;
    let effects = truth.effect(&doses)?;
    let options = FitOptions::new()
        .with_bootstrap_iterations(4)
        .with_resampling(Resampling::Rows)
        .with_seed(3);
    let mut model = MuSyC::new(2)?
        .with_bounds(BoundsConfig::new().with_family(Family::E, (0., 1.2)))?
        .with_options(options);
    model.fit(&doses, &effects)?;
    let samples = model.bootstrap_samples().ok_or(musyc::Error::NoBootstrap)?;
    assert_eq!(samples.len(), 4);
    let e0 = samples.values("E_0").ok_or(musyc::Error::NoBootstrap)?;
    assert!(e0.iter().all(|v| (0. ..=1.2).contains(v)));
    Ok(())
}
