use musyc::{BoundsConfig, DoseGrid, Family, MuSyC, ParameterRegistry, Result};
use nalgebra::DVector;

fn main() -> Result<()> {
    // every effect state gets its own value, all shifts are neutral
    let registry = ParameterRegistry::new(3, false)?;
    let values: Vec<(String, f64)> = registry
        .specs()
        .iter()
        .map(|spec| match spec.state {
            Some(state) => (spec.name.clone(), 1. - 0.12 * state as f64),
            None => (spec.name.clone(), 1.),
        })
        .collect();
    let truth = MuSyC::new(3)?.with_fit_gamma(false)?.with_parameters(values)?;

    let grid = DoseGrid::new(
        DVector::from_element(3, 0.01),
        DVector::from_element(3, 100.),
        vec![5, 5, 5],
        true,
    )?;
    let effects = truth.effect(&grid.points)?;

    // fit model within plausible ranges
    let bounds = BoundsConfig::new()
        .with_family(Family::E, (-0.5, 1.5))
        .with_family(Family::H, (0.1, 10.))
        .with_family(Family::C, (1e-3, 1e3))
        .with_family(Family::Alpha, (1e-2, 1e2));
    let mut model = MuSyC::new(3)?.with_fit_gamma(false)?.with_bounds(bounds)?;
    model.fit(&grid.points, &effects)?;

    println!("{}", model.parameters()?);
    for (name, beta) in model.betas()? {
        println!("{name} = {beta:.4}");
    }
    Ok(())
}
