use musyc::{DoseGrid, FitOptions, MuSyC, Resampling, Result};
use nalgebra::DVector;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn main() -> Result<()> {
    let truth = MuSyC::new(2)?.with_fit_gamma(false)?.with_parameters([
        ("E_0", 1.),
        ("E_1", 0.5),
        ("E_2", 0.5),
        ("E_1,2", 0.2),
        ("h_1", 1.),
        ("h_2", 1.),
        ("C_1", 1.),
        ("C_2", 1.),
        ("alpha_1_2", 3.),
        ("alpha_2_1", 3.),
    ])?;

    let grid = DoseGrid::new(
        DVector::from_element(2, 0.01),
        DVector::from_element(2, 100.),
        vec![6, 6],
        true,
    )?;
    let mut rng = StdRng::seed_from_u64(1);
    let effects = truth
        .effect(&grid.points)?
        .map(|e| e + rng.random_range(-0.03..0.03));

    // residual bootstrap with 100 replicates
    let options = FitOptions::new()
        .with_bootstrap_iterations(100)
        .with_resampling(Resampling::Residuals)
        .with_seed(7);
    let mut model = MuSyC::new(2)?.with_fit_gamma(false)?.with_options(options);
    model.fit(&grid.points, &effects)?;

    println!("{}", model.parameters()?);
    println!("{}", model.confidence_intervals(95.)?);
    Ok(())
}
