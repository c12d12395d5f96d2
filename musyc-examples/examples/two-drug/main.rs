use musyc::{DoseGrid, MuSyC, Result};
use nalgebra::DVector;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn main() -> Result<()> {
    // define ground truth of a synergistic combination
    let truth = MuSyC::new(2)?.with_parameters([
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
    ])?;

    // sample a noisy checkerboard with zero dose row and column
    let grid = DoseGrid::new(
        DVector::from_element(2, 0.01),
        DVector::from_element(2, 100.),
        vec![7, 7],
        true,
    )?;
    let mut rng = StdRng::seed_from_u64(0);
    let effects = truth
        .effect(&grid.points)?
        .map(|e| e + rng.random_range(-0.02..0.02));

    // fit model
    let mut model = MuSyC::new(2)?;
    model.fit(&grid.points, &effects)?;

    println!("{}", model.parameters()?);
    for (name, beta) in model.betas()? {
        println!("{name} = {beta:.4}");
    }
    for warning in model.warnings() {
        println!("warning: {warning}");
    }
    Ok(())
}
