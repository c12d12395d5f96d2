use musyc::{BoundsConfig, DoseGrid, Family, MuSyC, Result};
use nalgebra::DVector;

fn main() -> Result<()> {
    let truth = MuSyC::new(2)?.with_parameters([
        ("E_0", 1.),
        ("E_1", 0.7),
        ("E_2", 0.4),
        ("E_1,2", 0.),
        ("h_1", 2.),
        ("h_2", 1.),
        ("C_1", 0.1),
        ("C_2", 1.),
        ("alpha_1_2", 1.),
        ("alpha_2_1", 5.),
        ("gamma_1_2", 1.),
        ("gamma_2_1", 1.),
    ])?;
    let grid = DoseGrid::new(
        DVector::from_element(2, 0.001),
        DVector::from_element(2, 10.),
        vec![6, 6],
        true,
    )?;
    let effects = truth.effect(&grid.points)?;

    // family bounds first, then per drug, then per parameter
    //
    // the same configuration by string keys:
    // let bounds = BoundsConfig::from_pairs([
    //     ("E_bounds", (0., 1.)),
    //     ("h_bounds", (0.1, 10.)),
    //     ("C_1_bounds", (1e-3, 1.)),
    //     ("E_0_bounds", (0.95, 1.05)),
    // ]);
    let bounds = BoundsConfig::new()
        .with_family(Family::E, (0., 1.))
        .with_family(Family::H, (0.1, 10.))
        .with_drug(Family::C, 1, (1e-3, 1.))
        .with_parameter("E_0", (0.95, 1.05));
    let mut model = MuSyC::new(2)?.with_bounds(bounds)?;
    for (idx, name) in model.registry().names().iter().enumerate() {
        let (lower, upper) = model.bounds().linear(idx);
        println!("{name}: ({lower}, {upper})");
    }
    model.fit(&grid.points, &effects)?;
    println!("{}", model.parameters()?);
    Ok(())
}
