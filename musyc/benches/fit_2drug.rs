use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use musyc::{DoseGrid, FitOptions, JacobianKind, MuSyC, Result};
use nalgebra::DVector;
use std::time::Duration;

fn fit_2drug(size: usize, jacobian: JacobianKind) -> Result<()> {
    // define ground truth
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
        ("gamma_1_2", 1.2),
        ("gamma_2_1", 0.8),
    ])?;

    // define checkerboard
    let grid = DoseGrid::new(
        DVector::from_element(2, 0.01),
        DVector::from_element(2, 100.),
        vec![size; 2],
        true,
    )?;
    let effects = truth.effect(&grid.points)?;

    // fit model
    let mut model =
        MuSyC::new(2)?.with_options(FitOptions::new().with_jacobian(jacobian));
    model.fit(&grid.points, &effects)?;

    Ok(())
}

fn benchmark_fit_2drug(c: &mut Criterion) {
    let mut group = c.benchmark_group("Fit 2 Drugs");
    group.sample_size(10).warm_up_time(Duration::from_secs(1));
    for size in (4..13).step_by(4) {
        group.bench_with_input(BenchmarkId::new("Analytic grid size", size), &size, |b, &s| {
            b.iter(|| fit_2drug(s, JacobianKind::Auto));
        });
        group.bench_with_input(BenchmarkId::new("Generic grid size", size), &size, |b, &s| {
            b.iter(|| fit_2drug(s, JacobianKind::Generic));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_fit_2drug);
criterion_main!(benches);
