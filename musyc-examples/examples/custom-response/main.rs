use musyc::{
    Bounds, NLPSolverOptions, Response, ResponseCurve, ResponseFunction, Result,
    fit_least_squares,
};
use nalgebra::{DVector, SVector};
use num_dual::DualNum;
use std::sync::Arc;

// with help of the Response derive and the required implementation
// of the ResponseFunction the parameter gradient is automatically
// generated
#[derive(Response)]
#[parameters = 3]
struct Emax;

// E(d) = e0 + emax * d / (exp(ln_c) + d)
impl ResponseFunction<3> for Emax {
    fn f<D: DualNum<f64>>(&self, dose: f64, theta: &SVector<D, 3>) -> D {
        theta[0].clone() + theta[1].clone() * dose / (theta[2].exp() + dose)
    }
}

fn main() -> Result<()> {
    let doses = DVector::from_vec(vec![0., 0.1, 0.3, 1., 3., 10., 30.]);
    let truth = SVector::<f64, 3>::new(1., -0.8, 2_f64.ln());
    let effects = doses.map(|d| Emax.val(d, &truth));

    // fit the curve without bounds
    let curve = ResponseCurve::new(Emax, doses);
    let bounds = Bounds::unbounded(vec![false; 3]);
    let x0 = DVector::from_vec(vec![0.5, -0.5, 0.]);
    let solution = fit_least_squares(
        Arc::new(curve),
        effects,
        &x0,
        &bounds,
        &NLPSolverOptions::new(),
    );
    println!(
        "e0 = {:.4}, emax = {:.4}, C = {:.4}",
        solution.x[0],
        solution.x[1],
        solution.x[2].exp()
    );
    Ok(())
}
