use musyc::{Response, ResponseFunction};
use nalgebra::SVector;
use num_dual::DualNum;

#[derive(Response)]
#[parameters = 2]
struct Emax;

impl ResponseFunction<2> for Emax {
    fn f<D: DualNum<f64>>(&self, dose: f64, theta: &SVector<D, 2>) -> D {
        theta[0].clone() * dose / (theta[1].clone() + dose)
    }
}

fn main() {
    let theta = SVector::<f64, 2>::new(2., 1.);
    let (val, grad) = Emax.val_grad(1., &theta);
    assert_eq!(val, Emax.val(1., &theta));
    assert!((grad[0] - 0.5).abs() < 1e-12);
    assert!((grad[1] + 0.5).abs() < 1e-12);
}
