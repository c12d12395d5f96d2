use musyc::{Response, ResponseFunction};
use nalgebra::SVector;
use num_dual::DualNum;

#[derive(Response)]
#[parameters = 3]
struct Logistic {
    offset: f64,
}

impl ResponseFunction<3> for Logistic {
    fn f<D: DualNum<f64>>(&self, dose: f64, theta: &SVector<D, 3>) -> D {
        let z = theta[1].clone() * (D::from(dose) - theta[2].clone());
        theta[0].clone() / ((-z).exp() + 1.) + self.offset
    }
}

fn main() {
    let response = Logistic { offset: 0.5 };
    let theta = SVector::<f64, 3>::new(1., 2., 0.);
    assert!((response.val(0., &theta) - 1.).abs() < 1e-12);
}
