use crate::least_squares::ResidualModel;
use nalgebra::{DMatrix, DVector, SVector};
use num_dual::DualNum;

/// Required value function for [Response](musyc_derive::Response) derive.
pub trait ResponseFunction<const P: usize> {
    /// Defines the response at a dose for the parameter vector theta.
    fn f<D: DualNum<f64>>(&self, dose: f64, theta: &SVector<D, P>) -> D;
}

/// Defines the value and parameter gradient of a dose-response function.
pub trait Response<const P: usize> {
    /// Value function.
    fn val(&self, dose: f64, theta: &SVector<f64, P>) -> f64;
    /// Value and gradient with respect to theta.
    fn val_grad(&self, dose: f64, theta: &SVector<f64, P>) -> (f64, SVector<f64, P>);
}

/// Dose-response function evaluated at fixed doses, fitted by least squares.
pub struct ResponseCurve<R, const P: usize> {
    response: R,
    doses: DVector<f64>,
}

impl<R: Response<P>, const P: usize> ResponseCurve<R, P> {
    /// Creates the curve of a response function at the given doses.
    pub fn new(response: R, doses: DVector<f64>) -> Self {
        Self { response, doses }
    }

    fn theta(x: &DVector<f64>) -> SVector<f64, P> {
        SVector::from_fn(|i, _| x[i])
    }
}

impl<R: Response<P>, const P: usize> ResidualModel for ResponseCurve<R, P> {
    fn predict(&self, x: &DVector<f64>) -> DVector<f64> {
        let theta = Self::theta(x);
        self.doses.map(|d| self.response.val(d, &theta))
    }

    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let theta = Self::theta(x);
        let mut jac = DMatrix::zeros(self.doses.len(), P);
        for (row, &d) in self.doses.iter().enumerate() {
            let (_, grad) = self.response.val_grad(d, &theta);
            jac.set_row(row, &grad.transpose());
        }
        jac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use musyc_derive::Response;

    #[derive(Response)]
    #[parameters = 2]
    struct Linear;

    impl ResponseFunction<2> for Linear {
        fn f<D: DualNum<f64>>(&self, dose: f64, theta: &SVector<D, 2>) -> D {
            theta[0].clone() + theta[1].clone() * dose
        }
    }

    #[test]
    fn test_response_derive() -> Result<()> {
        let theta = SVector::<f64, 2>::new(1., 3.);
        let (val, grad) = Linear.val_grad(2., &theta);
        assert_eq!(val, 7.);
        assert_eq!(Linear.val(2., &theta), 7.);
        assert!((grad - SVector::<f64, 2>::new(1., 2.)).norm() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_response_curve() -> Result<()> {
        let curve = ResponseCurve::new(Linear, DVector::from_vec(vec![0., 1., 2.]));
        let x = DVector::from_vec(vec![1., 3.]);
        assert_eq!(curve.predict(&x), DVector::from_vec(vec![1., 4., 7.]));
        let jac = curve.jacobian(&x);
        assert_eq!(jac.shape(), (3, 2));
        assert!((jac[(2, 1)] - 2.).abs() < 1e-12);
        assert!((jac[(0, 0)] - 1.).abs() < 1e-12);
        Ok(())
    }
}
