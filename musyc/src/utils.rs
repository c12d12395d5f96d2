use faer::Mat;
use faer_ext::IntoFaer;
use nalgebra::{DMatrix, DVector};

/// Convert type to a dynamically sized nalgebra vector
pub trait IntoDVector {
    /// Returns the first column as dvector
    fn into_dvector(self) -> DVector<f64>;
}

impl IntoDVector for &Mat<f64> {
    fn into_dvector(self) -> DVector<f64> {
        match self.ncols() {
            0 => DVector::zeros(0),
            _ => DVector::from_fn(self.nrows(), |i, _| self[(i, 0)]),
        }
    }
}

impl IntoDVector for Mat<f64> {
    fn into_dvector(self) -> DVector<f64> {
        (&self).into_dvector()
    }
}

/// Convert nalgebra matrix into an owned faer matrix
pub trait IntoFaerMat {
    /// Returns an owned faer copy
    fn into_faer_mat(self) -> Mat<f64>;
}

impl IntoFaerMat for &DMatrix<f64> {
    fn into_faer_mat(self) -> Mat<f64> {
        self.view_range(.., ..).into_faer().to_owned()
    }
}

impl IntoFaerMat for &DVector<f64> {
    fn into_faer_mat(self) -> Mat<f64> {
        self.view_range(.., ..).into_faer().to_owned()
    }
}
