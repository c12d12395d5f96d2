use crate::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Checkerboard of dose combinations defined by per drug lower/upper dose and the number of
/// dose levels q.
///
/// Levels are spaced logarithmically between lower and upper, optionally preceded by a zero
/// dose. The points are the cartesian product of all levels, one row per combination and one
/// column per drug.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseGrid {
    /// Lowest positive dose of each drug.
    pub lower: DVector<f64>,
    /// Highest dose of each drug.
    pub upper: DVector<f64>,
    /// Number of positive dose levels of each drug.
    pub q: Vec<usize>,
    /// Dose levels of each drug.
    pub levels: Vec<Vec<f64>>,
    /// Dose matrix of all combinations.
    pub points: DMatrix<f64>,
}

impl DoseGrid {
    /// Creates the grid by generating the cartesian product of the dose levels.
    pub fn new(
        lower: DVector<f64>,
        upper: DVector<f64>,
        q: Vec<usize>,
        with_zero: bool,
    ) -> Result<Self> {
        if lower.len() != upper.len() || lower.len() != q.len() {
            return Err(Error::ShapeMismatch {
                mat1: "lower",
                mat2: "upper",
                dim1: 0,
                dim2: 0,
                shape1: lower.shape(),
                shape2: (upper.len(), q.len()),
            });
        }
        if let Some(&q_min) = q.iter().min() {
            if q_min < 2 {
                return Err(Error::MinValue {
                    name: "q",
                    value: q_min,
                    ge_value: 2,
                });
            }
        }
        if let Some(dim) = lower.iter().position(|l| !(l.is_finite() && *l > 0.)) {
            return Err(Error::InvalidBounds {
                name: format!("dose range of drug {}", dim + 1),
                lower: lower[dim],
                upper: upper[dim],
            });
        }
        if !lower.is_empty() {
            let (dim, distance) = (&upper - &lower).argmin();
            if distance.is_nan() || distance <= 0.0 {
                return Err(Error::MinDistanceBetweenVectors {
                    vector1: "lower",
                    vector2: "upper",
                    dim,
                    distance,
                    gt_distance: 0.0,
                });
            }
        }

        let levels: Vec<Vec<f64>> = (0..q.len())
            .map(|d| {
                let ratio = (upper[d] / lower[d]).ln() / (q[d] as f64 - 1.);
                let positive = (0..q[d]).map(|i| match i + 1 == q[d] {
                    true => upper[d],
                    false => lower[d] * (i as f64 * ratio).exp(),
                });
                match with_zero {
                    true => std::iter::once(0.).chain(positive).collect(),
                    false => positive.collect(),
                }
            })
            .collect();
        let rows = DoseGrid::build_grid(&levels, vec![0.; levels.len()], 0);
        let points = DMatrix::from_fn(rows.len(), levels.len(), |r, c| rows[r][c]);
        Ok(Self {
            lower,
            upper,
            q,
            levels,
            points,
        })
    }

    fn build_grid(levels: &[Vec<f64>], mut x: Vec<f64>, d: usize) -> Vec<Vec<f64>> {
        if d < levels.len() {
            let mut vec = vec![];
            for &level in &levels[d] {
                x[d] = level;
                vec.extend(DoseGrid::build_grid(levels, x.clone(), d + 1));
            }
            vec
        } else {
            vec![x]
        }
    }

    /// Number of dose combinations.
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    /// Returns true if the grid has no dose combinations.
    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }
}
