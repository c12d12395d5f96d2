#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
mod bootstrap;
mod bounds;
mod error;
/// Directed graph of drug states, every edge engages one additional drug.
pub mod graph;
mod grid;
mod hill;
mod interior_point_method;
/// Derivatives of the predicted effect with respect to the parameter vector.
pub mod jacobian;
mod least_squares;
mod musyc;
/// Layout of the MuSyC parameter vector.
pub mod registry;
mod response;
/// Drug states and their dense integer encoding.
pub mod state;
mod surface;
mod synergy;
mod utils;

pub use bootstrap::{
    BootstrapSamples, ConfidenceIntervals, Resampling, percentile_interval, quantile_linear_sorted,
};
pub use bounds::{Bounds, BoundsConfig, BoundsTarget, HillBounds};
pub use error::{Error, FitStage, FitWarning, Result};
pub use grid::DoseGrid;
pub use hill::{
    Hill, HillFunction, HillParameters, MIN_OBSERVATIONS, SingleDrugModel,
    geometric_mean_positive,
};
pub use interior_point_method::{
    NLPBound, NLPFunctionTarget, NLPSolution, NLPSolver, NLPSolverOptions,
};
pub use jacobian::{Jacobian, JacobianKind, JacobianProvider};
pub use least_squares::{LeastSquaresTarget, ResidualModel, fit_least_squares};
pub use musyc::{FitOptions, FitState, MuSyC, Parameters};
pub use musyc_derive::Response;
pub use registry::{Family, ParameterRegistry, parameter_names};
pub use response::{Response, ResponseCurve, ResponseFunction};
pub use surface::SurfaceEvaluator;
pub use synergy::{beta, betas};
pub use utils::{IntoDVector, IntoFaerMat};
