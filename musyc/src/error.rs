/// Main error type
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    /// A state index does not address one of the 2^n drug states.
    #[error("state index {index} is out of range for {num_drugs} drugs")]
    StateIndexOutOfRange {
        /// Requested state index.
        index: usize,
        /// Number of drugs of the state space.
        num_drugs: usize,
    },
    /// A drug state contains an entry other than 0 or 1.
    #[error("drug state entry at position {position} is {value} but has to be 0 or 1")]
    NonBinaryState {
        /// Position of the invalid entry.
        position: usize,
        /// Invalid entry.
        value: u8,
    },
    /// Two compared drug states do not have the same length.
    #[error("drug states of length {len1} and {len2} can not be compared")]
    StateLengthMismatch {
        /// Length of state 1.
        len1: usize,
        /// Length of state 2.
        len2: usize,
    },
    /// A value is lower than required.
    #[error("minimal value of {name} is {ge_value} but found {value}")]
    MinValue {
        /// Value name
        name: &'static str,
        /// Found value
        value: usize,
        /// Required minimum value
        ge_value: usize,
    },
    /// A value is greater than supported.
    #[error("maximal value of {name} is {le_value} but found {value}")]
    MaxValue {
        /// Value name
        name: &'static str,
        /// Found value
        value: usize,
        /// Supported maximum value
        le_value: usize,
    },
    /// Minimal dimensional distance requirement is violated.
    #[error(
        "min distance between vectors {vector1} and {vector2} found on dim {dim} with {distance} but should > {gt_distance}"
    )]
    MinDistanceBetweenVectors {
        /// Name of vector1.
        vector1: &'static str,
        /// Name of vector2.
        vector2: &'static str,
        /// Dimension on which the distance requirement is violated.
        dim: usize,
        /// Found distance between dim-values of vector1 and vector2.
        distance: f64,
        /// Minimal required distance.
        gt_distance: f64,
    },
    /// Two given tensors do not have the same shape.
    #[error(
        "mat {mat1} with shape {shape1:?} and {mat2} with {shape2:?} have different len on dim {dim1} and {dim2}"
    )]
    ShapeMismatch {
        /// Name of matrix 1.
        mat1: &'static str,
        /// Name of matrix 2.
        mat2: &'static str,
        /// Affected shape of dimension on matrix 1.
        dim1: usize,
        /// Affected shape of dimension on matrix 2.
        dim2: usize,
        /// Shape of matrix 1.
        shape1: (usize, usize),
        /// Shape of matrix 2.
        shape2: (usize, usize),
    },
    /// A dose is negative or not finite.
    #[error("dose {value} at observation {row} of drug {col} has to be finite and >= 0")]
    InvalidDose {
        /// Observation row.
        row: usize,
        /// Drug column.
        col: usize,
        /// Invalid dose.
        value: f64,
    },
    /// An observed effect is not finite.
    #[error("effect {value} at observation {row} has to be finite")]
    InvalidEffect {
        /// Observation row.
        row: usize,
        /// Invalid effect.
        value: f64,
    },
    /// A parameter value is outside of the domain of its family.
    #[error("value {value} of parameter {name} is invalid")]
    InvalidParameterValue {
        /// Parameter name.
        name: String,
        /// Invalid value.
        value: f64,
    },
    /// Lower bound is not strictly lower than the upper bound.
    #[error("bounds ({lower}, {upper}) of {name} require lower < upper")]
    InvalidBounds {
        /// Parameter or family name.
        name: String,
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
    /// Lower bound of a strictly positive parameter is negative.
    #[error("lower bound {lower} of positive parameter {name} has to be >= 0")]
    NegativeBound {
        /// Parameter or family name.
        name: String,
        /// Lower bound.
        lower: f64,
    },
    /// Parameter name is not part of the model.
    #[error("unknown parameter {name}")]
    UnknownParameter {
        /// Parameter name.
        name: String,
    },
    /// Bounds key is neither a family, a drug nor a parameter key.
    #[error("unknown bounds key {key}")]
    UnknownBoundsKey {
        /// Bounds key.
        key: String,
    },
    /// A complete parameter set is required, but a parameter is missing.
    #[error("missing value for parameter {name}")]
    MissingParameter {
        /// Parameter name.
        name: String,
    },
    /// Model parameters are requested before the model has been fit or set.
    #[error("model has neither been fit nor been given parameters")]
    NotFitted,
    /// Confidence intervals are requested without bootstrap samples.
    #[error("confidence intervals require a fit with bootstrap iterations > 0")]
    NoBootstrap,
    /// Confidence level outside of (0, 100].
    #[error("confidence level {level} has to be in (0, 100]")]
    InvalidConfidenceLevel {
        /// Requested level.
        level: f64,
    },
}

/// Main result type
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of a fit in which a non-fatal problem occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStage {
    /// Marginal Hill fit of a single drug (0-based drug position).
    SingleDrug(usize),
    /// Joint fit of the full parameter vector.
    Joint,
    /// Refit of a bootstrap replicate.
    Bootstrap(usize),
}

/// Non-fatal fit problems. They are logged and stored on the model, never returned as errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FitWarning {
    /// Optimizer stopped at its iteration limit; the best iterate is kept.
    #[error("{stage:?} fit did not converge within {iterations} iterations")]
    NotConverged {
        /// Affected stage.
        stage: FitStage,
        /// Spent newton iterations.
        iterations: u64,
    },
    /// Single drug fit could not be used; default bounds and initial guesses are used instead.
    #[error("single drug fit of drug {drug} skipped: {reason}")]
    SingleDrugFallback {
        /// 0-based drug position.
        drug: usize,
        /// Reason of the fallback.
        reason: String,
    },
}
