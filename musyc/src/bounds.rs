use crate::registry::Family;
use nalgebra::DVector;

/// Target of a bounds override.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundsTarget {
    /// Every parameter of a family.
    Family(Family),
    /// Every parameter of a family belonging to a 1-based drug. For alpha and gamma these are
    /// all edges that newly engage the drug.
    Drug(Family, usize),
    /// A single named parameter, e.g. `alpha_1,2_3`.
    Parameter(String),
    /// Unparsed string key like `h_1_bounds`, resolved against the parameter registry.
    Key(String),
}

/// User supplied bounds overrides in linear units.
///
/// Overrides are resolved by [ParameterRegistry::default_bounds](crate::ParameterRegistry::default_bounds)
/// from general to specific, so the order in which they are added only matters between
/// overrides of the same specificity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsConfig {
    entries: Vec<(BoundsTarget, (f64, f64))>,
}

impl BoundsConfig {
    /// Creates an empty bounds configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bounds configuration from string keys.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, (f64, f64))>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |config, (key, bound)| config.with_key(key, bound))
    }

    /// Bounds every parameter of a family.
    pub fn with_family(mut self, family: Family, bound: (f64, f64)) -> Self {
        self.entries.push((BoundsTarget::Family(family), bound));
        self
    }

    /// Bounds every parameter of a family belonging to the 1-based drug. E parameters belong to
    /// states and are bounded by name instead.
    pub fn with_drug(mut self, family: Family, drug: usize, bound: (f64, f64)) -> Self {
        self.entries.push((BoundsTarget::Drug(family, drug), bound));
        self
    }

    /// Bounds a single named parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, bound: (f64, f64)) -> Self {
        self.entries
            .push((BoundsTarget::Parameter(name.into()), bound));
        self
    }

    /// Bounds by string key, e.g. `E_bounds`, `h_1_bounds` or `alpha_1,2_3_bounds`.
    pub fn with_key(mut self, key: impl Into<String>, bound: (f64, f64)) -> Self {
        self.entries.push((BoundsTarget::Key(key.into()), bound));
        self
    }

    /// All overrides in insertion order.
    pub fn entries(&self) -> &[(BoundsTarget, (f64, f64))] {
        &self.entries
    }

    /// Returns true if no override has been given.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolved bounds of every parameter in optimizer coordinates.
///
/// Bounds of strictly positive parameters are stored as natural logarithms, an unconstrained
/// positive parameter therefore has the bounds `(-inf, inf)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: DVector<f64>,
    upper: DVector<f64>,
    positive: Vec<bool>,
}

impl Bounds {
    /// Creates bounds from linear `(lower, upper)` pairs and the log-scale flag of each entry.
    pub fn from_linear(linear: Vec<(f64, f64)>, positive: Vec<bool>) -> Self {
        let to_internal = |v: f64, log: bool| if log { v.ln() } else { v };
        let lower = DVector::from_iterator(
            linear.len(),
            linear.iter().zip(&positive).map(|(b, &p)| to_internal(b.0, p)),
        );
        let upper = DVector::from_iterator(
            linear.len(),
            linear.iter().zip(&positive).map(|(b, &p)| to_internal(b.1, p)),
        );
        Self {
            lower,
            upper,
            positive,
        }
    }

    /// Unconstrained bounds.
    pub fn unbounded(positive: Vec<bool>) -> Self {
        let size = positive.len();
        Self {
            lower: DVector::from_element(size, f64::NEG_INFINITY),
            upper: DVector::from_element(size, f64::INFINITY),
            positive,
        }
    }

    /// Number of bounded parameters.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Returns true if there are no bounded parameters.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Lower bounds in optimizer coordinates.
    pub fn lower(&self) -> &DVector<f64> {
        &self.lower
    }

    /// Upper bounds in optimizer coordinates.
    pub fn upper(&self) -> &DVector<f64> {
        &self.upper
    }

    /// Returns true if parameter `idx` is optimized on log scale.
    pub fn is_log_scaled(&self, idx: usize) -> bool {
        self.positive[idx]
    }

    /// Bounds of parameter `idx` in linear units.
    pub fn linear(&self, idx: usize) -> (f64, f64) {
        match self.positive[idx] {
            true => (self.lower[idx].exp(), self.upper[idx].exp()),
            false => (self.lower[idx], self.upper[idx]),
        }
    }

    /// Returns true if x lies within the closed bounds.
    pub fn contains(&self, x: &DVector<f64>) -> bool {
        x.len() == self.len()
            && x.iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(v, (l, u))| l <= v && v <= u)
    }

    /// Moves x into the strict interior of the bounds.
    ///
    /// Coordinates outside or on a finite bound are pushed inside by a small margin relative
    /// to the width of the interval, non-finite coordinates are replaced by the center of
    /// their interval.
    pub fn project_interior(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            x.len(),
            x.iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .map(|(&v, (&l, &u))| project(v, l, u)),
        )
    }
}

fn project(v: f64, l: f64, u: f64) -> f64 {
    const MARGIN: f64 = 1e-3;
    match (l.is_finite(), u.is_finite()) {
        (true, true) => {
            let m = MARGIN * (u - l);
            match v.is_finite() {
                true => v.clamp(l + m, u - m),
                false => 0.5 * (l + u),
            }
        }
        (true, false) => {
            let m = MARGIN * l.abs().max(1.);
            match v.is_finite() {
                true => v.max(l + m),
                false => l + 1.,
            }
        }
        (false, true) => {
            let m = MARGIN * u.abs().max(1.);
            match v.is_finite() {
                true => v.min(u - m),
                false => u - 1.,
            }
        }
        (false, false) => match v.is_finite() {
            true => v,
            false => 0.,
        },
    }
}

/// Bounds of the single drug Hill model in linear units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HillBounds {
    /// Bounds of the effect without drug.
    pub e0: (f64, f64),
    /// Bounds of the effect at saturating dose.
    pub emax: (f64, f64),
    /// Bounds of the Hill coefficient.
    pub h: (f64, f64),
    /// Bounds of the potency.
    pub c: (f64, f64),
}

impl Default for HillBounds {
    fn default() -> Self {
        Self {
            e0: (f64::NEG_INFINITY, f64::INFINITY),
            emax: (f64::NEG_INFINITY, f64::INFINITY),
            h: (0., f64::INFINITY),
            c: (0., f64::INFINITY),
        }
    }
}

impl HillBounds {
    /// Bounds in optimizer coordinates `(E0, Emax, ln h, ln C)`.
    pub fn to_bounds(&self) -> Bounds {
        Bounds::from_linear(
            vec![self.e0, self.emax, self.h, self.c],
            vec![false, false, true, true],
        )
    }
}
