use crate::{
    Bounds, BoundsConfig, Error, HillBounds, Result,
    bounds::BoundsTarget,
    graph::InteractionGraph,
    state::{MAX_DRUGS, num_states},
};
use nalgebra::DVector;
use std::{collections::HashMap, fmt::Display, ops::Range};

/// Parameter families of the MuSyC model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Effect of a drug state.
    E,
    /// Hill coefficient (cooperativity) of a drug.
    H,
    /// Potency (EC50) of a drug.
    C,
    /// Potency shift of an edge.
    Alpha,
    /// Cooperativity shift of an edge.
    Gamma,
}

impl Family {
    /// All families in parameter vector order.
    pub const ALL: [Family; 5] = [
        Family::E,
        Family::H,
        Family::C,
        Family::Alpha,
        Family::Gamma,
    ];

    /// Name prefix of the family.
    pub fn prefix(&self) -> &'static str {
        match self {
            Family::E => "E",
            Family::H => "h",
            Family::C => "C",
            Family::Alpha => "alpha",
            Family::Gamma => "gamma",
        }
    }

    /// Family of a name prefix.
    pub fn from_prefix(prefix: &str) -> Option<Family> {
        Family::ALL.into_iter().find(|f| f.prefix() == prefix)
    }

    /// Strictly positive families are optimized on log scale.
    pub fn is_positive(&self) -> bool {
        !matches!(self, Family::E)
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Closed-form number of parameters of a family for n drugs.
pub fn num_params(family: Family, n: usize) -> usize {
    match family {
        Family::E => num_states(n),
        Family::H | Family::C => n,
        Family::Alpha | Family::Gamma if n == 0 => 0,
        Family::Alpha | Family::Gamma => n * num_states(n - 1) - n,
    }
}

/// Ordered parameter names for n drugs.
pub fn parameter_names(n: usize, fit_gamma: bool) -> Result<Vec<String>> {
    Ok(ParameterRegistry::new(n, fit_gamma)?.names())
}

/// Description of one entry of the parameter vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Presentation name, e.g. `alpha_1,2_3`.
    pub name: String,
    /// Parameter family.
    pub family: Family,
    /// State index of an E parameter.
    pub state: Option<usize>,
    /// Drug position of h and C parameters, newly engaged drug of alpha and gamma parameters.
    pub drug: Option<usize>,
    /// Interaction slot of alpha and gamma parameters.
    pub interaction: Option<usize>,
}

/// Registry of all model parameters built once per number of drugs.
///
/// The layout is `E` for every state in index order, `h_1..h_n`, `C_1..C_n`, `alpha` for every
/// edge leaving a non-origin state and, if fitted, `gamma` in the same order. Internally every
/// component is addressed by its position; names are only used for presentation and lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRegistry {
    graph: InteractionGraph,
    fit_gamma: bool,
    specs: Vec<ParameterSpec>,
    lookup: HashMap<String, usize>,
}

impl ParameterRegistry {
    /// Creates the registry of n drugs with or without cooperativity shifts.
    pub fn new(n: usize, fit_gamma: bool) -> Result<Self> {
        if n > MAX_DRUGS {
            return Err(Error::MaxValue {
                name: "num_drugs",
                value: n,
                le_value: MAX_DRUGS,
            });
        }
        let graph = InteractionGraph::new(n)?;
        let mut specs: Vec<ParameterSpec> = graph
            .nodes()
            .iter()
            .map(|node| ParameterSpec {
                name: match node.index {
                    0 => "E_0".to_string(),
                    _ => format!("E_{}", node.label),
                },
                family: Family::E,
                state: Some(node.index),
                drug: None,
                interaction: None,
            })
            .collect();
        for family in [Family::H, Family::C] {
            specs.extend((0..n).map(|drug| ParameterSpec {
                name: format!("{}_{}", family.prefix(), drug + 1),
                family,
                state: None,
                drug: Some(drug),
                interaction: None,
            }));
        }
        let shifts = match fit_gamma {
            true => vec![Family::Alpha, Family::Gamma],
            false => vec![Family::Alpha],
        };
        for family in shifts {
            specs.extend(graph.interaction_edges().map(|e| ParameterSpec {
                name: format!("{}_{}", family.prefix(), e.label),
                family,
                state: None,
                drug: Some(e.drug),
                interaction: e.interaction,
            }));
        }
        let lookup = specs
            .iter()
            .enumerate()
            .map(|(idx, spec)| (spec.name.clone(), idx))
            .collect();
        Ok(Self {
            graph,
            fit_gamma,
            specs,
            lookup,
        })
    }

    /// Number of drugs.
    pub fn num_drugs(&self) -> usize {
        self.graph.num_drugs()
    }

    /// Whether gamma parameters are part of the vector.
    pub fn fit_gamma(&self) -> bool {
        self.fit_gamma
    }

    /// Interaction graph the registry is built on.
    pub fn graph(&self) -> &InteractionGraph {
        &self.graph
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if the registry does not contain any parameter.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// All parameter specs in vector order.
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Parameter names in vector order.
    pub fn names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    /// Position of a named parameter.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Family of the parameter at position `idx`.
    pub fn family_of(&self, idx: usize) -> Option<Family> {
        self.specs.get(idx).map(|s| s.family)
    }

    /// Number of parameters of a family as laid out by this registry.
    pub fn num_params(&self, family: Family) -> usize {
        self.family_range(family).len()
    }

    /// Positions of a family within the vector.
    pub fn family_range(&self, family: Family) -> Range<usize> {
        let s = self.graph.num_states();
        let n = self.num_drugs();
        let m = self.graph.num_interactions();
        match family {
            Family::E => 0..s,
            Family::H => s..s + n,
            Family::C => s + n..s + 2 * n,
            Family::Alpha => s + 2 * n..s + 2 * n + m,
            Family::Gamma if self.fit_gamma => s + 2 * n + m..s + 2 * n + 2 * m,
            Family::Gamma => 0..0,
        }
    }

    /// Position of the effect of a state.
    pub fn e_index(&self, state: usize) -> usize {
        state
    }

    /// Position of the Hill coefficient of a drug.
    pub fn h_index(&self, drug: usize) -> usize {
        self.graph.num_states() + drug
    }

    /// Position of the potency of a drug.
    pub fn c_index(&self, drug: usize) -> usize {
        self.graph.num_states() + self.num_drugs() + drug
    }

    /// Position of the potency shift of an interaction slot.
    pub fn alpha_index(&self, interaction: usize) -> usize {
        self.family_range(Family::Alpha).start + interaction
    }

    /// Position of the cooperativity shift of an interaction slot, if gamma is fitted.
    pub fn gamma_index(&self, interaction: usize) -> Option<usize> {
        match self.fit_gamma {
            true => Some(self.family_range(Family::Gamma).start + interaction),
            false => None,
        }
    }

    /// Converts a vector in optimizer coordinates into linear units.
    pub fn to_linear(&self, theta: &DVector<f64>) -> Vec<f64> {
        theta
            .iter()
            .zip(&self.specs)
            .map(|(&v, s)| match s.family.is_positive() {
                true => v.exp(),
                false => v,
            })
            .collect()
    }

    /// Converts linear values into optimizer coordinates.
    ///
    /// Strictly positive families require values > 0.
    pub fn from_linear(&self, values: &[f64]) -> Result<DVector<f64>> {
        if values.len() != self.len() {
            return Err(Error::ShapeMismatch {
                mat1: "values",
                mat2: "parameters",
                dim1: 0,
                dim2: 0,
                shape1: (values.len(), 1),
                shape2: (self.len(), 1),
            });
        }
        let theta = values
            .iter()
            .zip(&self.specs)
            .map(|(&v, s)| match (v.is_finite(), s.family.is_positive()) {
                (true, true) if v > 0. => Ok(v.ln()),
                (true, false) => Ok(v),
                _ => Err(Error::InvalidParameterValue {
                    name: s.name.clone(),
                    value: v,
                }),
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(DVector::from_vec(theta))
    }

    /// Resolves bounds overrides into bounds of every parameter.
    ///
    /// Family bounds are applied first, followed by per-drug bounds and finally bounds of
    /// explicitly named parameters. Parameters without any override stay unconstrained, which
    /// is `(0, inf)` for the strictly positive families.
    pub fn default_bounds(&self, config: &BoundsConfig) -> Result<Bounds> {
        let mut family_level = vec![];
        let mut drug_level = vec![];
        let mut name_level = vec![];
        for (target, bound) in config.entries() {
            let target = match target {
                BoundsTarget::Key(key) => self.parse_bounds_key(key)?,
                _ => target.clone(),
            };
            match target {
                BoundsTarget::Family(family) => {
                    validate_bound(family.prefix(), family, *bound)?;
                    family_level.push((family, *bound));
                }
                BoundsTarget::Drug(family, drug) => {
                    let name = format!("{}_{}", family.prefix(), drug);
                    if family == Family::E || drug == 0 || drug > self.num_drugs() {
                        return Err(Error::UnknownBoundsKey { key: name });
                    }
                    validate_bound(&name, family, *bound)?;
                    drug_level.push((family, drug - 1, *bound));
                }
                BoundsTarget::Parameter(name) => {
                    let idx = self
                        .index_of(&name)
                        .ok_or_else(|| Error::UnknownParameter { name: name.clone() })?;
                    validate_bound(&name, self.specs[idx].family, *bound)?;
                    name_level.push((idx, *bound));
                }
                BoundsTarget::Key(key) => return Err(Error::UnknownBoundsKey { key }),
            }
        }

        let mut linear: Vec<(f64, f64)> = self
            .specs
            .iter()
            .map(|s| match s.family.is_positive() {
                true => (0., f64::INFINITY),
                false => (f64::NEG_INFINITY, f64::INFINITY),
            })
            .collect();
        for (family, bound) in family_level {
            self.family_range(family).for_each(|i| linear[i] = bound);
        }
        for (family, drug, bound) in drug_level {
            self.family_range(family)
                .filter(|&i| self.specs[i].drug == Some(drug))
                .for_each(|i| linear[i] = bound);
        }
        for (idx, bound) in name_level {
            linear[idx] = bound;
        }
        let positive = self.specs.iter().map(|s| s.family.is_positive()).collect();
        Ok(Bounds::from_linear(linear, positive))
    }

    /// Projects the bounds of drug `drug` (0-based) for its marginal Hill model.
    ///
    /// E0 is taken from the origin state, Emax from the state in which only this drug is
    /// engaged, h and C from the drug's own parameters.
    pub fn single_drug_bounds(&self, bounds: &Bounds, drug: usize) -> HillBounds {
        HillBounds {
            e0: bounds.linear(self.e_index(0)),
            emax: bounds.linear(self.e_index(1 << drug)),
            h: bounds.linear(self.h_index(drug)),
            c: bounds.linear(self.c_index(drug)),
        }
    }

    fn parse_bounds_key(&self, key: &str) -> Result<BoundsTarget> {
        let name = key.strip_suffix("_bounds").unwrap_or(key);
        if let Some(family) = Family::from_prefix(name) {
            return Ok(BoundsTarget::Family(family));
        }
        if self.index_of(name).is_some() {
            return Ok(BoundsTarget::Parameter(name.to_string()));
        }
        let unknown = || Error::UnknownBoundsKey {
            key: key.to_string(),
        };
        let (prefix, drug) = name.split_once('_').ok_or_else(unknown)?;
        let family = Family::from_prefix(prefix).ok_or_else(unknown)?;
        let drug = drug.parse::<usize>().map_err(|_| unknown())?;
        Ok(BoundsTarget::Drug(family, drug))
    }
}

fn validate_bound(name: &str, family: Family, (lower, upper): (f64, f64)) -> Result<()> {
    if lower.is_nan() || upper.is_nan() || lower >= upper {
        return Err(Error::InvalidBounds {
            name: name.to_string(),
            lower,
            upper,
        });
    }
    if family.is_positive() && lower < 0. {
        return Err(Error::NegativeBound {
            name: name.to_string(),
            lower,
        });
    }
    Ok(())
}
