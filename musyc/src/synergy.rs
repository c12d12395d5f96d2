use crate::{
    Error, ParameterRegistry, Result,
    graph::label_for_state,
    state::{index_to_state, num_states, popcount},
};

#[cfg_attr(doc, katexit::katexit)]
/// Synergistic efficacy of a drug state.
///
/// With $m$ the lowest drug of the state $S$,
///
/// $$ \beta_S = \frac{E_{S \setminus m} - E_S}{E_\emptyset - E_{S \setminus m}}. $$
///
/// States with less than two engaged drugs have no synergy and return NaN. A vanishing
/// denominator yields an infinite or NaN value, which is returned as is.
pub fn beta(e_values: &[f64], state: usize) -> Result<f64> {
    let n = e_values.len().trailing_zeros() as usize;
    if !e_values.len().is_power_of_two() || num_states(n) != e_values.len() {
        return Err(Error::ShapeMismatch {
            mat1: "e_values",
            mat2: "states",
            dim1: 0,
            dim2: 0,
            shape1: (e_values.len(), 1),
            shape2: (num_states(n + 1), 1),
        });
    }
    if state >= e_values.len() {
        return Err(Error::StateIndexOutOfRange {
            index: state,
            num_drugs: n,
        });
    }
    if popcount(state) < 2 {
        return Ok(f64::NAN);
    }
    let without_lowest = state & (state - 1);
    Ok((e_values[without_lowest] - e_values[state]) / (e_values[0] - e_values[without_lowest]))
}

/// Named synergistic efficacies `beta_<label>` of every state with at least two drugs, in
/// state index order.
pub fn betas(registry: &ParameterRegistry, e_values: &[f64]) -> Result<Vec<(String, f64)>> {
    let n = registry.num_drugs();
    if e_values.len() != num_states(n) {
        return Err(Error::ShapeMismatch {
            mat1: "e_values",
            mat2: "states",
            dim1: 0,
            dim2: 0,
            shape1: (e_values.len(), 1),
            shape2: (num_states(n), 1),
        });
    }
    (0..num_states(n))
        .filter(|&state| popcount(state) >= 2)
        .map(|state| {
            let label = label_for_state(&index_to_state(state, n)?);
            Ok((format!("beta_{label}"), beta(e_values, state)?))
        })
        .collect()
}
