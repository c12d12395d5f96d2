use crate::{Error, Result};

/// Maximal number of drugs. The model grows with 2^n states and n * 2^(n-1) edges.
pub const MAX_DRUGS: usize = 10;

/// Number of states of n drugs.
pub fn num_states(n: usize) -> usize {
    1 << n
}

/// Number of engaged drugs of a state index.
pub fn popcount(idx: usize) -> usize {
    idx.count_ones() as usize
}

/// Returns true if drug position `drug` (0-based) is engaged in state index `idx`.
pub fn is_engaged(idx: usize, drug: usize) -> bool {
    idx & (1 << drug) != 0
}

/// Decodes a state index into its drug state.
///
/// Drug states are written with the highest drug first, i.e. position `0` holds drug `n` and
/// position `n - 1` holds drug `1`. The index reads the vector as a binary number, so drug `i`
/// (1-based) is bit `i - 1` of the index.
pub fn index_to_state(idx: usize, n: usize) -> Result<Vec<u8>> {
    if n > MAX_DRUGS || idx >= num_states(n) {
        return Err(Error::StateIndexOutOfRange {
            index: idx,
            num_drugs: n,
        });
    }
    Ok((0..n).rev().map(|drug| (idx >> drug & 1) as u8).collect())
}

/// Encodes a drug state into its state index.
pub fn state_to_index(state: &[u8]) -> Result<usize> {
    if state.len() > MAX_DRUGS {
        return Err(Error::MaxValue {
            name: "state length",
            value: state.len(),
            le_value: MAX_DRUGS,
        });
    }
    state
        .iter()
        .enumerate()
        .try_fold(0, |idx, (position, &value)| match value {
            0 | 1 => Ok(idx << 1 | value as usize),
            _ => Err(Error::NonBinaryState { position, value }),
        })
}

/// Number of positions in which two drug states differ.
pub fn hamming(a: &[u8], b: &[u8]) -> Result<usize> {
    if a.len() != b.len() {
        return Err(Error::StateLengthMismatch {
            len1: a.len(),
            len2: b.len(),
        });
    }
    Ok(a.iter().zip(b).filter(|(x, y)| x != y).count())
}

/// Single-drug transitions of a state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Neighbors {
    /// `(drug position, child index)` for every drug that is not engaged yet.
    pub add: Vec<(usize, usize)>,
    /// `(drug position, parent index)` for every engaged drug.
    pub remove: Vec<(usize, usize)>,
}

/// Returns the states reachable by engaging or releasing exactly one drug.
pub fn neighbors(idx: usize, n: usize) -> Result<Neighbors> {
    if n > MAX_DRUGS || idx >= num_states(n) {
        return Err(Error::StateIndexOutOfRange {
            index: idx,
            num_drugs: n,
        });
    }
    let mut neighbors = Neighbors::default();
    for drug in 0..n {
        if is_engaged(idx, drug) {
            neighbors.remove.push((drug, idx & !(1 << drug)));
        } else {
            neighbors.add.push((drug, idx | 1 << drug));
        }
    }
    Ok(neighbors)
}
