use crate::{
    Error, Result,
    state::{MAX_DRUGS, index_to_state, is_engaged, num_states},
};
use std::collections::HashMap;

/// Comma-joined 1-based drugs engaged in the state, ascending. Empty for the origin.
pub fn label_for_state(state: &[u8]) -> String {
    let n = state.len();
    (0..n)
        .filter(|&drug| state[n - 1 - drug] == 1)
        .map(|drug| (drug + 1).to_string())
        .collect::<Vec<String>>()
        .join(",")
}

/// Comma-joined 1-based drugs engaged in `b` but not in `a`. Released drugs are ignored.
pub fn difference_label(a: &[u8], b: &[u8]) -> Result<String> {
    if a.len() != b.len() {
        return Err(Error::StateLengthMismatch {
            len1: a.len(),
            len2: b.len(),
        });
    }
    let added: Vec<u8> = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| u8::from(x == 0 && y == 1))
        .collect();
    Ok(label_for_state(&added))
}

/// Label `<parent>_<added drugs>` of the transition from `parent` to `child`.
pub fn label_for_edge(parent: &[u8], child: &[u8]) -> Result<String> {
    let added = difference_label(parent, child)?;
    Ok(format!("{}_{}", label_for_state(parent), added))
}

/// Directed edge from a parent state to the child state engaging one more drug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Parent state index.
    pub parent: usize,
    /// Child state index.
    pub child: usize,
    /// Newly engaged drug (0-based drug position).
    pub drug: usize,
    /// Canonical label `<parent>_<drug>`.
    pub label: String,
    /// Position within the alpha and gamma families. `None` for edges leaving the origin,
    /// which are described by the drug's own potency and cooperativity.
    pub interaction: Option<usize>,
}

/// State node of the interaction graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// State index.
    pub index: usize,
    /// Drug state vector.
    pub state: Vec<u8>,
    /// Canonical state label.
    pub label: String,
    /// Ids of edges entering the node.
    pub incoming: Vec<usize>,
    /// Ids of edges leaving the node.
    pub outgoing: Vec<usize>,
}

/// Arena of all 2^n drug states and the edges between them.
///
/// Edges are ordered by parent index and, per parent, by the engaged drug in descending
/// order. Interaction slots of non-origin edges follow the same order, which fixes the layout
/// of the alpha and gamma parameter families.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionGraph {
    num_drugs: usize,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    edge_lookup: HashMap<String, usize>,
}

impl InteractionGraph {
    /// Builds the interaction graph of n drugs.
    pub fn new(n: usize) -> Result<Self> {
        if n > MAX_DRUGS {
            return Err(Error::MaxValue {
                name: "num_drugs",
                value: n,
                le_value: MAX_DRUGS,
            });
        }
        let mut nodes = (0..num_states(n))
            .map(|index| {
                let state = index_to_state(index, n)?;
                let label = label_for_state(&state);
                Ok(Node {
                    index,
                    state,
                    label,
                    incoming: vec![],
                    outgoing: vec![],
                })
            })
            .collect::<Result<Vec<Node>>>()?;

        let mut edges = vec![];
        let mut interactions = 0;
        for parent in 0..num_states(n) {
            for drug in (0..n).rev().filter(|&drug| !is_engaged(parent, drug)) {
                let child = parent | 1 << drug;
                let interaction = match parent {
                    0 => None,
                    _ => {
                        interactions += 1;
                        Some(interactions - 1)
                    }
                };
                let label = format!("{}_{}", nodes[parent].label, drug + 1);
                let id = edges.len();
                nodes[parent].outgoing.push(id);
                nodes[child].incoming.push(id);
                edges.push(Edge {
                    parent,
                    child,
                    drug,
                    label,
                    interaction,
                });
            }
        }
        let edge_lookup = edges
            .iter()
            .enumerate()
            .map(|(id, e)| (e.label.clone(), id))
            .collect();
        Ok(Self {
            num_drugs: n,
            nodes,
            edges,
            edge_lookup,
        })
    }

    /// Number of drugs.
    pub fn num_drugs(&self) -> usize {
        self.num_drugs
    }

    /// Number of states.
    pub fn num_states(&self) -> usize {
        self.nodes.len()
    }

    /// All state nodes, ordered by state index.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in canonical order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges whose parent is not the origin, ordered by interaction slot.
    pub fn interaction_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.interaction.is_some())
    }

    /// Number of edges owning an alpha/gamma pair.
    pub fn num_interactions(&self) -> usize {
        self.edges.len() - self.num_drugs
    }

    /// Edge id of a label like `"1,2_3"`.
    pub fn edge_by_label(&self, label: &str) -> Option<usize> {
        self.edge_lookup.get(label).copied()
    }

    /// Checks whether per-edge log weights define a unique log potential for every state,
    /// i.e. whether every path from the origin to a state accumulates the same weight.
    ///
    /// Returns the largest absolute disagreement between an edge weight and the potential
    /// difference of its end points. Zero means the weights satisfy detailed balance.
    pub fn path_disagreement(&self, log_weights: &[f64]) -> f64 {
        let mut potential = vec![f64::NAN; self.nodes.len()];
        if let Some(p) = potential.first_mut() {
            *p = 0.;
        }
        // parents always have a lower index than their children
        for node in self.nodes.iter().skip(1) {
            if let Some(&id) = node.incoming.last() {
                let e = &self.edges[id];
                potential[node.index] = potential[e.parent] + log_weights[id];
            }
        }
        self.edges
            .iter()
            .enumerate()
            .map(|(id, e)| {
                let diff = potential[e.child] - potential[e.parent] - log_weights[id];
                match diff.is_nan() {
                    // -inf - -inf, both ends unreachable
                    true => 0.,
                    false => diff.abs(),
                }
            })
            .fold(0., f64::max)
    }
}
