//! Boolean decomposition: the shared representation every RPQ/CFPQ algorithm
//! operates on — an ordered state list plus one sparse boolean adjacency
//! matrix per symbol.
//!
//! ## Chosen semantics
//!
//! The upstream project this crate's algorithms are modeled on carried
//! several generations of this module with diverging behavior on empty
//! inputs, on whether `from_nfa` deduplicates, and on the dtype of an
//! intersection's matrices. This implementation commits to one coherent set
//! of semantics everywhere:
//! - `from_nfa`/`from_rsm` always deduplicate states by `data`, OR-ing the
//!   `is_start`/`is_final` flags of any states that collide.
//! - Every matrix is plain boolean (no weighted/counting variant).
//! - A graph or automaton with zero states produces a `Decomp` with zero
//!   states and no matrices are allocated; every algorithm below short
//!   circuits on `n == 0` before doing any matrix work.

use crate::automaton::{Label, Nfa, Rsm};
use crate::matrix::{BoolMatrixBuilder, SparseBoolMatrix};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Per-state metadata carried alongside the decomposition's matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInfo<D> {
    pub data: D,
    pub is_start: bool,
    pub is_final: bool,
}

/// The tagged union of two decompositions' state data, used by
/// [`Decomp::direct_sum`] and [`Decomp::intersect`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side<A, B> {
    Left(A),
    Right(B),
}

/// Ordered state list + one sparse boolean matrix per symbol.
#[derive(Debug, Clone)]
pub struct Decomp<D> {
    states: Vec<StateInfo<D>>,
    adjs: HashMap<Label, SparseBoolMatrix>,
}

/// Result of [`Decomp::constrained_bfs`]: either the set of reached graph
/// state indices (`Common`), or `(start_index, reached_index)` pairs
/// (`Separated`) — indices into the *graph* decomposition's state list in
/// both cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BfsOutcome {
    Common(Vec<usize>),
    Separated(Vec<(usize, usize)>),
}

fn dedup_states<D: Clone + Eq + Hash + Ord>(
    raw: impl Iterator<Item = (D, bool, bool)>,
    sort: bool,
) -> (Vec<StateInfo<D>>, HashMap<D, usize>) {
    let mut index_of: HashMap<D, usize> = HashMap::new();
    let mut states: Vec<StateInfo<D>> = Vec::new();
    for (data, is_start, is_final) in raw {
        if let Some(&idx) = index_of.get(&data) {
            states[idx].is_start |= is_start;
            states[idx].is_final |= is_final;
        } else {
            index_of.insert(data.clone(), states.len());
            states.push(StateInfo {
                data,
                is_start,
                is_final,
            });
        }
    }
    if sort {
        states.sort_by(|a, b| a.data.cmp(&b.data));
        index_of = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.data.clone(), i))
            .collect();
    }
    (states, index_of)
}

impl<D: Clone + Eq + Hash + Ord> Decomp<D> {
    /// Build a decomposition from an NFA, deduplicating states by `data`.
    /// Epsilon transitions must already have been eliminated (public
    /// engines assume epsilon-free input).
    #[must_use]
    pub fn from_nfa(nfa: &Nfa<D>, sort_states: bool) -> Decomp<D> {
        let (states, index_of) = dedup_states(
            nfa.states()
                .iter()
                .map(|s| (s.data.clone(), s.is_start, s.is_final)),
            sort_states,
        );
        let n = states.len();
        let mut builders: HashMap<Label, BoolMatrixBuilder> = HashMap::new();
        for (from, label, to) in nfa.transitions() {
            if label.is_epsilon() {
                continue;
            }
            let fi = index_of[&nfa.states()[*from].data];
            let ti = index_of[&nfa.states()[*to].data];
            builders.entry(label.clone()).or_default().set(fi, ti);
        }
        let adjs = builders.into_iter().map(|(k, b)| (k, b.build(n, n))).collect();
        Decomp { states, adjs }
    }

    #[must_use]
    pub fn states(&self) -> &[StateInfo<D>] {
        &self.states
    }

    #[must_use]
    pub fn adjs(&self) -> &HashMap<Label, SparseBoolMatrix> {
        &self.adjs
    }

    #[must_use]
    pub fn adj(&self, label: &Label) -> Option<&SparseBoolMatrix> {
        self.adjs.get(label)
    }

    /// OR `mat` into `label`'s adjacency matrix, inserting it fresh if the
    /// symbol hasn't been seen before. Returns whether anything changed, so
    /// callers driving a fixed point (e.g. RSM/automaton intersection's
    /// summary-edge worklist) can detect convergence directly.
    pub fn or_symbol(&mut self, label: Label, mat: SparseBoolMatrix) -> bool {
        match self.adjs.get_mut(&label) {
            Some(existing) => existing.or_assign(&mat),
            None => {
                let grew = mat.nnz() > 0;
                self.adjs.insert(label, mat);
                grew
            }
        }
    }

    /// Index of the (unique, post-dedup) state carrying `data`, if any.
    #[must_use]
    pub fn index_of(&self, data: &D) -> Option<usize> {
        self.states.iter().position(|s| &s.data == data)
    }

    /// Union, over every symbol, OR-squared to a fixed point. Returns the
    /// `(i, j)` indices reachable from `i` via any nonempty sequence of any
    /// symbols (including length-1 hops).
    #[must_use]
    pub fn transitive_closure_any_symbol(&self) -> Vec<(usize, usize)> {
        self.transitive_closure_any_symbol_with_limit(None)
            .unwrap_or_default()
    }

    /// Same as [`transitive_closure_any_symbol`](Self::transitive_closure_any_symbol)
    /// but returns `IterationLimitExceeded` if the squaring loop exceeds
    /// `max_iterations` outer rounds, per `EngineConfig::max_iterations`.
    pub fn transitive_closure_any_symbol_with_limit(
        &self,
        max_iterations: Option<usize>,
    ) -> crate::error::EngineResult<Vec<(usize, usize)>> {
        let n = self.states.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut m = SparseBoolMatrix::empty(n, n);
        for mat in self.adjs.values() {
            m.or_assign(mat);
        }
        let mut iterations = 0usize;
        loop {
            let prev = m.nnz();
            let squared = m.mxm(&m);
            m.or_assign(&squared);
            if m.nnz() == prev {
                break;
            }
            iterations += 1;
            tracing::debug!(iterations, nnz = m.nnz(), "transitive_closure_any_symbol round");
            if let Some(limit) = max_iterations {
                if iterations > limit {
                    return Err(crate::error::EngineError::IterationLimitExceeded {
                        phase: "transitive_closure_any_symbol".to_string(),
                        limit,
                    });
                }
            }
        }
        Ok(m.nonzero_pairs().collect())
    }

    /// Product construction. States are the Cartesian product `self x
    /// other` in `(i1 * |other.states| + i2)` order; a product state is
    /// start (final) iff both component states are. A symbol present on
    /// only one side contributes a zero matrix on the other.
    #[must_use]
    pub fn intersect<D2: Clone + Eq + Hash + Ord>(&self, other: &Decomp<D2>) -> Decomp<(D, D2)> {
        let n2 = other.states.len();
        let states: Vec<StateInfo<(D, D2)>> = self
            .states
            .iter()
            .flat_map(|s1| {
                other.states.iter().map(move |s2| StateInfo {
                    data: (s1.data.clone(), s2.data.clone()),
                    is_start: s1.is_start && s2.is_start,
                    is_final: s1.is_final && s2.is_final,
                })
            })
            .collect();
        let n = self.states.len() * n2;

        let symbols: HashSet<&Label> = self.adjs.keys().chain(other.adjs.keys()).collect();
        let mut adjs = HashMap::new();
        for sym in symbols {
            let mat = match (self.adjs.get(sym), other.adjs.get(sym)) {
                (Some(a), Some(b)) => a.kronecker(b),
                _ => SparseBoolMatrix::empty(n, n),
            };
            adjs.insert(sym.clone(), mat);
        }
        Decomp { states, adjs }
    }

    /// Block-diagonal concatenation: `self`'s states first, then `other`'s.
    /// Used only to feed [`constrained_bfs`](Self::constrained_bfs), which
    /// needs a single multiply to advance both the query automaton and the
    /// graph under a shared symbol.
    #[must_use]
    pub fn direct_sum<D2: Clone + Eq + Hash>(&self, other: &Decomp<D2>) -> Decomp<Side<D, D2>> {
        let n1 = self.states.len();
        let n2 = other.states.len();
        let states = self
            .states
            .iter()
            .map(|s| StateInfo {
                data: Side::Left(s.data.clone()),
                is_start: s.is_start,
                is_final: s.is_final,
            })
            .chain(other.states.iter().map(|s| StateInfo {
                data: Side::Right(s.data.clone()),
                is_start: s.is_start,
                is_final: s.is_final,
            }))
            .collect();

        let symbols: HashSet<&Label> = self.adjs.keys().chain(other.adjs.keys()).collect();
        let mut adjs = HashMap::new();
        for sym in symbols {
            let a = self
                .adjs
                .get(sym)
                .cloned()
                .unwrap_or_else(|| SparseBoolMatrix::empty(n1, n1));
            let b = other
                .adjs
                .get(sym)
                .cloned()
                .unwrap_or_else(|| SparseBoolMatrix::empty(n2, n2));
            adjs.insert((*sym).clone(), a.block_diag(&b));
        }
        Decomp { states, adjs }
    }

    /// Constrained BFS: reachability in `self` under the regular constraint
    /// `constraint`, computed as a single iterated multiply over the direct
    /// sum `constraint (+) self`. See the module-level algorithm note for
    /// the front-normalization step; §4.2 of the design document spells out
    /// the index arithmetic this implements line for line.
    #[must_use]
    pub fn constrained_bfs<Dq: Clone + Eq + Hash + Ord>(
        &self,
        constraint: &Decomp<Dq>,
        separated: bool,
    ) -> BfsOutcome {
        let k = constraint.states.len();
        let n = self.states.len();
        if n == 0 || k == 0 {
            return if separated {
                BfsOutcome::Separated(Vec::new())
            } else {
                BfsOutcome::Common(Vec::new())
            };
        }

        let start_graph_indices: Vec<usize> =
            (0..n).filter(|&j| self.states[j].is_start).collect();

        let ds = constraint.direct_sum(self);

        let init_front = if separated {
            let bands = start_graph_indices.len();
            let mut b = BoolMatrixBuilder::new();
            for (band, &gstart) in start_graph_indices.iter().enumerate() {
                for i in 0..k {
                    if constraint.states[i].is_start {
                        let row = band * k + i;
                        b.set(row, i);
                        b.set(row, k + gstart);
                    }
                }
            }
            b.build(bands * k, k + n)
        } else {
            let mut b = BoolMatrixBuilder::new();
            for i in 0..k {
                if constraint.states[i].is_start {
                    b.set(i, i);
                    for j in 0..n {
                        if self.states[j].is_start {
                            b.set(i, k + j);
                        }
                    }
                }
            }
            b.build(k, k + n)
        };

        let rows = init_front.rows();
        let mut visited = SparseBoolMatrix::empty(rows, k + n);
        let mut current = Some(init_front);
        loop {
            let prev_nnz = visited.nnz();
            for sym_mat in ds.adjs.values() {
                let front_for_step = current.as_ref().unwrap_or(&visited);
                let product = front_for_step.mxm(sym_mat);
                let transformed = transform_front_part(k, &product);
                visited.or_assign(&transformed);
            }
            current = None;
            if visited.nnz() == prev_nnz {
                break;
            }
        }

        if separated {
            let mut res: Vec<(usize, usize)> = Vec::new();
            for (i, j) in visited.nonzero_pairs() {
                if j >= k {
                    let q = i % k;
                    let v = j - k;
                    if constraint.states[q].is_final && self.states[v].is_final {
                        res.push((start_graph_indices[i / k], v));
                    }
                }
            }
            res.sort_unstable();
            res.dedup();
            BfsOutcome::Separated(res)
        } else {
            let mut res: Vec<usize> = Vec::new();
            for (i, j) in visited.nonzero_pairs() {
                if j >= k {
                    let q = i % k;
                    let v = j - k;
                    if constraint.states[q].is_final && self.states[v].is_final {
                        res.push(v);
                    }
                }
            }
            res.sort_unstable();
            res.dedup();
            BfsOutcome::Common(res)
        }
    }
}

impl Decomp<(String, u32)> {
    /// Build a decomposition from an RSM: state data is `(variable, local
    /// state id)`. No adjacency exists between states of different boxes —
    /// each box's transitions are mapped independently, so the invariant
    /// holds structurally rather than needing an explicit check.
    #[must_use]
    pub fn from_rsm(rsm: &Rsm, sort_states: bool) -> Decomp<(String, u32)> {
        let mut box_names: Vec<&String> = rsm.boxes().keys().collect();
        box_names.sort();

        let raw = box_names.iter().flat_map(|var| {
            rsm.boxes()[*var]
                .states()
                .iter()
                .map(move |s| (((*var).clone(), s.data), s.is_start, s.is_final))
        });
        let (states, index_of) = dedup_states(raw, sort_states);
        let n = states.len();

        let mut builders: HashMap<Label, BoolMatrixBuilder> = HashMap::new();
        for var in &box_names {
            let nfa = &rsm.boxes()[*var];
            for (from, label, to) in nfa.transitions() {
                if label.is_epsilon() {
                    continue;
                }
                let fi = index_of[&((*var).clone(), nfa.states()[*from].data)];
                let ti = index_of[&((*var).clone(), nfa.states()[*to].data)];
                builders.entry(label.clone()).or_default().set(fi, ti);
            }
        }
        let adjs = builders.into_iter().map(|(k, b)| (k, b.build(n, n))).collect();
        Decomp { states, adjs }
    }
}

/// Normalize one step of `constrained_bfs`'s front: for every `(i, j)` with
/// `j < k` (a newly reached constraint state), carry row `i`'s right-block
/// (graph-side) nonzeros down onto `row_band(i) + j`, where `row_band(i) =
/// (i / k) * k` collapses a separated band's rows back onto its diagonal.
fn transform_front_part(k: usize, front: &SparseBoolMatrix) -> SparseBoolMatrix {
    let (rows, cols) = front.shape();
    let mut builder = BoolMatrixBuilder::new();
    for i in 0..rows {
        let row = front.row(i);
        let right: Vec<usize> = row.iter().copied().filter(|&j| j >= k).collect();
        if right.is_empty() {
            continue;
        }
        for &j in row {
            if j < k {
                let dest = (i / k) * k + j;
                builder.set(dest, j);
                for &rj in &right {
                    builder.set(dest, rj);
                }
            }
        }
    }
    builder.build(rows, cols)
}
