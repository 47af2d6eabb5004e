//! Context-free path queries: the query is a context-free grammar (carried
//! here as a normalized [`Wcnf`] for the two saturation engines, or an
//! [`Rsm`] for the tensor engine) instead of a regular expression.
//!
//! All three engines return the same shape — one reachable `(source,
//! target)` vertex-pair set per nonterminal — so [`project`] can apply the
//! common "keep the start symbol's pairs, filtered to the requested start
//! and final vertex sets" step identically regardless of which engine
//! produced the triples.

use crate::automaton::{Label, Nfa, Rsm};
use crate::decomposition::Decomp;
use crate::graph::LabeledGraph;
use crate::matrix::SparseBoolMatrix;
use crate::value::VertexId;
use std::collections::{HashMap, HashSet, VecDeque};

/// A grammar in weak Chomsky normal form: every production is `A -> ε`,
/// `A -> a`, or `A -> B C`.
#[derive(Debug, Clone, Default)]
pub struct Wcnf {
    pub start: String,
    pub epsilon: HashSet<String>,
    pub terminal: Vec<(String, String)>,
    pub binary: Vec<(String, String, String)>,
}

/// Per-nonterminal reachable vertex-pair sets, the common output shape of
/// every CFPQ engine below.
pub type CfpqTriples = HashMap<String, HashSet<(VertexId, VertexId)>>;

fn indices_to_triples(
    graph: &LabeledGraph,
    by_var: HashMap<String, HashSet<(usize, usize)>>,
) -> CfpqTriples {
    by_var
        .into_iter()
        .map(|(var, pairs)| {
            let vs = pairs
                .into_iter()
                .map(|(u, v)| (graph.vertices()[u].clone(), graph.vertices()[v].clone()))
                .collect();
            (var, vs)
        })
        .collect()
}

/// Worklist-driven triple saturation (Hellings' algorithm).
#[must_use]
pub fn cfpq_by_hellings(graph: &LabeledGraph, wcnf: &Wcnf) -> CfpqTriples {
    let n = graph.len();
    let mut res: HashSet<(usize, String, usize)> = HashSet::new();
    let mut worklist: VecDeque<(usize, String, usize)> = VecDeque::new();
    let mut by_end: HashMap<usize, Vec<(String, usize)>> = HashMap::new();
    let mut by_start: HashMap<usize, Vec<(String, usize)>> = HashMap::new();

    macro_rules! seed {
        ($u:expr, $a:expr, $v:expr) => {{
            let t: (usize, String, usize) = ($u, $a, $v);
            if res.insert(t.clone()) {
                by_end.entry(t.2).or_default().push((t.1.clone(), t.0));
                by_start.entry(t.0).or_default().push((t.1.clone(), t.2));
                worklist.push_back(t);
            }
        }};
    }

    for a in &wcnf.epsilon {
        for v in 0..n {
            seed!(v, a.clone(), v);
        }
    }
    for e in graph.edges() {
        let u = graph.vertex_index(&e.source).expect("edge endpoint is a graph vertex");
        let v = graph.vertex_index(&e.target).expect("edge endpoint is a graph vertex");
        for (a, sym) in &wcnf.terminal {
            if *sym == e.label {
                seed!(u, a.clone(), v);
            }
        }
    }

    while let Some((u1, vi, v1)) = worklist.pop_front() {
        if let Some(list) = by_end.get(&u1).cloned() {
            for (vj, u2) in list {
                for (vk, b, c) in &wcnf.binary {
                    if *b == vj && *c == vi {
                        seed!(u2, vk.clone(), v1);
                    }
                }
            }
        }
        if let Some(list) = by_start.get(&v1).cloned() {
            for (vj, v2) in list {
                for (vk, b, c) in &wcnf.binary {
                    if *b == vi && *c == vj {
                        seed!(u1, vk.clone(), v2);
                    }
                }
            }
        }
    }

    let mut by_var: HashMap<String, HashSet<(usize, usize)>> = HashMap::new();
    for (u, var, v) in res {
        by_var.entry(var).or_default().insert((u, v));
    }
    indices_to_triples(graph, by_var)
}

/// Saturation via iterated boolean matrix multiplication over WCNF
/// productions.
#[must_use]
pub fn cfpq_by_matrix(graph: &LabeledGraph, wcnf: &Wcnf) -> CfpqTriples {
    let n = graph.len();
    let mut matrices: HashMap<String, SparseBoolMatrix> = HashMap::new();

    for a in &wcnf.epsilon {
        matrices
            .entry(a.clone())
            .or_insert_with(|| SparseBoolMatrix::empty(n, n))
            .or_assign(&SparseBoolMatrix::identity(n));
    }
    for e in graph.edges() {
        let u = graph.vertex_index(&e.source).expect("edge endpoint is a graph vertex");
        let v = graph.vertex_index(&e.target).expect("edge endpoint is a graph vertex");
        for (a, sym) in &wcnf.terminal {
            if *sym == e.label {
                matrices.entry(a.clone()).or_insert_with(|| SparseBoolMatrix::empty(n, n)).set(u, v);
            }
        }
    }

    let mut rounds = 0usize;
    loop {
        let mut grew = false;
        for (head, left, right) in &wcnf.binary {
            let lhs = matrices.get(left).cloned().unwrap_or_else(|| SparseBoolMatrix::empty(n, n));
            let rhs = matrices.get(right).cloned().unwrap_or_else(|| SparseBoolMatrix::empty(n, n));
            let product = lhs.mxm(&rhs);
            let entry = matrices.entry(head.clone()).or_insert_with(|| SparseBoolMatrix::empty(n, n));
            if entry.or_assign(&product) {
                grew = true;
            }
        }
        rounds += 1;
        tracing::debug!(rounds, variables = matrices.len(), "cfpq_by_matrix round");
        if !grew {
            break;
        }
    }

    let by_var: HashMap<String, HashSet<(usize, usize)>> = matrices
        .into_iter()
        .map(|(var, mat)| (var, mat.nonzero_pairs().collect()))
        .collect();
    indices_to_triples(graph, by_var)
}

/// Tensor CFPQ: intersect the RSM with the graph, add nullable-variable
/// self-loops, and repeatedly fold newly discovered box `(start, final)`
/// witnesses back in as summary edges until the fixed point is reached.
#[must_use]
pub fn cfpq_by_tensor(graph: &LabeledGraph, rsm: &Rsm) -> CfpqTriples {
    let graph_nfa = Nfa::from_graph(graph, None, None);
    let rsm_decomp = Decomp::from_rsm(rsm, true);
    let mut graph_decomp = Decomp::from_nfa(&graph_nfa, true);
    let n = graph_decomp.states().len();

    for s in rsm_decomp.states() {
        if s.is_start && s.is_final {
            graph_decomp.or_symbol(Label::variable(s.data.0.clone()), SparseBoolMatrix::identity(n));
        }
    }

    loop {
        let prod = rsm_decomp.intersect(&graph_decomp);
        let closure = prod.transitive_closure_any_symbol();
        let mut additions: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
        for (i, j) in closure {
            let ri = i / n;
            let gi = i % n;
            let rj = j / n;
            let gj = j % n;
            let sr = &rsm_decomp.states()[ri];
            let sf = &rsm_decomp.states()[rj];
            if sr.is_start && sf.is_final && sr.data.0 == sf.data.0 {
                additions.entry(sr.data.0.clone()).or_default().push((gi, gj));
            }
        }
        let mut grew = false;
        for (var, pairs) in additions {
            let mut mat = SparseBoolMatrix::empty(n, n);
            for (gi, gj) in pairs {
                mat.set(gi, gj);
            }
            if graph_decomp.or_symbol(Label::variable(var), mat) {
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    let mut by_var: HashMap<String, HashSet<(usize, usize)>> = HashMap::new();
    for (label, mat) in graph_decomp.adjs() {
        if let Label::Variable(v) = label {
            by_var.insert(v.clone(), mat.nonzero_pairs().collect());
        }
    }
    indices_to_triples(graph, by_var)
}

/// Keep `start_symbol`'s pairs, filtered to `starts`/`finals` (`None` means
/// "every vertex"), dropping the variable tag.
#[must_use]
pub fn project(
    triples: &CfpqTriples,
    start_symbol: &str,
    starts: Option<&HashSet<VertexId>>,
    finals: Option<&HashSet<VertexId>>,
) -> HashSet<(VertexId, VertexId)> {
    triples
        .get(start_symbol)
        .into_iter()
        .flatten()
        .filter(|(u, v)| starts.map_or(true, |s| s.contains(u)) && finals.map_or(true, |f| f.contains(v)))
        .cloned()
        .collect()
}
