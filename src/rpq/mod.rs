//! Regular path queries: given a graph and a regular constraint (already
//! compiled to an automaton), find the vertex pairs connected by a path
//! whose label sequence the constraint accepts.
//!
//! Two algorithms, same contract, different cost profile: [`tensor_rpq`]
//! builds the full product automaton and closes it once (good when the
//! constraint is small relative to the graph and many start vertices are in
//! play); [`bfs_rpq`] advances a front vector symbol by symbol and never
//! materializes the product's matrices (good for a handful of start
//! vertices against a large graph).

use crate::automaton::Nfa;
use crate::decomposition::{BfsOutcome, Decomp};
use crate::value::VertexId;
use std::collections::HashSet;

/// Output shape of [`bfs_rpq`]: `Common` pools every start vertex's
/// reachable set together, `Separated` keeps `(start, reached)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BfsRpqResult {
    Common(HashSet<VertexId>),
    Separated(HashSet<(VertexId, VertexId)>),
}

/// Tensor-product RPQ: intersect the graph automaton with the query
/// automaton, close the product over any symbol, and read off every
/// `(start, end)` vertex pair whose product state pair is `(start, final)`.
#[must_use]
pub fn tensor_rpq(graph: &Nfa<VertexId>, query: &Nfa<u32>) -> HashSet<(VertexId, VertexId)> {
    let graph_decomp = Decomp::from_nfa(graph, false);
    let query_decomp = Decomp::from_nfa(query, false);
    let prod = graph_decomp.intersect(&query_decomp);
    let closure = prod.transitive_closure_any_symbol();

    let mut out = HashSet::new();
    for (i, j) in closure {
        if prod.states()[i].is_start && prod.states()[j].is_final {
            let (from_v, _) = &prod.states()[i].data;
            let (to_v, _) = &prod.states()[j].data;
            out.insert((from_v.clone(), to_v.clone()));
        }
    }
    out
}

/// BFS-constrained RPQ: advance a front vector over the direct sum of the
/// query and the graph instead of materializing their Kronecker product.
/// `separated` selects whether each start vertex's reachable set is tracked
/// independently or pooled.
#[must_use]
pub fn bfs_rpq(graph: &Nfa<VertexId>, query: &Nfa<u32>, separated: bool) -> BfsRpqResult {
    let graph_decomp = Decomp::from_nfa(graph, false);
    let query_decomp = Decomp::from_nfa(query, false);
    match graph_decomp.constrained_bfs(&query_decomp, separated) {
        BfsOutcome::Common(idxs) => BfsRpqResult::Common(
            idxs.into_iter().map(|i| graph_decomp.states()[i].data.clone()).collect(),
        ),
        BfsOutcome::Separated(pairs) => BfsRpqResult::Separated(
            pairs
                .into_iter()
                .map(|(s, r)| (graph_decomp.states()[s].data.clone(), graph_decomp.states()[r].data.clone()))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Label;
    use crate::graph::LabeledGraph;

    fn two_cycle_graph() -> LabeledGraph {
        let mut g = LabeledGraph::new();
        g.add_edge(VertexId::int(0), "a", VertexId::int(1));
        g.add_edge(VertexId::int(1), "a", VertexId::int(0));
        g
    }

    fn single_symbol_query(sym: &str) -> Nfa<u32> {
        let mut q = Nfa::new();
        let s0 = q.add_state(0u32, true, false);
        let s1 = q.add_state(1u32, false, true);
        q.add_transition(s0, Label::terminal(sym), s1);
        q
    }

    #[test]
    fn tensor_rpq_finds_direct_edge() {
        let g = two_cycle_graph();
        let graph_nfa = Nfa::from_graph(&g, None, None);
        let query = single_symbol_query("a");
        let pairs = tensor_rpq(&graph_nfa, &query);
        assert!(pairs.contains(&(VertexId::int(0), VertexId::int(1))));
        assert!(pairs.contains(&(VertexId::int(1), VertexId::int(0))));
    }

    #[test]
    fn bfs_rpq_common_matches_tensor_rpq_targets() {
        let g = two_cycle_graph();
        let graph_nfa = Nfa::from_graph(&g, None, None);
        let query = single_symbol_query("a");
        let tensor_targets: HashSet<VertexId> =
            tensor_rpq(&graph_nfa, &query).into_iter().map(|(_, t)| t).collect();
        match bfs_rpq(&graph_nfa, &query, false) {
            BfsRpqResult::Common(reached) => assert_eq!(reached, tensor_targets),
            BfsRpqResult::Separated(_) => panic!("expected Common"),
        }
    }

    #[test]
    fn bfs_rpq_separated_tracks_per_start_reachability() {
        let g = two_cycle_graph();
        let graph_nfa = Nfa::from_graph(&g, None, None);
        let query = single_symbol_query("a");
        match bfs_rpq(&graph_nfa, &query, true) {
            BfsRpqResult::Separated(pairs) => {
                assert!(pairs.contains(&(VertexId::int(0), VertexId::int(1))));
                assert!(pairs.contains(&(VertexId::int(1), VertexId::int(0))));
            }
            BfsRpqResult::Common(_) => panic!("expected Separated"),
        }
    }

    #[test]
    fn no_matching_label_gives_empty_result() {
        let g = two_cycle_graph();
        let graph_nfa = Nfa::from_graph(&g, None, None);
        let query = single_symbol_query("z");
        assert!(tensor_rpq(&graph_nfa, &query).is_empty());
    }
}
