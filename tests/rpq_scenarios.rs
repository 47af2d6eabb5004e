//! End-to-end regular path query scenarios driven through the public
//! adapters (regex text in, `ResultSet` out) rather than through the
//! internal `Nfa`/`Decomp` types directly.

use pathql::adapters::compile_regex;
use pathql::config::EngineConfig;
use pathql::graph::LabeledGraph;
use pathql::query::QueryEngine;
use pathql::value::{ResultItem, VertexId};

fn two_cycle_graph() -> LabeledGraph {
    let mut g = LabeledGraph::new();
    g.add_edge(VertexId::int(0), "a", VertexId::int(1));
    g.add_edge(VertexId::int(1), "a", VertexId::int(0));
    g
}

#[test]
fn any_label_star_query_reaches_every_vertex_from_every_start() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let g = two_cycle_graph();
    let mut next = 0u32;
    let query = compile_regex("a*", &mut next).unwrap();
    let tensor = engine.rpq_by_tensor(&g, &query, None, None).unwrap();
    for a in [VertexId::int(0), VertexId::int(1)] {
        for b in [VertexId::int(0), VertexId::int(1)] {
            assert!(tensor.contains(&ResultItem::Pair(a.clone(), b.clone())));
        }
    }
}

#[test]
fn empty_language_query_returns_empty_result_set() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let g = two_cycle_graph();
    let mut next = 0u32;
    // "z" never appears as an edge label in this graph.
    let query = compile_regex("z", &mut next).unwrap();
    let tensor = engine.rpq_by_tensor(&g, &query, None, None).unwrap();
    assert!(tensor.is_empty());
}

#[test]
fn bfs_separated_and_tensor_agree_on_reachable_pairs() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let g = two_cycle_graph();
    let mut next = 0u32;
    let query = compile_regex("a", &mut next).unwrap();
    let tensor = engine.rpq_by_tensor(&g, &query, None, None).unwrap();
    let bfs = engine.rpq_by_bfs(&g, &query, None, None, true).unwrap();
    assert_eq!(tensor, bfs);
}

#[test]
fn bfs_common_pools_targets_across_all_starts() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let g = two_cycle_graph();
    let mut next = 0u32;
    let query = compile_regex("a", &mut next).unwrap();
    let bfs = engine.rpq_by_bfs(&g, &query, None, None, false).unwrap();
    assert!(bfs.contains(&ResultItem::Vertex(VertexId::int(0))));
    assert!(bfs.contains(&ResultItem::Vertex(VertexId::int(1))));
}

#[test]
fn mixed_vertex_kind_start_filter_is_rejected() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let g = two_cycle_graph();
    let mut next = 0u32;
    let query = compile_regex("a", &mut next).unwrap();
    let mut starts = std::collections::HashSet::new();
    starts.insert(VertexId::str("not-in-graph"));
    let result = engine.rpq_by_tensor(&g, &query, Some(&starts), None);
    assert!(result.is_err());
}
