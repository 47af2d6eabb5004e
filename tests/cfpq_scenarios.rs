//! End-to-end context-free path query scenarios: balanced parentheses via
//! the CFG text adapter, and the tensor-vs-matrix equivalence property.

use pathql::adapters::parse_cfg;
use pathql::config::EngineConfig;
use pathql::query::QueryEngine;
use pathql::value::{ResultItem, VertexId};
use pathql::LabeledGraph;

fn balanced_parens_graph() -> LabeledGraph {
    // 0 -a-> 1 -a-> 2 -b-> 1 -b-> 0  (a single "(())" shaped path)
    let mut g = LabeledGraph::new();
    g.add_edge(VertexId::int(0), "a", VertexId::int(1));
    g.add_edge(VertexId::int(1), "a", VertexId::int(2));
    g.add_edge(VertexId::int(2), "b", VertexId::int(1));
    g.add_edge(VertexId::int(1), "b", VertexId::int(0));
    g
}

#[test]
fn balanced_parens_grammar_connects_matching_endpoints() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let g = balanced_parens_graph();
    let grammar = parse_cfg("S -> a S b | epsilon").unwrap();
    let wcnf = grammar.to_wcnf();
    let result = engine.cfpq_by_hellings(&g, &wcnf, None, None).unwrap();
    assert!(result.contains(&ResultItem::Pair(VertexId::int(0), VertexId::int(0))));
    assert!(result.contains(&ResultItem::Pair(VertexId::int(1), VertexId::int(1))));
}

#[test]
fn balanced_parens_tensor_matches_hellings() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let g = balanced_parens_graph();
    let grammar = parse_cfg("S -> a S b | epsilon").unwrap();
    let wcnf = grammar.to_wcnf();
    let hellings = engine.cfpq_by_hellings(&g, &wcnf, None, None).unwrap();

    let rsm = grammar.to_rsm();
    let tensor = engine.cfpq_by_tensor(&g, &rsm, None, None).unwrap();
    assert_eq!(hellings, tensor);
}

#[test]
fn matrix_and_hellings_agree_on_a_star_b_star_grammar() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let mut g = LabeledGraph::new();
    g.add_edge(VertexId::str("p"), "a", VertexId::str("q"));
    g.add_edge(VertexId::str("q"), "b", VertexId::str("r"));
    let grammar = parse_cfg("S -> A B\nA -> a | epsilon\nB -> b | epsilon").unwrap();
    let wcnf = grammar.to_wcnf();
    let hellings = engine.cfpq_by_hellings(&g, &wcnf, None, None).unwrap();
    let matrix = engine.cfpq_by_matrix(&g, &wcnf, None, None).unwrap();
    assert_eq!(hellings, matrix);
    assert!(hellings.contains(&ResultItem::Pair(VertexId::str("p"), VertexId::str("r"))));
}

#[test]
fn empty_graph_produces_empty_cfpq_result() {
    let mut engine = QueryEngine::new(EngineConfig::default());
    let g = LabeledGraph::new();
    let grammar = parse_cfg("S -> a S b | epsilon").unwrap();
    let wcnf = grammar.to_wcnf();
    let result = engine.cfpq_by_hellings(&g, &wcnf, None, None).unwrap();
    assert!(result.is_empty());
}
