//! Query facade: the single entry point that owns configuration and
//! telemetry, validates caller-supplied start/final vertex sets up front,
//! and dispatches to the RPQ/CFPQ engines in [`crate::rpq`]/[`crate::cfpq`].

use crate::automaton::{Nfa, Rsm};
use crate::cfpq::{self, CfpqTriples, Wcnf};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::LabeledGraph;
use crate::rpq::{self, BfsRpqResult};
use crate::statistics::{QueryRecord, QueryStats};
use crate::value::{ResultItem, VertexId};
use std::collections::HashSet;
use std::time::Instant;

/// A set of query results: either bare vertices (BFS common mode) or vertex
/// pairs (every other engine). Combinators operate uniformly over
/// [`ResultItem`] regardless of which shape is inside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet(HashSet<ResultItem>);

impl ResultSet {
    #[must_use]
    pub fn from_vertices(vs: HashSet<VertexId>) -> Self {
        ResultSet(vs.into_iter().map(ResultItem::Vertex).collect())
    }

    #[must_use]
    pub fn from_pairs(ps: HashSet<(VertexId, VertexId)>) -> Self {
        ResultSet(ps.into_iter().map(|(a, b)| ResultItem::Pair(a, b)).collect())
    }

    #[must_use]
    pub fn items(&self) -> &HashSet<ResultItem> {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, item: &ResultItem) -> bool {
        self.0.contains(item)
    }

    #[must_use]
    pub fn map(&self, f: impl Fn(&ResultItem) -> ResultItem) -> ResultSet {
        ResultSet(self.0.iter().map(f).collect())
    }

    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&ResultItem) -> bool) -> ResultSet {
        ResultSet(self.0.iter().filter(|item| predicate(item)).cloned().collect())
    }

    #[must_use]
    pub fn union(&self, other: &ResultSet) -> ResultSet {
        ResultSet(self.0.union(&other.0).cloned().collect())
    }

    #[must_use]
    pub fn intersect(&self, other: &ResultSet) -> ResultSet {
        ResultSet(self.0.intersection(&other.0).cloned().collect())
    }
}

/// Owns engine configuration and running telemetry; every RPQ/CFPQ
/// algorithm is reachable as a method here instead of a free function so a
/// caller gets one object to configure once and query repeatedly.
#[derive(Debug, Default)]
pub struct QueryEngine {
    config: EngineConfig,
    stats: QueryStats,
}

fn check_subsets(
    graph: &LabeledGraph,
    starts: Option<&HashSet<VertexId>>,
    finals: Option<&HashSet<VertexId>>,
) -> EngineResult<()> {
    if let Some(s) = starts {
        graph.validate_subset(s)?;
    }
    if let Some(f) = finals {
        graph.validate_subset(f)?;
    }
    Ok(())
}

impl QueryEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        QueryEngine {
            config,
            stats: QueryStats::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    fn record(&mut self, engine: &'static str, started: Instant, result_size: usize) {
        self.stats.record(QueryRecord {
            engine,
            elapsed: started.elapsed(),
            outer_iterations: 0,
            result_size,
        });
    }

    pub fn rpq_by_tensor(
        &mut self,
        graph: &LabeledGraph,
        query: &Nfa<u32>,
        starts: Option<&HashSet<VertexId>>,
        finals: Option<&HashSet<VertexId>>,
    ) -> EngineResult<ResultSet> {
        check_subsets(graph, starts, finals)?;
        let started = Instant::now();
        let graph_nfa = Nfa::from_graph(graph, starts, finals);
        let pairs = rpq::tensor_rpq(&graph_nfa, query);
        let result = ResultSet::from_pairs(pairs);
        self.record("rpq_by_tensor", started, result.len());
        Ok(result)
    }

    pub fn rpq_by_bfs(
        &mut self,
        graph: &LabeledGraph,
        query: &Nfa<u32>,
        starts: Option<&HashSet<VertexId>>,
        finals: Option<&HashSet<VertexId>>,
        separated: bool,
    ) -> EngineResult<ResultSet> {
        check_subsets(graph, starts, finals)?;
        let started = Instant::now();
        let graph_nfa = Nfa::from_graph(graph, starts, finals);
        let result = match rpq::bfs_rpq(&graph_nfa, query, separated) {
            BfsRpqResult::Common(vs) => ResultSet::from_vertices(vs),
            BfsRpqResult::Separated(ps) => ResultSet::from_pairs(ps),
        };
        self.record("rpq_by_bfs", started, result.len());
        Ok(result)
    }

    pub fn cfpq_by_hellings(
        &mut self,
        graph: &LabeledGraph,
        wcnf: &Wcnf,
        starts: Option<&HashSet<VertexId>>,
        finals: Option<&HashSet<VertexId>>,
    ) -> EngineResult<ResultSet> {
        check_subsets(graph, starts, finals)?;
        let started = Instant::now();
        let triples = cfpq::cfpq_by_hellings(graph, wcnf);
        let result = self.project_and_finish("cfpq_by_hellings", started, &triples, &wcnf.start, starts, finals);
        Ok(result)
    }

    pub fn cfpq_by_matrix(
        &mut self,
        graph: &LabeledGraph,
        wcnf: &Wcnf,
        starts: Option<&HashSet<VertexId>>,
        finals: Option<&HashSet<VertexId>>,
    ) -> EngineResult<ResultSet> {
        check_subsets(graph, starts, finals)?;
        let started = Instant::now();
        let triples = cfpq::cfpq_by_matrix(graph, wcnf);
        let result = self.project_and_finish("cfpq_by_matrix", started, &triples, &wcnf.start, starts, finals);
        Ok(result)
    }

    pub fn cfpq_by_tensor(
        &mut self,
        graph: &LabeledGraph,
        rsm: &Rsm,
        starts: Option<&HashSet<VertexId>>,
        finals: Option<&HashSet<VertexId>>,
    ) -> EngineResult<ResultSet> {
        check_subsets(graph, starts, finals)?;
        let started = Instant::now();
        let triples = cfpq::cfpq_by_tensor(graph, rsm);
        let start_symbol = rsm.start().to_string();
        let result = self.project_and_finish("cfpq_by_tensor", started, &triples, &start_symbol, starts, finals);
        Ok(result)
    }

    fn project_and_finish(
        &mut self,
        engine: &'static str,
        started: Instant,
        triples: &CfpqTriples,
        start_symbol: &str,
        starts: Option<&HashSet<VertexId>>,
        finals: Option<&HashSet<VertexId>>,
    ) -> ResultSet {
        let pairs = cfpq::project(triples, start_symbol, starts, finals);
        let result = ResultSet::from_pairs(pairs);
        self.record(engine, started, result.len());
        result
    }

    /// RSM-level reachability: which `(start, final)` pairs of the RSM's
    /// start box are connected by a derivable path.
    #[must_use]
    pub fn rsm_get_reachables(&self, rsm: &Rsm) -> HashSet<(u32, u32)> {
        rsm.get_reachables()
    }

    /// Intersect an RSM's language with an NFA's (see [`Rsm::intersect`]).
    /// The result's start box carries every terminal edge of the
    /// intersection; any box call the construction couldn't resolve into a
    /// same-box summary edge survives as its own small box instead.
    #[must_use]
    pub fn rsm_intersect_nfa(&self, rsm: &Rsm, nfa: &Nfa<VertexId>) -> Rsm {
        rsm.intersect(nfa)
    }

    /// Intersecting two RSMs (grammar ∩ grammar) would require synthesizing
    /// a fresh multi-box recursive result rather than the per-call boxes
    /// [`Rsm::intersect`] produces for an RSM-vs-automaton pair; that
    /// construction is out of scope for this engine.
    pub fn rsm_intersect_rsm(&self, _a: &Rsm, _b: &Rsm) -> EngineResult<Rsm> {
        Err(EngineError::UnsupportedOperation(
            "RSM-RSM intersection is not implemented; intersect one side with a compiled NFA instead".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{compile_regex, parse_cfg};

    fn two_cycle_graph() -> LabeledGraph {
        let mut g = LabeledGraph::new();
        g.add_edge(VertexId::int(0), "a", VertexId::int(1));
        g.add_edge(VertexId::int(1), "a", VertexId::int(0));
        g
    }

    #[test]
    fn rpq_by_tensor_rejects_unknown_start_vertex() {
        let mut engine = QueryEngine::new(EngineConfig::default());
        let g = two_cycle_graph();
        let mut next = 0u32;
        let query = compile_regex("a", &mut next).unwrap();
        let mut bogus_starts = HashSet::new();
        bogus_starts.insert(VertexId::int(99));
        let result = engine.rpq_by_tensor(&g, &query, Some(&bogus_starts), None);
        assert!(matches!(result, Err(EngineError::TypeError(_))));
    }

    #[test]
    fn rpq_by_tensor_finds_cycle_edges_and_records_stats() {
        let mut engine = QueryEngine::new(EngineConfig::default());
        let g = two_cycle_graph();
        let mut next = 0u32;
        let query = compile_regex("a", &mut next).unwrap();
        let result = engine.rpq_by_tensor(&g, &query, None, None).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(engine.stats().queries_run, 1);
    }

    #[test]
    fn cfpq_by_hellings_matches_cfpq_by_matrix_through_facade() {
        let mut engine = QueryEngine::new(EngineConfig::default());
        let mut g = LabeledGraph::new();
        g.add_edge(VertexId::str("p"), "a", VertexId::str("q"));
        g.add_edge(VertexId::str("q"), "b", VertexId::str("r"));
        let grammar = parse_cfg("S -> a b").unwrap();
        let wcnf = grammar.to_wcnf();
        let by_hellings = engine.cfpq_by_hellings(&g, &wcnf, None, None).unwrap();
        let by_matrix = engine.cfpq_by_matrix(&g, &wcnf, None, None).unwrap();
        assert_eq!(by_hellings, by_matrix);
    }

    #[test]
    fn rsm_intersect_rsm_is_unsupported() {
        let engine = QueryEngine::new(EngineConfig::default());
        let grammar = parse_cfg("S -> a").unwrap();
        let rsm = grammar.to_rsm();
        let result = engine.rsm_intersect_rsm(&rsm, &rsm);
        assert!(matches!(result, Err(EngineError::UnsupportedOperation(_))));
    }
}
