//! `pathql`: a path-based query engine over labeled directed graphs.
//!
//! Two query families share one substrate — a sparse boolean adjacency
//! matrix per edge symbol, assembled into a [`decomposition::Decomp`]:
//!
//! - **Regular path queries** ([`rpq`]): the query is a regular
//!   expression, compiled to an [`automaton::Nfa`]. [`rpq::tensor_rpq`]
//!   closes the graph-query product once; [`rpq::bfs_rpq`] advances a front
//!   vector instead of materializing the product.
//! - **Context-free path queries** ([`cfpq`]): the query is a context-free
//!   grammar, either normalized to [`cfpq::Wcnf`] for the two saturation
//!   engines ([`cfpq::cfpq_by_hellings`], [`cfpq::cfpq_by_matrix`]) or kept
//!   as an [`automaton::Rsm`] for [`cfpq::cfpq_by_tensor`].
//!
//! [`query::QueryEngine`] is the façade that ties configuration, input
//! validation, and telemetry together over all five engines; [`adapters`]
//! turns regex/CFG/DOT source text into the `Nfa`/`Rsm`/`LabeledGraph`
//! values those engines consume.

pub mod adapters;
pub mod automaton;
pub mod cfpq;
pub mod config;
pub mod decomposition;
pub mod error;
pub mod graph;
pub mod matrix;
pub mod query;
pub mod rpq;
pub mod statistics;
pub mod value;

pub use automaton::{Label, Nfa, NfaState, Rsm};
pub use cfpq::{CfpqTriples, Wcnf};
pub use config::EngineConfig;
pub use decomposition::Decomp;
pub use error::{EngineError, EngineResult};
pub use graph::{Edge, LabeledGraph};
pub use matrix::SparseBoolMatrix;
pub use query::{QueryEngine, ResultSet};
pub use value::{Meta, ResultItem, VertexId};
