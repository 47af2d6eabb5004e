//! External surface adapters: concrete (if minimal) parsers and writers for
//! the regex, CFG, and DOT dialects named in the engine's external
//! interfaces. Every RPQ/CFPQ engine operates on `Nfa`/`Rsm`/`LabeledGraph`
//! values; these modules are how a caller gets one of those from text.

pub mod cfg;
pub mod dot;
pub mod regex_compiler;

pub use cfg::{parse_cfg, Grammar, Symbol};
pub use dot::{read_graph_dot, read_rsm_dot, write_graph_dot, write_rsm_dot};
pub use regex_compiler::compile_regex;
