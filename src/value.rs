//! Vertex identity and the tagged result-element type.
//!
//! A [`LabeledGraph`](crate::graph::LabeledGraph) is monomorphic in its vertex
//! kind, but the query facade's result sets must stay able to tell a set of
//! bare vertices apart from a set of vertex pairs at runtime (an external
//! scripting layer built on this crate pattern-matches on that distinction).
//! [`VertexId`] is the small sum type standing in for "integer or string
//! identity"; [`Meta`] is the tag carried alongside a [`ResultItem`] so a
//! `Set<Set<Int>>`-shaped result is distinguishable from a `Set<Pair<Int,Int>>`
//! one without downcasting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque vertex identity: either an integer or an interned string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VertexId {
    Int(i64),
    Str(Arc<str>),
}

impl VertexId {
    #[must_use]
    pub fn int(v: i64) -> Self {
        VertexId::Int(v)
    }

    #[must_use]
    pub fn str(v: impl Into<Arc<str>>) -> Self {
        VertexId::Str(v.into())
    }

    /// The `Meta` tag of this vertex's kind, used to reject graphs or sets
    /// that mix vertex kinds.
    #[must_use]
    pub fn meta(&self) -> Meta {
        match self {
            VertexId::Int(_) => Meta::Int,
            VertexId::Str(_) => Meta::Str,
        }
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexId::Int(v) => write!(f, "{v}"),
            VertexId::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for VertexId {
    fn from(v: i64) -> Self {
        VertexId::Int(v)
    }
}

impl From<i32> for VertexId {
    fn from(v: i32) -> Self {
        VertexId::Int(i64::from(v))
    }
}

impl From<&str> for VertexId {
    fn from(v: &str) -> Self {
        VertexId::Str(Arc::from(v))
    }
}

impl From<String> for VertexId {
    fn from(v: String) -> Self {
        VertexId::Str(Arc::from(v.as_str()))
    }
}

/// Runtime type tag for a [`ResultItem`], mirroring the source system's `Meta`
/// hierarchy: lets a caller (or an external interpreter layered on this
/// crate) distinguish `Set<Int>` from `Set<Pair<Int, Int>>` without
/// downcasting through `dyn Any`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Meta {
    Int,
    Str,
    Pair(Box<Meta>, Box<Meta>),
    Edge(Box<Meta>),
    Set(Box<Meta>),
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Meta::Int => write!(f, "Int"),
            Meta::Str => write!(f, "Str"),
            Meta::Pair(a, b) => write!(f, "Pair<{a}, {b}>"),
            Meta::Edge(v) => write!(f, "Edge<{v}>"),
            Meta::Set(v) => write!(f, "Set<{v}>"),
        }
    }
}

/// A single element of a [`ResultSet`](crate::query::ResultSet): either a bare
/// vertex (BFS common mode) or a vertex pair (tensor/BFS-separated/CFPQ
/// results).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultItem {
    Vertex(VertexId),
    Pair(VertexId, VertexId),
}

impl ResultItem {
    #[must_use]
    pub fn meta(&self) -> Meta {
        match self {
            ResultItem::Vertex(v) => v.meta(),
            ResultItem::Pair(a, b) => Meta::Pair(Box::new(a.meta()), Box::new(b.meta())),
        }
    }
}
