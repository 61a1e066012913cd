//! condensed_graph
// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.
#![deny(missing_docs)]

// A condensed de Bruijn graph: edges carry sequence and coverage, vertices are
// the (k)-base overlaps between abutting edges.  Edges and vertices live in a
// petgraph `StableDiGraph`: ids stay valid while other elements are removed, and
// the id of a removed element may be handed out again.  Side tables keyed by id
// (provenance, paired information) must drop an id when it is removed.
//
// A graph may be conjugate-typed, in which case every vertex and edge has a
// reverse-complement partner, recorded in an explicit id -> id table, and every
// mutation is applied to both strands.

mod condensed;
mod order;

pub use condensed::CondensedGraph;
pub use order::{component_order, id_order};

use debruijn::dna_string::DnaString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a vertex in a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub u32);

/// Identifier of an edge in a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u32);

impl VertexId {
    /// Return the id as a node index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    /// Return the id as an edge index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Errors raised by graph operations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A conjugate was requested from a graph without reverse-complement duality.
    #[error("conjugate requested on a non-conjugate graph")]
    NotConjugate,

    /// The structural precondition for splitting a vertex failed.
    #[error("split of vertex {vertex} is blocked")]
    SplitBlocked {
        /// The vertex that could not be split.
        vertex: VertexId,
    },

    /// The vertex is not present in the graph.
    #[error("vertex {0} is not in the graph")]
    MissingVertex(VertexId),

    /// The edge is not present in the graph.
    #[error("edge {0} is not in the graph")]
    MissingEdge(EdgeId),

    /// A plain vertex delete was requested on a vertex that still has edges.
    #[error("vertex {vertex} still has {degree} incident edges")]
    VertexNotEmpty {
        /// The vertex that was to be deleted.
        vertex: VertexId,
        /// Its current degree.
        degree: usize,
    },

    /// The split coefficients do not line up with the split edges.
    #[error("{edges} edges were given with {coefficients} split coefficients")]
    LengthMismatch {
        /// Number of edges.
        edges: usize,
        /// Number of coefficients.
        coefficients: usize,
    },

    /// An edge sequence is too short to overlap its neighbours.
    #[error("edge sequence of length {len} does not extend past the overlap k = {k}")]
    ShortSequence {
        /// Sequence length.
        len: usize,
        /// Overlap length.
        k: usize,
    },
}

/// Result of splitting a vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// The newly created vertex.
    pub vertex: VertexId,
    /// For every split edge, the pair (old edge, new edge).
    pub edges: Vec<(EdgeId, EdgeId)>,
}

/// Everything removed by a forced vertex delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removed {
    /// Removed vertices, including conjugates.
    pub vertices: Vec<VertexId>,
    /// Removed edges, including conjugates.
    pub edges: Vec<EdgeId>,
}

/// The graph contract consumed by repeat resolution.
///
/// Accessors taking an id panic if the id is not live, as indexing a petgraph
/// graph does; mutations return a `GraphError` instead.
pub trait AssemblyGraph {
    /// Create an empty graph with overlap `k`, conjugate-typed or not.
    fn empty(k: usize, conjugate: bool) -> Self
    where
        Self: Sized;

    /// Return the overlap length between abutting edges.
    fn k(&self) -> usize;

    /// Return true if the graph maintains reverse-complement duality.
    fn is_conjugate(&self) -> bool;

    /// Add a vertex (and its conjugate, if conjugate-typed).
    fn add_vertex(&mut self) -> VertexId;

    /// Add an edge spelling `seq` (and its conjugate, if conjugate-typed).
    fn add_edge(
        &mut self,
        start: VertexId,
        end: VertexId,
        seq: DnaString,
    ) -> Result<EdgeId, GraphError>;

    /// Delete an edge and its conjugate.  Return the removed edge ids.
    fn delete_edge(&mut self, e: EdgeId) -> Result<Vec<EdgeId>, GraphError>;

    /// Delete an isolated vertex and its conjugate.  Return the removed vertex ids.
    fn delete_vertex(&mut self, v: VertexId) -> Result<Vec<VertexId>, GraphError>;

    /// Delete a vertex and its conjugate together with all their incident edges.
    fn force_delete_vertex(&mut self, v: VertexId) -> Result<Removed, GraphError>;

    /// Return all live vertices in ascending id order.
    fn vertices(&self) -> Vec<VertexId>;

    /// Return all live edges in ascending id order.
    fn edges(&self) -> Vec<EdgeId>;

    /// Return true if the vertex is live.
    fn contains_vertex(&self, v: VertexId) -> bool;

    /// Return true if the edge is live.
    fn contains_edge(&self, e: EdgeId) -> bool;

    /// Return the number of live vertices.
    fn vertex_count(&self) -> usize;

    /// Return the number of live edges.
    fn edge_count(&self) -> usize;

    /// Return the edges exiting a vertex.
    fn outgoing_edges(&self, v: VertexId) -> Vec<EdgeId>;

    /// Return the edges entering a vertex.
    fn incoming_edges(&self, v: VertexId) -> Vec<EdgeId>;

    /// Return the number of edges entering or exiting a vertex.
    fn degree(&self, v: VertexId) -> usize {
        self.outgoing_edges(v).len() + self.incoming_edges(v).len()
    }

    /// Return the source of an edge.
    fn edge_start(&self, e: EdgeId) -> VertexId;

    /// Return the target of an edge.
    fn edge_end(&self, e: EdgeId) -> VertexId;

    /// Return the length of an edge, in bases beyond the overlap.
    fn length(&self, e: EdgeId) -> usize;

    /// Return the sequence of an edge.
    fn sequence(&self, e: EdgeId) -> &DnaString;

    /// Return the coverage of an edge.
    fn coverage(&self, e: EdgeId) -> f64;

    /// Set the coverage of an edge and of its conjugate.
    fn set_coverage(&mut self, e: EdgeId, coverage: f64);

    /// Return the reverse-complement partner of a vertex.
    fn conjugate_vertex(&self, v: VertexId) -> Result<VertexId, GraphError>;

    /// Return the reverse-complement partner of an edge.
    fn conjugate_edge(&self, e: EdgeId) -> Result<EdgeId, GraphError>;

    /// Return true if `edges` may be moved off `v` onto a new vertex.
    fn split_condition(&self, v: VertexId, edges: &[EdgeId]) -> bool;

    /// Move copies of `edges` off `v` onto a new vertex.  The copy of edge i
    /// keeps the endpoint not equal to `v` and gets coverage scaled by
    /// `coefficients[i]`.  The old edges are left in place.
    fn split_vertex(
        &mut self,
        v: VertexId,
        edges: &[EdgeId],
        coefficients: &[f64],
    ) -> Result<Split, GraphError>;
}
