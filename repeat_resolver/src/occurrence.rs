// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

//! Paired evidence as seen from one vertex.

use condensed_graph::EdgeId;
use paired_info::PairObservation;

/// Which side of the vertex being resolved an edge lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The edge leaves the vertex.
    Outgoing,
    /// The edge enters the vertex.
    Incoming,
}

/// One paired observation of an edge incident to the vertex being resolved,
/// placed relative to that vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeOccurrence {
    /// The observation, keyed by the incident working edge.
    pub obs: PairObservation,
    /// Side of the vertex the working edge lies on.
    pub side: Side,
    /// Original-graph edge the observation pairs with.
    pub paired: EdgeId,
    /// Position of the paired edge relative to the vertex.  For an incoming
    /// edge the distance is measured from the edge start, so its length is
    /// subtracted.
    pub offset: i64,
}

impl EdgeOccurrence {
    /// Place an observation of an edge with the given length at the vertex.
    pub fn new(obs: PairObservation, side: Side, edge_len: usize) -> Self {
        let offset = match side {
            Side::Outgoing => obs.distance,
            Side::Incoming => obs.distance - edge_len as i64,
        };
        EdgeOccurrence {
            obs,
            side,
            paired: obs.second,
            offset,
        }
    }

    /// The incident working edge.
    pub fn edge(&self) -> EdgeId {
        self.obs.first
    }
}
