//! paired_info
// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.
#![deny(missing_docs)]

// Sparse store of paired-read distance evidence.  An observation is keyed by
// its first edge, which lives in the graph being rewritten; the second edge
// always names an edge of the original graph.

use condensed_graph::EdgeId;
use fxhash::FxHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Weights below this are treated as absent evidence.
pub const WEIGHT_EPS: f64 = 1e-8;

/// A claim that an occurrence of `first` is followed, `distance` bases
/// downstream (start to start), by an occurrence of `second`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairObservation {
    /// Edge of the working graph.
    pub first: EdgeId,
    /// Edge of the original graph.
    pub second: EdgeId,
    /// Signed distance in bases.
    pub distance: i64,
    /// Non-negative evidence mass.
    pub weight: f64,
    /// Spread of the distance estimate.
    pub variance: f64,
}

impl PairObservation {
    /// Create an observation.
    pub fn new(first: EdgeId, second: EdgeId, distance: i64, weight: f64, variance: f64) -> Self {
        PairObservation {
            first,
            second,
            distance,
            weight,
            variance,
        }
    }

    /// Return true if the observation carries usable weight.
    pub fn is_significant(&self) -> bool {
        self.weight >= WEIGHT_EPS
    }

    /// Return a copy keyed by a different first edge.
    pub fn with_first(&self, first: EdgeId) -> Self {
        PairObservation { first, ..*self }
    }

    fn same_pair(&self, other: &PairObservation) -> bool {
        self.first == other.first && self.second == other.second && self.distance == other.distance
    }
}

/// Paired-distance index keyed by first edge.
#[derive(Clone, Debug, Default)]
pub struct PairedIndex {
    infos: FxHashMap<EdgeId, Vec<PairObservation>>,
}

impl PairedIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        PairedIndex::default()
    }

    /// Return every observation whose first edge is `e`.
    pub fn edge_infos(&self, e: EdgeId) -> &[PairObservation] {
        self.infos.get(&e).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Insert an observation.  An observation with the same first edge,
    /// second edge and distance as a stored one is merged into it: weights
    /// add and the larger variance is kept.
    pub fn add_pair_info(&mut self, obs: PairObservation) {
        let list = self.infos.entry(obs.first).or_default();
        match list.iter_mut().find(|x| x.same_pair(&obs)) {
            Some(x) => {
                x.weight += obs.weight;
                x.variance = x.variance.max(obs.variance);
            }
            None => list.push(obs),
        }
    }

    /// Drop every observation keyed by `e` and return what was dropped.
    pub fn delete_edge_info(&mut self, e: EdgeId) -> Vec<PairObservation> {
        self.infos.remove(&e).unwrap_or_default()
    }

    /// Move an observation under a new first edge.  If `obs` is no longer
    /// stored under its old key it is simply added under the new one.
    pub fn replace_first_edge(&mut self, obs: &PairObservation, new_first: EdgeId) {
        if let Some(list) = self.infos.get_mut(&obs.first) {
            if let Some(pos) = list.iter().position(|x| x.same_pair(obs)) {
                list.remove(pos);
            }
            if list.is_empty() {
                self.infos.remove(&obs.first);
            }
        }
        self.add_pair_info(obs.with_first(new_first));
    }

    /// Return the number of stored observations.
    pub fn len(&self) -> usize {
        self.infos.values().map(Vec::len).sum()
    }

    /// Return true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.infos.values().all(Vec::is_empty)
    }

    /// Return the first edges that have observations, in id order.
    pub fn first_edges(&self) -> Vec<EdgeId> {
        self.infos
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(&e, _)| e)
            .sorted()
            .collect()
    }

    /// Iterate over all observations, grouped by first edge in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PairObservation> + '_ {
        self.first_edges()
            .into_iter()
            .flat_map(move |e| self.edge_infos(e).iter())
    }
}

impl FromIterator<PairObservation> for PairedIndex {
    fn from_iter<I: IntoIterator<Item = PairObservation>>(iter: I) -> Self {
        let mut index = PairedIndex::new();
        for obs in iter {
            index.add_pair_info(obs);
        }
        index
    }
}
