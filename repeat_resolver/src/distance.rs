// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use condensed_graph::{AssemblyGraph, VertexId};
use fxhash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Distance reported for vertices the bounded search does not reach.
pub(crate) const UNREACHED: i64 = 1_000_000_000;

/// Memoized bounded shortest-path distances over an immutable graph.  One
/// search per source vertex; every vertex within `max_depth` bases of the
/// source is cached, including the source itself at distance 0.
pub(crate) struct DistanceOracle<'a, G> {
    graph: &'a G,
    max_depth: usize,
    cache: FxHashMap<VertexId, FxHashMap<VertexId, usize>>,
}

impl<'a, G: AssemblyGraph> DistanceOracle<'a, G> {
    pub(crate) fn new(graph: &'a G, max_depth: usize) -> Self {
        DistanceOracle {
            graph,
            max_depth,
            cache: FxHashMap::default(),
        }
    }

    /// The graph distances are measured in.
    pub(crate) fn graph(&self) -> &'a G {
        self.graph
    }

    /// Length of the shortest path from `from` to `to`, summing edge lengths,
    /// or `UNREACHED` if it exceeds the depth bound.
    pub(crate) fn distance(&mut self, from: VertexId, to: VertexId) -> i64 {
        let (graph, max_depth) = (self.graph, self.max_depth);
        let dists = self
            .cache
            .entry(from)
            .or_insert_with(|| bounded_dijkstra(graph, from, max_depth));
        dists.get(&to).map_or(UNREACHED, |&d| d as i64)
    }

    #[cfg(test)]
    pub(crate) fn cached_sources(&self) -> usize {
        self.cache.len()
    }
}

fn bounded_dijkstra<G: AssemblyGraph>(
    graph: &G,
    source: VertexId,
    max_depth: usize,
) -> FxHashMap<VertexId, usize> {
    let mut dist: FxHashMap<VertexId, usize> = FxHashMap::default();
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0usize, source)));
    while let Some(Reverse((d, v))) = heap.pop() {
        if dist.contains_key(&v) {
            continue;
        }
        dist.insert(v, d);
        for e in graph.outgoing_edges(v) {
            let next = d + graph.length(e);
            let w = graph.edge_end(e);
            if next <= max_depth && !dist.contains_key(&w) {
                heap.push(Reverse((next, w)));
            }
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GraphBuilder;

    #[test]
    fn test_bounded_distances() {
        // 0 -100-> 1 -100-> 2 -900-> 3, plus a shortcut 0 -150-> 2
        let mut b = GraphBuilder::single();
        let v = b.vertices(4);
        b.edge(v[0], v[1], 100, 1.0);
        b.edge(v[1], v[2], 100, 1.0);
        b.edge(v[2], v[3], 900, 1.0);
        b.edge(v[0], v[2], 150, 1.0);
        let g = b.build();
        let mut oracle = DistanceOracle::new(&g, 1000);
        assert_eq!(oracle.distance(v[0], v[0]), 0);
        assert_eq!(oracle.distance(v[0], v[2]), 150);
        assert_eq!(oracle.distance(v[0], v[3]), UNREACHED);
        assert_eq!(oracle.distance(v[1], v[3]), 1000);
        assert_eq!(oracle.distance(v[3], v[0]), UNREACHED);
        assert_eq!(oracle.cached_sources(), 3);
        assert_eq!(oracle.distance(v[0], v[1]), 100);
        assert_eq!(oracle.cached_sources(), 3);
    }
}
