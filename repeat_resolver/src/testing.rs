// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

// Builders for small graphs and evidence used across the unit tests.

use crate::config::ResolverConfig;
use condensed_graph::{AssemblyGraph, CondensedGraph, EdgeId, VertexId};
use debruijn::dna_string::DnaString;
use paired_info::PairObservation;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

pub(crate) const K: usize = 5;

/// Insert size 300, read length 100 and a coverage cutoff of 6, running the
/// first `mode` resolve modes.
pub(crate) fn resolver_config(mode: usize) -> ResolverConfig {
    ResolverConfig {
        mode,
        ..ResolverConfig::new(300.0, 100.0)
    }
}

pub(crate) fn obs(first: EdgeId, second: EdgeId, distance: i64, weight: f64) -> PairObservation {
    PairObservation::new(first, second, distance, weight, 0.0)
}

pub(crate) struct GraphBuilder {
    g: CondensedGraph,
    rng: Pcg64,
}

impl GraphBuilder {
    pub(crate) fn single() -> Self {
        GraphBuilder {
            g: CondensedGraph::new_single(K),
            rng: Pcg64::seed_from_u64(1),
        }
    }

    pub(crate) fn conjugate() -> Self {
        GraphBuilder {
            g: CondensedGraph::new_conjugate(K),
            rng: Pcg64::seed_from_u64(1),
        }
    }

    pub(crate) fn vertices(&mut self, n: usize) -> Vec<VertexId> {
        (0..n).map(|_| self.g.add_vertex()).collect()
    }

    // Seeded random bases, so that no two edges share a sequence and none is
    // its own reverse complement.
    fn sequence(&mut self, len: usize) -> DnaString {
        let bases: String = (0..len)
            .map(|_| b"ACGT"[self.rng.gen_range(0..4)] as char)
            .collect();
        DnaString::from_dna_string(&bases)
    }

    /// Add an edge of `len` bases beyond the overlap.
    pub(crate) fn edge(
        &mut self,
        start: VertexId,
        end: VertexId,
        len: usize,
        coverage: f64,
    ) -> EdgeId {
        let seq = self.sequence(len + K);
        let e = self.g.add_edge(start, end, seq).unwrap();
        self.g.set_coverage(e, coverage);
        e
    }

    pub(crate) fn build(self) -> CondensedGraph {
        self.g
    }
}
