// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

//! The repeat resolver and its driver loop.

use crate::coloring::color_occurrences;
use crate::config::ResolverConfig;
use crate::distance::DistanceOracle;
use crate::errors::ResolverError;
use crate::filter::DistanceFilter;
use crate::matching::match_incident_edges;
use crate::occurrence::{EdgeOccurrence, Side};
use condensed_graph::{component_order, id_order, AssemblyGraph, EdgeId, GraphError, VertexId};
use fxhash::FxHashMap;
use log::{debug, info, trace};
use paired_info::{PairedIndex, WEIGHT_EPS};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;

/// How much evidence a split requires.  Modes run in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolveMode {
    /// Colour occurrences by adjacency; every incident edge needs evidence and
    /// vertices next to edges without evidence are skipped.
    Strict = 0,
    /// Pair incoming with outgoing edges directly from matching evidence.
    Matching = 1,
    /// Like `Strict`, but edges without evidence get a color of their own,
    /// vertices next to such edges are resolved, and evidence far from the
    /// expected pair distance is ignored.
    Relaxed = 2,
}

impl ResolveMode {
    /// All modes, strictest first.
    pub const ALL: [ResolveMode; 3] = [
        ResolveMode::Strict,
        ResolveMode::Matching,
        ResolveMode::Relaxed,
    ];
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolveMode::Strict => "strict",
            ResolveMode::Matching => "matching",
            ResolveMode::Relaxed => "relaxed",
        };
        write!(f, "{} ({})", *self as usize, name)
    }
}

/// Counts reported by a resolution run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    /// Number of vertices a resolution was attempted on.
    pub vertices_processed: usize,
    /// Number of vertices split into two or more copies, per mode.
    pub splits_per_mode: Vec<usize>,
    /// Number of sweeps over the graph, per mode.
    pub sweeps_per_mode: Vec<usize>,
}

/// The products of a resolver run.
#[derive(Debug)]
pub struct Resolution<G> {
    /// The rewritten graph.
    pub graph: G,
    /// Paired evidence keyed by edges of the rewritten graph.
    pub index: PairedIndex,
    /// Original edge each edge of the rewritten graph derives from.
    pub edge_labels: BTreeMap<EdgeId, EdgeId>,
    /// Original vertex each vertex of the rewritten graph derives from.
    pub vertex_labels: BTreeMap<VertexId, VertexId>,
}

/// Splits repeat vertices of a working copy of `original` using paired
/// evidence.  Paired observations are keyed by a working edge and point at an
/// original edge.
pub struct RepeatResolver<'a, G: AssemblyGraph> {
    pub(crate) original: &'a G,
    pub(crate) graph: G,
    pub(crate) index: PairedIndex,
    pub(crate) edge_labels: BTreeMap<EdgeId, EdgeId>,
    pub(crate) vertex_labels: BTreeMap<VertexId, VertexId>,
    /// Edges without usable evidence; persists across the whole run.
    pub(crate) global_cheaters: BTreeSet<EdgeId>,
    /// Edges whose evidence was discarded at the current vertex, with the
    /// number of colors they were split into.
    pub(crate) local_cheaters: BTreeMap<EdgeId, usize>,
    pub(crate) oracle: DistanceOracle<'a, G>,
    pub(crate) filter: DistanceFilter,
    pub(crate) config: ResolverConfig,
    pub(crate) mode: ResolveMode,
    pub(crate) rc_mode: bool,
}

impl<'a, G: AssemblyGraph> RepeatResolver<'a, G> {
    /// Copy `original` into a fresh working graph and migrate the paired
    /// evidence, which is keyed by original edges on both sides.
    pub fn new(
        original: &'a G,
        pairs: &PairedIndex,
        config: ResolverConfig,
    ) -> Result<Self, ResolverError> {
        config.validate()?;
        let rc_mode = config.symmetric_resolve;
        if rc_mode && !original.is_conjugate() {
            return Err(GraphError::NotConjugate.into());
        }

        let mut graph = G::empty(original.k(), rc_mode);
        let mut vertex_labels = BTreeMap::new();
        let mut edge_labels = BTreeMap::new();
        let mut new_vertex: FxHashMap<VertexId, VertexId> = FxHashMap::default();
        let mut new_edge: FxHashMap<EdgeId, EdgeId> = FxHashMap::default();

        for v in original.vertices() {
            if new_vertex.contains_key(&v) || original.degree(v) == 0 {
                continue;
            }
            let nv = graph.add_vertex();
            vertex_labels.insert(nv, v);
            new_vertex.insert(v, nv);
            if rc_mode {
                let (cv, cnv) = (original.conjugate_vertex(v)?, graph.conjugate_vertex(nv)?);
                vertex_labels.insert(cnv, cv);
                new_vertex.insert(cv, cnv);
            }
        }
        debug!("copied {} vertices", graph.vertex_count());

        for e in original.edges() {
            if new_edge.contains_key(&e) {
                continue;
            }
            let start = new_vertex[&original.edge_start(e)];
            let end = new_vertex[&original.edge_end(e)];
            let ne = graph.add_edge(start, end, original.sequence(e).clone())?;
            graph.set_coverage(ne, original.coverage(e));
            edge_labels.insert(ne, e);
            new_edge.insert(e, ne);
            if rc_mode {
                let (ce, cne) = (original.conjugate_edge(e)?, graph.conjugate_edge(ne)?);
                edge_labels.insert(cne, ce);
                new_edge.insert(ce, cne);
            }
        }
        debug!("copied {} edges", graph.edge_count());

        let mut index = PairedIndex::new();
        let (mut migrated, mut dropped) = (0usize, 0usize);
        for obs in pairs.iter() {
            match new_edge.get(&obs.first) {
                Some(&first) if original.contains_edge(obs.second) => {
                    index.add_pair_info(obs.with_first(first));
                    migrated += 1;
                }
                _ => {
                    debug!("paired info with deleted edge: {} {}", obs.first, obs.second);
                    dropped += 1;
                }
            }
        }

        let mut global_cheaters = BTreeSet::new();
        let mut zero_paired_length = 0;
        for e in original.edges() {
            let ne = new_edge[&e];
            let has_evidence = index
                .edge_infos(ne)
                .iter()
                .any(|obs| obs.weight > WEIGHT_EPS && obs.distance >= 0);
            if !has_evidence {
                zero_paired_length += original.length(e);
                global_cheaters.insert(ne);
                trace!("global cheater {ne}");
            }
        }
        info!("total length of edges with no paired info: {zero_paired_length}");
        info!("paired info size: {migrated} ({dropped} dropped)");

        let oracle = DistanceOracle::new(original, config.max_distance);
        Ok(RepeatResolver {
            original,
            graph,
            index,
            edge_labels,
            vertex_labels,
            global_cheaters,
            local_cheaters: BTreeMap::new(),
            oracle,
            filter: DistanceFilter::new(&config),
            config,
            mode: ResolveMode::Strict,
            rc_mode,
        })
    }

    /// The working graph.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// The paired index, keyed by working edges.
    pub fn index(&self) -> &PairedIndex {
        &self.index
    }

    /// Original edge of each working edge.
    pub fn edge_labels(&self) -> &BTreeMap<EdgeId, EdgeId> {
        &self.edge_labels
    }

    /// Original vertex of each working vertex.
    pub fn vertex_labels(&self) -> &BTreeMap<VertexId, VertexId> {
        &self.vertex_labels
    }

    /// Working edges currently without usable evidence.
    pub fn global_cheaters(&self) -> &BTreeSet<EdgeId> {
        &self.global_cheaters
    }

    /// Give up the resolver, returning the working graph and its side tables.
    pub fn into_parts(self) -> Resolution<G> {
        Resolution {
            graph: self.graph,
            index: self.index,
            edge_labels: self.edge_labels,
            vertex_labels: self.vertex_labels,
        }
    }

    /// Run every configured mode, sweeping the graph in each until a sweep
    /// splits nothing.
    pub fn resolve_repeats(&mut self) -> Result<ResolveSummary, ResolverError> {
        let started = Instant::now();
        let mut summary = ResolveSummary::default();
        info!("resolving non-primitive repeats");
        for &mode in ResolveMode::ALL.iter().take(self.config.mode) {
            self.mode = mode;
            info!("trying resolve mode {mode}");
            let (mut splits, mut sweeps) = (0, 0);
            loop {
                sweeps += 1;
                let order = if self.rc_mode {
                    component_order(&self.graph, self.config.insert_size as usize)
                } else {
                    id_order(&self.graph)
                };
                info!("got {} vertices, trying to split", order.len());
                let mut changed = false;
                for v in order {
                    if !self.graph.contains_vertex(v) {
                        trace!("{v} already deleted");
                        continue;
                    }
                    if self.graph.incoming_edges(v).len() <= 1
                        && self.graph.outgoing_edges(v).len() <= 1
                    {
                        trace!("{v} does not branch");
                        continue;
                    }
                    if mode != ResolveMode::Relaxed && self.touches_global_cheater(v) {
                        debug!("cheaters are near {v}");
                        continue;
                    }
                    summary.vertices_processed += 1;
                    let occurrences = self.generate_occurrences(v);
                    let copies = match mode {
                        ResolveMode::Strict | ResolveMode::Relaxed => {
                            self.rectangle_resolve(v, &occurrences)?
                        }
                        ResolveMode::Matching => self.matching_resolve(v, &occurrences)?,
                    };
                    debug!("{v} resolved to {copies}");
                    if copies > 1 {
                        changed = true;
                        splits += 1;
                    }
                }
                if !changed {
                    break;
                }
            }
            summary.splits_per_mode.push(splits);
            summary.sweeps_per_mode.push(sweeps);
        }
        info!(
            "{} vertices processed while resolving non-primitive repeats, {} split",
            summary.vertices_processed,
            summary.splits_per_mode.iter().sum::<usize>()
        );
        info!("repeat resolver running time was {} ms", started.elapsed().as_millis());
        Ok(summary)
    }

    fn touches_global_cheater(&self, v: VertexId) -> bool {
        self.graph
            .outgoing_edges(v)
            .into_iter()
            .chain(self.graph.incoming_edges(v))
            .any(|e| self.global_cheaters.contains(&e))
    }

    /// Collect the usable paired evidence of the edges at `v`, placed
    /// relative to `v`.  In the relaxed mode, evidence far from the expected
    /// pair distance is dropped and its edge recorded as a local cheater.
    pub(crate) fn generate_occurrences(&mut self, v: VertexId) -> Vec<EdgeOccurrence> {
        self.local_cheaters.clear();
        let trusted = self.config.trusted_distance();
        let near = self.config.near_vertex as f64;
        let mut occurrences = Vec::new();
        let mut paired_edges = BTreeSet::new();
        let sides = [
            (Side::Outgoing, self.graph.outgoing_edges(v)),
            (Side::Incoming, self.graph.incoming_edges(v)),
        ];
        for (side, edges) in sides {
            for e in edges {
                let len = self.graph.length(e);
                for obs in self.index.edge_infos(e) {
                    if !obs.is_significant() || obs.distance < 0 {
                        continue;
                    }
                    if !self.original.contains_edge(obs.second)
                        || !self.edge_labels.contains_key(&e)
                    {
                        debug!(
                            "dropping paired info {} {} without provenance",
                            obs.first, obs.second
                        );
                        continue;
                    }
                    let paired_len = self.original.length(obs.second);
                    let Some(corrected) = self.filter.correct(obs, len, paired_len) else {
                        continue;
                    };
                    let occ = EdgeOccurrence::new(corrected, side, len);
                    if self.mode == ResolveMode::Relaxed
                        && (((occ.offset + paired_len as i64) as f64) < trusted - near
                            || occ.offset as f64 > trusted + near)
                    {
                        self.local_cheaters.entry(e).or_insert(0);
                        debug!(
                            "ignored paired info between {} and {} at {}",
                            e, obs.second, occ.offset
                        );
                        continue;
                    }
                    paired_edges.insert(occ.paired);
                    occurrences.push(occ);
                }
            }
        }
        occurrences.sort_by_key(|o| (o.edge(), o.paired, o.obs.distance));
        debug!(
            "{} occurrences at {v} pairing with {} edges",
            occurrences.len(),
            paired_edges.len()
        );
        occurrences
    }

    fn rectangle_resolve(
        &mut self,
        v: VertexId,
        occurrences: &[EdgeOccurrence],
    ) -> Result<usize, ResolverError> {
        if self.mode != ResolveMode::Strict && occurrences.is_empty() {
            debug!("can not resolve {v}: no paired info");
            return Ok(1);
        }
        let coloring = color_occurrences(
            occurrences,
            &self.graph,
            &mut self.oracle,
            self.config.max_repeat_length,
        );
        trace!("colors at {v}: {:?}", coloring.colors);
        Ok(self.multi_split(v, occurrences, coloring)?.len())
    }

    fn matching_resolve(
        &mut self,
        v: VertexId,
        occurrences: &[EdgeOccurrence],
    ) -> Result<usize, ResolverError> {
        if occurrences.is_empty() {
            return Ok(1);
        }
        let outgoing = self.graph.outgoing_edges(v);
        let incoming = self.graph.incoming_edges(v);
        match match_incident_edges(occurrences, &outgoing, &incoming) {
            Some(coloring) => Ok(self.multi_split(v, occurrences, coloring)?.len()),
            None => {
                debug!("matching failed at {v}");
                Ok(1)
            }
        }
    }

    /// The edge and, when resolving both strands, its conjugate.
    pub(crate) fn with_conjugate(&self, e: EdgeId) -> Result<Vec<EdgeId>, GraphError> {
        if !self.rc_mode {
            return Ok(vec![e]);
        }
        let ce = self.graph.conjugate_edge(e)?;
        Ok(if ce == e { vec![e] } else { vec![e, ce] })
    }
}
