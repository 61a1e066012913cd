// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use crate::coloring::Coloring;
use crate::errors::ResolverError;
use crate::occurrence::EdgeOccurrence;
use crate::resolver::{RepeatResolver, ResolveMode};
use condensed_graph::{AssemblyGraph, EdgeId, VertexId};
use itertools::Itertools;
use log::{debug, trace, warn};
use paired_info::PairObservation;
use std::collections::BTreeMap;

impl<'a, G: AssemblyGraph> RepeatResolver<'a, G> {
    /// Split `v` into one copy per color.  Each incident edge gets a copy on
    /// every color that carries its evidence, with coverage proportional to
    /// the evidence weight in that color.  Copies below the coverage cutoff
    /// are dropped.  On success `v` is deleted and the new vertices are
    /// returned; otherwise the graph is untouched and `[v]` is returned.
    pub(crate) fn multi_split(
        &mut self,
        v: VertexId,
        occurrences: &[EdgeOccurrence],
        coloring: Coloring,
    ) -> Result<Vec<VertexId>, ResolverError> {
        let outgoing = self.graph.outgoing_edges(v);
        let incoming = self.graph.incoming_edges(v);
        if !(self.graph.split_condition(v, &outgoing) && self.graph.split_condition(v, &incoming)) {
            debug!("splitting {v} blocked by its edges");
            return Ok(vec![v]);
        }
        let incident: Vec<EdgeId> = outgoing
            .iter()
            .chain(&incoming)
            .copied()
            .sorted()
            .dedup()
            .collect();

        let mut counts: BTreeMap<EdgeId, usize> = incident.iter().map(|&e| (e, 0)).collect();
        for occ in occurrences {
            *counts.entry(occ.edge()).or_default() += 1;
        }
        let Coloring {
            colors,
            mut n_colors,
        } = coloring;
        if n_colors <= 1 {
            debug!("nothing to split at {v}");
            return Ok(vec![v]);
        }
        let mut colored: Vec<(PairObservation, usize)> =
            occurrences.iter().zip(colors).map(|(o, c)| (o.obs, c)).collect();

        // Edges without any colored evidence.
        let mut synthetic: Vec<(EdgeId, usize)> = Vec::new();
        let mut nonpaired = 0;
        for (&e, _) in counts.iter().filter(|&(_, &n)| n == 0) {
            nonpaired += 1;
            if self.mode != ResolveMode::Relaxed {
                debug!("edge {e} without paired info blocks splitting {v}");
                return Ok(vec![v]);
            }
            let evidence: Vec<PairObservation> = self
                .index
                .edge_infos(e)
                .iter()
                .filter(|o| o.is_significant())
                .copied()
                .collect();
            if evidence.is_empty() {
                synthetic.push((e, n_colors));
            } else {
                colored.extend(evidence.into_iter().map(|o| (o, n_colors)));
            }
            n_colors += 1;
        }
        if nonpaired > 0 {
            warn!("added {nonpaired} non-paired edges at {v}");
        }
        debug!("splitting {v} into {n_colors} parts");

        // An edge seen once carries all of its evidence into that color; an
        // edge seen several times keeps only what was colored.
        for (&e, &n) in &counts {
            if n > 1 {
                self.index.delete_edge_info(e);
            } else if n == 1 {
                let edge_colors: Vec<usize> = colored
                    .iter()
                    .filter(|(o, _)| o.first == e)
                    .map(|&(_, c)| c)
                    .unique()
                    .collect();
                if edge_colors.len() > 1 {
                    warn!("different colors found for one colored edge {e}");
                }
                if let Some(&color) = edge_colors.first() {
                    colored.retain(|(o, c)| !(o.first == e && *c == color));
                    let stored = self.index.delete_edge_info(e);
                    colored.extend(stored.into_iter().map(|o| (o, color)));
                }
            }
        }

        let mut total: BTreeMap<EdgeId, f64> = BTreeMap::new();
        let mut per_color: Vec<BTreeMap<EdgeId, f64>> = vec![BTreeMap::new(); n_colors];
        for (o, c) in &colored {
            *total.entry(o.first).or_default() += o.weight;
            *per_color[*c].entry(o.first).or_default() += o.weight;
        }
        for &(e, c) in &synthetic {
            total.insert(e, 1.0);
            per_color[c].insert(e, 1.0);
        }

        let cutting_coverage = self.config.cutting_coverage();
        let mut copies: BTreeMap<EdgeId, usize> = BTreeMap::new();
        let mut live: Vec<(EdgeId, EdgeId)> = Vec::new();
        let mut new_vertices = Vec::new();
        let mut low_coverage = 0;
        for (color, weights) in per_color.iter().enumerate() {
            let mut split_edges = Vec::new();
            let mut coefficients = Vec::new();
            for (&e, &w) in weights {
                if w == 0.0 {
                    trace!("zero covered pair info on {e}");
                    continue;
                }
                if let Some(n) = self.local_cheaters.get_mut(&e) {
                    *n += 1;
                }
                split_edges.push(e);
                coefficients.push(w / total[&e]);
            }
            if split_edges.is_empty() || !self.graph.split_condition(v, &split_edges) {
                continue;
            }
            let split = self.graph.split_vertex(v, &split_edges, &coefficients)?;
            new_vertices.push(split.vertex);
            self.label_vertex(split.vertex, v)?;
            for &(old, new) in &split.edges {
                *copies.entry(old).or_default() += 1;
                self.label_edge(new, old)?;
                if self.mode != ResolveMode::Strict
                    && self.local_cheaters.get(&old).map_or(false, |&n| n > 0)
                {
                    self.global_cheaters.insert(new);
                }
            }

            let renamed: BTreeMap<EdgeId, EdgeId> = split.edges.iter().copied().collect();
            for (o, c) in &colored {
                if *c != color {
                    continue;
                }
                if let Some(&new) = renamed.get(&o.first) {
                    self.index.replace_first_edge(o, new);
                }
            }

            for &(old, new) in &split.edges {
                if self.graph.coverage(new) < cutting_coverage {
                    debug!("deleting just created copy of {old} because of low coverage");
                    if let Some(n) = copies.get_mut(&old) {
                        *n -= 1;
                    }
                    low_coverage += 1;
                    self.delete_edge_with_cleanup(new)?;
                } else {
                    live.push((old, new));
                }
            }
        }
        let not_found = incident
            .iter()
            .filter(|e| copies.get(e).copied().unwrap_or(0) == 0)
            .count();
        if not_found > 0 {
            warn!("for {not_found} edges at {v}, no copies were found");
        }
        if low_coverage > 0 {
            warn!("deleted {low_coverage} just-created edges at {v} due to low coverage");
        }

        for &(proto, new) in &live {
            let n = copies.get(&proto).copied().unwrap_or(0);
            if n > 1 || (n == 1 && self.global_cheaters.contains(&proto)) {
                for e in self.with_conjugate(new)? {
                    self.global_cheaters.insert(e);
                }
            }
            if n == 1 && self.rc_mode {
                let conj_proto = self.graph.conjugate_edge(proto)?;
                let conj_new = self.graph.conjugate_edge(new)?;
                if conj_new != new {
                    for o in self.index.edge_infos(conj_proto).to_vec() {
                        self.index.replace_first_edge(&o, conj_new);
                    }
                }
            }
        }

        for &e in &incident {
            for x in self.with_conjugate(e)? {
                self.index.delete_edge_info(x);
                self.global_cheaters.remove(&x);
            }
        }
        let removed = self.graph.force_delete_vertex(v)?;
        for e in &removed.edges {
            self.edge_labels.remove(e);
        }
        for u in &removed.vertices {
            self.vertex_labels.remove(u);
        }
        trace!("{v} deleted, {} copies", new_vertices.len());
        Ok(new_vertices)
    }

    // Give `new` the provenance of `proto`, on both strands.
    fn label_edge(&mut self, new: EdgeId, proto: EdgeId) -> Result<(), ResolverError> {
        let origin = self.edge_labels[&proto];
        self.edge_labels.insert(new, origin);
        if self.rc_mode {
            let conj_origin = self.edge_labels[&self.graph.conjugate_edge(proto)?];
            self.edge_labels.insert(self.graph.conjugate_edge(new)?, conj_origin);
        }
        Ok(())
    }

    fn label_vertex(&mut self, new: VertexId, proto: VertexId) -> Result<(), ResolverError> {
        let origin = self.vertex_labels[&proto];
        self.vertex_labels.insert(new, origin);
        if self.rc_mode {
            let conj_origin = self.vertex_labels[&self.graph.conjugate_vertex(proto)?];
            self.vertex_labels.insert(self.graph.conjugate_vertex(new)?, conj_origin);
        }
        Ok(())
    }

    /// Delete an edge with its evidence and cheater status, then any endpoint
    /// left without edges.
    pub(crate) fn delete_edge_with_cleanup(&mut self, e: EdgeId) -> Result<(), ResolverError> {
        for x in self.with_conjugate(e)? {
            self.index.delete_edge_info(x);
            self.global_cheaters.remove(&x);
        }
        let (start, end) = (self.graph.edge_start(e), self.graph.edge_end(e));
        for x in self.graph.delete_edge(e)? {
            self.edge_labels.remove(&x);
        }
        for u in [start, end] {
            if self.graph.contains_vertex(u) && self.graph.degree(u) == 0 {
                for x in self.graph.delete_vertex(u)? {
                    self.vertex_labels.remove(&x);
                }
                trace!("vertex {u} removed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{obs, resolver_config, GraphBuilder};
    use paired_info::PairedIndex;
    use pretty_assertions::assert_eq;

    // c0 -C-> v -A-> a1, v -O-> o1, where O has no evidence at all.
    fn orphan_graph() -> (condensed_graph::CondensedGraph, [EdgeId; 3], VertexId) {
        let mut b = GraphBuilder::single();
        let n = b.vertices(4);
        let c = b.edge(n[0], n[1], 200, 50.0);
        let a = b.edge(n[1], n[2], 200, 50.0);
        let o = b.edge(n[1], n[3], 200, 50.0);
        (b.build(), [c, a, o], n[1])
    }

    fn two_colors(
        v: VertexId,
        r: &mut RepeatResolver<'_, condensed_graph::CondensedGraph>,
    ) -> Vec<VertexId> {
        let occurrences = r.generate_occurrences(v);
        let n = occurrences.len();
        let coloring = Coloring {
            colors: (0..n).map(|i| i % 2).collect(),
            n_colors: 2,
        };
        r.multi_split(v, &occurrences, coloring).unwrap()
    }

    #[test]
    fn test_orphan_blocks_strict_split() {
        let (g, [c, a, _], v) = orphan_graph();
        let pairs: PairedIndex = vec![obs(c, a, 200, 1.0), obs(a, a, 0, 1.0)].into_iter().collect();
        let mut r = RepeatResolver::new(&g, &pairs, resolver_config(3)).unwrap();
        assert_eq!(two_colors(v, &mut r), vec![v]);
        assert_eq!(r.graph().edge_count(), 3);
        assert_eq!(r.index().len(), 2);
    }

    #[test]
    fn test_orphan_gets_own_color_when_relaxed() {
        let (g, [c, a, o], v) = orphan_graph();
        let pairs: PairedIndex = vec![obs(c, a, 200, 1.0), obs(a, a, 0, 1.0)].into_iter().collect();
        let mut r = RepeatResolver::new(&g, &pairs, resolver_config(3)).unwrap();
        r.mode = ResolveMode::Relaxed;
        let new = two_colors(v, &mut r);
        assert_eq!(new.len(), 3);
        assert!(!r.graph().contains_vertex(v));

        // The orphan keeps a single copy at full coverage, and stays a cheater.
        let copies: Vec<EdgeId> = r
            .graph()
            .edges()
            .into_iter()
            .filter(|e| r.edge_labels()[e] == o)
            .collect();
        assert_eq!(copies.len(), 1);
        assert_eq!(r.graph().coverage(copies[0]), 50.0);
        assert!(r.global_cheaters().contains(&copies[0]));
    }

    #[test]
    fn test_single_color_is_noop() {
        let (g, [c, a, o], v) = orphan_graph();
        let pairs: PairedIndex = vec![obs(c, a, 200, 1.0), obs(a, a, 0, 1.0), obs(o, o, 0, 1.0)]
            .into_iter()
            .collect();
        let mut r = RepeatResolver::new(&g, &pairs, resolver_config(3)).unwrap();
        let occurrences = r.generate_occurrences(v);
        let coloring = Coloring {
            colors: vec![0; occurrences.len()],
            n_colors: 1,
        };
        assert_eq!(r.multi_split(v, &occurrences, coloring).unwrap(), vec![v]);
        assert_eq!(r.index().len(), 3);
    }
}
