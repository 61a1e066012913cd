// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

//! JSON snapshots of an assembly graph with its paired evidence, as read and
//! written by the `resolve_repeats` binary.
//!
//! Input vertices and edges are referred to by their position in the
//! snapshot.  In a conjugate snapshot every listed vertex and edge also has a
//! reverse-complement partner, referred to by the same position with `rc`
//! set.

use crate::resolver::{Resolution, ResolveSummary};
use anyhow::{bail, Context, Result};
use condensed_graph::{AssemblyGraph, CondensedGraph, EdgeId, VertexId};
use debruijn::dna_string::DnaString;
use paired_info::{PairObservation, PairedIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A vertex or edge of the input snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotRef {
    /// Position in the snapshot's vertex or edge list.
    pub index: usize,
    /// Refers to the reverse-complement partner.
    pub rc: bool,
}

/// An edge of the input snapshot.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeRecord {
    /// Position of the start vertex.
    pub start: usize,
    /// The edge starts at the partner of `start`.
    #[serde(default)]
    pub start_rc: bool,
    /// Position of the end vertex.
    pub end: usize,
    /// The edge ends at the partner of `end`.
    #[serde(default)]
    pub end_rc: bool,
    /// Bases spelled by the edge, including both overlaps.
    pub seq: String,
    /// Mean k-mer coverage, shared with the reverse complement.
    pub coverage: f64,
}

/// A paired observation of the input snapshot.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PairRecord {
    /// Position of the edge the observation is keyed by.
    pub first: usize,
    /// Refers to the partner of `first`.
    #[serde(default)]
    pub first_rc: bool,
    /// Position of the paired edge.
    pub second: usize,
    /// Refers to the partner of `second`.
    #[serde(default)]
    pub second_rc: bool,
    /// Distance from the start of `first` to the start of `second`.
    pub distance: i64,
    /// Number of supporting read pairs.
    pub weight: f64,
    /// Spread of the distance estimate.
    #[serde(default)]
    pub variance: f64,
}

/// An assembly graph with paired evidence, as stored on disk.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSnapshot {
    /// Overlap between abutting edges.
    pub k: usize,
    /// Keep both strands.
    #[serde(default)]
    pub conjugate: bool,
    /// Number of vertices (or vertex pairs, if conjugate).
    pub vertices: usize,
    /// Edges, each with its sequence and coverage.
    pub edges: Vec<EdgeRecord>,
    /// Paired observations between snapshot edges.
    #[serde(default)]
    pub pairs: Vec<PairRecord>,
}

/// A snapshot loaded into a graph and a paired index.
#[derive(Debug)]
pub struct LoadedSnapshot {
    /// The graph, with both strands if the snapshot is conjugate.
    pub graph: CondensedGraph,
    /// Paired observations keyed by graph edges.
    pub index: PairedIndex,
    /// Snapshot position of every graph vertex.
    pub vertex_refs: BTreeMap<VertexId, SnapshotRef>,
    /// Snapshot position of every graph edge.
    pub edge_refs: BTreeMap<EdgeId, SnapshotRef>,
}

impl GraphSnapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("parsing graph snapshot")
    }

    /// Read and parse a JSON snapshot file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| path.display().to_string())?;
        GraphSnapshot::from_json_str(&s).with_context(|| path.display().to_string())
    }

    /// Build the graph and the paired index.
    pub fn load(&self) -> Result<LoadedSnapshot> {
        let mut graph = CondensedGraph::empty(self.k, self.conjugate);
        let mut vertex_refs = BTreeMap::new();
        let mut vertices = Vec::with_capacity(self.vertices);
        for index in 0..self.vertices {
            let v = graph.add_vertex();
            vertex_refs.insert(v, SnapshotRef { index, rc: false });
            if self.conjugate {
                vertex_refs.insert(graph.conjugate_vertex(v)?, SnapshotRef { index, rc: true });
            }
            vertices.push(v);
        }
        let vertex = |graph: &CondensedGraph, index: usize, rc: bool| -> Result<VertexId> {
            let Some(&v) = vertices.get(index) else {
                bail!("vertex {index} out of range, snapshot has {}", vertices.len());
            };
            self.strand(rc, "vertex")?;
            Ok(if rc { graph.conjugate_vertex(v)? } else { v })
        };

        let mut edge_refs = BTreeMap::new();
        let mut edges = Vec::with_capacity(self.edges.len());
        for (index, rec) in self.edges.iter().enumerate() {
            if let Some(c) = rec.seq.chars().find(|c| !"ACGT".contains(*c)) {
                bail!("edge {index}: invalid base {c:?}");
            }
            let start = vertex(&graph, rec.start, rec.start_rc)?;
            let end = vertex(&graph, rec.end, rec.end_rc)?;
            let e = graph
                .add_edge(start, end, DnaString::from_dna_string(&rec.seq))
                .with_context(|| format!("edge {index}"))?;
            graph.set_coverage(e, rec.coverage);
            edge_refs.insert(e, SnapshotRef { index, rc: false });
            if self.conjugate {
                let ce = graph.conjugate_edge(e)?;
                if ce != e {
                    edge_refs.insert(ce, SnapshotRef { index, rc: true });
                }
            }
            edges.push(e);
        }
        let edge = |graph: &CondensedGraph, index: usize, rc: bool| -> Result<EdgeId> {
            let Some(&e) = edges.get(index) else {
                bail!("edge {index} out of range, snapshot has {}", edges.len());
            };
            self.strand(rc, "edge")?;
            Ok(if rc { graph.conjugate_edge(e)? } else { e })
        };

        let mut index = PairedIndex::new();
        for rec in &self.pairs {
            index.add_pair_info(PairObservation::new(
                edge(&graph, rec.first, rec.first_rc)?,
                edge(&graph, rec.second, rec.second_rc)?,
                rec.distance,
                rec.weight,
                rec.variance,
            ));
        }
        Ok(LoadedSnapshot {
            graph,
            index,
            vertex_refs,
            edge_refs,
        })
    }

    fn strand(&self, rc: bool, what: &str) -> Result<()> {
        if rc && !self.conjugate {
            bail!("reverse-complement {what} in a snapshot without conjugates");
        }
        Ok(())
    }
}

/// A vertex of the resolved graph.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedVertex {
    /// Id in the resolved graph.
    pub id: VertexId,
    /// The snapshot vertex this one is a copy of.
    pub origin: SnapshotRef,
    /// Reverse-complement partner, if the graph keeps both strands.
    pub conjugate: Option<VertexId>,
}

/// An edge of the resolved graph.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedEdge {
    /// Id in the resolved graph.
    pub id: EdgeId,
    /// Start vertex id.
    pub start: VertexId,
    /// End vertex id.
    pub end: VertexId,
    /// Bases spelled by the edge.
    pub seq: String,
    /// Coverage after splitting.
    pub coverage: f64,
    /// The snapshot edge this one is a copy of.
    pub origin: SnapshotRef,
    /// Reverse-complement partner, if the graph keeps both strands.
    pub conjugate: Option<EdgeId>,
}

/// A paired observation keyed by a resolved edge, pointing at a snapshot edge.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedPair {
    /// Resolved edge the observation is keyed by.
    pub first: EdgeId,
    /// The paired snapshot edge.
    pub second: SnapshotRef,
    /// Distance between the edge starts.
    pub distance: i64,
    /// Number of supporting read pairs.
    pub weight: f64,
    /// Spread of the distance estimate.
    pub variance: f64,
}

/// The resolved graph with provenance, as written by `resolve_repeats`.
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedSnapshot {
    /// Counts from the resolver run.
    pub summary: ResolveSummary,
    /// Every vertex of the resolved graph, in id order.
    pub vertices: Vec<ResolvedVertex>,
    /// Every edge of the resolved graph, in id order.
    pub edges: Vec<ResolvedEdge>,
    /// Remaining paired observations.
    pub pairs: Vec<ResolvedPair>,
}

impl ResolvedSnapshot {
    /// Describe a resolution of `loaded` in terms of snapshot positions.
    pub fn new<G: AssemblyGraph>(
        summary: ResolveSummary,
        res: &Resolution<G>,
        loaded: &LoadedSnapshot,
    ) -> Result<Self> {
        let g = &res.graph;
        let vertex_origin = |v: VertexId| -> Result<SnapshotRef> {
            res.vertex_labels
                .get(&v)
                .and_then(|o| loaded.vertex_refs.get(o))
                .copied()
                .with_context(|| format!("vertex {v} has no origin"))
        };
        let edge_origin = |e: EdgeId| -> Result<SnapshotRef> {
            loaded
                .edge_refs
                .get(&e)
                .copied()
                .with_context(|| format!("edge {e} is not in the snapshot"))
        };

        let vertices = g
            .vertices()
            .into_iter()
            .map(|v| {
                Ok(ResolvedVertex {
                    id: v,
                    origin: vertex_origin(v)?,
                    conjugate: g.conjugate_vertex(v).ok(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let edges = g
            .edges()
            .into_iter()
            .map(|e| {
                let origin = res
                    .edge_labels
                    .get(&e)
                    .with_context(|| format!("edge {e} has no origin"))?;
                Ok(ResolvedEdge {
                    id: e,
                    start: g.edge_start(e),
                    end: g.edge_end(e),
                    seq: g.sequence(e).to_string(),
                    coverage: g.coverage(e),
                    origin: edge_origin(*origin)?,
                    conjugate: g.conjugate_edge(e).ok(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let pairs = res
            .index
            .iter()
            .map(|o| {
                Ok(ResolvedPair {
                    first: o.first,
                    second: edge_origin(o.second)?,
                    distance: o.distance,
                    weight: o.weight,
                    variance: o.variance,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ResolvedSnapshot {
            summary,
            vertices,
            edges,
            pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::resolver::RepeatResolver;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    // Two paths crossing at vertex 2, with evidence pairing C with A and D with B.
    const CROSS: &str = r#"{
        "k": 3,
        "vertices": 5,
        "edges": [
            {"start": 0, "end": 2, "seq": "AAACCCGGGTTTACGTTGCAACGTAGCATGCAAACCCGGGTTTACGTTGCAACGTAGCATGCATT", "coverage": 40.0},
            {"start": 1, "end": 2, "seq": "CCCAAATTTGGGTGCAACGTTGCATGCTACGCCCAAATTTGGGTGCAACGTTGCATGCTACGTTT", "coverage": 40.0},
            {"start": 2, "end": 3, "seq": "TTTGACTGACCATGGTACCATGGTCAGTCAAGTTTGACTGACCATGGTACCATGGTCAGTCAAGG", "coverage": 40.0},
            {"start": 2, "end": 4, "seq": "TTTCAGTCAGGTACCATGGTACCTGACTGAACTTTCAGTCAGGTACCATGGTACCTGACTGAACC", "coverage": 40.0}
        ],
        "pairs": [
            {"first": 0, "second": 2, "distance": 62, "weight": 1.0},
            {"first": 1, "second": 3, "distance": 62, "weight": 1.0},
            {"first": 2, "second": 2, "distance": 0, "weight": 1.0},
            {"first": 3, "second": 3, "distance": 0, "weight": 1.0}
        ]
    }"#;

    fn cross_config() -> ResolverConfig {
        ResolverConfig {
            mode: 1,
            ..ResolverConfig::new(100.0, 30.0)
        }
    }

    #[test]
    fn test_load() {
        let snapshot = GraphSnapshot::from_json_str(CROSS).unwrap();
        let loaded = snapshot.load().unwrap();
        assert_eq!(loaded.graph.vertex_count(), 5);
        assert_eq!(loaded.graph.edge_count(), 4);
        assert_eq!(loaded.index.len(), 4);
        for (&e, r) in &loaded.edge_refs {
            assert_eq!(loaded.graph.length(e), snapshot.edges[r.index].seq.len() - 3);
            assert_eq!(loaded.graph.coverage(e), 40.0);
        }
    }

    #[test]
    fn test_load_conjugate() {
        let s = r#"{"k": 3, "conjugate": true, "vertices": 2,
            "edges": [{"start": 0, "end": 1, "seq": "ACGGTCA", "coverage": 5.0}],
            "pairs": [{"first": 0, "first_rc": true, "second": 0, "second_rc": true,
                       "distance": 0, "weight": 2.0}]}"#;
        let loaded = GraphSnapshot::from_json_str(s).unwrap().load().unwrap();
        assert_eq!(loaded.graph.vertex_count(), 4);
        assert_eq!(loaded.graph.edge_count(), 2);
        let rc: Vec<EdgeId> = loaded
            .edge_refs
            .iter()
            .filter(|(_, r)| r.rc)
            .map(|(&e, _)| e)
            .collect();
        assert_eq!(rc.len(), 1);
        assert_eq!(loaded.index.edge_infos(rc[0]).len(), 1);
        assert_eq!(loaded.graph.coverage(rc[0]), 5.0);
    }

    #[test]
    fn test_load_rejects_bad_input() {
        let bad_base = r#"{"k": 3, "vertices": 2,
            "edges": [{"start": 0, "end": 1, "seq": "ACGNTCA", "coverage": 5.0}]}"#;
        let bad_vertex = r#"{"k": 3, "vertices": 2,
            "edges": [{"start": 0, "end": 2, "seq": "ACGGTCA", "coverage": 5.0}]}"#;
        let rc_in_single = r#"{"k": 3, "vertices": 2,
            "edges": [{"start": 0, "end": 1, "end_rc": true, "seq": "ACGGTCA", "coverage": 5.0}]}"#;
        let too_short = r#"{"k": 3, "vertices": 2,
            "edges": [{"start": 0, "end": 1, "seq": "ACG", "coverage": 5.0}]}"#;
        let bad_pair = r#"{"k": 3, "vertices": 2,
            "edges": [{"start": 0, "end": 1, "seq": "ACGGTCA", "coverage": 5.0}],
            "pairs": [{"first": 0, "second": 7, "distance": 0, "weight": 1.0}]}"#;
        for s in [bad_base, bad_vertex, rc_in_single, too_short, bad_pair] {
            let snapshot = GraphSnapshot::from_json_str(s).unwrap();
            assert!(snapshot.load().is_err(), "{s}");
        }
        let extra = r#"{"k": 3, "vertices": 0, "edges": [], "extra": 1}"#;
        assert!(GraphSnapshot::from_json_str(extra).is_err());
    }

    #[test]
    fn test_resolved_snapshot() {
        let loaded = GraphSnapshot::from_json_str(CROSS).unwrap().load().unwrap();
        let mut r = RepeatResolver::new(&loaded.graph, &loaded.index, cross_config()).unwrap();
        let summary = r.resolve_repeats().unwrap();
        let out = ResolvedSnapshot::new(summary, &r.into_parts(), &loaded).unwrap();

        assert_eq!(out.summary.splits_per_mode, vec![1]);
        assert_eq!(out.vertices.len(), 6);
        assert_eq!(out.edges.len(), 4);
        let split: Vec<&ResolvedVertex> = out
            .vertices
            .iter()
            .filter(|v| v.origin.index == 2)
            .collect();
        assert_eq!(split.len(), 2);
        for v in split {
            let origins: BTreeSet<usize> = out
                .edges
                .iter()
                .filter(|e| e.start == v.id || e.end == v.id)
                .map(|e| e.origin.index)
                .collect();
            assert!(
                origins == BTreeSet::from([0, 2]) || origins == BTreeSet::from([1, 3]),
                "{origins:?}"
            );
        }
        assert_eq!(out.pairs.len(), 4);
        assert!(out.edges.iter().all(|e| e.conjugate.is_none()));
        serde_json::to_string(&out).unwrap();
    }
}
