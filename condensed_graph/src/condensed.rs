// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use crate::{AssemblyGraph, EdgeId, GraphError, Removed, Split, VertexId};
use debruijn::dna_string::DnaString;
use debruijn::Mer;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

#[derive(Debug, Clone)]
struct EdgeData {
    seq: DnaString,
    coverage: f64,
}

/// The conjugate tables.  Entry i is the partner of id i; entries of deleted
/// ids are left in place until the id is handed out again.
#[derive(Debug, Clone, Default)]
struct Involution {
    vertex: Vec<VertexId>,
    edge: Vec<EdgeId>,
}

fn node(v: VertexId) -> NodeIndex {
    NodeIndex::new(v.index())
}

fn edge_index(e: EdgeId) -> EdgeIndex {
    EdgeIndex::new(e.index())
}

fn vertex_id(n: NodeIndex) -> VertexId {
    VertexId(n.index() as u32)
}

fn edge_id(e: EdgeIndex) -> EdgeId {
    EdgeId(e.index() as u32)
}

fn set_partner<T: Copy>(table: &mut Vec<T>, i: usize, partner: T, vacant: T) {
    if table.len() <= i {
        table.resize(i + 1, vacant);
    }
    table[i] = partner;
}

/// Condensed de Bruijn graph on a petgraph `StableDiGraph`, with or without
/// reverse-complement duality.  Vertices and edges keep their ids when other
/// vertices and edges are removed.
#[derive(Debug, Clone)]
pub struct CondensedGraph {
    k: usize,
    g: StableDiGraph<(), EdgeData>,
    inv: Option<Involution>,
}

impl CondensedGraph {
    /// Create an empty graph without conjugate duality.
    pub fn new_single(k: usize) -> CondensedGraph {
        CondensedGraph {
            k,
            g: StableDiGraph::default(),
            inv: None,
        }
    }

    /// Create an empty graph that keeps both strands.
    pub fn new_conjugate(k: usize) -> CondensedGraph {
        CondensedGraph {
            inv: Some(Involution::default()),
            ..CondensedGraph::new_single(k)
        }
    }

    fn edge_data(&self, e: EdgeId) -> &EdgeData {
        match self.g.edge_weight(edge_index(e)) {
            Some(data) => data,
            None => panic!("edge {e} is not in the graph"),
        }
    }

    fn endpoints(&self, e: EdgeId) -> (VertexId, VertexId) {
        match self.g.edge_endpoints(edge_index(e)) {
            Some((s, t)) => (vertex_id(s), vertex_id(t)),
            None => panic!("edge {e} is not in the graph"),
        }
    }

    fn incident(&self, v: VertexId, dir: Direction) -> Vec<EdgeId> {
        if !self.contains_vertex(v) {
            panic!("vertex {v} is not in the graph");
        }
        let mut edges: Vec<EdgeId> = self
            .g
            .edges_directed(node(v), dir)
            .map(|r| edge_id(r.id()))
            .collect();
        edges.sort_unstable();
        edges
    }

    // Add one edge without touching the involution.
    fn push_edge(
        &mut self,
        start: VertexId,
        end: VertexId,
        seq: DnaString,
        coverage: f64,
    ) -> Result<EdgeId, GraphError> {
        for v in [start, end] {
            if !self.contains_vertex(v) {
                return Err(GraphError::MissingVertex(v));
            }
        }
        let e = self.g.add_edge(node(start), node(end), EdgeData { seq, coverage });
        Ok(edge_id(e))
    }

    // Add an edge and, if conjugate-typed, its reverse complement running
    // conj(end) -> conj(start).  An edge from a vertex to the conjugate of
    // itself whose sequence is a palindrome is its own conjugate.
    fn add_edge_pair(
        &mut self,
        start: VertexId,
        end: VertexId,
        seq: DnaString,
        coverage: f64,
        conj_coverage: f64,
    ) -> Result<EdgeId, GraphError> {
        if seq.len() <= self.k {
            return Err(GraphError::ShortSequence {
                len: seq.len(),
                k: self.k,
            });
        }
        if self.inv.is_none() {
            return self.push_edge(start, end, seq, coverage);
        }
        let conj_start = self.conjugate_vertex(end)?;
        let conj_end = self.conjugate_vertex(start)?;
        let rc = seq.rc();
        let palindrome = rc == seq;
        let e = self.push_edge(start, end, seq, coverage)?;
        let ce = if start == conj_start && palindrome {
            e
        } else {
            self.push_edge(conj_start, conj_end, rc, conj_coverage)?
        };
        if let Some(inv) = self.inv.as_mut() {
            set_partner(&mut inv.edge, e.index(), ce, EdgeId(u32::MAX));
            set_partner(&mut inv.edge, ce.index(), e, EdgeId(u32::MAX));
        }
        Ok(e)
    }

    // The vertex and its conjugate, deduplicated.
    fn with_conjugate_vertex(&self, v: VertexId) -> Vec<VertexId> {
        match self.conjugate_vertex(v) {
            Ok(cv) if cv != v => vec![v, cv],
            _ => vec![v],
        }
    }

    fn with_conjugate_edge(&self, e: EdgeId) -> Vec<EdgeId> {
        match self.conjugate_edge(e) {
            Ok(ce) if ce != e => vec![e, ce],
            _ => vec![e],
        }
    }
}

impl AssemblyGraph for CondensedGraph {
    fn empty(k: usize, conjugate: bool) -> CondensedGraph {
        if conjugate {
            CondensedGraph::new_conjugate(k)
        } else {
            CondensedGraph::new_single(k)
        }
    }

    fn k(&self) -> usize {
        self.k
    }

    fn is_conjugate(&self) -> bool {
        self.inv.is_some()
    }

    fn add_vertex(&mut self) -> VertexId {
        let v = vertex_id(self.g.add_node(()));
        if self.inv.is_some() {
            let cv = vertex_id(self.g.add_node(()));
            if let Some(inv) = self.inv.as_mut() {
                set_partner(&mut inv.vertex, v.index(), cv, VertexId(u32::MAX));
                set_partner(&mut inv.vertex, cv.index(), v, VertexId(u32::MAX));
            }
        }
        v
    }

    fn add_edge(
        &mut self,
        start: VertexId,
        end: VertexId,
        seq: DnaString,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge_pair(start, end, seq, 0.0, 0.0)
    }

    fn delete_edge(&mut self, e: EdgeId) -> Result<Vec<EdgeId>, GraphError> {
        if !self.contains_edge(e) {
            return Err(GraphError::MissingEdge(e));
        }
        let removed = self.with_conjugate_edge(e);
        for &x in &removed {
            self.g
                .remove_edge(edge_index(x))
                .ok_or(GraphError::MissingEdge(x))?;
        }
        Ok(removed)
    }

    fn delete_vertex(&mut self, v: VertexId) -> Result<Vec<VertexId>, GraphError> {
        if !self.contains_vertex(v) {
            return Err(GraphError::MissingVertex(v));
        }
        let removed = self.with_conjugate_vertex(v);
        for &x in &removed {
            let degree = self.degree(x);
            if degree > 0 {
                return Err(GraphError::VertexNotEmpty { vertex: x, degree });
            }
        }
        for &x in &removed {
            self.g
                .remove_node(node(x))
                .ok_or(GraphError::MissingVertex(x))?;
        }
        Ok(removed)
    }

    fn force_delete_vertex(&mut self, v: VertexId) -> Result<Removed, GraphError> {
        if !self.contains_vertex(v) {
            return Err(GraphError::MissingVertex(v));
        }
        let mut removed = Removed {
            vertices: self.with_conjugate_vertex(v),
            edges: Vec::new(),
        };
        for &x in &removed.vertices {
            removed.edges.extend(self.incident(x, Direction::Outgoing));
            removed.edges.extend(self.incident(x, Direction::Incoming));
        }
        removed.edges.sort_unstable();
        removed.edges.dedup();

        // Removing a node drops its edges, and the conjugate of every
        // incident edge is incident to the conjugate vertex.
        for &x in &removed.vertices {
            self.g
                .remove_node(node(x))
                .ok_or(GraphError::MissingVertex(x))?;
        }
        Ok(removed)
    }

    fn vertices(&self) -> Vec<VertexId> {
        self.g.node_indices().map(vertex_id).collect()
    }

    fn edges(&self) -> Vec<EdgeId> {
        self.g.edge_indices().map(edge_id).collect()
    }

    fn contains_vertex(&self, v: VertexId) -> bool {
        self.g.contains_node(node(v))
    }

    fn contains_edge(&self, e: EdgeId) -> bool {
        self.g.edge_weight(edge_index(e)).is_some()
    }

    fn vertex_count(&self) -> usize {
        self.g.node_count()
    }

    fn edge_count(&self) -> usize {
        self.g.edge_count()
    }

    fn outgoing_edges(&self, v: VertexId) -> Vec<EdgeId> {
        self.incident(v, Direction::Outgoing)
    }

    fn incoming_edges(&self, v: VertexId) -> Vec<EdgeId> {
        self.incident(v, Direction::Incoming)
    }

    fn edge_start(&self, e: EdgeId) -> VertexId {
        self.endpoints(e).0
    }

    fn edge_end(&self, e: EdgeId) -> VertexId {
        self.endpoints(e).1
    }

    fn length(&self, e: EdgeId) -> usize {
        self.edge_data(e).seq.len() - self.k
    }

    fn sequence(&self, e: EdgeId) -> &DnaString {
        &self.edge_data(e).seq
    }

    fn coverage(&self, e: EdgeId) -> f64 {
        self.edge_data(e).coverage
    }

    fn set_coverage(&mut self, e: EdgeId, coverage: f64) {
        for x in self.with_conjugate_edge(e) {
            match self.g.edge_weight_mut(edge_index(x)) {
                Some(data) => data.coverage = coverage,
                None => panic!("edge {x} is not in the graph"),
            }
        }
    }

    fn conjugate_vertex(&self, v: VertexId) -> Result<VertexId, GraphError> {
        match &self.inv {
            Some(inv) => inv
                .vertex
                .get(v.index())
                .copied()
                .ok_or(GraphError::MissingVertex(v)),
            None => Err(GraphError::NotConjugate),
        }
    }

    fn conjugate_edge(&self, e: EdgeId) -> Result<EdgeId, GraphError> {
        match &self.inv {
            Some(inv) => inv
                .edge
                .get(e.index())
                .copied()
                .ok_or(GraphError::MissingEdge(e)),
            None => Err(GraphError::NotConjugate),
        }
    }

    // Every edge must touch v exactly once: loops would have to be split on
    // both ends.  On a conjugate graph an edge joining a vertex to its own
    // conjugate would put both strands on the new vertex.
    fn split_condition(&self, v: VertexId, edges: &[EdgeId]) -> bool {
        if !self.contains_vertex(v) {
            return false;
        }
        if self.conjugate_vertex(v).ok() == Some(v) {
            return false;
        }
        edges.iter().all(|&e| {
            if !self.contains_edge(e) {
                return false;
            }
            let (start, end) = self.endpoints(e);
            if start == end || (start != v && end != v) {
                return false;
            }
            match self.conjugate_vertex(end) {
                Ok(conj_end) => start != conj_end,
                Err(_) => true,
            }
        })
    }

    fn split_vertex(
        &mut self,
        v: VertexId,
        edges: &[EdgeId],
        coefficients: &[f64],
    ) -> Result<Split, GraphError> {
        if edges.len() != coefficients.len() {
            return Err(GraphError::LengthMismatch {
                edges: edges.len(),
                coefficients: coefficients.len(),
            });
        }
        if !self.split_condition(v, edges) {
            return Err(GraphError::SplitBlocked { vertex: v });
        }
        let new_vertex = self.add_vertex();
        let mut pairs = Vec::with_capacity(edges.len());
        for (&e, &coeff) in edges.iter().zip(coefficients) {
            let data = self.edge_data(e).clone();
            let conj_coverage = match self.conjugate_edge(e) {
                Ok(ce) => self.coverage(ce),
                Err(_) => data.coverage,
            };
            let (start, end) = self.endpoints(e);
            let (start, end) = if start == v {
                (new_vertex, end)
            } else {
                (start, new_vertex)
            };
            let new_edge = self.add_edge_pair(
                start,
                end,
                data.seq,
                data.coverage * coeff,
                conj_coverage * coeff,
            )?;
            pairs.push((e, new_edge));
        }
        Ok(Split {
            vertex: new_vertex,
            edges: pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seq(len: usize) -> DnaString {
        let bases: String = "ACGGT".chars().cycle().take(len).collect();
        DnaString::from_dna_string(&bases)
    }

    #[test]
    fn test_single_add_and_delete() {
        let mut g = CondensedGraph::new_single(5);
        let a = g.add_vertex();
        let b = g.add_vertex();
        let e = g.add_edge(a, b, seq(25)).unwrap();
        assert_eq!(g.length(e), 20);
        assert_eq!(g.outgoing_edges(a), vec![e]);
        assert_eq!(g.incoming_edges(b), vec![e]);
        assert_eq!(g.conjugate_edge(e), Err(GraphError::NotConjugate));
        assert_eq!(
            g.delete_vertex(a),
            Err(GraphError::VertexNotEmpty {
                vertex: a,
                degree: 1
            })
        );
        assert_eq!(g.delete_edge(e).unwrap(), vec![e]);
        assert_eq!(g.delete_vertex(a).unwrap(), vec![a]);
        assert_eq!(g.vertices(), vec![b]);
        assert_eq!(g.edge_count(), 0);
        assert!(!g.contains_vertex(a));
        assert!(!g.contains_edge(e));
    }

    #[test]
    fn test_ids_survive_removal() {
        let mut g = CondensedGraph::new_single(5);
        let v: Vec<VertexId> = (0..4).map(|_| g.add_vertex()).collect();
        let e01 = g.add_edge(v[0], v[1], seq(20)).unwrap();
        let e12 = g.add_edge(v[1], v[2], seq(21)).unwrap();
        let e23 = g.add_edge(v[2], v[3], seq(22)).unwrap();
        g.delete_edge(e01).unwrap();
        g.delete_vertex(v[0]).unwrap();
        assert_eq!(g.vertices(), vec![v[1], v[2], v[3]]);
        assert_eq!(g.edges(), vec![e12, e23]);
        assert_eq!((g.edge_start(e23), g.edge_end(e23)), (v[2], v[3]));
        assert_eq!(g.length(e23), 17);
        assert_eq!(g.outgoing_edges(v[1]), vec![e12]);
    }

    #[test]
    fn test_coverage_mirrors_onto_conjugate() {
        let mut g = CondensedGraph::new_conjugate(5);
        let a = g.add_vertex();
        let b = g.add_vertex();
        let e = g.add_edge(a, b, seq(30)).unwrap();
        let ce = g.conjugate_edge(e).unwrap();
        g.set_coverage(e, 12.5);
        assert_eq!(g.coverage(ce), 12.5);
        g.set_coverage(ce, 3.0);
        assert_eq!(g.coverage(e), 3.0);
    }

    #[test]
    fn test_short_sequence_rejected() {
        let mut g = CondensedGraph::new_single(5);
        let a = g.add_vertex();
        assert_eq!(
            g.add_edge(a, a, seq(5)),
            Err(GraphError::ShortSequence { len: 5, k: 5 })
        );
    }

    #[test]
    fn test_conjugate_pairs() {
        let mut g = CondensedGraph::new_conjugate(5);
        let a = g.add_vertex();
        let b = g.add_vertex();
        assert_eq!(g.vertex_count(), 4);
        let e = g.add_edge(a, b, seq(30)).unwrap();
        let ce = g.conjugate_edge(e).unwrap();
        assert_ne!(e, ce);
        assert_eq!(g.conjugate_edge(ce).unwrap(), e);
        assert_eq!(g.edge_start(ce), g.conjugate_vertex(b).unwrap());
        assert_eq!(g.edge_end(ce), g.conjugate_vertex(a).unwrap());
        assert_eq!(g.sequence(ce), &seq(30).rc());
        assert_eq!(g.delete_edge(e).unwrap(), vec![e, ce]);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.delete_vertex(a).unwrap().len(), 2);
        assert_eq!(g.vertex_count(), 2);
    }

    #[test]
    fn test_split_condition() {
        let mut g = CondensedGraph::new_conjugate(5);
        let a = g.add_vertex();
        let b = g.add_vertex();
        let loop_edge = g.add_edge(a, a, seq(30)).unwrap();
        let to_self_rc = g.add_edge(a, g.conjugate_vertex(a).unwrap(), seq(31)).unwrap();
        let plain = g.add_edge(a, b, seq(32)).unwrap();
        let elsewhere = g.add_edge(b, b, seq(33)).unwrap();
        assert!(g.split_condition(a, &[plain]));
        assert!(!g.split_condition(a, &[loop_edge]));
        assert!(!g.split_condition(a, &[to_self_rc]));
        assert!(!g.split_condition(a, &[plain, elsewhere]));
    }

    #[test]
    fn test_split_vertex_conjugate() {
        let mut g = CondensedGraph::new_conjugate(5);
        let u = g.add_vertex();
        let v = g.add_vertex();
        let w = g.add_vertex();
        let into = g.add_edge(u, v, seq(30)).unwrap();
        let out = g.add_edge(v, w, seq(40)).unwrap();
        for e in [into, out] {
            g.set_coverage(e, 10.0);
        }
        let split = g.split_vertex(v, &[into, out], &[0.5, 0.25]).unwrap();
        let nv = split.vertex;
        assert_eq!(split.edges.len(), 2);
        let (_, new_into) = split.edges[0];
        let (_, new_out) = split.edges[1];
        assert_eq!((g.edge_start(new_into), g.edge_end(new_into)), (u, nv));
        assert_eq!((g.edge_start(new_out), g.edge_end(new_out)), (nv, w));
        assert_eq!(g.coverage(new_into), 5.0);
        assert_eq!(g.coverage(new_out), 2.5);
        let conj_out = g.conjugate_edge(new_out).unwrap();
        assert_eq!(g.coverage(conj_out), 2.5);
        assert_eq!(g.edge_end(conj_out), g.conjugate_vertex(nv).unwrap());

        // Old edges stay until the vertex is deleted.
        assert_eq!(g.degree(v), 2);
        let removed = g.force_delete_vertex(v).unwrap();
        assert_eq!(removed.vertices.len(), 2);
        assert_eq!(removed.edges.len(), 4);
        assert_eq!(g.edge_count(), 4);
        for e in g.edges() {
            let ce = g.conjugate_edge(e).unwrap();
            assert_eq!(g.conjugate_edge(ce).unwrap(), e);
            assert_eq!(g.coverage(e), g.coverage(ce));
        }
    }

    #[test]
    fn test_split_blocked() {
        let mut g = CondensedGraph::new_single(5);
        let v = g.add_vertex();
        let l = g.add_edge(v, v, seq(30)).unwrap();
        assert_eq!(
            g.split_vertex(v, &[l], &[1.0]),
            Err(GraphError::SplitBlocked { vertex: v })
        );
        assert_eq!(
            g.split_vertex(v, &[l], &[]),
            Err(GraphError::LengthMismatch {
                edges: 1,
                coefficients: 0
            })
        );
    }
}
