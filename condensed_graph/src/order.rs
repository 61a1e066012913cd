// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use crate::{AssemblyGraph, VertexId};

/// Return the live vertices in ascending id order.
pub fn id_order<G: AssemblyGraph>(g: &G) -> Vec<VertexId> {
    g.vertices()
}

/// Return the live vertices grouped by connected component, where two
/// vertices are connected only through edges of length at most `max_len`.
/// Components are ordered by their smallest vertex id, and vertices within a
/// component by id, so the order does not depend on traversal details.
pub fn component_order<G: AssemblyGraph>(g: &G, max_len: usize) -> Vec<VertexId> {
    let verts = g.vertices();
    let mut comp: Vec<Vec<VertexId>> = Vec::new();
    let mut used = vec![false; verts.last().map_or(0, |v| v.index() + 1)];
    let mut c: Vec<VertexId> = Vec::new();
    let mut cnext: Vec<VertexId> = Vec::new();
    for &v in &verts {
        if used[v.index()] {
            continue;
        }
        c.clear();
        cnext.clear();
        cnext.push(v);
        while let Some(w) = cnext.pop() {
            if used[w.index()] {
                continue;
            }
            used[w.index()] = true;
            c.push(w);
            for e in g.outgoing_edges(w) {
                if g.length(e) <= max_len {
                    cnext.push(g.edge_end(e));
                }
            }
            for e in g.incoming_edges(w) {
                if g.length(e) <= max_len {
                    cnext.push(g.edge_start(e));
                }
            }
        }
        c.sort_unstable();
        comp.push(c.clone());
    }
    comp.sort_by_key(|c| c[0]);
    comp.into_iter().flatten().collect()
}
