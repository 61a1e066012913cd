// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use crate::coloring::Coloring;
use crate::occurrence::EdgeOccurrence;
use condensed_graph::EdgeId;
use fxhash::FxHashMap;
use log::debug;
use petgraph::unionfind::UnionFind;

// Find the unique working edge, other than the occurrence's own, that sees the
// same paired edge at the same offset.

fn unique_partner(a: &EdgeOccurrence, occurrences: &[EdgeOccurrence]) -> Option<EdgeId> {
    let mut partner = None;
    for b in occurrences {
        if b.edge() == a.edge() || b.offset != a.offset || b.paired != a.paired {
            continue;
        }
        match partner {
            None => partner = Some(b.edge()),
            Some(p) if p != b.edge() => {
                debug!("multiple pairing for {}", a.edge());
                return None;
            }
            Some(_) => {}
        }
    }
    partner
}

/// Pair each outgoing edge with the incoming edge its evidence uniquely
/// points to.  Succeeds only if every incident edge ends up in exactly one
/// in/out pair; the colors are then the pairs.
pub(crate) fn match_incident_edges(
    occurrences: &[EdgeOccurrence],
    outgoing: &[EdgeId],
    incoming: &[EdgeId],
) -> Option<Coloring> {
    // Incoming edges are nodes 0..n_in, outgoing edges follow.
    let mut node: FxHashMap<(bool, EdgeId), usize> = FxHashMap::default();
    for (i, &e) in incoming.iter().enumerate() {
        node.insert((false, e), i);
    }
    for (i, &e) in outgoing.iter().enumerate() {
        node.insert((true, e), incoming.len() + i);
    }
    let n = incoming.len() + outgoing.len();

    let mut components = UnionFind::<usize>::new(n);
    for a in occurrences {
        let Some(&out_node) = node.get(&(true, a.edge())) else {
            continue;
        };
        if let Some(partner) = unique_partner(a, occurrences) {
            if let Some(&in_node) = node.get(&(false, partner)) {
                components.union(out_node, in_node);
            }
        }
    }

    let labels = components.into_labeling();
    let mut sizes: FxHashMap<usize, usize> = FxHashMap::default();
    for &l in &labels {
        *sizes.entry(l).or_default() += 1;
    }
    if sizes.values().any(|&s| s != 2) {
        debug!("incident edges do not form a perfect matching");
        return None;
    }

    let mut dense: FxHashMap<usize, usize> = FxHashMap::default();
    let node_colors: Vec<usize> = labels
        .iter()
        .map(|l| {
            let next = dense.len();
            *dense.entry(*l).or_insert(next)
        })
        .collect();
    let colors = occurrences
        .iter()
        .map(|a| {
            let i = node
                .get(&(true, a.edge()))
                .or_else(|| node.get(&(false, a.edge())))
                .copied()?;
            Some(node_colors[i])
        })
        .collect::<Option<Vec<usize>>>()?;
    Some(Coloring {
        colors,
        n_colors: dense.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occurrence::Side;
    use paired_info::PairObservation;
    use pretty_assertions::assert_eq;

    fn occ(first: u32, paired: u32, side: Side, offset: i64) -> EdgeOccurrence {
        EdgeOccurrence {
            obs: PairObservation::new(EdgeId(first), EdgeId(paired), offset, 1.0, 0.0),
            side,
            paired: EdgeId(paired),
            offset,
        }
    }

    #[test]
    fn test_perfect_matching() {
        // in: 0, 1   out: 2, 3
        let occs = vec![
            occ(0, 10, Side::Incoming, 100),
            occ(1, 11, Side::Incoming, 100),
            occ(2, 10, Side::Outgoing, 100),
            occ(3, 11, Side::Outgoing, 100),
        ];
        let coloring =
            match_incident_edges(&occs, &[EdgeId(2), EdgeId(3)], &[EdgeId(0), EdgeId(1)]).unwrap();
        assert_eq!(coloring.n_colors, 2);
        assert_eq!(coloring.colors, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_unmatched_edge_fails() {
        let occs = vec![
            occ(0, 10, Side::Incoming, 100),
            occ(2, 10, Side::Outgoing, 100),
            occ(3, 11, Side::Outgoing, 100),
        ];
        assert_eq!(
            match_incident_edges(&occs, &[EdgeId(2), EdgeId(3)], &[EdgeId(0), EdgeId(1)]),
            None
        );
    }

    #[test]
    fn test_component_of_three_fails() {
        // out 2 pairs with both 0 and 1 through different paired edges.
        let occs = vec![
            occ(0, 10, Side::Incoming, 100),
            occ(1, 11, Side::Incoming, 100),
            occ(2, 10, Side::Outgoing, 100),
            occ(2, 11, Side::Outgoing, 100),
            occ(3, 12, Side::Outgoing, 100),
        ];
        assert_eq!(
            match_incident_edges(&occs, &[EdgeId(2), EdgeId(3)], &[EdgeId(0), EdgeId(1)]),
            None
        );
    }
}
