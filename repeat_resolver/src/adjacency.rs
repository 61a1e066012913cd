// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use crate::distance::DistanceOracle;
use crate::occurrence::EdgeOccurrence;
use condensed_graph::{AssemblyGraph, EdgeId};
use log::trace;

fn is_close(a: f64, b: f64, max_diff: f64) -> bool {
    (a - b).abs() < max_diff
}

/// Decide whether two occurrences at the same vertex are consistent with a
/// single traversal of the genome.  `working` is the graph being resolved;
/// paired edges are placed in the oracle's graph.
///
/// The relation is not symmetric in general.
pub(crate) fn is_adjacent<G: AssemblyGraph>(
    a: &EdgeOccurrence,
    b: &EdgeOccurrence,
    working: &G,
    oracle: &mut DistanceOracle<'_, G>,
    max_repeat_length: usize,
) -> bool {
    let (ea, eb) = (a.edge(), b.edge());
    let is_loop = |e: EdgeId| working.edge_start(e) == working.edge_end(e);
    if ea != eb && !is_loop(ea) && !is_loop(eb) {
        // Two edges leaving (or entering) the same vertex cannot both lie
        // on one traversal through it.
        if working.edge_start(ea) == working.edge_start(eb)
            || working.edge_end(ea) == working.edge_end(eb)
        {
            trace!("{ea} and {eb} share an endpoint");
            return false;
        }
    }
    if ea == eb && working.length(ea) > max_repeat_length {
        return true;
    }
    let max_diff = a.obs.variance.max(b.obs.variance) + 0.5 + 1e-9;
    paired_edges_adjacent(a, b, ea == eb, oracle, max_diff)
}

fn paired_edges_adjacent<G: AssemblyGraph>(
    a: &EdgeOccurrence,
    b: &EdgeOccurrence,
    same_first: bool,
    oracle: &mut DistanceOracle<'_, G>,
    max_diff: f64,
) -> bool {
    let g = oracle.graph();
    let (start, end) = (g.edge_start(a.paired), g.edge_end(a.paired));
    let (other_start, other_end) = (g.edge_start(b.paired), g.edge_end(b.paired));
    let len = g.length(a.paired) as i64;
    let other_len = g.length(b.paired) as i64;
    let (d, other_d) = (a.offset, b.offset);

    let forward = oracle.distance(end, other_start);
    if is_close((d + len + forward) as f64, other_d as f64, max_diff) {
        return true;
    }
    let backward = oracle.distance(other_end, start);
    if is_close((other_d + other_len + backward) as f64, d as f64, max_diff) {
        return true;
    }
    if a.paired == b.paired && is_close(d as f64, other_d as f64, max_diff) {
        return true;
    }
    same_first
        && ((end == other_start && is_close((d + len) as f64, other_d as f64, max_diff))
            || (start == other_end && is_close(d as f64, (other_d + other_len) as f64, max_diff)))
}
