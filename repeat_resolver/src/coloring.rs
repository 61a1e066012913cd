// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use crate::adjacency::is_adjacent;
use crate::distance::DistanceOracle;
use crate::occurrence::EdgeOccurrence;
use condensed_graph::AssemblyGraph;
use log::{error, trace, warn};
use petgraph::graph::{NodeIndex, UnGraph};

/// Partition of the occurrences at a vertex into traversals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Coloring {
    /// Color of each occurrence.
    pub(crate) colors: Vec<usize>,
    /// Number of distinct colors, numbered from 0.
    pub(crate) n_colors: usize,
}

impl Coloring {
    /// Label nodes by connected component, numbering components in order of
    /// their lowest node.
    fn label(graph: &UnGraph<(), ()>) -> Coloring {
        let n = graph.node_count();
        let mut colors: Vec<Option<usize>> = vec![None; n];
        let mut n_colors = 0;
        let mut stack = Vec::new();
        for i in 0..n {
            if colors[i].is_some() {
                continue;
            }
            colors[i] = Some(n_colors);
            stack.push(NodeIndex::new(i));
            while let Some(node) = stack.pop() {
                for next in graph.neighbors(node) {
                    match colors[next.index()] {
                        Some(c) if c != n_colors => {
                            error!(
                                "occurrence {} reached with color {} but already has color {}",
                                next.index(),
                                n_colors,
                                c
                            );
                        }
                        Some(_) => {}
                        None => {
                            colors[next.index()] = Some(n_colors);
                            stack.push(next);
                        }
                    }
                }
            }
            n_colors += 1;
        }
        Coloring {
            colors: colors.into_iter().flatten().collect(),
            n_colors,
        }
    }
}

/// Color the occurrences at one vertex: two occurrences share a color when
/// they are linked by a chain of adjacent pairs.
pub(crate) fn color_occurrences<G: AssemblyGraph>(
    occurrences: &[EdgeOccurrence],
    working: &G,
    oracle: &mut DistanceOracle<'_, G>,
    max_repeat_length: usize,
) -> Coloring {
    color_by_adjacency(occurrences.len(), |i, j| {
        let (a, b) = (&occurrences[i], &occurrences[j]);
        let adjacent = is_adjacent(a, b, working, oracle, max_repeat_length);
        if adjacent && i != j {
            trace!("{} at {} is adjacent to {} at {}", a.paired, a.offset, b.paired, b.offset);
        }
        adjacent
    })
}

// Link i and j whenever adjacent(i, j) holds.  Both orders are asked, and a
// pair adjacent in one order only is reported but still linked.
fn color_by_adjacency<F>(n: usize, mut adjacent: F) -> Coloring
where
    F: FnMut(usize, usize) -> bool,
{
    let mut graph: UnGraph<(), ()> = UnGraph::with_capacity(n, n);
    for _ in 0..n {
        graph.add_node(());
    }
    for i in 0..n {
        for j in 0..n {
            let ab = adjacent(i, j);
            if ab && !adjacent(j, i) {
                warn!("asymmetric adjacency between occurrences {i} and {j}");
            }
            if ab && i != j {
                graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
            }
        }
    }
    Coloring::label(&graph)
}
