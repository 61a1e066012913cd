//! repeat_resolver
// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.
#![deny(missing_docs)]

// Resolve repeats in a condensed assembly graph using paired-read distance
// evidence.  A vertex where several genomic traversals collapse is split into
// one copy per traversal whenever the evidence pairs its incoming and outgoing
// edges up consistently.
//
// The resolver owns a working copy of the graph and never touches the
// original, which is also the graph that distances between paired edges are
// measured in.

mod adjacency;
mod coloring;
pub mod config;
mod distance;
pub mod errors;
mod filter;
mod matching;
mod occurrence;
pub mod resolver;
pub mod snapshot;
mod split;

#[cfg(test)]
mod testing;

pub use config::ResolverConfig;
pub use errors::ResolverError;
pub use occurrence::{EdgeOccurrence, Side};
pub use resolver::{RepeatResolver, ResolveMode, ResolveSummary, Resolution};
