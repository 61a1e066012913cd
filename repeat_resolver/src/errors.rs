// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

//! Errors that abort a resolver run.

use condensed_graph::GraphError;

/// Fatal resolver errors.  Blocked splits and ambiguous evidence are not
/// errors; they leave the vertex unresolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// A graph invariant was violated, e.g. a conjugate was requested from a
    /// graph without reverse-complement duality.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The configuration is inconsistent.
    #[error("invalid resolver configuration: {0}")]
    InvalidConfig(String),
}
