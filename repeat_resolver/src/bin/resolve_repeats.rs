// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use condensed_graph::AssemblyGraph;
use log::{info, LevelFilter};
use repeat_resolver::snapshot::{GraphSnapshot, ResolvedSnapshot};
use repeat_resolver::{RepeatResolver, ResolverConfig};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Split repeat vertices of an assembly graph using paired-read evidence.
#[derive(Parser, Debug)]
#[clap(name = "resolve_repeats")]
struct Args {
    /// JSON snapshot of the graph and its paired observations.
    #[clap(long, value_name = "JSON")]
    input: PathBuf,

    /// Resolver parameters.
    #[clap(long, value_name = "TOML")]
    config: PathBuf,

    /// Where to write the resolved graph.
    #[clap(long, value_name = "JSON")]
    output: PathBuf,
}

fn init_log() {
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .try_init();
}

fn main() -> Result<()> {
    init_log();
    let args = Args::parse();

    let config = ResolverConfig::from_toml_file(&args.config)?;
    let loaded = GraphSnapshot::from_json_file(&args.input)?.load()?;
    info!(
        "loaded {} vertices, {} edges, {} paired observations",
        loaded.graph.vertex_count(),
        loaded.graph.edge_count(),
        loaded.index.len()
    );

    let mut resolver = RepeatResolver::new(&loaded.graph, &loaded.index, config)?;
    let summary = resolver.resolve_repeats()?;
    let resolved = ResolvedSnapshot::new(summary, &resolver.into_parts(), &loaded)?;

    let mut out = BufWriter::new(
        File::create(&args.output).with_context(|| args.output.display().to_string())?,
    );
    serde_json::to_writer_pretty(&mut out, &resolved)?;
    out.flush()?;
    info!("wrote {}", args.output.display());
    Ok(())
}
