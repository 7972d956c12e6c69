// SPDX-License-Identifier: MIT OR Apache-2.0
//! Convert records between RON and JSON.

use anyhow::Context;
use clap::Args;
use pixflow_graph::NodeRecord;
use std::path::PathBuf;

/// Convert a record file.
#[derive(Args)]
pub struct ConvertArgs {
    /// Source record (`.ron` or `.json`)
    pub input: PathBuf,

    /// Destination record, format picked from the extension
    pub output: PathBuf,

    /// Decode the record first and write it back out normalized
    #[arg(long)]
    pub normalize: bool,
}

/// Run the convert command.
pub fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let record = if args.normalize {
        let (graph, root) = super::common::load_graph(&args.input, None)?;
        graph
            .encode(root)
            .context("decoded root disappeared from the graph")?
    } else {
        NodeRecord::load(&args.input).with_context(|| format!("loading {}", args.input.display()))?
    };

    record
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    tracing::info!(
        "Wrote {} nodes to {}",
        record.node_count(),
        args.output.display()
    );
    Ok(())
}
