// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node kind listing.

use super::common::format_value;
use clap::Args;
use pixflow_graph::{uniforms, NodeKind};

/// List node kinds.
#[derive(Args)]
pub struct KindsArgs {
    /// Show the parameters of a single kind
    #[arg(value_name = "KIND")]
    pub kind: Option<String>,
}

/// Run the kinds command.
pub fn run(args: KindsArgs) -> anyhow::Result<()> {
    let Some(tag) = &args.kind else {
        for kind in NodeKind::ALL {
            let roles: Vec<_> = kind.roles().iter().map(|role| role.as_str()).collect();
            println!(
                "  {:16}  {:10}  inputs: [{}]",
                kind.tag(),
                format!("{:?}", kind.category()),
                roles.join(", ")
            );
        }
        return Ok(());
    };

    let kind = NodeKind::from_tag(tag).ok_or_else(|| anyhow::anyhow!("Unknown node kind: {tag}"))?;
    println!("{} ({:?})", kind.display_name(), kind.category());
    println!();
    println!("  {:18}  {:8}  {:28}  {}", "Name", "Type", "Default", "Offset");
    for spec in kind.params() {
        let offset = uniforms::offset_of(kind, spec.name).unwrap_or_default();
        println!(
            "  {:18}  {:8}  {:28}  {}",
            spec.name,
            spec.param_type().to_string(),
            format_value(&spec.default),
            offset
        );
    }
    println!();
    println!("  {} uniforms", uniforms::uniform_count(kind));
    Ok(())
}
