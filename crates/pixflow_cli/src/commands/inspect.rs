// SPDX-License-Identifier: MIT OR Apache-2.0
//! Print a decoded node tree.

use super::common::{format_value, load_graph};
use clap::Args;
use pixflow_graph::{uniforms, Graph, InputRole, NodeId};
use std::path::PathBuf;

/// Inspect a record file.
#[derive(Args)]
pub struct InspectArgs {
    /// Record to inspect (`.ron` or `.json`)
    pub file: PathBuf,

    /// Graph configuration (RON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also print each node's packed uniform vector
    #[arg(short, long)]
    pub uniforms: bool,
}

/// Run the inspect command.
pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let (graph, root) = load_graph(&args.file, args.config.as_ref())?;

    println!("File:  {}", args.file.display());
    println!("Nodes: {}", graph.node_count());
    println!();
    let mut out = String::new();
    write_tree(&graph, root, args.uniforms, &mut out);
    print!("{out}");
    Ok(())
}

enum Entry {
    Node(NodeId, Option<InputRole>, usize),
    Empty(InputRole, usize),
}

fn write_tree(graph: &Graph, root: NodeId, with_uniforms: bool, out: &mut String) {
    let mut stack = vec![Entry::Node(root, None, 0)];
    while let Some(entry) = stack.pop() {
        let (node_id, role, depth) = match entry {
            Entry::Node(node_id, role, depth) => (node_id, role, depth),
            Entry::Empty(role, depth) => {
                let indent = "  ".repeat(depth);
                out.push_str(&format!("{indent}{role}: (empty)\n"));
                continue;
            }
        };
        let Some(node) = graph.node(node_id) else {
            continue;
        };

        let indent = "  ".repeat(depth);
        let label = role.map(|role| format!("{role}: ")).unwrap_or_default();
        out.push_str(&format!("{indent}{label}{} [{}]\n", node.name, node.kind().tag()));
        for (name, value) in node.params() {
            out.push_str(&format!("{indent}    {name} = {}\n", format_value(value)));
        }
        if with_uniforms {
            out.push_str(&format!("{indent}    uniforms {:?}\n", uniforms::pack(node)));
        }

        let inputs: Vec<_> = node.inputs().collect();
        for (input_role, input) in inputs.into_iter().rev() {
            stack.push(match input {
                Some(input_id) => Entry::Node(input_id, Some(input_role), depth + 1),
                None => Entry::Empty(input_role, depth + 1),
            });
        }
    }
}
