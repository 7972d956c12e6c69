// SPDX-License-Identifier: MIT OR Apache-2.0
//! Helpers shared by the record commands.

use anyhow::Context;
use pixflow_graph::{Graph, GraphConfig, NodeId, NodeRecord, ParamValue};
use std::path::{Path, PathBuf};

/// Load a record and decode it into a fresh graph
pub fn load_graph(record: &Path, config: Option<&PathBuf>) -> anyhow::Result<(Graph, NodeId)> {
    let config = match config {
        Some(path) => GraphConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GraphConfig::default(),
    };
    let record =
        NodeRecord::load(record).with_context(|| format!("loading {}", record.display()))?;

    let mut graph = Graph::with_config(config);
    let root = graph.decode(&record)?;
    tracing::debug!("Decoded {} nodes", graph.node_count());
    Ok((graph, root))
}

/// Short text form of a parameter value
pub fn format_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Scalar(v) => format!("{v}"),
        ParamValue::Point([x, y]) => format!("({x}, {y})"),
        ParamValue::Color(c) => format!("rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a),
        ParamValue::Bool(v) => format!("{v}"),
        ParamValue::Blend(mode) => format!("{mode:?} `{}`", mode.symbol()),
        ParamValue::Fill(mode) => format!("{mode:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixflow_graph::{BlendMode, Color};

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&ParamValue::Point([1.0, -0.5])), "(1, -0.5)");
        assert_eq!(format_value(&ParamValue::Color(Color::BLACK)), "rgba(0, 0, 0, 1)");
        assert_eq!(
            format_value(&ParamValue::Blend(BlendMode::SubtractWithAlpha)),
            "SubtractWithAlpha `--`"
        );
    }
}
