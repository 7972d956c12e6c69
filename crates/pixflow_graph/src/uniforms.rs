// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uniform packing.
//!
//! A node's parameters are flattened into one `f32` vector in schema order.
//! Shaders index that vector by position, so the per-kind layout returned by
//! [`layout`] is a compatibility contract with both shader code and
//! persisted graphs.

use crate::node::{Node, NodeKind};
use crate::param::ParamValue;

/// Flatten a node's parameters into its uniform vector
pub fn pack(node: &Node) -> Vec<f32> {
    let mut out = Vec::with_capacity(uniform_count(node.kind()));
    for (_, value) in node.params() {
        push_value(&mut out, value);
    }
    out
}

/// Append one value's components
pub fn push_value(out: &mut Vec<f32>, value: &ParamValue) {
    match value {
        ParamValue::Scalar(v) => out.push(*v),
        ParamValue::Point([x, y]) => out.extend([*x, *y]),
        ParamValue::Color(color) => out.extend(color.channels()),
        ParamValue::Bool(flag) => out.push(if *flag { 1.0 } else { 0.0 }),
        ParamValue::Blend(mode) => out.push(mode.index() as f32),
        ParamValue::Fill(mode) => out.push(mode.index() as f32),
    }
}

/// Parameter names and widths in packing order
pub fn layout(kind: NodeKind) -> Vec<(&'static str, usize)> {
    kind.params()
        .iter()
        .map(|spec| (spec.name, spec.param_type().width()))
        .collect()
}

/// Length of the uniform vector of `kind`
pub fn uniform_count(kind: NodeKind) -> usize {
    kind.params().iter().map(|spec| spec.param_type().width()).sum()
}

/// Offset of a parameter inside the uniform vector of `kind`
pub fn offset_of(kind: NodeKind, name: &str) -> Option<usize> {
    let mut offset = 0;
    for spec in kind.params() {
        if spec.name == name {
            return Some(offset);
        }
        offset += spec.param_type().width();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::param::{BlendMode, Color};

    #[test]
    fn test_circle_layout() {
        let mut graph = Graph::new();
        let circle = graph.add_node(NodeKind::Circle);
        graph.set_parameter(circle, "position", [0.1_f32, -0.2]).unwrap();

        let uniforms = pack(graph.node(circle).unwrap());
        assert_eq!(
            uniforms,
            vec![
                0.25, 0.1, -0.2, 0.0, // radius, position, edge radius
                1.0, 1.0, 1.0, 1.0, // color
                0.5, 0.5, 0.5, 1.0, // edge color
                0.0, 0.0, 0.0, 1.0, // background
                1.0, // premultiply
            ]
        );
        assert_eq!(uniforms.len(), uniform_count(NodeKind::Circle));
    }

    #[test]
    fn test_blend_layout() {
        let mut graph = Graph::new();
        let blend = graph.add_node(NodeKind::Blend);
        graph.set_parameter(blend, "mode", BlendMode::Difference).unwrap();
        graph.set_parameter(blend, "bypass_transform", false).unwrap();

        let uniforms = pack(graph.node(blend).unwrap());
        assert_eq!(uniforms, vec![4.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(offset_of(NodeKind::Blend, "size"), Some(7));
    }

    #[test]
    fn test_pack_ignores_dirty_state() {
        let mut graph = Graph::new();
        let color = graph.add_node(NodeKind::Color);
        graph.set_parameter(color, "color", Color::rgba(0.2, 0.4, 0.6, 0.8)).unwrap();
        assert!(graph.node(color).unwrap().is_dirty());
        assert_eq!(pack(graph.node(color).unwrap()), vec![0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn test_layout_widths() {
        assert_eq!(
            layout(NodeKind::Transform),
            vec![("position", 2), ("rotation", 1), ("scale", 1), ("size", 2)]
        );
        assert_eq!(uniform_count(NodeKind::Camera), 3);
        assert_eq!(offset_of(NodeKind::Camera, "zoom"), None);
    }
}
