// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph-building operators.
//!
//! Each function creates a fresh node wired to the given inputs and returns
//! its ID. The inputs themselves are never modified and identical requests
//! are never shared.

use crate::connection::InputRole;
use crate::graph::{ConnectionError, Graph};
use crate::node::{NodeId, NodeKind};
use crate::param::{BlendMode, ParamError, ParamValue};

/// Blend `a` over/under/... `b` with a new blend node.
///
/// The node is named after the operator symbol of `mode` and takes its fill
/// mode and transform bypass from [`crate::config::OperatorConfig`].
pub fn blend(
    graph: &mut Graph,
    a: NodeId,
    b: NodeId,
    mode: BlendMode,
) -> Result<NodeId, ConnectionError> {
    for input in [a, b] {
        if !graph.contains(input) {
            return Err(ConnectionError::NodeNotFound(input));
        }
    }

    let defaults = graph.config().operators.clone();
    let node = graph.add_node(NodeKind::Blend);
    graph.set_name(node, mode.symbol());
    if let Some(blend) = graph.node_mut(node) {
        blend.params.insert("mode", ParamValue::Blend(mode));
        blend.params.insert("fill_mode", ParamValue::Fill(defaults.fill_mode));
        blend.params.insert("bypass_transform", ParamValue::Bool(defaults.bypass_transform));
    }
    graph.connect(node, InputRole::A, Some(a))?;
    graph.connect(node, InputRole::B, Some(b))?;

    tracing::trace!("{a} {} {b} -> {node}", mode.symbol());
    Ok(node)
}

macro_rules! blend_operators {
    ($($(#[$doc:meta])* $name:ident => $mode:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(
                graph: &mut Graph,
                a: NodeId,
                b: NodeId,
            ) -> Result<NodeId, ConnectionError> {
                blend(graph, a, b, BlendMode::$mode)
            }
        )*
    };
}

blend_operators! {
    /// `a & b`
    over => Over,
    /// `a !& b`
    under => Under,
    /// `a + b`
    add => Add,
    /// `a * b`
    multiply => Multiply,
    /// `a % b`
    difference => Difference,
    /// `a -- b`
    subtract_with_alpha => SubtractWithAlpha,
    /// `a - b`
    subtract => Subtract,
    /// `a >< b`
    maximum => Maximum,
    /// `a <> b`
    minimum => Minimum,
    /// `a !** b`
    gamma => Gamma,
    /// `a ** b`
    power => Power,
}

fn transform(
    graph: &mut Graph,
    input: NodeId,
    name: &str,
    value: ParamValue,
) -> Result<NodeId, OperatorError> {
    if !graph.contains(input) {
        return Err(ConnectionError::NodeNotFound(input).into());
    }
    let node = graph.create_node(NodeKind::Transform, [(name, value)])?;
    graph.connect(node, InputRole::Single, Some(input))?;
    Ok(node)
}

/// Move `input` with a new transform node
pub fn position(graph: &mut Graph, input: NodeId, at: [f32; 2]) -> Result<NodeId, OperatorError> {
    transform(graph, input, "position", ParamValue::Point(at))
}

/// Rotate `input` with a new transform node
pub fn rotate(graph: &mut Graph, input: NodeId, rotation: f32) -> Result<NodeId, OperatorError> {
    transform(graph, input, "rotation", ParamValue::Scalar(rotation))
}

/// Scale `input` with a new transform node
pub fn scale(graph: &mut Graph, input: NodeId, by: f32) -> Result<NodeId, OperatorError> {
    transform(graph, input, "scale", ParamValue::Scalar(by))
}

/// Error when building a transform shortcut
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperatorError {
    /// The input could not be connected
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The transform value was rejected
    #[error(transparent)]
    Param(#[from] ParamError),
}
