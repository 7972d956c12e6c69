// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render scheduling.
//!
//! A render pass brings one root node up to date: its input graph is walked
//! in post-order, clean nodes are reused as-is and every dirty node is sent to
//! the [`RenderBackend`] exactly once, after all of its inputs.

use crate::connection::InputRole;
use crate::graph::Graph;
use crate::node::{NodeCategory, NodeId, NodeKind};
use crate::uniforms;
use indexmap::IndexSet;
use std::sync::Arc;

/// Rendered RGBA8 pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGBA8 data, shared between clones
    pub data: Arc<[u8]>,
}

impl PixelBuffer {
    /// Wrap existing RGBA8 data
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    /// Size in bytes of a `width` x `height` RGBA8 image, `None` on overflow
    pub fn byte_len(width: u32, height: u32) -> Option<usize> {
        let width = usize::try_from(width).ok()?;
        let height = usize::try_from(height).ok()?;
        width.checked_mul(height)?.checked_mul(4)
    }

    /// Buffer filled with a single RGBA8 value, `None` if the size overflows
    pub fn try_solid(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        let len = Self::byte_len(width, height)?;
        let data: Vec<u8> = rgba.iter().copied().cycle().take(len).collect();
        Some(Self::new(width, height, data))
    }

    /// Buffer filled with a single RGBA8 value.
    ///
    /// # Panics
    ///
    /// Panics if the byte size does not fit in `usize`, see [`Self::try_solid`].
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        match Self::try_solid(width, height, rgba) {
            Some(buffer) => buffer,
            None => panic!("{width}x{height} pixel buffer overflows usize"),
        }
    }
}

/// Everything the backend needs to render one node
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Node being rendered
    pub node: NodeId,
    /// Kind of the node, selecting the shader
    pub kind: NodeKind,
    /// Packed parameters, see [`crate::uniforms`]
    pub uniforms: Vec<f32>,
    /// Input images in role order; the last pushed frame for resources
    pub inputs: Vec<PixelBuffer>,
}

/// External renderer, typically a GPU shader pipeline
pub trait RenderBackend {
    /// Render one node
    fn render(&mut self, request: &RenderRequest) -> Result<PixelBuffer, BackendError>;
}

impl<F> RenderBackend for F
where
    F: FnMut(&RenderRequest) -> Result<PixelBuffer, BackendError>,
{
    fn render(&mut self, request: &RenderRequest) -> Result<PixelBuffer, BackendError> {
        self(request)
    }
}

/// Failure reported by a render backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    /// Create a backend error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error during a render pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The backend failed to render a node
    #[error("Backend failed to render {node}: {source}")]
    Backend {
        /// Node that failed
        node: NodeId,
        /// Backend failure
        source: BackendError,
    },

    /// An effect slot has no input connected
    #[error("Node {node} has no {role} input")]
    MissingInput {
        /// Node that cannot render
        node: NodeId,
        /// Empty slot
        role: InputRole,
    },

    /// A resource node has not received a frame yet
    #[error("Resource {0} has no frame")]
    NoFrame(NodeId),

    /// The graph changed while the node was rendering
    #[error("Node {0} changed during the render pass")]
    Interrupted(NodeId),
}

/// Counters for one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RenderStats {
    /// Nodes sent to the backend and committed
    pub rendered: usize,
    /// Clean nodes reused from cache
    pub skipped: usize,
    /// Nodes that failed or could not render because an input failed
    pub failed: usize,
}

/// A dirty node ready to be sent to the backend
#[derive(Debug, Clone)]
pub(crate) struct RenderJob {
    pub request: RenderRequest,
    pub revision: u64,
}

/// What a render pass should do with one node
#[derive(Debug)]
pub(crate) enum Step {
    /// Node is clean
    Skip,
    /// An input is still dirty, nothing to do this pass
    Blocked,
    /// Node can be rendered
    Render(RenderJob),
}

/// Per-node state transitions of a render pass
pub(crate) trait PassState {
    /// Decide what to do with one node
    fn prepare(&mut self, node_id: NodeId) -> Result<Step, RenderError>;
    /// Store a rendered result, returning whether it was accepted
    fn commit(&mut self, node_id: NodeId, revision: u64, pixels: PixelBuffer) -> bool;
}

impl PassState for Graph {
    fn prepare(&mut self, node_id: NodeId) -> Result<Step, RenderError> {
        self.prepare_render(node_id)
    }

    fn commit(&mut self, node_id: NodeId, revision: u64, pixels: PixelBuffer) -> bool {
        self.commit_render(node_id, revision, pixels)
    }
}

/// Run the planned nodes through the backend, returning the first failure
pub(crate) fn drive_pass(
    state: &mut impl PassState,
    root: NodeId,
    order: Vec<NodeId>,
    backend: &mut dyn RenderBackend,
) -> Option<RenderError> {
    let mut stats = RenderStats::default();
    let mut first_error = None;

    for node_id in order {
        let job = match state.prepare(node_id) {
            Ok(Step::Skip) => {
                stats.skipped += 1;
                continue;
            }
            Ok(Step::Blocked) => {
                stats.failed += 1;
                continue;
            }
            Ok(Step::Render(job)) => job,
            Err(err) => {
                tracing::warn!("Cannot render {node_id}: {err}");
                stats.failed += 1;
                first_error.get_or_insert(err);
                continue;
            }
        };

        match backend.render(&job.request) {
            Ok(pixels) => {
                if state.commit(node_id, job.revision, pixels) {
                    stats.rendered += 1;
                } else {
                    stats.failed += 1;
                }
            }
            Err(source) => {
                tracing::warn!("Backend failed to render {node_id}: {source}");
                stats.failed += 1;
                first_error.get_or_insert(RenderError::Backend {
                    node: node_id,
                    source,
                });
            }
        }
    }

    tracing::debug!(
        root = %root,
        rendered = stats.rendered,
        skipped = stats.skipped,
        failed = stats.failed,
        "render pass finished"
    );
    first_error
}

impl Graph {
    /// Bring `root` up to date and return its pixels.
    ///
    /// On failure the failing node and everything depending on it stay dirty
    /// and the first error is returned; independent branches of the graph
    /// that rendered successfully keep their new results.
    pub fn render_pass(
        &mut self,
        root: NodeId,
        backend: &mut dyn RenderBackend,
    ) -> Result<PixelBuffer, RenderError> {
        let order = self.plan_render(root)?;
        let first_error = drive_pass(self, root, order, backend);
        self.root_result(root, first_error)
    }

    /// Post-order list of `root` and its transitive inputs, each listed once
    pub(crate) fn plan_render(&self, root: NodeId) -> Result<Vec<NodeId>, RenderError> {
        if !self.contains(root) {
            return Err(RenderError::NodeNotFound(root));
        }
        let mut visited = IndexSet::new();
        let mut order = Vec::new();
        // (node, inputs already pushed)
        let mut stack = vec![(root, false)];
        while let Some((node_id, expanded)) = stack.pop() {
            if expanded {
                order.push(node_id);
                continue;
            }
            if !visited.insert(node_id) {
                continue;
            }
            let Some(node) = self.node(node_id) else {
                continue;
            };
            stack.push((node_id, true));
            let inputs: Vec<NodeId> = node.input_ids().collect();
            for input in inputs.into_iter().rev() {
                if !visited.contains(&input) {
                    stack.push((input, false));
                }
            }
        }
        Ok(order)
    }

    /// Decide what to do with one node of a planned pass
    pub(crate) fn prepare_render(&self, node_id: NodeId) -> Result<Step, RenderError> {
        let node = self.node(node_id).ok_or(RenderError::NodeNotFound(node_id))?;
        if !node.is_dirty() {
            return Ok(Step::Skip);
        }

        let mut inputs = Vec::new();
        if node.category() == NodeCategory::Resource {
            let frame = node.frame().ok_or(RenderError::NoFrame(node_id))?;
            inputs.push(frame.pixels.clone());
        }
        for (role, input) in node.inputs() {
            let input_id = input.ok_or(RenderError::MissingInput { node: node_id, role })?;
            let upstream = self.node(input_id).ok_or(RenderError::NodeNotFound(input_id))?;
            match upstream.cached_result() {
                Some(pixels) if !upstream.is_dirty() => inputs.push(pixels.clone()),
                _ => return Ok(Step::Blocked),
            }
        }

        Ok(Step::Render(RenderJob {
            request: RenderRequest {
                node: node_id,
                kind: node.kind(),
                uniforms: uniforms::pack(node),
                inputs,
            },
            revision: node.revision(),
        }))
    }

    /// Store a rendered result unless the node changed since it was prepared
    pub(crate) fn commit_render(
        &mut self,
        node_id: NodeId,
        revision: u64,
        pixels: PixelBuffer,
    ) -> bool {
        let Some(node) = self.node_mut(node_id) else {
            return false;
        };
        if node.revision != revision {
            tracing::warn!("Discarding stale render of {node_id}");
            return false;
        }
        node.cached = Some(pixels);
        node.dirty = false;
        tracing::debug!(node = %node_id, kind = %node.kind(), "rendered");
        true
    }

    pub(crate) fn root_result(
        &self,
        root: NodeId,
        first_error: Option<RenderError>,
    ) -> Result<PixelBuffer, RenderError> {
        let node = self.node(root).ok_or(RenderError::NodeNotFound(root))?;
        match node.cached_result() {
            Some(pixels) if !node.is_dirty() => Ok(pixels.clone()),
            _ => Err(first_error.unwrap_or(RenderError::Interrupted(root))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Color;

    fn counting_backend(
        calls: &mut Vec<NodeId>,
    ) -> impl FnMut(&RenderRequest) -> Result<PixelBuffer, BackendError> + '_ {
        move |request: &RenderRequest| -> Result<PixelBuffer, BackendError> {
            calls.push(request.node);
            Ok(PixelBuffer::solid(2, 2, [255, 255, 255, 255]))
        }
    }

    #[test]
    fn test_buffer_size_overflow() {
        assert_eq!(PixelBuffer::byte_len(4, 3), Some(48));
        assert_eq!(PixelBuffer::try_solid(2, 1, [1, 2, 3, 4]).unwrap().data.len(), 8);
        assert_eq!(PixelBuffer::byte_len(u32::MAX, u32::MAX), None);
        assert!(PixelBuffer::try_solid(u32::MAX, u32::MAX, [0; 4]).is_none());
    }

    #[test]
    fn test_clean_graph_renders_nothing() {
        let mut graph = Graph::new();
        let color = graph.add_node(NodeKind::Color);
        let mut calls = Vec::new();
        graph.render_pass(color, &mut counting_backend(&mut calls)).unwrap();
        assert_eq!(calls.len(), 1);

        calls.clear();
        graph.render_pass(color, &mut counting_backend(&mut calls)).unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn test_shared_input_rendered_once() {
        let mut graph = Graph::new();
        let src = graph.add_node(NodeKind::Color);
        let blend = graph.add_node(NodeKind::Blend);
        graph.connect(blend, InputRole::A, Some(src)).unwrap();
        graph.connect(blend, InputRole::B, Some(src)).unwrap();

        let mut calls = Vec::new();
        graph.render_pass(blend, &mut counting_backend(&mut calls)).unwrap();
        assert_eq!(calls, vec![src, blend]);
    }

    #[test]
    fn test_request_carries_uniforms_and_inputs() {
        let mut graph = Graph::new();
        let src = graph.add_node(NodeKind::Color);
        graph.set_parameter(src, "color", Color::RED).unwrap();
        let fx = graph.add_node(NodeKind::Transform);
        graph.connect(fx, InputRole::Single, Some(src)).unwrap();

        let mut requests = Vec::new();
        let mut backend = |request: &RenderRequest| -> Result<PixelBuffer, BackendError> {
            requests.push(request.clone());
            Ok(PixelBuffer::solid(1, 1, [255, 0, 0, 255]))
        };
        graph.render_pass(fx, &mut backend).unwrap();

        assert_eq!(requests[0].uniforms, vec![1.0, 0.0, 0.0, 1.0]);
        assert!(requests[0].inputs.is_empty());
        assert_eq!(requests[1].kind, NodeKind::Transform);
        assert_eq!(requests[1].inputs, vec![PixelBuffer::solid(1, 1, [255, 0, 0, 255])]);
    }

    #[test]
    fn test_backend_failure_keeps_node_dirty() {
        let mut graph = Graph::new();
        let good = graph.add_node(NodeKind::Color);
        let bad = graph.add_node(NodeKind::Circle);
        let blend = graph.add_node(NodeKind::Blend);
        graph.connect(blend, InputRole::A, Some(good)).unwrap();
        graph.connect(blend, InputRole::B, Some(bad)).unwrap();

        let mut calls = Vec::new();
        let mut backend = |request: &RenderRequest| -> Result<PixelBuffer, BackendError> {
            calls.push(request.node);
            if request.kind == NodeKind::Circle {
                Err(BackendError::new("shader compile failed"))
            } else {
                Ok(PixelBuffer::solid(1, 1, [0, 0, 0, 255]))
            }
        };
        let err = graph.render_pass(blend, &mut backend).unwrap_err();

        assert!(matches!(err, RenderError::Backend { node, .. } if node == bad));
        assert_eq!(calls, vec![good, bad]);
        assert!(!graph.node(good).unwrap().is_dirty());
        assert!(graph.node(bad).unwrap().is_dirty());
        assert!(graph.node(bad).unwrap().cached_result().is_none());
        assert!(graph.node(blend).unwrap().is_dirty());
    }

    #[test]
    fn test_failure_leaves_previous_cache() {
        let mut graph = Graph::new();
        let color = graph.add_node(NodeKind::Color);
        let first = PixelBuffer::solid(1, 1, [1, 2, 3, 4]);
        let expected = first.clone();
        let mut backend =
            |_: &RenderRequest| -> Result<PixelBuffer, BackendError> { Ok(first.clone()) };
        graph.render_pass(color, &mut backend).unwrap();

        graph.set_parameter(color, "color", Color::BLACK).unwrap();
        let mut failing = |_: &RenderRequest| -> Result<PixelBuffer, BackendError> {
            Err(BackendError::new("device lost"))
        };
        assert!(graph.render_pass(color, &mut failing).is_err());
        assert_eq!(graph.node(color).unwrap().cached_result(), Some(&expected));
        assert!(graph.node(color).unwrap().is_dirty());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let mut graph = Graph::new();
        let fx = graph.add_node(NodeKind::HueSaturation);
        let mut calls = Vec::new();
        let err = graph.render_pass(fx, &mut counting_backend(&mut calls)).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingInput {
                node: fx,
                role: InputRole::Single
            }
        );
        assert!(calls.is_empty());
    }

    #[test]
    fn test_unknown_root() {
        let mut graph = Graph::new();
        let mut calls = Vec::new();
        let id = NodeId::new();
        let err = graph.render_pass(id, &mut counting_backend(&mut calls)).unwrap_err();
        assert_eq!(err, RenderError::NodeNotFound(id));
    }
}
