// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frames pushed into resource nodes by external sources such as cameras.

use crate::graph::Graph;
use crate::node::{NodeCategory, NodeId, NodeKind};
use crate::param::ParamValue;
use crate::render::PixelBuffer;

/// Metadata accompanying a captured frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameMetadata {
    /// Monotonic frame counter of the source
    pub sequence: u64,
    /// Device orientation when the frame was captured, if the source knows it
    pub orientation: Option<f32>,
}

/// One frame delivered by a resource source
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFrame {
    /// Captured pixels
    pub pixels: PixelBuffer,
    /// Capture metadata
    pub metadata: FrameMetadata,
}

impl ResourceFrame {
    /// Create a frame
    pub fn new(pixels: PixelBuffer, metadata: FrameMetadata) -> Self {
        Self { pixels, metadata }
    }
}

impl Graph {
    /// Store a new frame on a resource node and mark it dirty.
    ///
    /// A changed orientation in the frame metadata is written to the node's
    /// `orientation` parameter.
    pub fn push_frame(
        &mut self,
        node_id: NodeId,
        frame: ResourceFrame,
    ) -> Result<(), ResourceError> {
        let node = self.node_mut(node_id).ok_or(ResourceError::NodeNotFound(node_id))?;
        if node.category() != NodeCategory::Resource {
            return Err(ResourceError::NotAResource(node_id, node.kind()));
        }

        if let Some(orientation) = frame.metadata.orientation.filter(|o| o.is_finite()) {
            node.params.insert("orientation", ParamValue::Scalar(orientation));
        }
        tracing::trace!(node = %node_id, sequence = frame.metadata.sequence, "frame pushed");
        node.frame = Some(frame);
        self.mark_dirty(node_id);
        Ok(())
    }
}

/// Error when pushing a frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Frames can only be pushed to resource nodes
    #[error("Node {0} is a {1} node, not a resource")]
    NotAResource(NodeId, NodeKind),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::InputRole;
    use crate::render::{BackendError, RenderRequest};

    fn frame(sequence: u64, orientation: Option<f32>) -> ResourceFrame {
        ResourceFrame::new(
            PixelBuffer::solid(4, 3, [10, 20, 30, 255]),
            FrameMetadata { sequence, orientation },
        )
    }

    #[test]
    fn test_push_frame_marks_downstream_dirty() {
        let mut graph = Graph::new();
        let camera = graph.add_node(NodeKind::Camera);
        let fx = graph.add_node(NodeKind::HueSaturation);
        graph.connect(fx, InputRole::Single, Some(camera)).unwrap();
        graph.push_frame(camera, frame(1, None)).unwrap();

        let mut inputs = Vec::new();
        let mut backend = |request: &RenderRequest| -> Result<PixelBuffer, BackendError> {
            inputs.push(request.inputs.len());
            Ok(PixelBuffer::solid(1, 1, [0, 0, 0, 255]))
        };
        graph.render_pass(fx, &mut backend).unwrap();
        assert_eq!(inputs, vec![1, 1]);
        assert!(!graph.node(fx).unwrap().is_dirty());

        graph.push_frame(camera, frame(2, None)).unwrap();
        assert!(graph.node(camera).unwrap().is_dirty());
        assert!(graph.node(fx).unwrap().is_dirty());
        assert_eq!(graph.node(camera).unwrap().frame().unwrap().metadata.sequence, 2);
    }

    #[test]
    fn test_push_frame_updates_orientation() {
        let mut graph = Graph::new();
        let camera = graph.add_node(NodeKind::Camera);
        graph.push_frame(camera, frame(1, Some(3.0))).unwrap();
        assert_eq!(
            graph.node(camera).unwrap().param("orientation"),
            Some(&ParamValue::Scalar(3.0))
        );
    }

    #[test]
    fn test_push_frame_rejects_generators() {
        let mut graph = Graph::new();
        let color = graph.add_node(NodeKind::Color);
        assert_eq!(
            graph.push_frame(color, frame(1, None)),
            Err(ResourceError::NotAResource(color, NodeKind::Color))
        );
        assert!(graph.node(color).unwrap().frame().is_none());
    }

    #[test]
    fn test_camera_without_frame_cannot_render() {
        let mut graph = Graph::new();
        let camera = graph.add_node(NodeKind::Camera);
        let mut backend = |_: &RenderRequest| -> Result<PixelBuffer, BackendError> {
            Ok(PixelBuffer::solid(1, 1, [0, 0, 0, 255]))
        };
        assert_eq!(
            graph.render_pass(camera, &mut backend),
            Err(crate::render::RenderError::NoFrame(camera))
        );
    }
}
