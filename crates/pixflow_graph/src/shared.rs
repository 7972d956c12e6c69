// SPDX-License-Identifier: MIT OR Apache-2.0
//! Thread-safe graph handle.
//!
//! The graph lock is only held for individual node transitions (planning a
//! pass, preparing one node, committing one result). Backend calls run
//! unlocked so that parameter changes and frame pushes from other threads
//! are applied between node renders, never in the middle of one. A node
//! that changed while its render was in flight refuses the stale result.

use crate::connection::InputRole;
use crate::graph::{ConnectionError, Graph};
use crate::node::{Node, NodeId};
use crate::param::{ParamError, ParamValue};
use crate::render::{self, PassState, PixelBuffer, RenderBackend, RenderError, Step};
use crate::resource::{ResourceError, ResourceFrame};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Request to run a render pass, emitted when a resource receives a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSchedule {
    /// Resource node that received the frame
    pub source: NodeId,
}

/// Shared, lockable graph
#[derive(Clone, Default)]
pub struct SharedGraph {
    graph: Arc<Mutex<Graph>>,
    passes: Arc<Mutex<HashMap<NodeId, Arc<Mutex<()>>>>>,
    schedule: Arc<Mutex<Option<mpsc::UnboundedSender<RenderSchedule>>>>,
}

impl SharedGraph {
    /// Wrap a graph
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: Arc::new(Mutex::new(graph)),
            ..Self::default()
        }
    }

    /// Read the graph under the lock
    pub fn with<R>(&self, f: impl FnOnce(&Graph) -> R) -> R {
        f(&self.graph.lock())
    }

    /// Modify the graph under the lock
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        f(&mut self.graph.lock())
    }

    /// See [`Graph::set_parameter`]
    pub fn set_parameter(
        &self,
        node_id: NodeId,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<bool, ParamError> {
        self.graph.lock().set_parameter(node_id, name, value)
    }

    /// See [`Graph::connect`]
    pub fn connect(
        &self,
        node_id: NodeId,
        role: InputRole,
        input: Option<NodeId>,
    ) -> Result<(), ConnectionError> {
        self.graph.lock().connect(node_id, role, input)
    }

    /// Receiver for render requests triggered by resource frames.
    ///
    /// Only the most recently created receiver is fed.
    pub fn render_schedule(&self) -> mpsc::UnboundedReceiver<RenderSchedule> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.schedule.lock() = Some(tx);
        rx
    }

    /// Store a frame on a resource node and request a render pass
    pub fn push_frame(
        &self,
        node_id: NodeId,
        frame: ResourceFrame,
    ) -> Result<(), ResourceError> {
        let schedule_on_push = {
            let mut graph = self.graph.lock();
            graph.push_frame(node_id, frame)?;
            graph.config().resources.schedule_on_push
        };

        if schedule_on_push {
            let mut schedule = self.schedule.lock();
            let closed = schedule
                .as_ref()
                .is_some_and(|tx| tx.send(RenderSchedule { source: node_id }).is_err());
            if closed {
                tracing::debug!("Render schedule receiver dropped");
                *schedule = None;
            }
        }
        Ok(())
    }

    /// Remove a node, see [`Graph::remove_node`]
    pub fn remove_node(&self, node_id: NodeId) -> Option<Node> {
        let removed = self.graph.lock().remove_node(node_id);
        self.passes.lock().remove(&node_id);
        removed
    }

    /// Bring `root` up to date, see [`Graph::render_pass`].
    ///
    /// Passes on the same root are serialized; passes on different roots may
    /// run concurrently.
    pub fn render_pass(
        &self,
        root: NodeId,
        backend: &mut dyn RenderBackend,
    ) -> Result<PixelBuffer, RenderError> {
        let pass_lock = self.passes.lock().entry(root).or_default().clone();
        let result = {
            let _pass = pass_lock.lock();
            self.run_pass(root, backend)
        };
        self.release_pass_lock(root, pass_lock);
        result
    }

    fn run_pass(
        &self,
        root: NodeId,
        backend: &mut dyn RenderBackend,
    ) -> Result<PixelBuffer, RenderError> {
        let order = self.graph.lock().plan_render(root)?;
        let mut state = Locked(&self.graph);
        let first_error = render::drive_pass(&mut state, root, order, backend);
        self.graph.lock().root_result(root, first_error)
    }

    /// Forget the pass lock of `root` unless another pass is waiting on it
    fn release_pass_lock(&self, root: NodeId, pass_lock: Arc<Mutex<()>>) {
        let mut passes = self.passes.lock();
        // Clones are only dropped under the map lock, so the count is exact
        drop(pass_lock);
        if passes.get(&root).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            passes.remove(&root);
        }
    }
}

struct Locked<'a>(&'a Mutex<Graph>);

impl PassState for Locked<'_> {
    fn prepare(&mut self, node_id: NodeId) -> Result<Step, RenderError> {
        self.0.lock().prepare_render(node_id)
    }

    fn commit(&mut self, node_id: NodeId, revision: u64, pixels: PixelBuffer) -> bool {
        self.0.lock().commit_render(node_id, revision, pixels)
    }
}
