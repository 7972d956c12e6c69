// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph arena holding nodes and the edges between them.
//!
//! Nodes refer to each other only by [`NodeId`]. Each node keeps its inputs
//! (owning direction of the data flow) and a back-reference set of consumers
//! that is used for dirty propagation only.

use crate::config::GraphConfig;
use crate::connection::{Connection, InputRole};
use crate::node::{Node, NodeId, NodeKind};
use crate::param::{ParamError, ParamValue};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// A processing graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    config: GraphConfig,
    nodes: IndexMap<NodeId, Node>,
}

impl Graph {
    /// Create a new empty graph with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty graph
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: IndexMap::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Add a node of `kind` with default parameters
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let node = Node::new(kind);
        let id = node.id();
        self.insert_node(node);
        id
    }

    /// Add a node of `kind`, overriding some of its default parameters.
    ///
    /// Overrides are validated like [`Graph::set_parameter`]; if any of them is
    /// rejected no node is created.
    pub fn create_node<'a, I>(&mut self, kind: NodeKind, initial: I) -> Result<NodeId, ParamError>
    where
        I: IntoIterator<Item = (&'a str, ParamValue)>,
    {
        let mut node = Node::new(kind);
        for (name, value) in initial {
            let spec = kind
                .param(name)
                .ok_or_else(|| ParamError::UnknownParameter(name.to_string()))?;
            node.params.insert(spec.name, spec.validate(value)?);
        }
        let id = node.id();
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node, detaching it from its inputs and consumers.
    ///
    /// Every consumer slot that pointed at the node is emptied and the consumer
    /// is marked dirty.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let mut node = self.nodes.shift_remove(&node_id)?;

        for input in node.input_ids() {
            if let Some(upstream) = self.nodes.get_mut(&input) {
                upstream.consumers.shift_remove(&node_id);
            }
        }

        let consumers: Vec<NodeId> = node.consumers.drain(..).collect();
        for consumer_id in consumers {
            if let Some(consumer) = self.nodes.get_mut(&consumer_id) {
                for slot in consumer.inputs.values_mut() {
                    if *slot == Some(node_id) {
                        *slot = None;
                    }
                }
            }
            self.mark_dirty(consumer_id);
        }

        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Check whether a node exists
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes nothing consumes
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .values()
            .filter(|node| node.consumers.is_empty())
            .map(Node::id)
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id(), node);
    }

    /// Fill an empty slot of a freshly inserted node, skipping cycle checks
    pub(crate) fn link(&mut self, node_id: NodeId, role: InputRole, input: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.inputs.insert(role, Some(input));
        }
        if let Some(upstream) = self.nodes.get_mut(&input) {
            upstream.consumers.insert(node_id);
        }
    }

    /// Rename a node. Names are labels only and never dirty the node.
    pub fn set_name(&mut self, node_id: NodeId, name: impl Into<String>) -> bool {
        match self.nodes.get_mut(&node_id) {
            Some(node) => {
                node.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Set a parameter value.
    ///
    /// Returns `Ok(true)` when the stored value changed, in which case the node
    /// and everything downstream of it is marked dirty. Writing the current
    /// value is a no-op returning `Ok(false)`.
    pub fn set_parameter(
        &mut self,
        node_id: NodeId,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<bool, ParamError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(ParamError::NodeNotFound(node_id))?;
        let spec = node
            .kind()
            .param(name)
            .ok_or_else(|| ParamError::UnknownParameter(name.to_string()))?;
        let value = spec.validate(value.into())?;

        if node.params.get(spec.name) == Some(&value) {
            return Ok(false);
        }
        node.params.insert(spec.name, value);
        self.mark_dirty(node_id);
        Ok(true)
    }

    /// Connect `input` to `node`'s `role` slot, or empty the slot with `None`.
    ///
    /// Fails without touching the graph if the role does not exist on the
    /// node's kind or if the edge would make `node` depend on itself.
    pub fn connect(
        &mut self,
        node_id: NodeId,
        role: InputRole,
        input: Option<NodeId>,
    ) -> Result<(), ConnectionError> {
        let target = self
            .nodes
            .get(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))?;
        if !target.kind().has_role(role) {
            return Err(ConnectionError::InvalidRole {
                kind: target.kind(),
                role,
            });
        }
        if let Some(input_id) = input {
            if !self.nodes.contains_key(&input_id) {
                return Err(ConnectionError::NodeNotFound(input_id));
            }
            if self.feeds(node_id, input_id) {
                return Err(CycleError {
                    node: node_id,
                    input: input_id,
                }
                .into());
            }
        }

        let previous = target.input(role);
        if previous == input {
            return Ok(());
        }

        let mut still_feeds = false;
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.inputs.insert(role, input);
            still_feeds = previous.is_some_and(|prev| node.input_ids().any(|id| id == prev));
        }
        if let Some(prev) = previous.filter(|_| !still_feeds) {
            if let Some(upstream) = self.nodes.get_mut(&prev) {
                upstream.consumers.shift_remove(&node_id);
            }
        }
        if let Some(input_id) = input {
            if let Some(upstream) = self.nodes.get_mut(&input_id) {
                upstream.consumers.insert(node_id);
            }
        }

        self.mark_dirty(node_id);
        Ok(())
    }

    /// Empty `node`'s `role` slot
    pub fn disconnect(&mut self, node_id: NodeId, role: InputRole) -> Result<(), ConnectionError> {
        self.connect(node_id, role, None)
    }

    /// Whether `ancestor` is `node` or reachable from it through inputs
    pub fn depends_on(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut visited = IndexSet::new();
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.input_ids());
            }
        }
        false
    }

    /// Whether `target` is `node` or reachable from it through consumers.
    ///
    /// Same question as `depends_on(target, node)`, answered by walking
    /// downstream, which is cheap for freshly created nodes.
    fn feeds(&self, node_id: NodeId, target: NodeId) -> bool {
        let mut visited = IndexSet::new();
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.consumers.iter().copied());
            }
        }
        false
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.nodes.values().flat_map(|node| {
            node.inputs().filter_map(move |(role, input)| {
                input.map(|from| Connection::new(from, node.id(), role))
            })
        })
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = Connection> + '_ {
        self.connections().filter(move |c| c.involves_node(node_id))
    }

    /// Mark a node stale, along with everything downstream of it.
    ///
    /// Propagation walks `consumers` breadth-first and stops at nodes that are
    /// already dirty. Every node reached has its revision bumped, dirty or
    /// not, so that a render of it already in flight is not committed.
    /// Returns the nodes that went from clean to dirty.
    pub fn mark_dirty(&mut self, node_id: NodeId) -> Vec<NodeId> {
        let mut flipped = Vec::new();
        let mut queue = VecDeque::new();

        match self.nodes.get_mut(&node_id) {
            Some(node) => {
                node.revision += 1;
                if !node.dirty {
                    node.dirty = true;
                    flipped.push(node_id);
                }
                queue.extend(node.consumers.iter().copied());
            }
            None => return flipped,
        }

        let mut visited = IndexSet::new();
        visited.insert(node_id);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };
            if node.dirty {
                node.revision += 1;
                continue;
            }
            node.dirty = true;
            node.revision += 1;
            flipped.push(current);
            queue.extend(node.consumers.iter().copied());
        }

        tracing::trace!(node = %node_id, invalidated = flipped.len(), "propagated dirty state");
        flipped
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The node kind has no such input slot
    #[error("{kind} nodes have no {role} input")]
    InvalidRole {
        /// Kind of the target node
        kind: NodeKind,
        /// Requested slot
        role: InputRole,
    },

    /// The edge would close a cycle
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

/// Error when an edge would make a node depend on itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Connecting {input} into {node} would create a cycle")]
pub struct CycleError {
    /// Node whose slot was being set
    pub node: NodeId,
    /// Proposed input
    pub input: NodeId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Color;
    use crate::render::PixelBuffer;

    fn clean_all(graph: &mut Graph) {
        let ids: Vec<_> = graph.node_ids().collect();
        for id in ids {
            let node = graph.node_mut(id).unwrap();
            node.dirty = false;
            node.cached = Some(PixelBuffer::solid(1, 1, [0, 0, 0, 255]));
        }
    }

    #[test]
    fn test_set_parameter_same_value_keeps_clean() {
        let mut graph = Graph::new();
        let color = graph.add_node(NodeKind::Color);
        clean_all(&mut graph);

        assert_eq!(graph.set_parameter(color, "color", Color::WHITE), Ok(false));
        assert!(!graph.node(color).unwrap().is_dirty());

        assert_eq!(graph.set_parameter(color, "color", Color::RED), Ok(true));
        assert!(graph.node(color).unwrap().is_dirty());
    }

    #[test]
    fn test_set_parameter_rejects_and_keeps_value() {
        let mut graph = Graph::new();
        let circle = graph.add_node(NodeKind::Circle);
        clean_all(&mut graph);

        let err = graph.set_parameter(circle, "radius", true).unwrap_err();
        assert!(matches!(err, ParamError::TypeMismatch { .. }));
        assert_eq!(graph.node(circle).unwrap().param("radius"), Some(&ParamValue::Scalar(0.25)));
        assert!(!graph.node(circle).unwrap().is_dirty());

        let err = graph.set_parameter(circle, "diameter", 1.0_f32).unwrap_err();
        assert_eq!(err, ParamError::UnknownParameter("diameter".to_string()));
    }

    #[test]
    fn test_create_node_with_overrides() {
        let mut graph = Graph::new();
        let id = graph
            .create_node(NodeKind::HueSaturation, [("hue", ParamValue::Scalar(4.0))])
            .unwrap();
        assert_eq!(graph.node(id).unwrap().param("hue"), Some(&ParamValue::Scalar(1.0)));

        let err = graph.create_node(NodeKind::Color, [("color", ParamValue::Scalar(1.0))]);
        assert!(err.is_err());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_connect_updates_consumers() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Color);
        let b = graph.add_node(NodeKind::Color);
        let fx = graph.add_node(NodeKind::Transform);

        graph.connect(fx, InputRole::Single, Some(a)).unwrap();
        assert_eq!(graph.node(a).unwrap().consumers().collect::<Vec<_>>(), vec![fx]);

        graph.connect(fx, InputRole::Single, Some(b)).unwrap();
        assert_eq!(graph.node(a).unwrap().consumers().count(), 0);
        assert_eq!(graph.node(b).unwrap().consumers().collect::<Vec<_>>(), vec![fx]);
        assert_eq!(graph.node(fx).unwrap().input(InputRole::Single), Some(b));
    }

    #[test]
    fn test_connect_same_input_to_both_roles() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Color);
        let b = graph.add_node(NodeKind::Color);
        let blend = graph.add_node(NodeKind::Blend);

        graph.connect(blend, InputRole::A, Some(a)).unwrap();
        graph.connect(blend, InputRole::B, Some(a)).unwrap();
        graph.connect(blend, InputRole::A, Some(b)).unwrap();

        // `a` still feeds role B
        assert_eq!(graph.node(a).unwrap().consumers().collect::<Vec<_>>(), vec![blend]);
    }

    #[test]
    fn test_connect_rejects_cycles() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Transform);
        let b = graph.add_node(NodeKind::Transform);
        graph.connect(b, InputRole::Single, Some(a)).unwrap();

        let err = graph.connect(a, InputRole::Single, Some(b)).unwrap_err();
        assert_eq!(err, ConnectionError::Cycle(CycleError { node: a, input: b }));
        assert_eq!(graph.node(a).unwrap().input(InputRole::Single), None);

        let err = graph.connect(a, InputRole::Single, Some(a)).unwrap_err();
        assert!(matches!(err, ConnectionError::Cycle(_)));
    }

    #[test]
    fn test_cycle_check_follows_consumers() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Transform);
        let b = graph.add_node(NodeKind::Transform);
        let c = graph.add_node(NodeKind::Transform);
        graph.connect(b, InputRole::Single, Some(a)).unwrap();
        graph.connect(c, InputRole::Single, Some(b)).unwrap();

        for (node, input) in [(a, c), (a, b), (b, c), (c, a), (a, a)] {
            assert_eq!(graph.feeds(node, input), graph.depends_on(input, node));
        }
        assert!(matches!(
            graph.connect(a, InputRole::Single, Some(c)),
            Err(ConnectionError::Cycle(_))
        ));
        assert_eq!(graph.node(a).unwrap().input(InputRole::Single), None);
    }

    #[test]
    fn test_connect_rejects_unknown_role() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Color);
        let fx = graph.add_node(NodeKind::Transform);
        let err = graph.connect(fx, InputRole::A, Some(a)).unwrap_err();
        assert_eq!(
            err,
            ConnectionError::InvalidRole {
                kind: NodeKind::Transform,
                role: InputRole::A
            }
        );
    }

    #[test]
    fn test_propagation_reaches_all_consumers() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Color);
        let b = graph.add_node(NodeKind::Transform);
        let c = graph.add_node(NodeKind::Transform);
        let d = graph.add_node(NodeKind::HueSaturation);
        graph.connect(b, InputRole::Single, Some(a)).unwrap();
        graph.connect(c, InputRole::Single, Some(a)).unwrap();
        graph.connect(d, InputRole::Single, Some(c)).unwrap();
        clean_all(&mut graph);

        let flipped = graph.mark_dirty(a);
        assert_eq!(flipped.len(), 4);
        for id in [a, b, c, d] {
            assert!(graph.node(id).unwrap().is_dirty());
        }
    }

    #[test]
    fn test_propagation_visits_diamond_once() {
        let mut graph = Graph::new();
        let src = graph.add_node(NodeKind::Color);
        let left = graph.add_node(NodeKind::Transform);
        let right = graph.add_node(NodeKind::Transform);
        let join = graph.add_node(NodeKind::Blend);
        graph.connect(left, InputRole::Single, Some(src)).unwrap();
        graph.connect(right, InputRole::Single, Some(src)).unwrap();
        graph.connect(join, InputRole::A, Some(left)).unwrap();
        graph.connect(join, InputRole::B, Some(right)).unwrap();
        clean_all(&mut graph);

        let before = graph.node(join).unwrap().revision();
        let flipped = graph.mark_dirty(src);
        assert_eq!(flipped.len(), 4);
        assert_eq!(graph.node(join).unwrap().revision(), before + 1);
    }

    #[test]
    fn test_remove_node_detaches_everything() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Color);
        let fx = graph.add_node(NodeKind::Transform);
        let blend = graph.add_node(NodeKind::Blend);
        graph.connect(fx, InputRole::Single, Some(a)).unwrap();
        graph.connect(blend, InputRole::A, Some(fx)).unwrap();
        graph.connect(blend, InputRole::B, Some(fx)).unwrap();
        clean_all(&mut graph);

        let removed = graph.remove_node(fx).unwrap();
        assert_eq!(removed.id(), fx);
        assert_eq!(graph.node(a).unwrap().consumers().count(), 0);
        let blend_node = graph.node(blend).unwrap();
        assert_eq!(blend_node.input(InputRole::A), None);
        assert_eq!(blend_node.input(InputRole::B), None);
        assert_eq!(blend_node.inputs().count(), 2);
        assert!(blend_node.is_dirty());
        assert!(!graph.node(a).unwrap().is_dirty());
        assert_eq!(graph.connections().count(), 0);
    }

    #[test]
    fn test_roots_and_connections() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Color);
        let fx = graph.add_node(NodeKind::Transform);
        graph.connect(fx, InputRole::Single, Some(a)).unwrap();

        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![fx]);
        let edges: Vec<_> = graph.connections_for_node(a).collect();
        assert_eq!(edges, vec![Connection::new(a, fx, InputRole::Single)]);
    }
}
