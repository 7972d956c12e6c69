// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the processing graph.

use crate::connection::InputRole;
use crate::kinds;
use crate::param::{ParamSpec, ParamValue};
use crate::render::PixelBuffer;
use crate::resource::ResourceFrame;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node capability category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Produces an image from parameters alone
    Generator,
    /// Transforms one or two input images
    Effect,
    /// Produces an image from an external source
    Resource,
}

/// Closed set of node kinds.
///
/// A kind fixes the category, the input roles and the parameter schema of a
/// node; see [`crate::kinds`] for the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Solid color
    Color,
    /// Antialiased circle
    Circle,
    /// Position/rotation/scale of a single input
    Transform,
    /// Hue shift and saturation of a single input
    HueSaturation,
    /// Composite of two inputs
    Blend,
    /// Camera capture frames
    Camera,
}

impl NodeKind {
    /// All kinds
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Color,
        NodeKind::Circle,
        NodeKind::Transform,
        NodeKind::HueSaturation,
        NodeKind::Blend,
        NodeKind::Camera,
    ];

    /// Persisted tag of this kind
    pub fn tag(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Circle => "circle",
            Self::Transform => "transform",
            Self::HueSaturation => "hue_saturation",
            Self::Blend => "blend",
            Self::Camera => "camera",
        }
    }

    /// Look up a kind by its persisted tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Capability category
    pub fn category(self) -> NodeCategory {
        match self {
            Self::Color | Self::Circle => NodeCategory::Generator,
            Self::Transform | Self::HueSaturation | Self::Blend => NodeCategory::Effect,
            Self::Camera => NodeCategory::Resource,
        }
    }

    /// Input roles in declaration order
    pub fn roles(self) -> &'static [InputRole] {
        match self {
            Self::Transform | Self::HueSaturation => &[InputRole::Single],
            Self::Blend => &[InputRole::A, InputRole::B],
            Self::Color | Self::Circle | Self::Camera => &[],
        }
    }

    /// Whether `role` is one of this kind's input roles
    pub fn has_role(self, role: InputRole) -> bool {
        self.roles().contains(&role)
    }

    /// Parameter schema in packing order
    pub fn params(self) -> &'static [ParamSpec] {
        kinds::schema(self)
    }

    /// Get the declaration of one parameter
    pub fn param(self, name: &str) -> Option<&'static ParamSpec> {
        self.params().iter().find(|spec| spec.name == name)
    }

    /// Default display name for a fresh node
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Circle => "Circle",
            Self::Transform => "Transform",
            Self::HueSaturation => "Hue Saturation",
            Self::Blend => "Blend",
            Self::Camera => "Camera",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    /// Display name (not identity-bearing)
    pub name: String,
    pub(crate) inputs: IndexMap<InputRole, Option<NodeId>>,
    pub(crate) params: IndexMap<&'static str, ParamValue>,
    pub(crate) dirty: bool,
    pub(crate) revision: u64,
    pub(crate) cached: Option<PixelBuffer>,
    pub(crate) consumers: IndexSet<NodeId>,
    pub(crate) frame: Option<ResourceFrame>,
}

impl Node {
    /// Create a dirty node with default parameters and empty input slots
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            name: kind.display_name().to_string(),
            inputs: kind.roles().iter().map(|role| (*role, None)).collect(),
            params: kind.params().iter().map(|spec| (spec.name, spec.default)).collect(),
            dirty: true,
            revision: 0,
            cached: None,
            consumers: IndexSet::new(),
            frame: None,
        }
    }

    /// Unique instance ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node kind
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Capability category
    pub fn category(&self) -> NodeCategory {
        self.kind.category()
    }

    /// Node connected at `role`, `None` for an empty slot or a role this kind lacks
    pub fn input(&self, role: InputRole) -> Option<NodeId> {
        self.inputs.get(&role).copied().flatten()
    }

    /// All input slots in role order
    pub fn inputs(&self) -> impl Iterator<Item = (InputRole, Option<NodeId>)> + '_ {
        self.inputs.iter().map(|(role, input)| (*role, *input))
    }

    /// Connected input nodes in role order
    pub fn input_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.values().filter_map(|input| *input)
    }

    /// Get a parameter value
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// All parameters in schema order
    pub fn params(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.params.iter().map(|(name, value)| (*name, value))
    }

    /// Whether the cached result is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Counter bumped each time the node becomes dirty
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Last rendered result
    pub fn cached_result(&self) -> Option<&PixelBuffer> {
        self.cached.as_ref()
    }

    /// Nodes that read this node as an input
    pub fn consumers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.consumers.iter().copied()
    }

    /// Last frame pushed to a resource node
    pub fn frame(&self) -> Option<&ResourceFrame> {
        self.frame.as_ref()
    }
}
