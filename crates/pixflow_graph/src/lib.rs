// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow graph core for node-based image processing.
//!
//! Nodes are generators, effects or resources wired into a DAG. Each node
//! caches its last rendered image and is marked dirty when a parameter,
//! input or upstream node changes. A render pass walks the graph from a
//! root, re-rendering only dirty nodes through a [`RenderBackend`].
//!
//! ## Architecture
//!
//! - [`Graph`] owns every node; nodes refer to each other by [`NodeId`]
//! - Typed, schema-checked parameters packed into uniform vectors
//! - Cycle-checked connections and blend operators
//! - Tree records for persistence (RON and JSON)
//! - [`SharedGraph`] for rendering while other threads edit

pub mod param;
pub mod node;
pub mod kinds;
pub mod connection;
pub mod graph;
pub mod render;
pub mod uniforms;
pub mod operators;
pub mod resource;
pub mod serialization;
pub mod config;
pub mod shared;

pub use param::{BlendMode, Color, FillMode, ParamError, ParamType, ParamValue};
pub use node::{Node, NodeCategory, NodeId, NodeKind};
pub use connection::{Connection, InputRole};
pub use graph::{ConnectionError, CycleError, Graph};
pub use render::{BackendError, PixelBuffer, RenderBackend, RenderError, RenderRequest};
pub use serialization::{DecodeError, NodeRecord, RecordError};
pub use resource::{FrameMetadata, ResourceError, ResourceFrame};
pub use config::GraphConfig;
pub use shared::{RenderSchedule, SharedGraph};
