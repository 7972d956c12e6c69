// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted form of a node and everything upstream of it.
//!
//! A [`NodeRecord`] is a tree: a node shared by several consumers is written
//! once per consumer and decoding does not merge the copies back together.
//! IDs, dirty flags and cached pixels are never persisted.

use crate::connection::InputRole;
use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind};
use crate::param::{ParamError, ParamValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Encoded node with its inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Kind tag, see [`NodeKind::tag`]
    pub kind: String,
    /// Display name
    pub name: String,
    /// Parameter values by key
    pub parameters: IndexMap<String, ParamValue>,
    /// Encoded input by role name, `None` for an empty slot
    pub inputs: IndexMap<String, Option<NodeRecord>>,
}

impl NodeRecord {
    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, RecordError> {
        let options = ron::Options::default().without_recursion_limit();
        Ok(options.to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format. Nesting depth is not limited.
    pub fn from_ron(s: &str) -> Result<Self, RecordError> {
        let options = ron::Options::default().without_recursion_limit();
        let mut de = ron::Deserializer::from_str_with_options(s, &options)?;
        let record = Self::deserialize(serde_stacker::Deserializer::new(&mut de))
            .map_err(|e| de.span_error(e))?;
        de.end().map_err(|e| de.span_error(e))?;
        Ok(record)
    }

    /// Serialize to JSON format
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON format. Nesting depth is not limited.
    pub fn from_json(s: &str) -> Result<Self, RecordError> {
        let mut de = serde_json::Deserializer::from_str(s);
        de.disable_recursion_limit();
        let record = Self::deserialize(serde_stacker::Deserializer::new(&mut de))?;
        de.end()?;
        Ok(record)
    }

    /// Save to a `.ron` or `.json` file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        let path = path.as_ref();
        let contents = match RecordFormat::from_path(path)? {
            RecordFormat::Ron => self.to_ron()?,
            RecordFormat::Json => self.to_json()?,
        };
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load from a `.ron` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let format = RecordFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        let record = match format {
            RecordFormat::Ron => Self::from_ron(&contents)?,
            RecordFormat::Json => Self::from_json(&contents)?,
        };
        tracing::info!("Loaded {} record from {}", record.kind, path.display());
        Ok(record)
    }

    /// Number of nodes in the tree, counting shared inputs once per use
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(record) = stack.pop() {
            count += 1;
            stack.extend(record.inputs.values().flatten());
        }
        count
    }
}

impl Drop for NodeRecord {
    fn drop(&mut self) {
        // Unnest iteratively so deep chains do not overflow the stack
        let mut pending: Vec<NodeRecord> =
            self.inputs.drain(..).filter_map(|(_, input)| input).collect();
        while let Some(mut record) = pending.pop() {
            pending.extend(record.inputs.drain(..).filter_map(|(_, input)| input));
        }
    }
}

/// On-disk encoding of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Rusty Object Notation
    Ron,
    /// JSON
    Json,
}

impl RecordFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, RecordError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Ok(Self::Ron),
            Some("json") => Ok(Self::Json),
            _ => Err(RecordError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// One validated record, ready to be inserted without further checks
struct Decoded {
    kind: NodeKind,
    name: String,
    params: IndexMap<&'static str, ParamValue>,
    /// Index of the consumer in the decoded list and the slot this node fills
    parent: Option<(usize, InputRole)>,
}

enum Visit {
    Enter(NodeId),
    Exit(NodeId),
}

impl Graph {
    /// Encode a node and its transitive inputs
    pub fn encode(&self, node_id: NodeId) -> Option<NodeRecord> {
        let mut stack = vec![Visit::Enter(node_id)];
        // Finished records, inputs of the node being assembled on top
        let mut done: Vec<NodeRecord> = Vec::new();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    let node = self.node(id)?;
                    stack.push(Visit::Exit(id));
                    let inputs: Vec<NodeId> = node.input_ids().collect();
                    stack.extend(inputs.into_iter().rev().map(Visit::Enter));
                }
                Visit::Exit(id) => {
                    let node = self.node(id)?;
                    let connected = node.input_ids().count();
                    let mut encoded = done.split_off(done.len() - connected).into_iter();
                    let inputs = node
                        .inputs()
                        .map(|(role, input)| {
                            (role.as_str().to_string(), input.and_then(|_| encoded.next()))
                        })
                        .collect();
                    done.push(NodeRecord {
                        kind: node.kind().tag().to_string(),
                        name: node.name.clone(),
                        parameters: node
                            .params()
                            .map(|(name, value)| (name.to_string(), *value))
                            .collect(),
                        inputs,
                    });
                }
            }
        }
        done.pop()
    }

    /// Rebuild a node tree from a record and return the root's ID.
    ///
    /// The whole record is checked before anything is inserted, so on error
    /// the graph is left untouched. Every decoded node starts dirty.
    pub fn decode(&mut self, record: &NodeRecord) -> Result<NodeId, DecodeError> {
        let decoded = check(record)?;
        let mut ids: Vec<NodeId> = Vec::with_capacity(decoded.len());
        for entry in decoded {
            let mut node = Node::new(entry.kind);
            node.name = entry.name;
            node.params = entry.params;
            let node_id = node.id();
            self.insert_node(node);
            if let Some((parent, role)) = entry.parent {
                self.link(ids[parent], role, node_id);
            }
            ids.push(node_id);
        }
        Ok(ids[0])
    }
}

/// Location of a record in the tree, e.g. `blend.B.single`
fn record_path(root: &str, decoded: &[Decoded], mut at: Option<(usize, InputRole)>) -> String {
    let mut roles = Vec::new();
    while let Some((parent, role)) = at {
        roles.push(role);
        at = decoded[parent].parent;
    }
    let mut path = root.to_string();
    for role in roles.iter().rev() {
        path.push('.');
        path.push_str(role.as_str());
    }
    path
}

/// Validate a record tree, listing every node before its inputs
fn check(record: &NodeRecord) -> Result<Vec<Decoded>, DecodeError> {
    let mut decoded: Vec<Decoded> = Vec::new();
    let mut stack: Vec<(&NodeRecord, Option<(usize, InputRole)>)> = vec![(record, None)];

    while let Some((current, parent)) = stack.pop() {
        let path = || record_path(&record.kind, &decoded, parent);
        let kind = NodeKind::from_tag(&current.kind).ok_or_else(|| DecodeError::UnknownKind {
            path: path(),
            kind: current.kind.clone(),
        })?;

        let mut params = IndexMap::new();
        for spec in kind.params() {
            let value = current
                .parameters
                .get(spec.name)
                .ok_or_else(|| DecodeError::MissingParameter {
                    path: path(),
                    name: spec.name.to_string(),
                })?;
            let value = spec
                .validate(*value)
                .map_err(|source| DecodeError::Parameter { path: path(), source })?;
            params.insert(spec.name, value);
        }
        for key in current.parameters.keys().filter(|key| kind.param(key).is_none()) {
            tracing::debug!("Ignoring unknown parameter {}.{key}", path());
        }

        if let Some(role) = current
            .inputs
            .keys()
            .find(|role| !role.parse::<InputRole>().is_ok_and(|role| kind.has_role(role)))
        {
            return Err(DecodeError::UnknownRole {
                path: path(),
                role: role.clone(),
            });
        }

        let index = decoded.len();
        let mut inputs = Vec::new();
        for role in kind.roles() {
            let input = current
                .inputs
                .get(role.as_str())
                .ok_or_else(|| DecodeError::MissingInput { path: path(), role: *role })?;
            if let Some(input) = input {
                inputs.push((input, Some((index, *role))));
            }
        }
        // Inputs are visited in role order
        stack.extend(inputs.into_iter().rev());

        decoded.push(Decoded {
            kind,
            name: current.name.clone(),
            params,
            parent,
        });
    }
    Ok(decoded)
}

/// Error when decoding a record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The kind tag is not known
    #[error("{path}: unknown node kind {kind:?}")]
    UnknownKind {
        /// Location in the record tree
        path: String,
        /// Offending tag
        kind: String,
    },

    /// A parameter of the kind's schema is absent
    #[error("{path}: missing parameter {name}")]
    MissingParameter {
        /// Location in the record tree
        path: String,
        /// Missing key
        name: String,
    },

    /// A parameter has the wrong type or an invalid value
    #[error("{path}: {source}")]
    Parameter {
        /// Location in the record tree
        path: String,
        /// Validation failure
        source: ParamError,
    },

    /// The record names an input role the kind does not have
    #[error("{path}: unknown input role {role:?}")]
    UnknownRole {
        /// Location in the record tree
        path: String,
        /// Offending role name
        role: String,
    },

    /// An input role of the kind is absent
    #[error("{path}: missing input {role}")]
    MissingInput {
        /// Location in the record tree
        path: String,
        /// Missing role
        role: InputRole,
    },
}

/// Error when reading or writing record files
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON could not be parsed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON could not be written
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// JSON could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension is neither `.ron` nor `.json`
    #[error("Unsupported record format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}
