// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named input slot of an effect node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputRole {
    /// Input of a single-input effect
    #[serde(rename = "single")]
    Single,
    /// First input of a blend
    A,
    /// Second input of a blend
    B,
}

impl InputRole {
    /// Persisted name of the role
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Error when parsing a role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown input role: {0}")]
pub struct UnknownRole(pub String);

/// An edge feeding `from`'s output into `to`'s `role` slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Source node ID
    pub from: NodeId,
    /// Target node ID
    pub to: NodeId,
    /// Target slot
    pub role: InputRole,
}

impl Connection {
    /// Create a new connection
    pub fn new(from: NodeId, to: NodeId, role: InputRole) -> Self {
        Self { from, to, role }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from == node_id || self.to == node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        for role in [InputRole::Single, InputRole::A, InputRole::B] {
            assert_eq!(role.as_str().parse::<InputRole>(), Ok(role));
        }
        assert_eq!("C".parse::<InputRole>(), Err(UnknownRole("C".to_string())));
    }
}
