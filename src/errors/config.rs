// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Errors found while validating a graph description
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValidationError {
    /// Two nodes share the same id
    DuplicateNode {
        /// The duplicate node id
        node: String,
    },
    /// An edge, initial packet or export names a node that doesn't exist
    UnknownNode {
        /// Human readable description of the referencing entry
        referenced_by: String,
        /// The missing node id
        node: String,
    },
    /// Two graph-level ports in the same direction share a name
    DuplicateExport {
        /// "inport" or "outport"
        direction: String,
        /// The duplicate export name
        name: String,
    },
    /// A port name on an edge or export is not a legal port name
    InvalidPortName {
        referenced_by: String,
        port: String,
    },
}

impl fmt::Display for GraphValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValidationError::DuplicateNode { node } => {
                write!(f, "Duplicate node id: '{}'", node)
            }
            GraphValidationError::UnknownNode {
                referenced_by,
                node,
            } => {
                write!(
                    f,
                    "{} references node '{}' which does not exist",
                    referenced_by, node
                )
            }
            GraphValidationError::DuplicateExport { direction, name } => {
                write!(f, "Duplicate graph {}: '{}'", direction, name)
            }
            GraphValidationError::InvalidPortName {
                referenced_by,
                port,
            } => {
                write!(f, "{} uses invalid port name '{}'", referenced_by, port)
            }
        }
    }
}

impl std::error::Error for GraphValidationError {}
