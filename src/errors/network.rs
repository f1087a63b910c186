// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Activation, network lifecycle and graph loading errors.

use crate::errors::{GraphValidationError, PortError, SocketError};
use crate::packet::{scope_label, ScopeId};
use thiserror::Error;

/// Failure of a single activation. Reported on the network's event
/// channel; never unwinds other activations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessError {
    /// Data was read from a port that had nothing buffered for the scope.
    #[error("No data available on '{port}' for scope {}", scope_label(.scope))]
    Precondition {
        port: String,
        scope: Option<ScopeId>,
    },

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Socket(#[from] SocketError),

    /// The run that owned the activation has stopped.
    #[error("Network is not running; output dropped")]
    NetworkStopped,

    #[error("{0}")]
    Component(String),
}

impl ProcessError {
    pub fn component(message: impl Into<String>) -> Self {
        ProcessError::Component(message.into())
    }
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("Unknown graph {direction} '{name}'")]
    UnknownGraphPort { name: String, direction: String },

    #[error("Wiring failed at {node}.{port}: {source}")]
    Port {
        node: String,
        port: String,
        #[source]
        source: PortError,
    },

    #[error("Node '{node}' declares invalid ports: {source}")]
    InvalidNode {
        node: String,
        #[source]
        source: PortError,
    },

    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error("Set-up of node '{node}' failed: {source}")]
    SetUp {
        node: String,
        #[source]
        source: ProcessError,
    },

    #[error("Tear-down of node '{node}' failed: {source}")]
    TearDown {
        node: String,
        #[source]
        source: ProcessError,
    },

    #[error("Network '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Network '{0}' is not running")]
    NotRunning(String),

    #[error("Graph validation failed:\n{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Graph(Vec<GraphValidationError>),

    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported graph file extension '{0}'")]
    UnsupportedFormat(String),

    #[error("Unknown component '{0}'")]
    UnknownComponent(String),

    #[error("Component '{component}' rejected its metadata: {reason}")]
    InvalidMetadata { component: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_message_renders_null_scope() {
        let err = ProcessError::Precondition {
            port: "in1".into(),
            scope: None,
        };
        assert_eq!(err.to_string(), "No data available on 'in1' for scope null");
    }

    #[test]
    fn test_port_error_converts_into_process_error() {
        let err: ProcessError = PortError::NotAddressable { port: "out".into() }.into();
        assert!(matches!(err, ProcessError::Port(PortError::NotAddressable { .. })));
    }

    #[test]
    fn test_graph_error_lists_every_failure() {
        let err = NetworkError::Graph(vec![
            GraphValidationError::DuplicateNode { node: "a".into() },
            GraphValidationError::UnknownNode {
                referenced_by: "edge a.out -> b.in".into(),
                node: "b".into(),
            },
        ]);
        let text = err.to_string();
        assert!(text.contains("Duplicate node id: 'a'"));
        assert!(text.contains("'b'"));
    }
}
