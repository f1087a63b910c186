// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph validation errors.
//!
//! This module contains message types for logging events related to:
//! * Graph descriptions that failed validation
//! * Nodes that are unreachable from any inport, edge or initial packet
//! * Start order cycles

use crate::errors::GraphValidationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A graph description failed validation.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_flowline::errors::GraphValidationError;
/// use the_flowline::observability::messages::validation::GraphValidationFailed;
///
/// let errors = vec![GraphValidationError::DuplicateNode { node: "Pc1".into() }];
/// let msg = GraphValidationFailed {
///     graph: "scope/Merge",
///     errors: &errors,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct GraphValidationFailed<'a> {
    pub graph: &'a str,
    pub errors: &'a [GraphValidationError],
}

impl Display for GraphValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph '{}' failed validation with {} error(s)",
            self.graph,
            self.errors.len()
        )
    }
}

impl StructuredLog for GraphValidationFailed<'_> {
    fn log(&self) {
        for error in self.errors {
            tracing::error!(graph = self.graph, error = %error, "Graph validation error");
        }
        tracing::error!(
            graph = self.graph,
            error_count = self.errors.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            graph = self.graph,
            error_count = self.errors.len(),
        )
    }
}

/// A node has no inbound edge, initial packet or graph inport.
///
/// # Log Level
/// `warn!` - Potential issue, the node will never activate
pub struct UnconnectedNode<'a> {
    pub node_id: &'a str,
}

impl Display for UnconnectedNode<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Node '{}' has no inbound connections", self.node_id)
    }
}

impl StructuredLog for UnconnectedNode<'_> {
    fn log(&self) {
        tracing::warn!(node_id = self.node_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "span_name",
            name = name,
            node_id = self.node_id,
        )
    }
}

/// The graph contains a cycle; set-up order among its members falls back
/// to declaration order.
///
/// # Log Level
/// `debug!` - Cycles are legal in a dataflow graph
pub struct StartOrderCycle<'a> {
    pub members: &'a [&'a str],
}

impl Display for StartOrderCycle<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Nodes in a cycle start in declaration order: {}",
            self.members.join(", ")
        )
    }
}

impl StructuredLog for StartOrderCycle<'_> {
    fn log(&self) {
        tracing::debug!(
            members = self.members.join(", "),
            member_count = self.members.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            member_count = self.members.len(),
        )
    }
}
