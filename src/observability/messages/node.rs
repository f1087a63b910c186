// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for events inside a node's process boundary.
//!
//! This module contains message types for logging events related to:
//! * Activation failures
//! * Output written after the owning run stopped
//! * Packets that reach a node on a port it does not declare
//! * Forwarded bracket bookkeeping

use crate::errors::ProcessError;
use crate::observability::messages::StructuredLog;
use crate::packet::{scope_label, ScopeId};
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An activation returned or completed with an error.
///
/// # Log Level
/// `error!` - The activation's output is dropped, the network keeps running
///
/// # Example
/// ```
/// use the_flowline::errors::ProcessError;
/// use the_flowline::observability::messages::node::ActivationFailed;
///
/// let error = ProcessError::component("bad input");
/// let msg = ActivationFailed {
///     node_id: "Merge",
///     scope: &None,
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ActivationFailed<'a> {
    pub node_id: &'a str,
    pub scope: &'a Option<ScopeId>,
    pub error: &'a ProcessError,
}

impl Display for ActivationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' activation failed in scope {}: {}",
            self.node_id,
            scope_label(self.scope),
            self.error
        )
    }
}

impl StructuredLog for ActivationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node_id = self.node_id,
            scope = %scope_label(self.scope),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "activation_failed",
            span_name = name,
            node_id = self.node_id,
            scope = %scope_label(self.scope),
        )
    }
}

/// Output arrived from an activation after its run stopped.
///
/// # Log Level
/// `warn!` - The output is discarded
pub struct LateCompletion<'a> {
    pub node_id: &'a str,
    pub activation: u64,
}

impl Display for LateCompletion<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' activation {} completed after the network stopped",
            self.node_id, self.activation
        )
    }
}

impl StructuredLog for LateCompletion<'_> {
    fn log(&self) {
        tracing::warn!(node_id = self.node_id, activation = self.activation, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "late_completion",
            span_name = name,
            node_id = self.node_id,
            activation = self.activation,
        )
    }
}

/// A packet was delivered to a port the node does not declare.
///
/// # Log Level
/// `warn!` - The packet is dropped
pub struct UnknownPortDelivery<'a> {
    pub node_id: &'a str,
    pub port: &'a str,
}

impl Display for UnknownPortDelivery<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' has no input port '{}'; packet dropped",
            self.node_id, self.port
        )
    }
}

impl StructuredLog for UnknownPortDelivery<'_> {
    fn log(&self) {
        tracing::warn!(node_id = self.node_id, port = self.port, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unknown_port",
            span_name = name,
            node_id = self.node_id,
            port = self.port,
        )
    }
}

/// A close bracket was read from a forwarding port with nothing open.
///
/// # Log Level
/// `warn!` - The close is ignored
pub struct BracketUnderflow<'a> {
    pub node_id: &'a str,
    pub port: &'a str,
    pub scope: &'a Option<ScopeId>,
}

impl Display for BracketUnderflow<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' read a close bracket on '{}' in scope {} with no open bracket",
            self.node_id,
            self.port,
            scope_label(self.scope)
        )
    }
}

impl StructuredLog for BracketUnderflow<'_> {
    fn log(&self) {
        tracing::warn!(
            node_id = self.node_id,
            port = self.port,
            scope = %scope_label(self.scope),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "bracket_underflow",
            span_name = name,
            node_id = self.node_id,
            port = self.port,
        )
    }
}

/// Output flushing paused because a downstream socket is over its
/// high-water mark.
///
/// # Log Level
/// `debug!` - Routine flow control
pub struct OutputPaused<'a> {
    pub node_id: &'a str,
    pub queued: usize,
}

impl Display for OutputPaused<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' paused output with {} queued entries",
            self.node_id, self.queued
        )
    }
}

impl StructuredLog for OutputPaused<'_> {
    fn log(&self) {
        tracing::debug!(node_id = self.node_id, queued = self.queued, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("output_paused", span_name = name, node_id = self.node_id)
    }
}
