// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for network lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Start, stop and resumption of a network
//! * Idle detection ending a run
//! * Component set-up and tear-down failures

use crate::errors::ProcessError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A run started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkStarted<'a> {
    pub network: &'a str,
    pub run: u64,
    pub node_count: usize,
}

impl Display for NetworkStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Network '{}' run {} started with {} nodes",
            self.network, self.run, self.node_count
        )
    }
}

impl StructuredLog for NetworkStarted<'_> {
    fn log(&self) {
        tracing::info!(
            network = self.network,
            run = self.run,
            node_count = self.node_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "network_run",
            span_name = name,
            network = self.network,
            run = self.run,
        )
    }
}

/// All activity drained and stayed drained for the debounce interval.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_flowline::observability::messages::network::NetworkEnded;
/// use std::time::Duration;
///
/// let msg = NetworkEnded {
///     network: "scope/Merge",
///     run: 2,
///     uptime: Duration::from_millis(40),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct NetworkEnded<'a> {
    pub network: &'a str,
    pub run: u64,
    pub uptime: Duration,
}

impl Display for NetworkEnded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Network '{}' run {} ended after {:?}",
            self.network, self.run, self.uptime
        )
    }
}

impl StructuredLog for NetworkEnded<'_> {
    fn log(&self) {
        tracing::info!(
            network = self.network,
            run = self.run,
            uptime_ms = u64::try_from(self.uptime.as_millis()).unwrap_or(u64::MAX),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "network_ended",
            span_name = name,
            network = self.network,
            run = self.run,
        )
    }
}

/// New activity arrived after an end; a fresh run begins.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkResumed<'a> {
    pub network: &'a str,
    pub run: u64,
}

impl Display for NetworkResumed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Network '{}' resumed as run {}", self.network, self.run)
    }
}

impl StructuredLog for NetworkResumed<'_> {
    fn log(&self) {
        tracing::info!(network = self.network, run = self.run, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "network_resumed",
            span_name = name,
            network = self.network,
            run = self.run,
        )
    }
}

/// The network was stopped and its nodes torn down.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkStopped<'a> {
    pub network: &'a str,
    pub runs: u64,
}

impl Display for NetworkStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Network '{}' stopped after {} runs",
            self.network, self.runs
        )
    }
}

impl StructuredLog for NetworkStopped<'_> {
    fn log(&self) {
        tracing::info!(network = self.network, runs = self.runs, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("network_stopped", span_name = name, network = self.network)
    }
}

/// A component's set-up or tear-down hook failed.
///
/// # Log Level
/// `error!` - Set-up failures abort the start
pub struct ComponentHookFailed<'a> {
    pub node_id: &'a str,
    pub hook: &'a str,
    pub error: &'a ProcessError,
}

impl Display for ComponentHookFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' {} failed: {}",
            self.node_id, self.hook, self.error
        )
    }
}

impl StructuredLog for ComponentHookFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node_id = self.node_id,
            hook = self.hook,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "component_hook",
            span_name = name,
            node_id = self.node_id,
            hook = self.hook,
        )
    }
}
