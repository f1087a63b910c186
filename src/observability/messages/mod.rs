// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it at its documented level with structured
//! fields attached.
//!
//! # Organization
//!
//! * `network` - Network lifecycle and idle detection
//! * `node` - Activation and forwarding events inside a node
//! * `socket` - Transport-level anomalies
//! * `validation` - Graph validation failures
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_flowline::observability::messages::network::NetworkStarted;
//!
//! let msg = NetworkStarted {
//!     network: "scope/Merge",
//!     run: 1,
//!     node_count: 3,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod network;
pub mod node;
pub mod socket;
pub mod validation;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog {
    /// Emits the message at its level.
    fn log(&self);

    /// Opens a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
