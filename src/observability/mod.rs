// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout the runtime. Message types follow a struct-based pattern
//! with `Display` trait implementation to:
//!
//! * Keep log wording out of the engine code paths
//! * Attach the same structured fields every time an event is logged
//! * Provide consistent, human-readable output
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::network` - Network lifecycle and idle detection
//! * `messages::node` - Activations, completions and bracket forwarding
//! * `messages::socket` - Transport-level anomalies
//! * `messages::validation` - Graph validation failures
//!
//! # Usage
//!
//! ```rust
//! use the_flowline::observability::messages::node::ActivationFailed;
//! use the_flowline::observability::messages::StructuredLog;
//! use the_flowline::errors::ProcessError;
//!
//! let error = ProcessError::component("boom");
//! let msg = ActivationFailed {
//!     node_id: "Merge",
//!     scope: &None,
//!     error: &error,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
