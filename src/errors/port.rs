// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wiring and transport errors.
//!
//! Both enums are raised synchronously by the call that caused them and are
//! `Clone` so they can ride along on network error events.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortError {
    /// A single-connection port already has a socket attached.
    #[error("Port '{port}' already has a connection and does not allow multiple")]
    Capacity { port: String },

    #[error("Socket {socket} is not attached to port '{port}'")]
    NotAttached { port: String, socket: u64 },

    #[error("Port '{port}' has no connection at index {index}")]
    Index { port: String, index: usize },

    /// Addressable index past [`MAX_PORT_INDEX`](crate::ports::MAX_PORT_INDEX).
    #[error("Index {index} on port '{port}' exceeds the limit of {limit}")]
    IndexLimit {
        port: String,
        index: usize,
        limit: usize,
    },

    #[error("Addressable port '{port}' requires an explicit index")]
    IndexRequired { port: String },

    #[error("Port '{port}' is not addressable")]
    NotAddressable { port: String },

    #[error("Port '{port}' expects {expected} but got {found}")]
    TypeMismatch {
        port: String,
        expected: String,
        found: String,
    },

    #[error("Unknown port '{port}' on {direction}")]
    UnknownPort { port: String, direction: String },

    #[error("Invalid port name '{name}': only lowercase letters, digits, '_', '.' and '/' are allowed")]
    InvalidName { name: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SocketError {
    #[error("Socket {socket} is not connected")]
    NotConnected { socket: u64 },

    /// Close bracket without a matching open bracket.
    #[error("Socket {socket} has no open bracket to close")]
    UnbalancedBracket { socket: u64 },

    #[error("Socket {socket} cannot disconnect with {depth} open bracket(s)")]
    OpenBrackets { socket: u64, depth: usize },

    #[error("Socket {socket} is over its high-water mark ({pending}/{limit} pending)")]
    Backpressure {
        socket: u64,
        pending: usize,
        limit: usize,
    },
}
