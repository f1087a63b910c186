// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for transport-level anomalies on sockets.

use crate::observability::messages::StructuredLog;
use crate::packet::Ip;
use crate::socket::SocketId;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An external send was refused because the socket is over its high-water mark.
///
/// # Log Level
/// `debug!` - The caller receives the error and decides whether to retry
pub struct BackpressureRejected {
    pub socket: SocketId,
    pub pending: usize,
    pub limit: usize,
}

impl Display for BackpressureRejected {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Socket {} rejected send: {} deliveries pending, limit {}",
            self.socket, self.pending, self.limit
        )
    }
}

impl StructuredLog for BackpressureRejected {
    fn log(&self) {
        tracing::debug!(
            socket = self.socket.get(),
            pending = self.pending,
            limit = self.limit,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "backpressure",
            span_name = name,
            socket = self.socket.get(),
            pending = self.pending,
            limit = self.limit,
        )
    }
}

/// A close bracket was posted with no bracket open on the socket.
///
/// # Log Level
/// `warn!` - Sender discipline violation, the packet is refused
pub struct UnmatchedClose<'a> {
    pub socket: SocketId,
    pub ip: &'a Ip,
}

impl Display for UnmatchedClose<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Socket {} refused '{}': no open bracket to close",
            self.socket, self.ip
        )
    }
}

impl StructuredLog for UnmatchedClose<'_> {
    fn log(&self) {
        tracing::warn!(
            socket = self.socket.get(),
            owner = self.ip.owner.as_deref().unwrap_or("external"),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("unmatched_close", span_name = name, socket = self.socket.get())
    }
}
