// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod network;
mod port;

pub use config::GraphValidationError;
pub use network::{LoadError, NetworkError, ProcessError};
pub use port::{PortError, SocketError};
