// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod activity;
mod boundary;   // per-node scheduling and bracket forwarding
mod brackets;
mod buffer;
mod input;
mod network;    // wiring, lifecycle, idle detection
mod node;
mod output;
mod queue;
#[cfg(test)]
pub(crate) mod testing;

pub use activity::Activity;
pub use input::ProcessInput;
pub use network::{Network, NetworkBuilder, NetworkEvent};
pub use node::Node;
pub use output::{Outputs, ProcessOutput};
