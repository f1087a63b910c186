// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod components; // built-in core/* components
pub mod config;     // graph files + component registry
pub mod engine;     // nodes, process boundary, network
pub mod errors;     // error handling
pub mod observability;
pub mod packet;     // information packets and scopes
pub mod ports;
pub mod socket;     // connections between ports
pub mod traits;     // component abstraction
