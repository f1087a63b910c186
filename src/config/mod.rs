// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod dependency_graph;
mod loader;
mod registry;
mod validation;

pub mod consts;

pub use dependency_graph::DependencyGraph;
pub use loader::{
    load_and_validate_graph, load_graph, EdgeConfig, Endpoint, ExportConfig, GraphConfig,
    InitialConfig, NetworkOptions, NodeConfig,
};
pub use registry::{ComponentLoader, ComponentRegistry};
pub use validation::validate_graph;
