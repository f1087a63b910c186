// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::DEFAULT_IDLE_DEBOUNCE_MS;
use crate::errors::{LoadError, NetworkError};
use crate::observability::messages::validation::GraphValidationFailed;
use crate::observability::messages::StructuredLog;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// A resolved graph: component instances, the edges between their ports,
/// initial packets and the ports the graph exposes to the outside.
///
/// # Fields
/// * `name` - Name of the graph, used in logs and events
/// * `options` - Network-wide runtime options (optional)
/// * `nodes` - Component instances, in declaration order
/// * `edges` - Connections from an output port to an input port
/// * `initials` - Constant packets sent to an input port on every start
/// * `inports` / `outports` - Graph-level ports mapped onto node ports
///
/// # Example
/// ```yaml
/// name: scope/Merge
/// nodes:
///   - id: Pc1
///     component: core/Delay
///     metadata: { delay_ms: 1 }
///   - id: Merge
///     component: core/Zip
/// edges:
///   - from: { node: Pc1, port: out }
///     to: { node: Merge, port: in, index: 0 }
/// initials:
///   - data: twoIIP
///     to: { node: Merge, port: in, index: 1 }
/// inports:
///   - { name: in1, node: Pc1, port: in }
/// outports:
///   - { name: out, node: Merge, port: out }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphConfig {
    pub name: String,
    #[serde(default)]
    pub options: NetworkOptions,
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,
    #[serde(default)]
    pub initials: Vec<InitialConfig>,
    #[serde(default)]
    pub inports: Vec<ExportConfig>,
    #[serde(default)]
    pub outports: Vec<ExportConfig>,
}

/// Runtime options shared by every node of a network.
///
/// # Fields
/// * `idle_debounce_ms` - How long activity must stay at zero before `end` fires
/// * `high_water_mark` - Per-socket limit on undelivered events; unbounded when absent
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NetworkOptions {
    #[serde(default = "default_idle_debounce_ms")]
    pub idle_debounce_ms: u64,
    #[serde(default)]
    pub high_water_mark: Option<usize>,
}

fn default_idle_debounce_ms() -> u64 {
    DEFAULT_IDLE_DEBOUNCE_MS
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            idle_debounce_ms: DEFAULT_IDLE_DEBOUNCE_MS,
            high_water_mark: None,
        }
    }
}

impl NetworkOptions {
    pub fn idle_debounce(&self) -> Duration {
        Duration::from_millis(self.idle_debounce_ms)
    }
}

/// A component instance.
///
/// `metadata` is handed to the component factory unchanged; its shape is
/// defined by the component.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeConfig {
    pub id: String,
    pub component: String,
    #[serde(default)]
    pub metadata: Value,
}

/// One side of an edge: a node's port, optionally a sub-channel index of
/// an addressable port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Endpoint {
    pub node: String,
    pub port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Endpoint {
    pub fn new(node: impl Into<String>, port: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
            index,
        }
    }
}

impl From<(&str, &str)> for Endpoint {
    fn from((node, port): (&str, &str)) -> Self {
        Self::new(node, port, None)
    }
}

impl From<(&str, &str, usize)> for Endpoint {
    fn from((node, port, index): (&str, &str, usize)) -> Self {
        Self::new(node, port, Some(index))
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}.{}[{}]", self.node, self.port, index),
            None => write!(f, "{}.{}", self.node, self.port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EdgeConfig {
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InitialConfig {
    pub data: Value,
    pub to: Endpoint,
}

/// A graph-level port mapped onto a node port.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExportConfig {
    pub name: String,
    pub node: String,
    pub port: String,
    #[serde(default)]
    pub index: Option<usize>,
}

impl ExportConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.node.clone(), self.port.clone(), self.index)
    }
}

/// Load a graph from a YAML, TOML or JSON file, chosen by extension.
pub fn load_graph<P: AsRef<Path>>(path: P) -> Result<GraphConfig, LoadError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let content = fs::read_to_string(path)?;
    let graph = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };
    Ok(graph)
}

/// Load a graph and validate its structure.
///
/// Fails with [`NetworkError::Graph`] listing every problem found.
pub fn load_and_validate_graph<P: AsRef<Path>>(path: P) -> Result<GraphConfig, NetworkError> {
    let graph = load_graph(path)?;

    if let Err(errors) = crate::config::validate_graph(&graph) {
        GraphValidationFailed {
            graph: &graph.name,
            errors: &errors,
        }
        .log();
        return Err(NetworkError::Graph(errors));
    }

    Ok(graph)
}
