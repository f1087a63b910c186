// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of graph descriptions.
//!
//! Checks run in a fixed order and accumulate every problem found, so a
//! user sees all of them at once rather than fixing one per attempt.
//!
//! # Validation Pipeline
//!
//! 1. **Uniqueness Validation**: node ids are unique, export names are unique
//!    per direction
//! 2. **Reference Validation**: every edge, initial packet and export names a
//!    declared node
//! 3. **Port Name Validation**: every port named by an edge, initial packet or
//!    export is a legal port name
//!
//! Whether a referenced port actually exists on the component is only known
//! once the component is instantiated; that check happens when the network
//! wires its sockets.
//!
//! # Examples
//!
//! ```rust
//! use the_flowline::config::{validate_graph, Endpoint, GraphConfig, NetworkOptions, NodeConfig, EdgeConfig};
//! use the_flowline::errors::GraphValidationError;
//!
//! let graph = GraphConfig {
//!     name: "broken".into(),
//!     options: NetworkOptions::default(),
//!     nodes: vec![NodeConfig {
//!         id: "a".into(),
//!         component: "core/Repeat".into(),
//!         metadata: serde_json::Value::Null,
//!     }],
//!     edges: vec![EdgeConfig {
//!         from: Endpoint::from(("a", "out")),
//!         to: Endpoint::from(("missing", "in")),
//!     }],
//!     initials: vec![],
//!     inports: vec![],
//!     outports: vec![],
//! };
//!
//! let errors = validate_graph(&graph).unwrap_err();
//! assert!(matches!(errors[0], GraphValidationError::UnknownNode { .. }));
//! ```

use crate::config::{Endpoint, ExportConfig, GraphConfig};
use crate::errors::GraphValidationError;
use crate::ports::validate_port_name;
use std::collections::HashSet;

/// Validates a graph description.
///
/// # Returns
///
/// * `Ok(())` - The graph is structurally sound
/// * `Err(Vec<GraphValidationError>)` - Every problem found
pub fn validate_graph(graph: &GraphConfig) -> Result<(), Vec<GraphValidationError>> {
    let mut errors = Vec::new();

    if let Err(duplicates) = validate_unique_node_ids(graph) {
        errors.extend(duplicates);
    }
    if let Err(duplicates) = validate_unique_exports(&graph.inports, "inport") {
        errors.extend(duplicates);
    }
    if let Err(duplicates) = validate_unique_exports(&graph.outports, "outport") {
        errors.extend(duplicates);
    }
    if let Err(references) = validate_references(graph) {
        errors.extend(references);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_node_ids(graph: &GraphConfig) -> Result<(), Vec<GraphValidationError>> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut errors = Vec::new();

    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
            errors.push(GraphValidationError::DuplicateNode {
                node: node.id.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_exports(
    exports: &[ExportConfig],
    direction: &str,
) -> Result<(), Vec<GraphValidationError>> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for export in exports {
        if !seen.insert(export.name.as_str()) {
            errors.push(GraphValidationError::DuplicateExport {
                direction: direction.to_string(),
                name: export.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_references(graph: &GraphConfig) -> Result<(), Vec<GraphValidationError>> {
    let nodes: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut errors = Vec::new();

    let mut check = |endpoint: &Endpoint, referenced_by: String| {
        if !nodes.contains(endpoint.node.as_str()) {
            errors.push(GraphValidationError::UnknownNode {
                referenced_by: referenced_by.clone(),
                node: endpoint.node.clone(),
            });
        }
        if validate_port_name(&endpoint.port).is_err() {
            errors.push(GraphValidationError::InvalidPortName {
                referenced_by,
                port: endpoint.port.clone(),
            });
        }
    };

    for edge in &graph.edges {
        let label = format!("Edge {} -> {}", edge.from, edge.to);
        check(&edge.from, label.clone());
        check(&edge.to, label);
    }
    for initial in &graph.initials {
        check(&initial.to, format!("Initial packet for {}", initial.to));
    }
    for export in &graph.inports {
        check(&export.endpoint(), format!("Inport '{}'", export.name));
    }
    for export in &graph.outports {
        check(&export.endpoint(), format!("Outport '{}'", export.name));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgeConfig, InitialConfig, NetworkOptions, NodeConfig};
    use serde_json::{json, Value};

    fn node(id: &str) -> NodeConfig {
        NodeConfig {
            id: id.to_string(),
            component: "core/Repeat".to_string(),
            metadata: Value::Null,
        }
    }

    fn export(name: &str, node: &str, port: &str) -> ExportConfig {
        ExportConfig {
            name: name.to_string(),
            node: node.to_string(),
            port: port.to_string(),
            index: None,
        }
    }

    fn graph(nodes: Vec<NodeConfig>) -> GraphConfig {
        GraphConfig {
            name: "test".to_string(),
            options: NetworkOptions::default(),
            nodes,
            edges: vec![],
            initials: vec![],
            inports: vec![],
            outports: vec![],
        }
    }

    #[test]
    fn test_valid_graph() {
        let mut g = graph(vec![node("a"), node("b")]);
        g.edges.push(EdgeConfig {
            from: Endpoint::from(("a", "out")),
            to: Endpoint::from(("b", "in")),
        });
        g.initials.push(InitialConfig {
            data: json!("hello"),
            to: Endpoint::from(("a", "in")),
        });
        g.inports.push(export("in", "a", "in"));
        g.outports.push(export("out", "b", "out"));
        assert!(validate_graph(&g).is_ok());
    }

    #[test]
    fn test_duplicate_node_reported_once() {
        let g = graph(vec![node("a"), node("a"), node("a")]);
        let errors = validate_graph(&g).unwrap_err();
        assert_eq!(
            errors,
            vec![GraphValidationError::DuplicateNode { node: "a".into() }]
        );
    }

    #[test]
    fn test_unknown_nodes_are_accumulated() {
        let mut g = graph(vec![node("a")]);
        g.edges.push(EdgeConfig {
            from: Endpoint::from(("x", "out")),
            to: Endpoint::from(("y", "in")),
        });
        g.initials.push(InitialConfig {
            data: json!(1),
            to: Endpoint::from(("z", "in")),
        });
        let errors = validate_graph(&g).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors[0].to_string(),
            "Edge x.out -> y.in references node 'x' which does not exist"
        );
    }

    #[test]
    fn test_duplicate_exports_per_direction() {
        let mut g = graph(vec![node("a")]);
        g.inports.push(export("in", "a", "in"));
        g.inports.push(export("in", "a", "in"));
        g.outports.push(export("in", "a", "out"));
        let errors = validate_graph(&g).unwrap_err();
        assert_eq!(
            errors,
            vec![GraphValidationError::DuplicateExport {
                direction: "inport".into(),
                name: "in".into()
            }]
        );
    }

    #[test]
    fn test_invalid_port_name() {
        let mut g = graph(vec![node("a"), node("b")]);
        g.edges.push(EdgeConfig {
            from: Endpoint::from(("a", "OUT")),
            to: Endpoint::from(("b", "in")),
        });
        let errors = validate_graph(&g).unwrap_err();
        assert!(matches!(
            &errors[0],
            GraphValidationError::InvalidPortName { port, .. } if port == "OUT"
        ));
    }
}
