// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Input side of an activation.

use crate::engine::brackets::{BracketArena, BracketId, SourceKey};
use crate::engine::buffer::InputBuffers;
use crate::errors::{PortError, ProcessError};
use crate::observability::messages::node::BracketUnderflow;
use crate::observability::messages::StructuredLog;
use crate::packet::{Ip, Packet, ScopeId};
use crate::ports::{InPort, InPorts, PortRef};
use crate::traits::ForwardBrackets;
use serde_json::Value;

/// Scope-filtered view of a node's input buffers for one activation.
///
/// Every read is restricted to the activation's scope; unscoped ports read
/// from the null scope instead. Initial packets are visible from any scope.
/// Reading data from a forwarding port also consumes the brackets queued in
/// front of it and records them for forwarding.
pub struct ProcessInput<'a> {
    node_id: &'a str,
    scope: Option<ScopeId>,
    ports: &'a InPorts,
    forwarding: &'a ForwardBrackets,
    buffers: &'a mut InputBuffers,
    arena: &'a mut BracketArena,
    released: Vec<BracketId>,
    bracket_scopes: Vec<Option<ScopeId>>,
}

impl<'a> ProcessInput<'a> {
    pub(crate) fn new(
        node_id: &'a str,
        scope: Option<ScopeId>,
        ports: &'a InPorts,
        forwarding: &'a ForwardBrackets,
        buffers: &'a mut InputBuffers,
        arena: &'a mut BracketArena,
    ) -> Self {
        Self {
            node_id,
            scope,
            ports,
            forwarding,
            buffers,
            arena,
            released: Vec::new(),
            bracket_scopes: Vec::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        self.node_id
    }

    /// Scope of the packet that triggered this activation.
    pub fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    fn resolve(&self, port: &PortRef) -> Result<(&'a InPort, Option<ScopeId>), PortError> {
        let ports: &'a InPorts = self.ports;
        let in_port = ports.require(&port.name)?;
        in_port.check_index(port.index)?;
        let scope = if in_port.options().scoped {
            self.scope.clone()
        } else {
            None
        };
        Ok((in_port, scope))
    }

    /// True when every referenced port holds a packet accepted by
    /// `predicate` in the activation's scope. An unknown or badly indexed
    /// reference counts as absent.
    pub fn has_matching<I, P, F>(&self, ports: I, predicate: F) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<PortRef>,
        F: Fn(&Ip) -> bool,
    {
        ports.into_iter().all(|p| {
            let port = p.into();
            match self.resolve(&port) {
                Ok((in_port, scope)) => self
                    .buffers
                    .get(in_port.name())
                    .map(|b| b.has_matching(port.index, &scope, &predicate))
                    .unwrap_or(false),
                Err(_) => false,
            }
        })
    }

    /// True when every referenced port holds any packet, bracket or data.
    pub fn has<I, P>(&self, ports: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<PortRef>,
    {
        self.has_matching(ports, |_| true)
    }

    pub fn has_data<I, P>(&self, ports: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<PortRef>,
    {
        self.has_matching(ports, Ip::is_data)
    }

    /// Takes the next data value from `port`.
    ///
    /// Fails with [`ProcessError::Precondition`] when no data is available
    /// in scope; callers are expected to check with [`has_data`] first.
    ///
    /// [`has_data`]: ProcessInput::has_data
    pub fn get_data(&mut self, port: impl Into<PortRef>) -> Result<Value, ProcessError> {
        let port = port.into();
        let (in_port, scope) = self.resolve(&port)?;
        let taken = self
            .buffers
            .port(in_port.name())
            .take_data(port.index, &scope)
            .ok_or_else(|| ProcessError::Precondition {
                port: port.to_string(),
                scope: scope.clone(),
            })?;

        if self.forwarding.is_source(in_port.name()) {
            let source = SourceKey {
                port: in_port.name().to_string(),
                index: port.index,
                scope: scope.clone(),
            };
            for bracket in taken.prefix {
                self.apply_bracket(&source, bracket);
            }
            if !taken.initial && !self.bracket_scopes.contains(&scope) {
                self.bracket_scopes.push(scope);
            }
        }
        Ok(taken.ip.into_value())
    }

    /// Takes the next packet of any kind. Brackets read this way are not
    /// forwarded.
    pub fn get(&mut self, port: impl Into<PortRef>) -> Result<Option<Ip>, ProcessError> {
        let port = port.into();
        let (in_port, scope) = self.resolve(&port)?;
        Ok(self.buffers.port(in_port.name()).pop(port.index, &scope))
    }

    /// Indices with a socket attached; empty for non-addressable ports.
    pub fn attached(&self, port: &str) -> Vec<usize> {
        match self.ports.get(port) {
            Some(p) if p.is_addressable() => p.attached_indices(),
            _ => Vec::new(),
        }
    }

    fn apply_bracket(&mut self, source: &SourceKey, bracket: Ip) {
        match bracket.packet {
            Packet::OpenBracket(label) => {
                let targets = self
                    .forwarding
                    .targets(&source.port)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default();
                self.arena.open(source.clone(), label, &targets);
            }
            Packet::CloseBracket(_) => match self.arena.close(source) {
                Some(finished) => self.released.extend(finished),
                None => BracketUnderflow {
                    node_id: self.node_id,
                    port: &source.port,
                    scope: &source.scope,
                }
                .log(),
            },
            Packet::Data(_) => {}
        }
    }

    /// Brackets released by this activation's reads and the scopes whose
    /// forwarding context it depends on.
    pub(crate) fn into_parts(self) -> (Vec<BracketId>, Vec<Option<ScopeId>>) {
        (self.released, self.bracket_scopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::activity::Activity;
    use crate::ports::{PortDefinition, PortOptions};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn ports() -> InPorts {
        let (tx, _rx) = mpsc::unbounded_channel();
        let activity = Activity::new();
        let def = |name: &str, options: PortOptions| PortDefinition::new(name, options);
        InPorts::new(vec![
            InPort::new(def("in1", PortOptions::default()), tx.clone(), activity.clone()).unwrap(),
            InPort::new(def("in2", PortOptions::default().unscoped()), tx.clone(), activity.clone())
                .unwrap(),
            InPort::new(def("arr", PortOptions::default().addressable()), tx, activity).unwrap(),
        ])
    }

    #[test]
    fn test_reads_are_scope_filtered() {
        let ports = ports();
        let forwarding = ForwardBrackets::new();
        let mut buffers = InputBuffers::default();
        let mut arena = BracketArena::default();
        buffers.port("in1").push(None, Ip::data("a").with_scope("x"));
        buffers.port("in1").push(None, Ip::data("b").with_scope("y"));
        buffers.port("in2").push(None, Ip::data("free"));

        let mut input = ProcessInput::new(
            "Node",
            Some(ScopeId::from("y")),
            &ports,
            &forwarding,
            &mut buffers,
            &mut arena,
        );
        assert!(input.has_data(["in1", "in2"]));
        assert_eq!(input.get_data("in1").unwrap(), json!("b"));
        assert!(!input.has_data(["in1"]));
        assert_eq!(input.get_data("in2").unwrap(), json!("free"));
        assert!(matches!(
            input.get_data("in1"),
            Err(ProcessError::Precondition { .. })
        ));
    }

    #[test]
    fn test_bad_references_count_as_absent() {
        let ports = ports();
        let forwarding = ForwardBrackets::new();
        let mut buffers = InputBuffers::default();
        let mut arena = BracketArena::default();
        let mut input =
            ProcessInput::new("Node", None, &ports, &forwarding, &mut buffers, &mut arena);
        assert!(!input.has(["missing"]));
        assert!(!input.has(["arr"]));
        assert!(matches!(
            input.get_data("arr"),
            Err(ProcessError::Port(PortError::IndexRequired { .. }))
        ));
        assert!(input.attached("arr").is_empty());
    }

    #[test]
    fn test_forwarding_reads_record_brackets() {
        let ports = ports();
        let forwarding = ForwardBrackets::new().forward("in1", ["out"]);
        let mut buffers = InputBuffers::default();
        let mut arena = BracketArena::default();
        buffers.port("in1").push(None, Ip::open_bracket("g"));
        buffers.port("in1").push(None, Ip::data(1));

        let mut input =
            ProcessInput::new("Node", None, &ports, &forwarding, &mut buffers, &mut arena);
        assert!(input.has(["in1"]));
        assert_eq!(input.get_data("in1").unwrap(), json!(1));
        let (released, scopes) = input.into_parts();
        assert!(released.is_empty());
        assert_eq!(scopes, vec![None]);
        assert_eq!(arena.context(&None).len(), 1);
    }

    #[test]
    fn test_get_returns_brackets_without_forwarding() {
        let ports = ports();
        let forwarding = ForwardBrackets::new().forward("in1", ["out"]);
        let mut buffers = InputBuffers::default();
        let mut arena = BracketArena::default();
        buffers.port("in1").push(None, Ip::open_bracket("g"));

        let mut input =
            ProcessInput::new("Node", None, &ports, &forwarding, &mut buffers, &mut arena);
        let ip = input.get("in1").unwrap().unwrap();
        assert!(ip.is_bracket());
        assert!(input.get("in1").unwrap().is_none());
        drop(input);
        assert!(arena.is_empty());
    }
}
