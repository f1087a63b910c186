// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output side of an activation.
//!
//! A [`ProcessOutput`] is an owned completion handle. It can be moved into a
//! spawned task and completed later; every write is validated on the
//! caller's side and then handed to the owning node through a channel that
//! lives exactly as long as the run. Once the network stops the channel is
//! gone and late writes fail with [`ProcessError::NetworkStopped`].

use crate::engine::queue::{ActivationId, OutputItem};
use crate::errors::{PortError, ProcessError};
use crate::observability::messages::node::LateCompletion;
use crate::observability::messages::StructuredLog;
use crate::packet::{Ip, Packet, ScopeId};
use crate::ports::{OutPort, OutPorts, PortRef};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Message from an activation back to its node.
#[derive(Debug)]
pub(crate) enum Completion {
    Send {
        activation: ActivationId,
        items: Vec<OutputItem>,
    },
    Done {
        activation: ActivationId,
    },
    Failed {
        activation: ActivationId,
        scope: Option<ScopeId>,
        error: ProcessError,
    },
    /// Output ports have capacity again.
    Resume,
}

/// What an activation sends: a value for the default (first) output port,
/// or values for named ports.
#[derive(Debug, Clone, PartialEq)]
pub enum Outputs {
    Default(Value),
    Ports(Vec<(PortRef, Value)>),
}

impl Outputs {
    pub fn to(port: impl Into<PortRef>, value: impl Into<Value>) -> Self {
        Outputs::Ports(vec![(port.into(), value.into())])
    }

    pub fn with(self, port: impl Into<PortRef>, value: impl Into<Value>) -> Self {
        let mut ports = match self {
            Outputs::Ports(ports) => ports,
            Outputs::Default(value) => vec![(PortRef::from(""), value)],
        };
        ports.push((port.into(), value.into()));
        Outputs::Ports(ports)
    }
}

impl From<Value> for Outputs {
    fn from(value: Value) -> Self {
        Outputs::Default(value)
    }
}

impl From<&str> for Outputs {
    fn from(value: &str) -> Self {
        Outputs::Default(Value::from(value))
    }
}

impl From<String> for Outputs {
    fn from(value: String) -> Self {
        Outputs::Default(Value::from(value))
    }
}

impl From<i64> for Outputs {
    fn from(value: i64) -> Self {
        Outputs::Default(Value::from(value))
    }
}

impl From<bool> for Outputs {
    fn from(value: bool) -> Self {
        Outputs::Default(Value::from(value))
    }
}

#[derive(Debug)]
pub struct ProcessOutput {
    activation: ActivationId,
    scope: Option<ScopeId>,
    node_id: Arc<str>,
    ports: Arc<OutPorts>,
    tx: mpsc::UnboundedSender<Completion>,
    finished: bool,
}

impl ProcessOutput {
    pub(crate) fn new(
        activation: ActivationId,
        scope: Option<ScopeId>,
        node_id: Arc<str>,
        ports: Arc<OutPorts>,
        tx: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            activation,
            scope,
            node_id,
            ports,
            tx,
            finished: false,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Scope the activation runs under.
    pub fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    fn port(&self, target: &PortRef) -> Result<&OutPort, PortError> {
        if target.name.is_empty() {
            self.ports.default_port()
        } else {
            self.ports.require(&target.name)
        }
    }

    fn resolve(&self, outputs: Outputs) -> Result<Vec<OutputItem>, PortError> {
        let pairs = match outputs {
            Outputs::Default(value) => {
                let port = self.ports.default_port()?;
                vec![(PortRef::new(port.name(), None), value)]
            }
            Outputs::Ports(pairs) => pairs,
        };
        let mut items = Vec::with_capacity(pairs.len());
        for (target, value) in pairs {
            let port = self.port(&target)?;
            port.validate(&value, target.index)?;
            items.push(OutputItem {
                port: port.name().to_string(),
                index: target.index,
                packet: Packet::Data(value),
            });
        }
        Ok(items)
    }

    fn submit(&self, completion: Completion) -> Result<(), ProcessError> {
        self.tx.send(completion).map_err(|_| {
            LateCompletion {
                node_id: &self.node_id,
                activation: self.activation,
            }
            .log();
            ProcessError::NetworkStopped
        })
    }

    /// Validates and queues output. Nothing is queued if any target fails
    /// validation.
    pub fn send(&self, outputs: impl Into<Outputs>) -> Result<(), ProcessError> {
        let items = self.resolve(outputs.into())?;
        self.submit(Completion::Send {
            activation: self.activation,
            items,
        })
    }

    /// Queues one packet of any kind on `port`. Brackets sent this way are
    /// written as given, inside any forwarded brackets of the activation;
    /// the packet's own scope is replaced by the activation's.
    pub fn send_ip(&self, port: impl Into<PortRef>, ip: Ip) -> Result<(), ProcessError> {
        let target = port.into();
        let port = self.port(&target)?;
        match &ip.packet {
            Packet::Data(value) => port.validate(value, target.index)?,
            Packet::OpenBracket(_) | Packet::CloseBracket(_) => port.check_index(target.index)?,
        }
        self.submit(Completion::Send {
            activation: self.activation,
            items: vec![OutputItem {
                port: port.name().to_string(),
                index: target.index,
                packet: ip.packet,
            }],
        })
    }

    pub fn send_done(self, outputs: impl Into<Outputs>) -> Result<(), ProcessError> {
        self.send(outputs)?;
        self.done()
    }

    pub fn done(mut self) -> Result<(), ProcessError> {
        self.finished = true;
        self.submit(Completion::Done {
            activation: self.activation,
        })
    }

    /// Ends the activation as failed; its unwritten output is dropped.
    pub fn fail(mut self, error: ProcessError) -> Result<(), ProcessError> {
        self.finished = true;
        self.submit(Completion::Failed {
            activation: self.activation,
            scope: self.scope.clone(),
            error,
        })
    }
}

impl Drop for ProcessOutput {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.tx.send(Completion::Done {
                activation: self.activation,
            });
        }
    }
}
