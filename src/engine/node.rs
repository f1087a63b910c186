// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::activity::Activity;
use crate::engine::boundary::ProcessBoundary;
use crate::engine::network::NetworkEvent;
use crate::errors::PortError;
use crate::ports::{InPort, InPorts, OutPort, OutPorts};
use crate::socket::Delivery;
use crate::traits::{Component, ForwardBrackets};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// A component instance placed in a network under a node id.
///
/// The node owns the live ports and the inbox every attached input socket
/// delivers into. Each run gets a fresh [`ProcessBoundary`] driven by
/// [`Node::run`] on its own task.
pub struct Node {
    id: Arc<str>,
    component: Arc<dyn Component>,
    in_ports: Arc<InPorts>,
    out_ports: Arc<OutPorts>,
    forwarding: ForwardBrackets,
    activity: Activity,
    inbox: Mutex<mpsc::UnboundedReceiver<Delivery>>,
}

impl Node {
    pub fn new(
        id: &str,
        component: Arc<dyn Component>,
        activity: Activity,
    ) -> Result<Self, PortError> {
        let (tx, inbox) = mpsc::unbounded_channel();

        let in_ports = component
            .in_ports()
            .into_iter()
            .map(|def| InPort::new(def, tx.clone(), activity.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let out_ports = component
            .out_ports()
            .into_iter()
            .map(OutPort::new)
            .collect::<Result<Vec<_>, _>>()?;
        let in_ports = InPorts::new(in_ports);
        let out_ports = OutPorts::new(out_ports);

        let forwarding = component.forward_brackets();
        for (source, targets) in forwarding.iter() {
            in_ports.require(source)?;
            for target in targets {
                out_ports.require(target)?;
            }
        }

        Ok(Self {
            id: Arc::from(id),
            component,
            in_ports: Arc::new(in_ports),
            out_ports: Arc::new(out_ports),
            forwarding,
            activity,
            inbox: Mutex::new(inbox),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn shared_id(&self) -> Arc<str> {
        self.id.clone()
    }

    pub fn component(&self) -> Arc<dyn Component> {
        self.component.clone()
    }

    pub fn in_port(&self, name: &str) -> Option<&InPort> {
        self.in_ports.get(name)
    }

    pub fn out_port(&self, name: &str) -> Option<&OutPort> {
        self.out_ports.get(name)
    }

    pub fn in_ports(&self) -> Arc<InPorts> {
        self.in_ports.clone()
    }

    pub fn out_ports(&self) -> Arc<OutPorts> {
        self.out_ports.clone()
    }

    pub fn forwarding(&self) -> &ForwardBrackets {
        &self.forwarding
    }

    /// Drives the node until `cancel` fires. Completions from activations
    /// of this run travel on a channel that is dropped with the run.
    pub(crate) async fn run(
        self: Arc<Self>,
        cancel: CancellationToken,
        events: broadcast::Sender<NetworkEvent>,
    ) {
        let (tx, mut completions) = mpsc::unbounded_channel();
        let mut boundary = ProcessBoundary::new(&self, self.activity.clone(), tx, events);
        let mut inbox = self.inbox.lock().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(completion) = completions.recv() => boundary.complete(completion),
                Some(delivery) = inbox.recv() => boundary.receive(delivery),
                else => break,
            }
        }
    }

    /// Discards everything still queued in the inbox. Only called while
    /// the node is not running.
    pub(crate) async fn drain_inbox(&self) -> usize {
        let mut inbox = self.inbox.lock().await;
        let mut dropped = 0;
        while inbox.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    #[cfg(test)]
    pub(crate) async fn try_next_delivery(&self) -> Option<Delivery> {
        self.inbox.lock().await.try_recv().ok()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("component", &self.component.name())
            .field("in_ports", &self.in_ports.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortOptions;
    use crate::traits::ComponentBuilder;

    #[test]
    fn test_forwarding_must_name_declared_ports() {
        let component = ComponentBuilder::new("Bad")
            .in_port("in", PortOptions::default())
            .out_port("out", PortOptions::default())
            .forward("in", ["missing"])
            .process(|_, output| output.done());
        let err = Node::new("n", Arc::new(component), Activity::new()).unwrap_err();
        assert!(matches!(err, PortError::UnknownPort { .. }));
    }

    #[test]
    fn test_invalid_port_name_is_rejected() {
        let component = ComponentBuilder::new("Bad")
            .in_port("In", PortOptions::default())
            .process(|_, output| output.done());
        assert!(matches!(
            Node::new("n", Arc::new(component), Activity::new()),
            Err(PortError::InvalidName { .. })
        ));
    }

    #[tokio::test]
    async fn test_drain_inbox_discards_pending_deliveries() {
        let component = ComponentBuilder::new("Sink")
            .in_port("in", PortOptions::default())
            .process(|_, output| output.done());
        let activity = Activity::new();
        let node = Node::new("n", Arc::new(component), activity.clone()).unwrap();
        let socket = crate::socket::Socket::new();
        node.in_port("in").unwrap().attach(&socket, None).unwrap();
        socket.send("x").unwrap();
        assert_eq!(activity.pending(), 2);
        assert_eq!(node.drain_inbox().await, 2);
        assert_eq!(activity.pending(), 0);
    }
}
