// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::activity::Activity;
use crate::errors::PortError;
use crate::ports::slots::SocketSlots;
use crate::ports::{PortDefinition, PortOptions};
use crate::socket::{Consumer, Delivery, PortAddress, Socket};
use tokio::sync::mpsc;

/// Receiving endpoint. Every attached socket delivers into the owning
/// node's inbox tagged with this port's address.
#[derive(Debug)]
pub struct InPort {
    name: String,
    options: PortOptions,
    slots: SocketSlots,
    inbox: mpsc::UnboundedSender<Delivery>,
    activity: Activity,
}

impl InPort {
    pub fn new(
        definition: PortDefinition,
        inbox: mpsc::UnboundedSender<Delivery>,
        activity: Activity,
    ) -> Result<Self, PortError> {
        definition.validate()?;
        Ok(Self {
            slots: SocketSlots::new(&definition.name, &definition.options),
            name: definition.name,
            options: definition.options,
            inbox,
            activity,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &PortOptions {
        &self.options
    }

    pub fn is_addressable(&self) -> bool {
        self.options.addressable
    }

    fn address(&self, index: usize) -> PortAddress {
        PortAddress {
            port: self.name.clone(),
            index: self.options.addressable.then_some(index),
        }
    }

    /// Binds `socket` to this port and returns the index it occupies.
    ///
    /// Addressable ports place the socket at `index`, or append it when no
    /// index is given. Non-addressable ports refuse an index and refuse a
    /// second connection unless `multiple` is set.
    pub fn attach(&self, socket: &Socket, index: Option<usize>) -> Result<usize, PortError> {
        let position = self.slots.attach(socket, index)?;
        socket.bind(Consumer::Port {
            tx: self.inbox.clone(),
            target: self.address(position),
            activity: self.activity.clone(),
        });
        Ok(position)
    }

    pub fn detach(&self, socket: &Socket) -> Result<(), PortError> {
        let position = self.slots.detach(socket)?;
        if socket.is_bound_to(&self.address(position)) {
            socket.unbind();
        }
        Ok(())
    }

    pub fn is_attached(&self, index: Option<usize>) -> bool {
        self.slots.is_attached(index)
    }

    pub fn attached_indices(&self) -> Vec<usize> {
        self.slots.indices()
    }

    pub fn sockets(&self) -> Vec<Socket> {
        self.slots.sockets()
    }

    /// Checks that `index` is a legal way to address this port.
    pub fn check_index(&self, index: Option<usize>) -> Result<(), PortError> {
        match (self.options.addressable, index) {
            (true, None) => Err(PortError::IndexRequired {
                port: self.name.clone(),
            }),
            (false, Some(_)) => Err(PortError::NotAddressable {
                port: self.name.clone(),
            }),
            (true, Some(i)) if !self.is_attached(Some(i)) => Err(PortError::Index {
                port: self.name.clone(),
                index: i,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::SocketEvent;

    fn port(options: PortOptions) -> (InPort, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let port = InPort::new(PortDefinition::new("in", options), tx, Activity::new()).unwrap();
        (port, rx)
    }

    #[test]
    fn test_single_connection_port_refuses_second_socket() {
        let (port, _rx) = port(PortOptions::default().single());
        port.attach(&Socket::new(), None).unwrap();
        assert!(matches!(
            port.attach(&Socket::new(), None),
            Err(PortError::Capacity { .. })
        ));
    }

    #[test]
    fn test_multiple_connections_allowed_by_default() {
        let (port, _rx) = port(PortOptions::default());
        port.attach(&Socket::new(), None).unwrap();
        port.attach(&Socket::new(), None).unwrap();
        assert_eq!(port.sockets().len(), 2);
    }

    #[test]
    fn test_detach_unknown_socket() {
        let (port, _rx) = port(PortOptions::default());
        assert!(matches!(
            port.detach(&Socket::new()),
            Err(PortError::NotAttached { .. })
        ));
    }

    #[test]
    fn test_addressable_indices_are_stable() {
        let (port, _rx) = port(PortOptions::default().addressable());
        let a = Socket::new();
        let b = Socket::new();
        assert_eq!(port.attach(&a, None).unwrap(), 0);
        assert_eq!(port.attach(&b, None).unwrap(), 1);
        port.detach(&a).unwrap();
        assert_eq!(port.attached_indices(), vec![1]);
        assert!(matches!(port.check_index(Some(0)), Err(PortError::Index { index: 0, .. })));
        assert!(port.check_index(Some(1)).is_ok());
        assert!(matches!(port.check_index(None), Err(PortError::IndexRequired { .. })));
        assert_eq!(port.attach(&Socket::new(), Some(3)).unwrap(), 3);
        assert_eq!(port.attached_indices(), vec![1, 3]);
    }

    #[test]
    fn test_huge_index_from_a_graph_is_refused() {
        let (port, _rx) = port(PortOptions::default().addressable());
        let socket = Socket::new();
        assert!(matches!(
            port.attach(&socket, Some(usize::MAX)),
            Err(PortError::IndexLimit { .. })
        ));
        assert!(port.attached_indices().is_empty());
    }

    #[test]
    fn test_index_on_scalar_port_is_refused() {
        let (port, _rx) = port(PortOptions::default());
        assert!(matches!(
            port.attach(&Socket::new(), Some(0)),
            Err(PortError::NotAddressable { .. })
        ));
    }

    #[tokio::test]
    async fn test_deliveries_carry_port_address() {
        let (port, mut rx) = port(PortOptions::default().addressable());
        let socket = Socket::new();
        port.attach(&socket, Some(2)).unwrap();
        socket.send("x").unwrap();
        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.target.port, "in");
        assert_eq!(delivery.target.index, Some(2));
        assert_eq!(delivery.event, SocketEvent::Connect);

        port.detach(&socket).unwrap();
        socket.send("y").unwrap();
        rx.recv().await.unwrap();
        assert!(rx.try_recv().is_err());
    }
}
