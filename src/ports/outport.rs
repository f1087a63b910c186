// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{PortError, SocketError};
use crate::packet::Ip;
use crate::ports::slots::SocketSlots;
use crate::ports::{describe, PortDefinition, PortOptions};
use crate::socket::Socket;
use serde_json::Value;

/// Sending endpoint. Writes go through [`Socket`] stream handling so each
/// downstream connection sees `connect`, nested brackets, `disconnect`.
#[derive(Debug)]
pub struct OutPort {
    name: String,
    options: PortOptions,
    slots: SocketSlots,
}

impl OutPort {
    pub fn new(definition: PortDefinition) -> Result<Self, PortError> {
        definition.validate()?;
        Ok(Self {
            slots: SocketSlots::new(&definition.name, &definition.options),
            name: definition.name,
            options: definition.options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &PortOptions {
        &self.options
    }

    pub fn attach(&self, socket: &Socket, index: Option<usize>) -> Result<usize, PortError> {
        self.slots.attach(socket, index)
    }

    pub fn detach(&self, socket: &Socket) -> Result<(), PortError> {
        self.slots.detach(socket).map(|_| ())
    }

    pub fn is_attached(&self, index: Option<usize>) -> bool {
        self.slots.is_attached(index)
    }

    pub fn sockets(&self) -> Vec<Socket> {
        self.slots.sockets()
    }

    /// Checks a payload and target index before it is accepted for sending.
    pub fn validate(&self, value: &Value, index: Option<usize>) -> Result<(), PortError> {
        if !self.options.datatype.accepts(value) {
            return Err(PortError::TypeMismatch {
                port: self.name.clone(),
                expected: self.options.datatype.as_str().to_string(),
                found: describe(value).to_string(),
            });
        }
        self.check_index(index)
    }

    /// An index must name an attached slot of an addressable port. No index
    /// means every attached socket.
    pub fn check_index(&self, index: Option<usize>) -> Result<(), PortError> {
        match index {
            Some(_) if !self.options.addressable => Err(PortError::NotAddressable {
                port: self.name.clone(),
            }),
            Some(i) if !self.is_attached(Some(i)) => Err(PortError::Index {
                port: self.name.clone(),
                index: i,
            }),
            _ => Ok(()),
        }
    }

    /// Writes `ip` to the socket at `index`, or to every attached socket.
    ///
    /// Unscoped ports null the scope. Sending on a port with nothing
    /// attached drops the packet.
    pub fn emit(&self, mut ip: Ip, index: Option<usize>, owner: &str) -> Result<(), SocketError> {
        if !self.options.scoped {
            ip.scope = None;
        }
        ip.owner = Some(owner.to_string());
        let targets: Vec<Socket> = match index {
            Some(i) => self.slots.at(i).into_iter().collect(),
            None => self.sockets(),
        };
        let mut result = Ok(());
        for socket in targets {
            if let Err(err) = socket.deliver(ip.clone()) {
                result = Err(err);
            }
        }
        result
    }

    pub fn congested(&self) -> bool {
        self.sockets().iter().any(Socket::congested)
    }

    pub async fn wait_for_capacity(&self) {
        for socket in self.sockets() {
            socket.wait_for_capacity().await;
        }
    }

    /// Closes any open brackets and ends the stream on every socket.
    pub fn force_disconnect(&self) {
        for socket in self.sockets() {
            socket.force_disconnect();
        }
    }
}
