// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Socket bookkeeping shared by input and output ports.

use crate::errors::PortError;
use crate::ports::PortOptions;
use crate::socket::Socket;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Highest index an addressable port accepts.
pub const MAX_PORT_INDEX: usize = 1023;

/// Sockets attached to one port.
///
/// Addressable ports keep one slot per index and leave a detached slot
/// empty; other ports keep a plain list.
#[derive(Debug)]
pub(crate) struct SocketSlots {
    port: String,
    addressable: bool,
    multiple: bool,
    slots: Mutex<Vec<Option<Socket>>>,
}

impl SocketSlots {
    pub fn new(port: &str, options: &PortOptions) -> Self {
        Self {
            port: port.to_string(),
            addressable: options.addressable,
            multiple: options.multiple,
            slots: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<Socket>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `socket` and returns the index it occupies.
    pub fn attach(&self, socket: &Socket, index: Option<usize>) -> Result<usize, PortError> {
        let mut slots = self.lock();
        if self.addressable {
            let position = index.unwrap_or(slots.len());
            if position > MAX_PORT_INDEX {
                return Err(PortError::IndexLimit {
                    port: self.port.clone(),
                    index: position,
                    limit: MAX_PORT_INDEX,
                });
            }
            if slots.len() <= position {
                slots.resize(position + 1, None);
            }
            if slots[position].is_some() {
                return Err(PortError::Capacity {
                    port: format!("{}[{}]", self.port, position),
                });
            }
            slots[position] = Some(socket.clone());
            return Ok(position);
        }
        if index.is_some() {
            return Err(PortError::NotAddressable {
                port: self.port.clone(),
            });
        }
        if !self.multiple && slots.iter().any(Option::is_some) {
            return Err(PortError::Capacity {
                port: self.port.clone(),
            });
        }
        slots.push(Some(socket.clone()));
        Ok(slots.len() - 1)
    }

    /// Removes `socket` and returns the index it occupied.
    pub fn detach(&self, socket: &Socket) -> Result<usize, PortError> {
        let mut slots = self.lock();
        let position = slots
            .iter()
            .position(|s| s.as_ref() == Some(socket))
            .ok_or_else(|| PortError::NotAttached {
                port: self.port.clone(),
                socket: socket.id().get(),
            })?;
        if self.addressable {
            slots[position] = None;
        } else {
            slots.remove(position);
        }
        Ok(position)
    }

    /// Whether a socket sits at `index`, or anywhere when `index` is `None`.
    pub fn is_attached(&self, index: Option<usize>) -> bool {
        let slots = self.lock();
        match index {
            Some(i) => slots.get(i).map(Option::is_some).unwrap_or(false),
            None => slots.iter().any(Option::is_some),
        }
    }

    pub fn indices(&self) -> Vec<usize> {
        self.lock()
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
            .collect()
    }

    pub fn at(&self, index: usize) -> Option<Socket> {
        self.lock().get(index).cloned().flatten()
    }

    pub fn sockets(&self) -> Vec<Socket> {
        self.lock().iter().flatten().cloned().collect()
    }
}
