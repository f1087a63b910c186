// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-node input buffering.
//!
//! Every input port keeps one FIFO per (index, scope) pair plus a separate
//! FIFO per index for initial packets. Initial packets are visible from
//! every scope; a scoped read falls back to them when its own FIFO has no
//! data. Each stream also tracks its bracket depth on arrival so a
//! completed root-level group can be recognised.

use crate::packet::{Ip, IpKind, ScopeId};
use std::collections::{BTreeMap, HashMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct BufferKey {
    pub index: Option<usize>,
    pub scope: Option<ScopeId>,
}

impl BufferKey {
    pub fn new(index: Option<usize>, scope: Option<ScopeId>) -> Self {
        Self { index, scope }
    }
}

/// Result of a data read: the brackets that preceded the data packet on
/// its stream, and the packet itself.
#[derive(Debug)]
pub(crate) struct Taken {
    pub prefix: Vec<Ip>,
    pub ip: Ip,
    pub initial: bool,
}

#[derive(Debug, Default)]
pub(crate) struct PortBuffer {
    streams: BTreeMap<BufferKey, VecDeque<Ip>>,
    initial: BTreeMap<Option<usize>, VecDeque<Ip>>,
    /// Open groups per stream; absent means depth zero.
    depth: BTreeMap<BufferKey, usize>,
}

impl PortBuffer {
    /// Buffers `ip`. Returns true when it closes a root-level group.
    pub fn push(&mut self, index: Option<usize>, ip: Ip) -> bool {
        if ip.initial {
            self.initial.entry(index).or_default().push_back(ip);
            return false;
        }
        let key = BufferKey::new(index, ip.scope.clone());
        let closes_group = self.track(&key, ip.kind());
        self.streams.entry(key).or_default().push_back(ip);
        closes_group
    }

    fn track(&mut self, key: &BufferKey, kind: IpKind) -> bool {
        match kind {
            IpKind::OpenBracket => {
                *self.depth.entry(key.clone()).or_default() += 1;
                false
            }
            IpKind::CloseBracket => match self.depth.get_mut(key) {
                Some(depth) if *depth > 1 => {
                    *depth -= 1;
                    false
                }
                Some(_) => {
                    self.depth.remove(key);
                    true
                }
                // Unmatched close; the socket already refuses these.
                None => false,
            },
            IpKind::Data => false,
        }
    }

    /// Whether the stream holds brackets and no group on it is still
    /// waiting for its close.
    pub fn has_group(&self, index: Option<usize>, scope: &Option<ScopeId>) -> bool {
        let key = BufferKey::new(index, scope.clone());
        !self.depth.contains_key(&key)
            && self
                .streams
                .get(&key)
                .map(|q| q.iter().any(Ip::is_bracket))
                .unwrap_or(false)
    }

    pub fn has_matching<F>(&self, index: Option<usize>, scope: &Option<ScopeId>, predicate: F) -> bool
    where
        F: Fn(&Ip) -> bool,
    {
        let key = BufferKey::new(index, scope.clone());
        let in_stream = self
            .streams
            .get(&key)
            .map(|q| q.iter().any(&predicate))
            .unwrap_or(false);
        in_stream
            || self
                .initial
                .get(&index)
                .map(|q| q.iter().any(&predicate))
                .unwrap_or(false)
    }

    /// Removes everything up to and including the oldest data packet.
    pub fn take_data(&mut self, index: Option<usize>, scope: &Option<ScopeId>) -> Option<Taken> {
        let key = BufferKey::new(index, scope.clone());
        if let Some(queue) = self.streams.get_mut(&key) {
            if let Some(position) = queue.iter().position(Ip::is_data) {
                let prefix: Vec<Ip> = queue.drain(..position).collect();
                let ip = queue.pop_front()?;
                if queue.is_empty() {
                    self.streams.remove(&key);
                }
                return Some(Taken {
                    prefix,
                    ip,
                    initial: false,
                });
            }
        }
        let queue = self.initial.get_mut(&index)?;
        let position = queue.iter().position(Ip::is_data)?;
        queue.drain(..position);
        let ip = queue.pop_front()?;
        if queue.is_empty() {
            self.initial.remove(&index);
        }
        Some(Taken {
            prefix: Vec::new(),
            ip,
            initial: true,
        })
    }

    /// Next packet of any kind, stream first, then initial packets.
    pub fn pop(&mut self, index: Option<usize>, scope: &Option<ScopeId>) -> Option<Ip> {
        let key = BufferKey::new(index, scope.clone());
        if let Some(queue) = self.streams.get_mut(&key) {
            let ip = queue.pop_front();
            if queue.is_empty() {
                self.streams.remove(&key);
            }
            if ip.is_some() {
                return ip;
            }
        }
        let queue = self.initial.get_mut(&index)?;
        let ip = queue.pop_front();
        if queue.is_empty() {
            self.initial.remove(&index);
        }
        ip
    }

    pub fn front(&self, key: &BufferKey) -> Option<&Ip> {
        self.streams.get(key).and_then(|q| q.front())
    }

    pub fn pop_front(&mut self, key: &BufferKey) -> Option<Ip> {
        let queue = self.streams.get_mut(key)?;
        let ip = queue.pop_front();
        if queue.is_empty() {
            self.streams.remove(key);
        }
        ip
    }

    /// Length of a bracket-only balanced group at the head of the stream,
    /// e.g. `< a < b > >`. `None` when data intervenes or the group is
    /// still incomplete.
    pub fn empty_group_len(&self, key: &BufferKey) -> Option<usize> {
        let queue = self.streams.get(key)?;
        let mut depth = 0usize;
        for (i, ip) in queue.iter().enumerate() {
            match ip.kind() {
                IpKind::OpenBracket => depth += 1,
                IpKind::CloseBracket => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                IpKind::Data => return None,
            }
        }
        None
    }

    pub fn keys(&self) -> Vec<BufferKey> {
        self.streams.keys().cloned().collect()
    }

    pub fn has_data_at(&self, scope: &Option<ScopeId>) -> bool {
        self.streams
            .iter()
            .any(|(k, q)| &k.scope == scope && q.iter().any(Ip::is_data))
    }

    pub fn has_initial_data(&self) -> bool {
        self.initial.values().any(|q| q.iter().any(Ip::is_data))
    }

    pub fn holds_scope(&self, scope: &Option<ScopeId>) -> bool {
        self.streams.keys().any(|k| &k.scope == scope)
    }
}

/// All port buffers of one node, keyed by port name.
#[derive(Debug, Default)]
pub(crate) struct InputBuffers(HashMap<String, PortBuffer>);

impl InputBuffers {
    pub fn port(&mut self, name: &str) -> &mut PortBuffer {
        self.0.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&PortBuffer> {
        self.0.get(name)
    }

    /// Whether any port has stream data at `scope`. For the null scope,
    /// buffered initial packets count as well.
    pub fn has_data_at(&self, scope: &Option<ScopeId>) -> bool {
        self.0.values().any(|b| {
            b.has_data_at(scope) || (scope.is_none() && b.has_initial_data())
        })
    }

    pub fn holds_scope(&self, scope: &Option<ScopeId>) -> bool {
        self.0.values().any(|b| b.holds_scope(scope))
    }
}

/// Scopes in the order they were first observed by the node.
#[derive(Debug, Default)]
pub(crate) struct ScopeOrder(Vec<Option<ScopeId>>);

impl ScopeOrder {
    pub fn observe(&mut self, scope: &Option<ScopeId>) {
        if !self.0.contains(scope) {
            self.0.push(scope.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Option<ScopeId>> {
        self.0.iter()
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Option<ScopeId>) -> bool,
    {
        self.0.retain(keep);
    }
}
