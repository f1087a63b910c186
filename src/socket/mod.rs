// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Connections between one output port and one input port.
//!
//! A [`Socket`] is a FIFO of [`SocketEvent`]s. The producing side is an
//! [`OutPort`](crate::ports::OutPort) or an external harness; the consuming
//! side is either an [`InPort`](crate::ports::InPort), which forwards every
//! event into its node's inbox, or a [`SocketListener`] used to observe a
//! graph outport. Events emitted before a consumer is bound are kept in a
//! backlog and flushed in order on bind.
//!
//! # Stream discipline
//!
//! `connect` opens a stream, brackets nest strictly inside it, and
//! `disconnect` is refused while brackets are open. [`Socket::post`] opens
//! the stream on demand and closes it again once its bracket depth is back
//! to zero.

use crate::engine::activity::Activity;
use crate::errors::SocketError;
use crate::observability::messages::socket::{BackpressureRejected, UnmatchedClose};
use crate::observability::messages::StructuredLog;
use crate::packet::{Ip, Packet};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, Notify};

static NEXT_SOCKET_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(u64);

impl SocketId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Display for SocketId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Connect,
    Ip(Ip),
    Disconnect,
}

/// Port (and sub-channel for addressable ports) a socket delivers into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortAddress {
    pub port: String,
    pub index: Option<usize>,
}

/// One event on its way into a node's inbox.
///
/// Holds a unit of network activity until the receiving node has finished
/// handling it.
#[derive(Debug)]
pub struct Delivery {
    pub socket: SocketId,
    pub target: PortAddress,
    pub event: SocketEvent,
    _guard: DeliveryGuard,
}

#[derive(Debug)]
struct DeliveryGuard {
    shared: Arc<Shared>,
    activity: Activity,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        self.shared.pending.fetch_sub(1, Ordering::SeqCst);
        self.shared.capacity.notify_waiters();
        self.activity.exit();
    }
}

#[derive(Debug)]
pub(crate) enum Consumer {
    Port {
        tx: mpsc::UnboundedSender<Delivery>,
        target: PortAddress,
        activity: Activity,
    },
    Listener(mpsc::UnboundedSender<SocketEvent>),
}

#[derive(Debug, Default)]
struct State {
    connected: bool,
    auto_connected: bool,
    brackets: Vec<Value>,
    consumer: Option<Consumer>,
    backlog: VecDeque<SocketEvent>,
}

#[derive(Debug)]
struct Shared {
    id: SocketId,
    state: Mutex<State>,
    pending: AtomicUsize,
    high_water_mark: Option<usize>,
    capacity: Notify,
}

#[derive(Debug, Clone)]
pub struct Socket {
    shared: Arc<Shared>,
}

impl Socket {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A socket that rejects external sends while `limit` deliveries are
    /// still waiting in the consumer's inbox.
    pub fn with_high_water_mark(limit: usize) -> Self {
        Self::build(Some(limit.max(1)))
    }

    fn build(high_water_mark: Option<usize>) -> Self {
        let id = SocketId(NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            shared: Arc::new(Shared {
                id,
                state: Mutex::new(State::default()),
                pending: AtomicUsize::new(0),
                high_water_mark,
                capacity: Notify::new(),
            }),
        }
    }

    pub fn id(&self) -> SocketId {
        self.shared.id
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Number of currently open brackets.
    pub fn depth(&self) -> usize {
        self.state().brackets.len()
    }

    /// Deliveries handed to the consumer and not yet handled.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn high_water_mark(&self) -> Option<usize> {
        self.shared.high_water_mark
    }

    pub fn congested(&self) -> bool {
        match self.shared.high_water_mark {
            Some(limit) => self.pending() >= limit,
            None => false,
        }
    }

    /// Resolves once the socket is below its high-water mark.
    pub async fn wait_for_capacity(&self) {
        loop {
            let notified = self.shared.capacity.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.congested() {
                return;
            }
            notified.await;
        }
    }

    fn check_capacity(&self) -> Result<(), SocketError> {
        if let Some(limit) = self.shared.high_water_mark {
            let pending = self.pending();
            if pending >= limit {
                let err = SocketError::Backpressure {
                    socket: self.shared.id.get(),
                    pending,
                    limit,
                };
                BackpressureRejected {
                    socket: self.shared.id,
                    pending,
                    limit,
                }
                .log();
                return Err(err);
            }
        }
        Ok(())
    }

    fn dispatch(&self, state: &mut State, event: SocketEvent) {
        let undelivered = match &state.consumer {
            Some(Consumer::Port {
                tx,
                target,
                activity,
            }) => {
                self.shared.pending.fetch_add(1, Ordering::SeqCst);
                activity.enter();
                let delivery = Delivery {
                    socket: self.shared.id,
                    target: target.clone(),
                    event,
                    _guard: DeliveryGuard {
                        shared: self.shared.clone(),
                        activity: activity.clone(),
                    },
                };
                tx.send(delivery).err().map(|failed| {
                    let Delivery { event, .. } = failed.0;
                    event
                })
            }
            Some(Consumer::Listener(tx)) => tx.send(event).err().map(|failed| failed.0),
            None => Some(event),
        };
        if let Some(event) = undelivered {
            state.consumer = None;
            state.backlog.push_back(event);
        }
    }

    fn open_stream(&self, state: &mut State) {
        if !state.connected {
            state.connected = true;
            self.dispatch(state, SocketEvent::Connect);
        }
    }

    fn close_stream(&self, state: &mut State) {
        state.connected = false;
        state.auto_connected = false;
        self.dispatch(state, SocketEvent::Disconnect);
    }

    /// Opens a stream. Connecting an already connected socket is a no-op.
    pub fn connect(&self) {
        let mut state = self.state();
        self.open_stream(&mut state);
    }

    pub fn disconnect(&self) -> Result<(), SocketError> {
        let mut state = self.state();
        if !state.connected {
            return Err(SocketError::NotConnected {
                socket: self.shared.id.get(),
            });
        }
        if !state.brackets.is_empty() {
            return Err(SocketError::OpenBrackets {
                socket: self.shared.id.get(),
                depth: state.brackets.len(),
            });
        }
        self.close_stream(&mut state);
        Ok(())
    }

    /// Sends an unscoped data packet, connecting first if needed.
    pub fn send(&self, value: impl Into<Value>) -> Result<(), SocketError> {
        self.check_capacity()?;
        let mut state = self.state();
        self.open_stream(&mut state);
        self.dispatch(&mut state, SocketEvent::Ip(Ip::data(value)));
        Ok(())
    }

    pub fn begin_group(&self, label: impl Into<Value>) -> Result<(), SocketError> {
        self.check_capacity()?;
        let label = label.into();
        let mut state = self.state();
        self.open_stream(&mut state);
        state.brackets.push(label.clone());
        self.dispatch(&mut state, SocketEvent::Ip(Ip::open_bracket(label)));
        Ok(())
    }

    pub fn end_group(&self) -> Result<(), SocketError> {
        let mut state = self.state();
        let label = state.brackets.pop().ok_or(SocketError::UnbalancedBracket {
            socket: self.shared.id.get(),
        })?;
        self.dispatch(&mut state, SocketEvent::Ip(Ip::close_bracket(label)));
        Ok(())
    }

    /// Sends a packet with automatic stream handling.
    ///
    /// Connects when no stream is open and disconnects again when the
    /// stream it opened is back at bracket depth zero.
    pub fn post(&self, ip: Ip) -> Result<(), SocketError> {
        if !matches!(ip.packet, Packet::CloseBracket(_)) {
            self.check_capacity()?;
        }
        self.deliver(ip)
    }

    /// [`Socket::post`] without the high-water check. Used by output ports,
    /// which pause on congestion instead of failing.
    pub(crate) fn deliver(&self, ip: Ip) -> Result<(), SocketError> {
        let mut state = self.state();
        if let Packet::CloseBracket(_) = ip.packet {
            if state.brackets.is_empty() {
                UnmatchedClose {
                    socket: self.shared.id,
                    ip: &ip,
                }
                .log();
                return Err(SocketError::UnbalancedBracket {
                    socket: self.shared.id.get(),
                });
            }
        }
        if !state.connected && state.brackets.is_empty() {
            self.open_stream(&mut state);
            state.auto_connected = true;
        }
        match &ip.packet {
            Packet::OpenBracket(label) => state.brackets.push(label.clone()),
            Packet::CloseBracket(_) => {
                state.brackets.pop();
            }
            Packet::Data(_) => {}
        }
        self.dispatch(&mut state, SocketEvent::Ip(ip));
        if state.auto_connected && state.brackets.is_empty() {
            self.close_stream(&mut state);
        }
        Ok(())
    }

    /// Terminates the stream: closes every open bracket, then disconnects.
    pub fn force_disconnect(&self) {
        let mut state = self.state();
        if !state.connected {
            return;
        }
        while let Some(label) = state.brackets.pop() {
            self.dispatch(&mut state, SocketEvent::Ip(Ip::close_bracket(label)));
        }
        self.close_stream(&mut state);
    }

    /// Observes this socket from outside the network. Replaces any previous
    /// consumer and replays the backlog.
    pub fn listen(&self) -> SocketListener {
        let (tx, rx) = mpsc::unbounded_channel();
        self.bind(Consumer::Listener(tx));
        SocketListener { rx }
    }

    pub(crate) fn bind(&self, consumer: Consumer) {
        let mut state = self.state();
        state.consumer = Some(consumer);
        let backlog: Vec<SocketEvent> = state.backlog.drain(..).collect();
        for event in backlog {
            self.dispatch(&mut state, event);
        }
    }

    pub(crate) fn unbind(&self) {
        self.state().consumer = None;
    }

    pub(crate) fn is_bound_to(&self, address: &PortAddress) -> bool {
        matches!(
            &self.state().consumer,
            Some(Consumer::Port { target, .. }) if target == address
        )
    }
}

impl Default for Socket {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Socket {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

/// Receiving end of [`Socket::listen`].
#[derive(Debug)]
pub struct SocketListener {
    rx: mpsc::UnboundedReceiver<SocketEvent>,
}

impl SocketListener {
    pub async fn recv(&mut self) -> Option<SocketEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SocketEvent> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::IpKind;

    fn drain(listener: &mut SocketListener) -> Vec<String> {
        let mut seen = Vec::new();
        while let Some(event) = listener.try_recv() {
            seen.push(match event {
                SocketEvent::Connect => "CONN".to_string(),
                SocketEvent::Disconnect => "DISC".to_string(),
                SocketEvent::Ip(ip) => ip.to_string(),
            });
        }
        seen
    }

    #[test]
    fn test_explicit_stream() {
        let socket = Socket::new();
        let mut listener = socket.listen();
        socket.connect();
        socket.connect();
        socket.begin_group(1).unwrap();
        socket.send("baz").unwrap();
        socket.end_group().unwrap();
        socket.disconnect().unwrap();
        assert_eq!(
            drain(&mut listener),
            vec!["CONN", "null < 1", "null DATA baz", "null >", "DISC"]
        );
    }

    #[test]
    fn test_post_auto_connects_and_disconnects_at_depth_zero() {
        let socket = Socket::new();
        let mut listener = socket.listen();
        socket.post(Ip::open_bracket(1).with_scope("x")).unwrap();
        socket.post(Ip::data("one").with_scope("x")).unwrap();
        socket.post(Ip::close_bracket(1).with_scope("x")).unwrap();
        socket.post(Ip::data("two")).unwrap();
        assert_eq!(
            drain(&mut listener),
            vec![
                "CONN",
                "x < 1",
                "x DATA one",
                "x >",
                "DISC",
                "CONN",
                "null DATA two",
                "DISC"
            ]
        );
    }

    #[test]
    fn test_post_inside_explicit_stream_keeps_it_open() {
        let socket = Socket::new();
        let mut listener = socket.listen();
        socket.connect();
        socket.post(Ip::data("a")).unwrap();
        assert!(socket.is_connected());
        socket.disconnect().unwrap();
        assert_eq!(drain(&mut listener), vec!["CONN", "null DATA a", "DISC"]);
    }

    #[test]
    fn test_misuse_is_reported() {
        let socket = Socket::new();
        assert!(matches!(
            socket.disconnect(),
            Err(SocketError::NotConnected { .. })
        ));
        assert!(matches!(
            socket.end_group(),
            Err(SocketError::UnbalancedBracket { .. })
        ));
        assert!(matches!(
            socket.post(Ip::close_bracket(Value::Null)),
            Err(SocketError::UnbalancedBracket { .. })
        ));
        socket.begin_group("g").unwrap();
        assert!(matches!(
            socket.disconnect(),
            Err(SocketError::OpenBrackets { depth: 1, .. })
        ));
    }

    #[test]
    fn test_backlog_is_replayed_on_listen() {
        let socket = Socket::new();
        socket.send(1).unwrap();
        socket.disconnect().unwrap();
        let mut listener = socket.listen();
        assert_eq!(drain(&mut listener), vec!["CONN", "null DATA 1", "DISC"]);
    }

    #[test]
    fn test_force_disconnect_closes_open_brackets() {
        let socket = Socket::new();
        let mut listener = socket.listen();
        socket.begin_group("a").unwrap();
        socket.begin_group("b").unwrap();
        socket.force_disconnect();
        let events = drain(&mut listener);
        assert_eq!(events.len(), 6);
        assert_eq!(events[3], "null >");
        assert_eq!(events[5], "DISC");
        assert_eq!(socket.depth(), 0);
        assert!(!socket.is_connected());
    }

    #[tokio::test]
    async fn test_high_water_mark_rejects_until_drained() {
        let socket = Socket::with_high_water_mark(2);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let activity = Activity::new();
        socket.bind(Consumer::Port {
            tx,
            target: PortAddress {
                port: "in".into(),
                index: None,
            },
            activity: activity.clone(),
        });
        socket.send("a").unwrap();
        assert_eq!(socket.pending(), 2);
        assert!(socket.congested());
        assert!(matches!(
            socket.send("b"),
            Err(SocketError::Backpressure { limit: 2, .. })
        ));
        assert_eq!(activity.pending(), 2);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event, SocketEvent::Connect);
        drop(first);
        socket.wait_for_capacity().await;
        let second = rx.recv().await.unwrap();
        match &second.event {
            SocketEvent::Ip(ip) => assert_eq!(ip.kind(), IpKind::Data),
            other => panic!("unexpected {:?}", other),
        }
        drop(second);
        assert_eq!(activity.pending(), 0);
        socket.send("b").unwrap();
    }
}
