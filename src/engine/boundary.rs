// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The process boundary of one node for one run.
//!
//! Owns everything between the node's inbox and its output sockets: the
//! scope-partitioned input buffers, the forwarded bracket arena and the
//! ordered output queue. All of it is touched only from the node's task.

use crate::engine::activity::Activity;
use crate::engine::brackets::{BracketArena, BracketId, SourceKey};
use crate::engine::buffer::{InputBuffers, ScopeOrder};
use crate::engine::input::ProcessInput;
use crate::engine::network::NetworkEvent;
use crate::engine::node::Node;
use crate::engine::output::{Completion, ProcessOutput};
use crate::engine::queue::{ActivationId, OutputItem, OutputQueue, Ready};
use crate::errors::ProcessError;
use crate::observability::messages::node::{
    ActivationFailed, BracketUnderflow, OutputPaused, UnknownPortDelivery,
};
use crate::observability::messages::StructuredLog;
use crate::packet::{Ip, IpKind, Packet, ScopeId};
use crate::ports::{InPorts, OutPort, OutPorts};
use crate::socket::{Delivery, SocketEvent, SocketId};
use crate::traits::{Component, ForwardBrackets};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

pub(crate) struct ProcessBoundary {
    node_id: Arc<str>,
    component: Arc<dyn Component>,
    in_ports: Arc<InPorts>,
    out_ports: Arc<OutPorts>,
    forwarding: ForwardBrackets,
    buffers: InputBuffers,
    order: ScopeOrder,
    arena: BracketArena,
    queue: OutputQueue,
    streams: HashSet<SocketId>,
    activity: Activity,
    completions: mpsc::UnboundedSender<Completion>,
    events: broadcast::Sender<NetworkEvent>,
    next_activation: ActivationId,
    paused: bool,
}

impl ProcessBoundary {
    pub fn new(
        node: &Node,
        activity: Activity,
        completions: mpsc::UnboundedSender<Completion>,
        events: broadcast::Sender<NetworkEvent>,
    ) -> Self {
        Self {
            node_id: node.shared_id(),
            component: node.component(),
            in_ports: node.in_ports(),
            out_ports: node.out_ports(),
            forwarding: node.forwarding().clone(),
            buffers: InputBuffers::default(),
            order: ScopeOrder::default(),
            arena: BracketArena::default(),
            queue: OutputQueue::new(activity.clone()),
            streams: HashSet::new(),
            activity,
            completions,
            events,
            next_activation: 0,
            paused: false,
        }
    }

    /// Handles one socket event. The delivery's activity unit is held until
    /// the event and everything it triggered synchronously are done.
    pub fn receive(&mut self, delivery: Delivery) {
        let socket = delivery.socket;
        let port = delivery.target.port.clone();
        let index = delivery.target.index;
        match delivery.event {
            SocketEvent::Connect => {
                if self.streams.insert(socket) {
                    self.activity.enter();
                }
            }
            SocketEvent::Disconnect => {
                if self.streams.remove(&socket) {
                    self.activity.exit();
                }
            }
            SocketEvent::Ip(ip) => self.accept(&port, index, ip),
        }
        self.drain();
        self.flush();
    }

    fn accept(&mut self, port: &str, index: Option<usize>, mut ip: Ip) {
        let Some(in_port) = self.in_ports.get(port) else {
            UnknownPortDelivery {
                node_id: &self.node_id,
                port,
            }
            .log();
            return;
        };
        let scoped = in_port.options().scoped;
        if !scoped {
            ip.scope = None;
        }
        let scope = ip.scope.clone();
        let initial = ip.initial;
        let is_data = ip.is_data();

        let closes_group = self.buffers.port(port).push(index, ip);
        if !initial {
            self.order.observe(&scope);
        }
        if is_data {
            self.dispatch(scope, scoped && !initial);
        } else if closes_group && !self.forwarding.is_source(port) {
            // A whole group on a port that does not forward brackets is
            // handed to the component like data.
            if self.ready(&scope, true) {
                self.activate(scope);
            }
        }
    }

    /// Activates for every scope the new data packet could complete.
    fn dispatch(&mut self, scope: Option<ScopeId>, scoped_trigger: bool) {
        let candidates: Vec<Option<ScopeId>> = if scoped_trigger {
            vec![scope]
        } else {
            let mut candidates: Vec<_> = self
                .order
                .iter()
                .filter(|s| self.buffers.has_data_at(s))
                .cloned()
                .collect();
            if !candidates.contains(&None) {
                candidates.push(None);
            }
            candidates
        };
        for scope in candidates {
            if self.ready(&scope, false) {
                self.activate(scope);
            }
        }
    }

    /// Required ports (every attached index of an addressable one) hold a
    /// complete root-level packet visible from `scope`: data, or a closed
    /// group on a port that does not forward brackets. Unless a group
    /// triggered the check, at least one port must also hold data in it.
    fn ready(&self, scope: &Option<ScopeId>, group: bool) -> bool {
        for port in self.in_ports.iter().filter(|p| p.options().required) {
            let effective = if port.options().scoped {
                scope.clone()
            } else {
                None
            };
            let indices: Vec<Option<usize>> = if port.is_addressable() {
                port.attached_indices().into_iter().map(Some).collect()
            } else {
                vec![None]
            };
            let groups = !self.forwarding.is_source(port.name());
            let buffer = self.buffers.get(port.name());
            let satisfied = indices.into_iter().all(|index| {
                buffer
                    .map(|b| {
                        b.has_matching(index, &effective, Ip::is_data)
                            || (groups && b.has_group(index, &effective))
                    })
                    .unwrap_or(false)
            });
            if !satisfied {
                return false;
            }
        }
        group || self.buffers.has_data_at(scope)
    }

    fn activate(&mut self, scope: Option<ScopeId>) {
        let id = self.next_activation;
        self.next_activation += 1;

        let output = ProcessOutput::new(
            id,
            scope.clone(),
            self.node_id.clone(),
            self.out_ports.clone(),
            self.completions.clone(),
        );
        let mut input = ProcessInput::new(
            &self.node_id,
            scope.clone(),
            &self.in_ports,
            &self.forwarding,
            &mut self.buffers,
            &mut self.arena,
        );
        let result = self.component.process(&mut input, output);
        let (released, bracket_scopes) = input.into_parts();

        self.queue.push_close(released);
        let mut context: Vec<BracketId> = Vec::new();
        for s in &bracket_scopes {
            for bracket in self.arena.context(s) {
                if !context.contains(&bracket) {
                    context.push(bracket);
                }
            }
        }
        self.queue.push_activation(id, scope.clone(), context);

        if let Err(error) = result {
            self.report(&scope, error);
            self.queue.abort(id);
        }
    }

    pub fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Send { activation, items } => {
                self.queue.append(activation, items);
            }
            Completion::Done { activation } => {
                self.queue.finish(activation);
            }
            Completion::Failed {
                activation,
                scope,
                error,
            } => {
                if self.queue.abort(activation) {
                    self.report(&scope, error);
                }
            }
            Completion::Resume => self.paused = false,
        }
        self.flush();
    }

    /// Consumes brackets at the head of every forwarding stream that no
    /// activation will read: close brackets after consumed data and
    /// balanced empty groups. Ports that do not forward keep their
    /// brackets for the component to read.
    fn drain(&mut self) {
        let sources: Vec<String> = self
            .in_ports
            .iter()
            .map(|p| p.name().to_string())
            .filter(|name| self.forwarding.is_source(name))
            .collect();
        for name in sources {
            let Some(targets) = self.forwarding.targets(&name).map(<[String]>::to_vec) else {
                continue;
            };
            let keys = match self.buffers.get(&name) {
                Some(buffer) => buffer.keys(),
                None => continue,
            };
            for key in keys {
                let source = SourceKey {
                    port: name.clone(),
                    index: key.index,
                    scope: key.scope.clone(),
                };
                loop {
                    let buffer = self.buffers.port(&name);
                    let Some(kind) = buffer.front(&key).map(Ip::kind) else {
                        break;
                    };
                    match kind {
                        IpKind::CloseBracket => {
                            buffer.pop_front(&key);
                            self.close_forwarded(&source);
                        }
                        IpKind::OpenBracket => {
                            let Some(len) = buffer.empty_group_len(&key) else {
                                break;
                            };
                            let group: Vec<Ip> =
                                (0..len).filter_map(|_| buffer.pop_front(&key)).collect();
                            for ip in group {
                                match ip.packet {
                                    Packet::OpenBracket(label) => {
                                        self.arena.open(source.clone(), label, &targets);
                                    }
                                    Packet::CloseBracket(_) => self.close_forwarded(&source),
                                    Packet::Data(_) => {}
                                }
                            }
                        }
                        IpKind::Data => break,
                    }
                }
            }
        }
        let buffers = &self.buffers;
        self.order.retain(|s| buffers.holds_scope(s));
    }

    fn close_forwarded(&mut self, source: &SourceKey) {
        match self.arena.close(source) {
            Some(finished) => self.queue.push_close(finished),
            None => BracketUnderflow {
                node_id: &self.node_id,
                port: &source.port,
                scope: &source.scope,
            }
            .log(),
        }
    }

    /// Writes queued output in order until the queue is blocked.
    fn flush(&mut self) {
        if self.paused {
            return;
        }
        loop {
            if self.queue.is_empty() {
                return;
            }
            if self.out_ports.congested() {
                self.pause();
                return;
            }
            let Some(ready) = self.queue.next_ready() else {
                return;
            };
            match ready {
                Ready::Item {
                    scope,
                    context,
                    item,
                } => self.write_item(scope, &context, item),
                Ready::Close { ids } => {
                    for id in ids {
                        self.write_close(id);
                    }
                }
            }
        }
    }

    fn pause(&mut self) {
        self.paused = true;
        OutputPaused {
            node_id: &self.node_id,
            queued: self.queue.len(),
        }
        .log();
        let ports = self.out_ports.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            ports.wait_for_capacity().await;
            let _ = completions.send(Completion::Resume);
        });
    }

    fn write_item(&mut self, scope: Option<ScopeId>, context: &[BracketId], item: OutputItem) {
        let ports = self.out_ports.clone();
        let Some(port) = ports.get(&item.port) else {
            return;
        };
        for open in self.arena.ensure_open(context, &item.port) {
            self.emit(port, open, None);
        }
        let ip = Ip::from(item.packet).in_scope(scope);
        self.emit(port, ip, item.index);
    }

    fn write_close(&mut self, id: BracketId) {
        let ports = self.out_ports.clone();
        for (target, ip) in self.arena.finish(id) {
            if let Some(port) = ports.get(&target) {
                self.emit(port, ip, None);
            }
        }
    }

    fn emit(&self, port: &OutPort, ip: Ip, index: Option<usize>) {
        let scope = ip.scope.clone();
        if let Err(error) = port.emit(ip, index, &self.node_id) {
            self.report(&scope, ProcessError::Socket(error));
        }
    }

    fn report(&self, scope: &Option<ScopeId>, error: ProcessError) {
        ActivationFailed {
            node_id: &self.node_id,
            scope,
            error: &error,
        }
        .log();
        let _ = self.events.send(NetworkEvent::Error {
            node: self.node_id.to_string(),
            scope: scope.clone(),
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortOptions, PortRef};
    use crate::socket::Socket;
    use crate::traits::ComponentBuilder;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    struct Harness {
        node: Arc<Node>,
        boundary: ProcessBoundary,
        completions: mpsc::UnboundedReceiver<Completion>,
        inbox: Vec<Socket>,
        out: crate::socket::SocketListener,
        activity: Activity,
    }

    impl Harness {
        fn new(component: Arc<dyn Component>, inputs: &[&str]) -> Self {
            let activity = Activity::new();
            let node = Arc::new(Node::new("Node", component, activity.clone()).unwrap());
            let (tx, completions) = mpsc::unbounded_channel();
            let (events, _) = broadcast::channel(16);
            let boundary = ProcessBoundary::new(&node, activity.clone(), tx, events);
            let inbox = inputs
                .iter()
                .map(|name| {
                    let socket = Socket::new();
                    node.in_port(name).unwrap().attach(&socket, None).unwrap();
                    socket
                })
                .collect();
            let out_socket = Socket::new();
            node.out_port("out").unwrap().attach(&out_socket, None).unwrap();
            let out = out_socket.listen();
            Self {
                node,
                boundary,
                completions,
                inbox,
                out,
                activity,
            }
        }

        async fn pump(&mut self) {
            while let Some(delivery) = self.node.try_next_delivery().await {
                self.boundary.receive(delivery);
            }
            while let Ok(completion) = self.completions.try_recv() {
                self.boundary.complete(completion);
            }
        }

        fn transcript(&mut self) -> Vec<String> {
            let mut seen = Vec::new();
            while let Some(event) = self.out.try_recv() {
                match event {
                    SocketEvent::Ip(ip) => seen.push(ip.to_string()),
                    SocketEvent::Connect => seen.push("CONN".into()),
                    SocketEvent::Disconnect => seen.push("DISC".into()),
                }
            }
            seen
        }
    }

    fn passthrough() -> Arc<dyn Component> {
        Arc::new(
            ComponentBuilder::new("Pass")
                .in_port("in", PortOptions::default())
                .out_port("out", PortOptions::default())
                .forward("in", ["out"])
                .process(|input, output| {
                    let value = input.get_data("in")?;
                    output.send_done(value)
                }),
        )
    }

    #[tokio::test]
    async fn test_forwards_brackets_around_data() {
        let mut h = Harness::new(passthrough(), &["in"]);
        let socket = h.inbox[0].clone();
        socket.begin_group("a").unwrap();
        socket.send("v").unwrap();
        socket.end_group().unwrap();
        socket.disconnect().unwrap();
        h.pump().await;
        assert_eq!(
            h.transcript(),
            vec!["CONN", "null < a", "null DATA v", "null >", "DISC"]
        );
        assert_eq!(h.activity.pending(), 0);
    }

    #[tokio::test]
    async fn test_empty_group_is_forwarded() {
        let mut h = Harness::new(passthrough(), &["in"]);
        let socket = h.inbox[0].clone();
        socket.post(Ip::open_bracket("e").with_scope(1)).unwrap();
        socket.post(Ip::close_bracket("e").with_scope(1)).unwrap();
        h.pump().await;
        assert_eq!(h.transcript(), vec!["CONN", "1 < e", "1 >", "DISC"]);
    }

    #[tokio::test]
    async fn test_empty_group_ahead_of_data_keeps_its_place() {
        let mut h = Harness::new(passthrough(), &["in"]);
        let socket = h.inbox[0].clone();
        socket.post(Ip::open_bracket("a")).unwrap();
        socket.post(Ip::open_bracket("e")).unwrap();
        socket.post(Ip::close_bracket("e")).unwrap();
        socket.post(Ip::data("D")).unwrap();
        socket.post(Ip::close_bracket("a")).unwrap();
        h.pump().await;
        assert_eq!(
            h.transcript(),
            vec!["CONN", "null < a", "null < e", "null >", "null DATA D", "null >", "DISC"]
        );
        assert_eq!(h.activity.pending(), 0);
    }

    #[tokio::test]
    async fn test_brackets_reach_a_component_that_does_not_forward_them() {
        let seen: Arc<StdMutex<Vec<IpKind>>> = Arc::new(StdMutex::new(Vec::new()));
        let journal = seen.clone();
        let relay: Arc<dyn Component> = Arc::new(
            ComponentBuilder::new("Relay")
                .in_port("in", PortOptions::default())
                .out_port("out", PortOptions::default())
                .process(move |input, output| {
                    while let Some(ip) = input.get("in")? {
                        journal.lock().unwrap().push(ip.kind());
                        output.send_ip("out", ip)?;
                    }
                    output.done()
                }),
        );
        let mut h = Harness::new(relay, &["in"]);
        let socket = h.inbox[0].clone();
        socket.post(Ip::data("D1")).unwrap();
        socket.post(Ip::open_bracket("g")).unwrap();
        socket.post(Ip::close_bracket("g")).unwrap();
        socket.post(Ip::data("D2")).unwrap();
        h.pump().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![IpKind::Data, IpKind::OpenBracket, IpKind::CloseBracket, IpKind::Data]
        );
        assert_eq!(
            h.transcript(),
            vec![
                "CONN", "null DATA D1", "DISC", "CONN", "null < g", "null >", "DISC", "CONN",
                "null DATA D2", "DISC"
            ]
        );
    }

    #[tokio::test]
    async fn test_open_group_waits_for_its_close() {
        let calls = Arc::new(StdMutex::new(0usize));
        let counter = calls.clone();
        let counting: Arc<dyn Component> = Arc::new(
            ComponentBuilder::new("Count")
                .in_port("in", PortOptions::default())
                .out_port("out", PortOptions::default())
                .process(move |input, output| {
                    *counter.lock().unwrap() += 1;
                    while input.get("in")?.is_some() {}
                    output.done()
                }),
        );
        let mut h = Harness::new(counting, &["in"]);
        let socket = h.inbox[0].clone();
        socket.post(Ip::open_bracket("g")).unwrap();
        socket.post(Ip::open_bracket("h")).unwrap();
        socket.post(Ip::close_bracket("h")).unwrap();
        h.pump().await;
        assert_eq!(*calls.lock().unwrap(), 0);

        socket.post(Ip::close_bracket("g")).unwrap();
        h.pump().await;
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_stream_holds_activity() {
        let mut h = Harness::new(passthrough(), &["in"]);
        let socket = h.inbox[0].clone();
        socket.connect();
        h.pump().await;
        assert_eq!(h.activity.pending(), 1);
        socket.disconnect().unwrap();
        h.pump().await;
        assert_eq!(h.activity.pending(), 0);
    }

    #[tokio::test]
    async fn test_failed_activation_drops_output_and_reports() {
        let failing: Arc<dyn Component> = Arc::new(
            ComponentBuilder::new("Fail")
                .in_port("in", PortOptions::default())
                .out_port("out", PortOptions::default())
                .process(|input, output| {
                    input.get_data("in")?;
                    output.send("partial")?;
                    Err(ProcessError::component("boom"))
                }),
        );
        let mut h = Harness::new(failing, &["in"]);
        let mut events = h.boundary.events.subscribe();
        h.inbox[0].post(Ip::data(1)).unwrap();
        h.pump().await;
        assert!(h.transcript().iter().all(|e| !e.contains("DATA")));
        match events.try_recv().unwrap() {
            NetworkEvent::Error { node, error, .. } => {
                assert_eq!(node, "Node");
                assert_eq!(error, ProcessError::component("boom"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.activity.pending(), 0);
    }

    #[tokio::test]
    async fn test_required_addressable_port_waits_for_every_index() {
        let zip: Arc<dyn Component> = Arc::new(
            ComponentBuilder::new("Zip")
                .in_port("in", PortOptions::default().addressable().required())
                .out_port("out", PortOptions::default())
                .process(|input, output| {
                    let a = input.get_data(PortRef::new("in", Some(0)))?;
                    let b = input.get_data(PortRef::new("in", Some(1)))?;
                    output.send_done(json!([a, b]))
                }),
        );
        let mut h = Harness::new(zip, &[]);
        let first = Socket::new();
        let second = Socket::new();
        h.node.in_port("in").unwrap().attach(&first, None).unwrap();
        h.node.in_port("in").unwrap().attach(&second, None).unwrap();

        first.send("a").unwrap();
        h.pump().await;
        assert!(h.transcript().is_empty());

        second.send("b").unwrap();
        h.pump().await;
        assert_eq!(
            h.transcript(),
            vec!["CONN", "null DATA [\"a\",\"b\"]", "DISC"]
        );
    }

    /// A generated stream: data packets and arbitrarily nested groups,
    /// empty ones included.
    #[derive(Debug, Clone)]
    enum Piece {
        Data(u32),
        Group(Vec<Piece>),
    }

    fn piece_strategy() -> impl Strategy<Value = Piece> {
        let leaf = (0u32..100).prop_map(Piece::Data);
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(Piece::Group)
        })
    }

    fn scope_strategy() -> impl Strategy<Value = Option<ScopeId>> {
        prop_oneof![
            Just(None),
            Just(Some(ScopeId::from(1))),
            Just(Some(ScopeId::from("x"))),
        ]
    }

    fn flatten(pieces: &[Piece], scope: &Option<ScopeId>, labels: &mut u32, out: &mut Vec<Ip>) {
        for piece in pieces {
            match piece {
                Piece::Data(n) => out.push(Ip::data(*n).in_scope(scope.clone())),
                Piece::Group(inner) => {
                    *labels += 1;
                    let label = *labels;
                    out.push(Ip::open_bracket(label).in_scope(scope.clone()));
                    flatten(inner, scope, labels, out);
                    out.push(Ip::close_bracket(label).in_scope(scope.clone()));
                }
            }
        }
    }

    fn relay() -> Arc<dyn Component> {
        Arc::new(
            ComponentBuilder::new("Relay")
                .in_port("in", PortOptions::default())
                .out_port("out", PortOptions::default())
                .process(|input, output| {
                    while let Some(ip) = input.get("in")? {
                        output.send_ip("out", ip)?;
                    }
                    output.done()
                }),
        )
    }

    /// Feeds `stream` through a fresh boundary and returns the packets seen
    /// on the output, plus whether the output depth ever went negative or
    /// was left open.
    fn replay(component: Arc<dyn Component>, stream: &[Ip]) -> (Vec<String>, bool, usize) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let mut h = Harness::new(component, &["in"]);
            for ip in stream {
                h.inbox[0].post(ip.clone()).unwrap();
                h.pump().await;
            }
            let mut depth = 0i64;
            let mut balanced = true;
            let mut packets = Vec::new();
            for line in h.transcript() {
                match line.as_str() {
                    "CONN" => {}
                    "DISC" => balanced &= depth == 0,
                    _ => {
                        if line.ends_with(" >") {
                            depth -= 1;
                        } else if line.contains(" < ") {
                            depth += 1;
                        }
                        balanced &= depth >= 0;
                        packets.push(line);
                    }
                }
            }
            (packets, balanced && depth == 0, h.activity.pending())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn forwarded_streams_keep_their_nesting(
            pieces in prop::collection::vec(piece_strategy(), 1..6),
            scope in scope_strategy(),
        ) {
            let mut stream = Vec::new();
            flatten(&pieces, &scope, &mut 0, &mut stream);
            let expected: Vec<String> = stream.iter().map(Ip::to_string).collect();

            let (packets, balanced, pending) = replay(passthrough(), &stream);
            prop_assert!(balanced);
            prop_assert_eq!(packets, expected);
            prop_assert_eq!(pending, 0);
        }

        #[test]
        fn relayed_streams_arrive_unchanged(
            pieces in prop::collection::vec(piece_strategy(), 1..6),
            scope in scope_strategy(),
        ) {
            let mut stream = Vec::new();
            flatten(&pieces, &scope, &mut 0, &mut stream);
            let expected: Vec<String> = stream.iter().map(Ip::to_string).collect();

            let (packets, balanced, _) = replay(relay(), &stream);
            prop_assert!(balanced);
            prop_assert_eq!(packets, expected);
        }
    }
}
