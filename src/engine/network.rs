// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The network: node lifecycle, socket wiring and idle detection.
//!
//! A network owns one [`Node`] per component instance and one socket per
//! edge. `start` sets components up, spawns one task per node, sends the
//! initial packets and spawns the idle watcher. The watcher ends a run once
//! the shared [`Activity`] count has stayed at zero for the debounce
//! interval. New traffic after an end resumes the network under a new run
//! id. `stop` cancels the node tasks, terminates every output stream,
//! detaches the edge sockets and tears the components down.

use crate::config::consts::EVENT_CHANNEL_CAPACITY;
use crate::config::{
    validate_graph, ComponentLoader, DependencyGraph, EdgeConfig, Endpoint, ExportConfig,
    GraphConfig, InitialConfig, NetworkOptions, NodeConfig,
};
use crate::engine::activity::Activity;
use crate::engine::node::Node;
use crate::errors::{NetworkError, PortError, ProcessError};
use crate::observability::messages::network::{
    ComponentHookFailed, NetworkEnded, NetworkResumed, NetworkStarted, NetworkStopped,
};
use crate::observability::messages::validation::{GraphValidationFailed, UnconnectedNode};
use crate::observability::messages::StructuredLog;
use crate::packet::{Ip, ScopeId};
use crate::ports::{InPort, OutPort};
use crate::socket::Socket;
use crate::traits::Component;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Network-level notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// A run began, either from `start` or because traffic resumed after
    /// an end.
    Started { run: u64 },
    /// Every connection went idle and no activation is pending.
    End { run: u64, uptime: Duration },
    /// An activation failed; other activations are unaffected.
    Error {
        node: String,
        scope: Option<ScopeId>,
        error: ProcessError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lifecycle {
    Stopped,
    Running { run: u64, since: Instant },
    Finished { run: u64 },
}

#[derive(Debug)]
struct Shared {
    name: String,
    node_count: usize,
    events: broadcast::Sender<NetworkEvent>,
    lifecycle: StdMutex<Lifecycle>,
    runs: AtomicU64,
    activity: Activity,
    debounce: Duration,
}

impl Shared {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_run(&self) -> u64 {
        self.runs.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn begin_run(&self) -> u64 {
        let run = self.next_run();
        *self.lifecycle() = Lifecycle::Running {
            run,
            since: Instant::now(),
        };
        NetworkStarted {
            network: &self.name,
            run,
            node_count: self.node_count,
        }
        .log();
        let _ = self.events.send(NetworkEvent::Started { run });
        run
    }

    /// Ends the current run if it has not ended yet.
    fn finish_run(&self) {
        let mut lifecycle = self.lifecycle();
        if let Lifecycle::Running { run, since } = *lifecycle {
            *lifecycle = Lifecycle::Finished { run };
            drop(lifecycle);
            let uptime = since.elapsed();
            NetworkEnded {
                network: &self.name,
                run,
                uptime,
            }
            .log();
            let _ = self.events.send(NetworkEvent::End { run, uptime });
        }
    }

    fn resume_run(&self) {
        let mut lifecycle = self.lifecycle();
        if let Lifecycle::Finished { .. } = *lifecycle {
            let run = self.next_run();
            *lifecycle = Lifecycle::Running {
                run,
                since: Instant::now(),
            };
            drop(lifecycle);
            NetworkResumed {
                network: &self.name,
                run,
            }
            .log();
            let _ = self.events.send(NetworkEvent::Started { run });
        }
    }
}

/// Waits for the activity count to settle at zero, ends the run, then
/// waits for new activity and resumes.
async fn watch_idle(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut activity = shared.activity.subscribe();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            idle = activity.wait_for(|pending| *pending == 0) => {
                if idle.is_err() {
                    return;
                }
            }
        }

        let woke = tokio::select! {
            _ = cancel.cancelled() => return,
            busy = tokio::time::timeout(shared.debounce, activity.wait_for(|pending| *pending > 0)) => {
                match busy {
                    Ok(Ok(_)) => true,
                    Ok(Err(_)) => return,
                    Err(_) => false,
                }
            }
        };
        if woke {
            continue;
        }
        shared.finish_run();

        // any change after the end is new traffic, even a burst that is
        // already over by the time this task is polled
        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = activity.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
        shared.resume_run();
    }
}

struct Wire {
    from: Option<Endpoint>,
    to: Endpoint,
    socket: Socket,
    initial: Option<Value>,
}

struct ActiveRun {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    watcher: JoinHandle<()>,
}

#[derive(Default)]
struct RunState {
    wires: Option<Vec<Wire>>,
    active: Option<ActiveRun>,
}

/// A running instance of a graph.
pub struct Network {
    shared: Arc<Shared>,
    nodes: Vec<Arc<Node>>,
    start_order: Vec<usize>,
    edges: Vec<EdgeConfig>,
    initials: Vec<InitialConfig>,
    inports: HashMap<String, Endpoint>,
    outports: HashMap<String, Endpoint>,
    high_water_mark: Option<usize>,
    state: Mutex<RunState>,
}

impl Network {
    /// Instantiates every node of `graph` through `loader` and wires it.
    pub fn from_config(
        graph: &GraphConfig,
        loader: &dyn ComponentLoader,
    ) -> Result<Self, NetworkError> {
        if let Err(errors) = validate_graph(graph) {
            GraphValidationFailed {
                graph: &graph.name,
                errors: &errors,
            }
            .log();
            return Err(NetworkError::Graph(errors));
        }

        let mut builder = NetworkBuilder::new(graph.name.clone()).options(graph.options.clone());
        for node in &graph.nodes {
            let component = loader.load(&node.component, &node.metadata)?;
            builder = builder.node(node.id.clone(), component);
        }
        builder.edges = graph.edges.clone();
        builder.initials = graph.initials.clone();
        builder.inports = graph.inports.clone();
        builder.outports = graph.outports.clone();
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.shared.events.subscribe()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id).map(|n| n.as_ref())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().map(|n| n.as_ref())
    }

    /// Units of outstanding work across the network.
    pub fn pending(&self) -> usize {
        self.shared.activity.pending()
    }

    /// True between a run's start and its end.
    pub fn is_running(&self) -> bool {
        matches!(*self.shared.lifecycle(), Lifecycle::Running { .. })
    }

    /// True between `start` and `stop`, idle or not.
    pub fn is_started(&self) -> bool {
        !matches!(*self.shared.lifecycle(), Lifecycle::Stopped)
    }

    /// Id of the current (or most recent) run.
    pub fn run_id(&self) -> u64 {
        self.shared.runs.load(Ordering::SeqCst)
    }

    fn require_node(&self, id: &str) -> Result<&Arc<Node>, NetworkError> {
        self.nodes
            .iter()
            .find(|n| n.id() == id)
            .ok_or_else(|| NetworkError::UnknownNode(id.to_string()))
    }

    fn in_port(&self, endpoint: &Endpoint) -> Result<&InPort, NetworkError> {
        let node = self.require_node(&endpoint.node)?;
        node.in_port(&endpoint.port)
            .ok_or_else(|| port_error(endpoint, unknown_port(&endpoint.port, "inports")))
    }

    fn out_port(&self, endpoint: &Endpoint) -> Result<&OutPort, NetworkError> {
        let node = self.require_node(&endpoint.node)?;
        node.out_port(&endpoint.port)
            .ok_or_else(|| port_error(endpoint, unknown_port(&endpoint.port, "outports")))
    }

    fn export<'a>(
        exports: &'a HashMap<String, Endpoint>,
        name: &str,
        direction: &str,
    ) -> Result<&'a Endpoint, NetworkError> {
        exports.get(name).ok_or_else(|| NetworkError::UnknownGraphPort {
            name: name.to_string(),
            direction: direction.to_string(),
        })
    }

    /// Connects an external socket to a graph inport.
    pub fn attach_inport(&self, name: &str, socket: &Socket) -> Result<usize, NetworkError> {
        let endpoint = Self::export(&self.inports, name, "inport")?;
        self.in_port(endpoint)?
            .attach(socket, endpoint.index)
            .map_err(|e| port_error(endpoint, e))
    }

    pub fn detach_inport(&self, name: &str, socket: &Socket) -> Result<(), NetworkError> {
        let endpoint = Self::export(&self.inports, name, "inport")?;
        self.in_port(endpoint)?
            .detach(socket)
            .map_err(|e| port_error(endpoint, e))
    }

    /// Connects an external socket to a graph outport. Observe it with
    /// [`Socket::listen`].
    pub fn attach_outport(&self, name: &str, socket: &Socket) -> Result<usize, NetworkError> {
        let endpoint = Self::export(&self.outports, name, "outport")?;
        self.out_port(endpoint)?
            .attach(socket, endpoint.index)
            .map_err(|e| port_error(endpoint, e))
    }

    pub fn detach_outport(&self, name: &str, socket: &Socket) -> Result<(), NetworkError> {
        let endpoint = Self::export(&self.outports, name, "outport")?;
        self.out_port(endpoint)?
            .detach(socket)
            .map_err(|e| port_error(endpoint, e))
    }

    fn new_socket(&self) -> Socket {
        match self.high_water_mark {
            Some(limit) => Socket::with_high_water_mark(limit),
            None => Socket::new(),
        }
    }

    fn wire(&self) -> Result<Vec<Wire>, NetworkError> {
        let mut wires = Vec::with_capacity(self.edges.len() + self.initials.len());
        let result = self.wire_into(&mut wires);
        if let Err(err) = result {
            self.unwire(&wires);
            return Err(err);
        }
        Ok(wires)
    }

    fn wire_into(&self, wires: &mut Vec<Wire>) -> Result<(), NetworkError> {
        for edge in &self.edges {
            let socket = self.new_socket();
            self.out_port(&edge.from)?
                .attach(&socket, edge.from.index)
                .map_err(|e| port_error(&edge.from, e))?;
            let attached = self.in_port(&edge.to).and_then(|port| {
                port.attach(&socket, edge.to.index)
                    .map_err(|e| port_error(&edge.to, e))
            });
            if let Err(err) = attached {
                let _ = self.out_port(&edge.from).map(|port| port.detach(&socket));
                return Err(err);
            }
            wires.push(Wire {
                from: Some(edge.from.clone()),
                to: edge.to.clone(),
                socket,
                initial: None,
            });
        }
        for initial in &self.initials {
            let socket = Socket::new();
            self.in_port(&initial.to)?
                .attach(&socket, initial.to.index)
                .map_err(|e| port_error(&initial.to, e))?;
            wires.push(Wire {
                from: None,
                to: initial.to.clone(),
                socket,
                initial: Some(initial.data.clone()),
            });
        }
        Ok(())
    }

    fn unwire(&self, wires: &[Wire]) {
        for wire in wires {
            if let Some(from) = &wire.from {
                if let Ok(port) = self.out_port(from) {
                    let _ = port.detach(&wire.socket);
                }
            }
            if let Ok(port) = self.in_port(&wire.to) {
                let _ = port.detach(&wire.socket);
            }
        }
    }

    fn ordered_nodes(&self) -> impl DoubleEndedIterator<Item = &Arc<Node>> {
        self.start_order.iter().filter_map(|&i| self.nodes.get(i))
    }

    /// Sets up every component (upstream first), starts the node tasks and
    /// sends the initial packets.
    pub async fn start(&self) -> Result<(), NetworkError> {
        let mut state = self.state.lock().await;
        if state.active.is_some() {
            return Err(NetworkError::AlreadyRunning(self.shared.name.clone()));
        }
        if state.wires.is_none() {
            state.wires = Some(self.wire()?);
        }

        let mut ready: Vec<&Arc<Node>> = Vec::with_capacity(self.nodes.len());
        for node in self.ordered_nodes() {
            if let Err(source) = node.component().set_up().await {
                ComponentHookFailed {
                    node_id: node.id(),
                    hook: "set-up",
                    error: &source,
                }
                .log();
                for started in ready.iter().rev() {
                    let _ = started.component().tear_down().await;
                }
                return Err(NetworkError::SetUp {
                    node: node.id().to_string(),
                    source,
                });
            }
            ready.push(node);
        }

        let cancel = CancellationToken::new();
        let tasks = self
            .nodes
            .iter()
            .map(|node| {
                tokio::spawn(
                    node.clone()
                        .run(cancel.clone(), self.shared.events.clone()),
                )
            })
            .collect();
        self.shared.begin_run();

        if let Some(wires) = &state.wires {
            for wire in wires {
                if let Some(data) = &wire.initial {
                    wire.socket.post(Ip::data(data.clone()).as_initial())?;
                }
            }
        }

        let watcher = tokio::spawn(watch_idle(self.shared.clone(), cancel.clone()));
        state.active = Some(ActiveRun {
            cancel,
            tasks,
            watcher,
        });
        Ok(())
    }

    /// Stops the node tasks, terminates every output stream, detaches the
    /// edges and tears the components down (downstream first).
    ///
    /// A run that has not ended yet ends here. Outstanding
    /// [`ProcessOutput`](crate::engine::ProcessOutput) handles fail with
    /// [`ProcessError::NetworkStopped`] from now on.
    pub async fn stop(&self) -> Result<(), NetworkError> {
        let mut state = self.state.lock().await;
        let active = state
            .active
            .take()
            .ok_or_else(|| NetworkError::NotRunning(self.shared.name.clone()))?;

        active.cancel.cancel();
        for task in active.tasks {
            let _ = task.await;
        }
        let _ = active.watcher.await;
        self.shared.finish_run();

        for node in &self.nodes {
            for port in node.out_ports().iter() {
                port.force_disconnect();
            }
        }
        if let Some(wires) = state.wires.take() {
            self.unwire(&wires);
        }
        for node in &self.nodes {
            node.drain_inbox().await;
        }
        self.shared.activity.reset();

        let mut failure = None;
        for node in self.ordered_nodes().rev() {
            if let Err(source) = node.component().tear_down().await {
                ComponentHookFailed {
                    node_id: node.id(),
                    hook: "tear-down",
                    error: &source,
                }
                .log();
                failure.get_or_insert(NetworkError::TearDown {
                    node: node.id().to_string(),
                    source,
                });
            }
        }

        *self.shared.lifecycle() = Lifecycle::Stopped;
        NetworkStopped {
            network: &self.shared.name,
            runs: self.run_id(),
        }
        .log();

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("name", &self.shared.name)
            .field("nodes", &self.nodes)
            .field("edges", &self.edges.len())
            .finish()
    }
}

fn unknown_port(port: &str, direction: &str) -> PortError {
    PortError::UnknownPort {
        port: port.to_string(),
        direction: direction.to_string(),
    }
}

fn port_error(endpoint: &Endpoint, source: PortError) -> NetworkError {
    NetworkError::Port {
        node: endpoint.node.clone(),
        port: endpoint.port.clone(),
        source,
    }
}

/// Assembles a [`Network`] from component instances.
///
/// ```
/// use std::sync::Arc;
/// use the_flowline::components::core::Repeat;
/// use the_flowline::engine::NetworkBuilder;
///
/// let network = NetworkBuilder::new("relay")
///     .node("first", Arc::new(Repeat::new()))
///     .node("second", Arc::new(Repeat::new()))
///     .connect(("first", "out"), ("second", "in"))
///     .initial("hello", ("first", "in"))
///     .export_out("out", ("second", "out"))
///     .build()
///     .unwrap();
/// assert_eq!(network.nodes().count(), 2);
/// ```
pub struct NetworkBuilder {
    name: String,
    options: NetworkOptions,
    nodes: Vec<(String, Arc<dyn Component>)>,
    edges: Vec<EdgeConfig>,
    initials: Vec<InitialConfig>,
    inports: Vec<ExportConfig>,
    outports: Vec<ExportConfig>,
}

impl NetworkBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: NetworkOptions::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
            initials: Vec::new(),
            inports: Vec::new(),
            outports: Vec::new(),
        }
    }

    pub fn options(mut self, options: NetworkOptions) -> Self {
        self.options = options;
        self
    }

    pub fn idle_debounce(mut self, debounce: Duration) -> Self {
        self.options.idle_debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn high_water_mark(mut self, limit: usize) -> Self {
        self.options.high_water_mark = Some(limit);
        self
    }

    pub fn node(mut self, id: impl Into<String>, component: Arc<dyn Component>) -> Self {
        self.nodes.push((id.into(), component));
        self
    }

    pub fn connect(mut self, from: impl Into<Endpoint>, to: impl Into<Endpoint>) -> Self {
        self.edges.push(EdgeConfig {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn initial(mut self, data: impl Into<Value>, to: impl Into<Endpoint>) -> Self {
        self.initials.push(InitialConfig {
            data: data.into(),
            to: to.into(),
        });
        self
    }

    pub fn export_in(mut self, name: impl Into<String>, endpoint: impl Into<Endpoint>) -> Self {
        self.inports.push(export(name.into(), endpoint.into()));
        self
    }

    pub fn export_out(mut self, name: impl Into<String>, endpoint: impl Into<Endpoint>) -> Self {
        self.outports.push(export(name.into(), endpoint.into()));
        self
    }

    fn describe(&self) -> GraphConfig {
        GraphConfig {
            name: self.name.clone(),
            options: self.options.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|(id, component)| NodeConfig {
                    id: id.clone(),
                    component: component.name().to_string(),
                    metadata: Value::Null,
                })
                .collect(),
            edges: self.edges.clone(),
            initials: self.initials.clone(),
            inports: self.inports.clone(),
            outports: self.outports.clone(),
        }
    }

    /// Validates the graph, creates the nodes and wires every edge and
    /// initial packet.
    pub fn build(self) -> Result<Network, NetworkError> {
        validate_graph(&self.describe()).map_err(NetworkError::Graph)?;

        let activity = Activity::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (id, component) in self.nodes {
            let node = Node::new(&id, component, activity.clone())
                .map_err(|source| NetworkError::InvalidNode { node: id, source })?;
            nodes.push(Arc::new(node));
        }

        for node in &nodes {
            let id = node.id();
            let fed = self.edges.iter().any(|e| e.to.node == id)
                || self.initials.iter().any(|i| i.to.node == id)
                || self.inports.iter().any(|e| e.node == id);
            if !fed && node.in_ports().iter().next().is_some() {
                UnconnectedNode { node_id: id }.log();
            }
        }

        let declared: Vec<String> = nodes.iter().map(|n| n.id().to_string()).collect();
        let dependencies = DependencyGraph::from_edges(
            self.edges
                .iter()
                .map(|e| (e.from.node.as_str(), e.to.node.as_str())),
        );
        let start_order = dependencies
            .start_order(&declared)
            .iter()
            .filter_map(|id| declared.iter().position(|d| d == id))
            .collect();

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut network = Network {
            shared: Arc::new(Shared {
                name: self.name,
                node_count: nodes.len(),
                events,
                lifecycle: StdMutex::new(Lifecycle::Stopped),
                runs: AtomicU64::new(0),
                activity,
                debounce: self.options.idle_debounce(),
            }),
            nodes,
            start_order,
            edges: self.edges,
            initials: self.initials,
            inports: self
                .inports
                .iter()
                .map(|e| (e.name.clone(), e.endpoint()))
                .collect(),
            outports: self
                .outports
                .iter()
                .map(|e| (e.name.clone(), e.endpoint()))
                .collect(),
            high_water_mark: self.options.high_water_mark,
            state: Mutex::new(RunState::default()),
        };

        for endpoint in network.inports.values() {
            network.in_port(endpoint)?;
        }
        for endpoint in network.outports.values() {
            network.out_port(endpoint)?;
        }
        let wires = network.wire()?;
        network.state.get_mut().wires = Some(wires);
        Ok(network)
    }
}

fn export(name: String, endpoint: Endpoint) -> ExportConfig {
    ExportConfig {
        name,
        node: endpoint.node,
        port: endpoint.port,
        index: endpoint.index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::core::Repeat;
    use crate::errors::GraphValidationError;

    fn repeat() -> Arc<dyn Component> {
        Arc::new(Repeat::new())
    }

    #[test]
    fn test_build_rejects_unknown_nodes() {
        let err = NetworkBuilder::new("bad")
            .node("a", repeat())
            .connect(("a", "out"), ("b", "in"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Graph(ref errors)
                if matches!(errors[0], GraphValidationError::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_build_rejects_unknown_ports() {
        let err = NetworkBuilder::new("bad")
            .node("a", repeat())
            .node("b", repeat())
            .connect(("a", "missing"), ("b", "in"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Port { ref node, ref port, .. } if node == "a" && port == "missing"
        ));
    }

    #[test]
    fn test_idle_debounce_saturates() {
        let builder = NetworkBuilder::new("n").idle_debounce(Duration::MAX);
        assert_eq!(builder.options.idle_debounce_ms, u64::MAX);
        let builder = NetworkBuilder::new("n").idle_debounce(Duration::from_millis(25));
        assert_eq!(builder.options.idle_debounce_ms, 25);
    }

    #[test]
    fn test_unknown_graph_port() {
        let network = NetworkBuilder::new("n").node("a", repeat()).build().unwrap();
        assert!(matches!(
            network.attach_inport("in", &Socket::new()),
            Err(NetworkError::UnknownGraphPort { .. })
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_misuse() {
        let network = NetworkBuilder::new("n").node("a", repeat()).build().unwrap();
        assert!(matches!(network.stop().await, Err(NetworkError::NotRunning(_))));
        network.start().await.unwrap();
        assert!(network.is_started());
        assert!(matches!(
            network.start().await,
            Err(NetworkError::AlreadyRunning(_))
        ));
        network.stop().await.unwrap();
        assert!(!network.is_started());
    }

    #[tokio::test]
    async fn test_empty_network_ends_after_debounce() {
        let network = NetworkBuilder::new("empty")
            .node("a", repeat())
            .idle_debounce(Duration::from_millis(5))
            .build()
            .unwrap();
        let mut events = network.subscribe();
        network.start().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), NetworkEvent::Started { run: 1 });
        let end = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(end, NetworkEvent::End { run: 1, .. }));
        assert!(!network.is_running());
        network.stop().await.unwrap();
    }
}
