// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Helpers shared by the scenario tests.

use crate::engine::{Network, NetworkEvent};
use crate::socket::{Socket, SocketEvent, SocketListener};
use std::time::Duration;
use tokio::sync::broadcast;

pub(crate) const END_TIMEOUT: Duration = Duration::from_secs(5);

/// Renders an outport event the way the scenario transcripts spell it.
pub(crate) fn render(event: &SocketEvent) -> String {
    match event {
        SocketEvent::Connect => "CONN".to_string(),
        SocketEvent::Disconnect => "DISC".to_string(),
        SocketEvent::Ip(ip) => ip.to_string(),
    }
}

pub(crate) fn drain(listener: &mut SocketListener) -> Vec<String> {
    let mut seen = Vec::new();
    while let Some(event) = listener.try_recv() {
        seen.push(render(&event));
    }
    seen
}

/// Listens on a graph outport through a fresh socket.
pub(crate) fn tap(network: &Network, outport: &str) -> SocketListener {
    let socket = Socket::new();
    let listener = socket.listen();
    network
        .attach_outport(outport, &socket)
        .expect("outport should attach");
    listener
}

/// Collects network events up to and including the next `End`.
pub(crate) async fn until_end(events: &mut broadcast::Receiver<NetworkEvent>) -> Vec<NetworkEvent> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(END_TIMEOUT, events.recv())
            .await
            .expect("network should reach end")
            .expect("event channel should stay open");
        let done = matches!(event, NetworkEvent::End { .. });
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Starts `network`, waits for its end and returns the transcript seen on
/// `outport` together with every network event of the run.
pub(crate) async fn run_once(network: &Network, outport: &str) -> (Vec<String>, Vec<NetworkEvent>) {
    let mut listener = tap(network, outport);
    let mut events = network.subscribe();
    network.start().await.expect("network should start");
    let seen = until_end(&mut events).await;
    (drain(&mut listener), seen)
}

pub(crate) fn errors(events: &[NetworkEvent]) -> Vec<&NetworkEvent> {
    events
        .iter()
        .filter(|e| matches!(e, NetworkEvent::Error { .. }))
        .collect()
}
