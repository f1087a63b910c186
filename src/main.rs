// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use std::env;
use std::time::Instant;
use the_flowline::config::{load_and_validate_graph, ComponentRegistry};
use the_flowline::engine::{Network, NetworkEvent};
use the_flowline::packet::scope_label;
use the_flowline::socket::{Socket, SocketEvent, SocketListener};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <graph.yaml|graph.toml|graph.json>", args[0]);
        eprintln!("Example: {} graphs/zip-delay.yaml", args[0]);
        std::process::exit(1);
    }

    run_graph(&args[1]).await
}

/// Load a graph, run it until the network ends and print every packet seen
/// on its outports.
async fn run_graph(path: &str) -> Result<()> {
    let graph = load_and_validate_graph(path)
        .with_context(|| format!("failed to load graph '{}'", path))?;
    let registry = ComponentRegistry::with_core();
    let network = Network::from_config(&graph, &registry)
        .with_context(|| format!("failed to build network '{}'", graph.name))?;

    println!("🚀 Flowline network '{}'", network.name());
    println!("═══════════════════════════════════");
    println!("Nodes: {}", network.nodes().map(|n| n.id()).collect::<Vec<_>>().join(", "));
    println!();

    let mut listeners = Vec::with_capacity(graph.outports.len());
    for export in &graph.outports {
        let socket = Socket::new();
        network.attach_outport(&export.name, &socket)?;
        listeners.push((export.name.clone(), socket.listen()));
    }

    let mut events = network.subscribe();
    let started = Instant::now();
    network.start().await?;

    follow(&mut events, || network.is_running()).await?;

    for (outport, listener) in listeners.iter_mut() {
        print_packets(outport, listener);
    }

    network
        .stop()
        .await
        .with_context(|| format!("failed to stop network '{}'", network.name()))?;
    println!();
    println!("🎉 Done in {:?}", started.elapsed());
    Ok(())
}

/// Print network events until the run ends. Missed events are reported;
/// if the end itself was missed, `is_running` tells the loop to stop.
async fn follow<F>(events: &mut broadcast::Receiver<NetworkEvent>, is_running: F) -> Result<()>
where
    F: Fn() -> bool,
{
    loop {
        match events.recv().await {
            Ok(NetworkEvent::Started { run }) => println!("▶ run {} started", run),
            Ok(NetworkEvent::Error { node, scope, error }) => {
                println!("❌ {} failed in scope {}: {}", node, scope_label(&scope), error);
            }
            Ok(NetworkEvent::End { run, uptime }) => {
                println!("⏹ run {} ended after {:?}", run, uptime);
                return Ok(());
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Missed {} network events", skipped);
                if !is_running() {
                    return Ok(());
                }
            }
            Err(RecvError::Closed) => {
                return Err(RecvError::Closed).context("network event channel closed");
            }
        }
    }
}

fn print_packets(outport: &str, listener: &mut SocketListener) {
    while let Some(event) = listener.try_recv() {
        match event {
            SocketEvent::Connect => println!("  {} CONN", outport),
            SocketEvent::Ip(ip) => println!("  {} {}", outport, ip),
            SocketEvent::Disconnect => println!("  {} DISC", outport),
        }
    }
}
