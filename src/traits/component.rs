// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::{ProcessInput, ProcessOutput};
use crate::errors::ProcessError;
use crate::ports::{PortDefinition, PortOptions};

/// Map of forwarding source port -> output ports that receive its brackets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardBrackets(BTreeMap<String, Vec<String>>);

impl ForwardBrackets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward<I, S>(mut self, source: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(source.into(), targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn targets(&self, source: &str) -> Option<&[String]> {
        self.0.get(source).map(Vec::as_slice)
    }

    pub fn is_source(&self, port: &str) -> bool {
        self.0.contains_key(port)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Vec<String>>> for ForwardBrackets {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

/// A unit of logic in the graph.
///
/// `process` runs once per activation on the node's task. It must not
/// block; asynchronous work moves the [`ProcessOutput`] into a spawned task
/// and completes it from there.
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    fn in_ports(&self) -> Vec<PortDefinition>;

    fn out_ports(&self) -> Vec<PortDefinition>;

    /// Bracket forwarding policy. Empty by default.
    fn forward_brackets(&self) -> ForwardBrackets {
        ForwardBrackets::default()
    }

    /// Awaited before any packet is delivered to the node.
    async fn set_up(&self) -> Result<(), ProcessError> {
        Ok(())
    }

    /// Called when the network stops.
    async fn tear_down(&self) -> Result<(), ProcessError> {
        Ok(())
    }

    fn process(
        &self,
        input: &mut ProcessInput<'_>,
        output: ProcessOutput,
    ) -> Result<(), ProcessError>;
}

type ProcessFn =
    dyn Fn(&mut ProcessInput<'_>, ProcessOutput) -> Result<(), ProcessError> + Send + Sync;

/// Component assembled from port declarations and a closure.
pub struct FnComponent {
    name: String,
    in_ports: Vec<PortDefinition>,
    out_ports: Vec<PortDefinition>,
    forwarding: ForwardBrackets,
    process: Arc<ProcessFn>,
}

#[async_trait]
impl Component for FnComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn in_ports(&self) -> Vec<PortDefinition> {
        self.in_ports.clone()
    }

    fn out_ports(&self) -> Vec<PortDefinition> {
        self.out_ports.clone()
    }

    fn forward_brackets(&self) -> ForwardBrackets {
        self.forwarding.clone()
    }

    fn process(
        &self,
        input: &mut ProcessInput<'_>,
        output: ProcessOutput,
    ) -> Result<(), ProcessError> {
        (self.process)(input, output)
    }
}

/// Builder for [`FnComponent`].
///
/// ```
/// use the_flowline::traits::ComponentBuilder;
/// use the_flowline::ports::PortOptions;
///
/// let upper = ComponentBuilder::new("Upper")
///     .in_port("in", PortOptions::default())
///     .out_port("out", PortOptions::default())
///     .forward("in", ["out"])
///     .process(|input, output| {
///         let text = input.get_data("in")?;
///         let upper = text.as_str().unwrap_or_default().to_uppercase();
///         output.send_done(upper)
///     });
/// # let _ = upper;
/// ```
pub struct ComponentBuilder {
    name: String,
    in_ports: Vec<PortDefinition>,
    out_ports: Vec<PortDefinition>,
    forwarding: ForwardBrackets,
}

impl ComponentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
            forwarding: ForwardBrackets::default(),
        }
    }

    pub fn in_port(mut self, name: impl Into<String>, options: PortOptions) -> Self {
        self.in_ports.push(PortDefinition::new(name, options));
        self
    }

    pub fn out_port(mut self, name: impl Into<String>, options: PortOptions) -> Self {
        self.out_ports.push(PortDefinition::new(name, options));
        self
    }

    pub fn forward<I, S>(mut self, source: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forwarding = self.forwarding.forward(source, targets);
        self
    }

    pub fn process<F>(self, process: F) -> FnComponent
    where
        F: Fn(&mut ProcessInput<'_>, ProcessOutput) -> Result<(), ProcessError>
            + Send
            + Sync
            + 'static,
    {
        FnComponent {
            name: self.name,
            in_ports: self.in_ports,
            out_ports: self.out_ports,
            forwarding: self.forwarding,
            process: Arc::new(process),
        }
    }
}
