// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::{ProcessInput, ProcessOutput};
use crate::errors::ProcessError;
use crate::ports::PortDefinition;
use crate::traits::{Component, ForwardBrackets};

/// Configuration for the Delay component
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DelayConfig {
    #[serde(default)]
    pub delay_ms: u64,
}

/// Delay - sends each packet from `in` to `out` after a fixed delay.
///
/// Completes asynchronously: the activation stays pending (and the network
/// busy) until the timer fires. Results still leave in arrival order.
pub struct Delay {
    config: DelayConfig,
}

impl Delay {
    pub fn new(config: DelayConfig) -> Self {
        Self { config }
    }

    pub fn millis(delay_ms: u64) -> Self {
        Self::new(DelayConfig { delay_ms })
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.config.delay_ms)
    }
}

#[async_trait]
impl Component for Delay {
    fn name(&self) -> &str {
        "Delay"
    }

    fn in_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::named("in")]
    }

    fn out_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::named("out")]
    }

    fn forward_brackets(&self) -> ForwardBrackets {
        ForwardBrackets::new().forward("in", ["out"])
    }

    fn process(
        &self,
        input: &mut ProcessInput<'_>,
        output: ProcessOutput,
    ) -> Result<(), ProcessError> {
        let value = input.get_data("in")?;
        let delay = self.delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // a stopped network already logged the late completion
            let _ = output.send_done(value);
        });
        Ok(())
    }
}
