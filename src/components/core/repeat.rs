// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{ProcessInput, ProcessOutput};
use crate::errors::ProcessError;
use crate::ports::PortDefinition;
use crate::traits::{Component, ForwardBrackets};

/// Repeat - sends every packet received on `in` to `out`, brackets
/// included.
pub struct Repeat;

impl Repeat {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Repeat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for Repeat {
    fn name(&self) -> &str {
        "Repeat"
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
        output.send_done(value)
    }
}
