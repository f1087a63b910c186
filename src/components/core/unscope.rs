// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{ProcessInput, ProcessOutput};
use crate::errors::ProcessError;
use crate::ports::{PortDefinition, PortOptions};
use crate::traits::{Component, ForwardBrackets};

/// Unscope - passes packets through with their scope removed.
pub struct Unscope;

impl Unscope {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Unscope {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for Unscope {
    fn name(&self) -> &str {
        "Unscope"
    }

    fn in_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::named("in")]
    }

    fn out_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::new("out", PortOptions::default().unscoped())]
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
