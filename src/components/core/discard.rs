// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{ProcessInput, ProcessOutput};
use crate::errors::ProcessError;
use crate::ports::PortDefinition;
use crate::traits::Component;

/// Drop - consumes every packet on `in`, brackets included, and sends
/// nothing.
///
/// Registered as `core/Drop`.
pub struct Discard;

impl Discard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Discard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for Discard {
    fn name(&self) -> &str {
        "Drop"
    }

    fn in_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::named("in")]
    }

    fn out_ports(&self) -> Vec<PortDefinition> {
        Vec::new()
    }

    fn process(
        &self,
        input: &mut ProcessInput<'_>,
        output: ProcessOutput,
    ) -> Result<(), ProcessError> {
        while input.get("in")?.is_some() {}
        output.done()
    }
}
