// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::{ProcessInput, ProcessOutput};
use crate::errors::ProcessError;
use crate::ports::{DataType, PortDefinition, PortOptions};
use crate::traits::{Component, ForwardBrackets};

/// Zip - waits for one packet on every attached index of `in` and sends
/// them to `out` as a single array, ordered by index.
pub struct Zip;

impl Zip {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Zip {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Component for Zip {
    fn name(&self) -> &str {
        "Zip"
    }

    fn in_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::new(
            "in",
            PortOptions::default().addressable().required(),
        )]
    }

    fn out_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::new(
            "out",
            PortOptions::default().datatype(DataType::Array),
        )]
    }

    fn forward_brackets(&self) -> ForwardBrackets {
        ForwardBrackets::new().forward("in", ["out"])
    }

    fn process(
        &self,
        input: &mut ProcessInput<'_>,
        output: ProcessOutput,
    ) -> Result<(), ProcessError> {
        let indices = input.attached("in");
        let mut values = Vec::with_capacity(indices.len());
        for index in indices {
            values.push(input.get_data(("in", index))?);
        }
        output.send_done(Value::Array(values))
    }
}
