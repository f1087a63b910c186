// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed endpoints of a component.
//!
//! A component declares its ports as [`PortDefinition`]s. The network turns
//! them into live [`InPort`]s and [`OutPort`]s that own the attached sockets.
//! Addressable ports keep one socket per index; detaching leaves the slot
//! empty so the remaining indices never shift.

mod inport;
mod outport;
mod slots;

pub use inport::InPort;
pub use outport::OutPort;
pub use slots::MAX_PORT_INDEX;

use crate::errors::PortError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Semantic type tag of a port. Only the primitive categories are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    All,
    Bang,
    String,
    Boolean,
    Number,
    Int,
    Object,
    Array,
}

impl DataType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            DataType::All | DataType::Bang => true,
            DataType::String => value.is_string(),
            DataType::Boolean => value.is_boolean(),
            DataType::Number => value.is_number(),
            DataType::Int => value.is_i64() || value.is_u64(),
            DataType::Object => value.is_object(),
            DataType::Array => value.is_array(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::All => "all",
            DataType::Bang => "bang",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Number => "number",
            DataType::Int => "int",
            DataType::Object => "object",
            DataType::Array => "array",
        }
    }
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Port configuration.
///
/// Defaults: `datatype = all`, `required = false`, `addressable = false`,
/// `scoped = true`, `multiple = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortOptions {
    pub datatype: DataType,
    pub required: bool,
    pub addressable: bool,
    pub scoped: bool,
    /// Whether a non-addressable port accepts more than one connection.
    pub multiple: bool,
    pub description: Option<String>,
}

impl Default for PortOptions {
    fn default() -> Self {
        Self {
            datatype: DataType::All,
            required: false,
            addressable: false,
            scoped: true,
            multiple: true,
            description: None,
        }
    }
}

impl PortOptions {
    pub fn datatype(mut self, datatype: DataType) -> Self {
        self.datatype = datatype;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn addressable(mut self) -> Self {
        self.addressable = true;
        self
    }

    pub fn unscoped(mut self) -> Self {
        self.scoped = false;
        self
    }

    pub fn single(mut self) -> Self {
        self.multiple = false;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortDefinition {
    pub name: String,
    pub options: PortOptions,
}

impl PortDefinition {
    pub fn new(name: impl Into<String>, options: PortOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, PortOptions::default())
    }

    pub fn validate(&self) -> Result<(), PortError> {
        validate_port_name(&self.name)
    }
}

pub fn validate_port_name(name: &str) -> Result<(), PortError> {
    let legal = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || "_./".contains(c);
    if name.is_empty() || !name.chars().all(legal) {
        return Err(PortError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Names a port, or one sub-channel of an addressable port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortRef {
    pub name: String,
    pub index: Option<usize>,
}

impl PortRef {
    pub fn new(name: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

impl From<&str> for PortRef {
    fn from(name: &str) -> Self {
        Self::new(name, None)
    }
}

impl From<String> for PortRef {
    fn from(name: String) -> Self {
        Self::new(name, None)
    }
}

impl From<&String> for PortRef {
    fn from(name: &String) -> Self {
        Self::new(name.clone(), None)
    }
}

impl From<(&str, usize)> for PortRef {
    fn from((name, index): (&str, usize)) -> Self {
        Self::new(name, Some(index))
    }
}

impl From<&PortRef> for PortRef {
    fn from(port: &PortRef) -> Self {
        port.clone()
    }
}

impl Display for PortRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.name, index),
            None => write!(f, "{}", self.name),
        }
    }
}

fn unknown(port: &str, direction: &str) -> PortError {
    PortError::UnknownPort {
        port: port.to_string(),
        direction: direction.to_string(),
    }
}

/// Input ports of one node, in declaration order.
#[derive(Debug)]
pub struct InPorts(Vec<InPort>);

impl InPorts {
    pub fn new(ports: Vec<InPort>) -> Self {
        Self(ports)
    }

    pub fn get(&self, name: &str) -> Option<&InPort> {
        self.0.iter().find(|p| p.name() == name)
    }

    pub fn require(&self, name: &str) -> Result<&InPort, PortError> {
        self.get(name).ok_or_else(|| unknown(name, "inports"))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InPort> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.name()).collect()
    }
}

/// Output ports of one node, in declaration order.
#[derive(Debug)]
pub struct OutPorts(Vec<OutPort>);

impl OutPorts {
    pub fn new(ports: Vec<OutPort>) -> Self {
        Self(ports)
    }

    pub fn get(&self, name: &str) -> Option<&OutPort> {
        self.0.iter().find(|p| p.name() == name)
    }

    pub fn require(&self, name: &str) -> Result<&OutPort, PortError> {
        self.get(name).ok_or_else(|| unknown(name, "outports"))
    }

    /// First declared output port; target of bare `send(value)` calls.
    pub fn default_port(&self) -> Result<&OutPort, PortError> {
        self.0.first().ok_or_else(|| unknown("<default>", "outports"))
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutPort> {
        self.0.iter()
    }

    pub fn congested(&self) -> bool {
        self.0.iter().any(|p| p.congested())
    }

    pub async fn wait_for_capacity(&self) {
        for port in &self.0 {
            port.wait_for_capacity().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_option_defaults() {
        let options = PortOptions::default();
        assert!(options.scoped);
        assert!(!options.addressable);
        assert!(!options.required);
        assert!(options.multiple);
        assert_eq!(options.datatype, DataType::All);
    }

    #[test]
    fn test_port_options_deserialize_with_defaults() {
        let options: PortOptions =
            serde_yaml::from_str("datatype: string\nscoped: false\n").unwrap();
        assert_eq!(options.datatype, DataType::String);
        assert!(!options.scoped);
        assert!(options.multiple);
    }

    #[test]
    fn test_datatype_acceptance() {
        assert!(DataType::String.accepts(&json!("a")));
        assert!(!DataType::String.accepts(&json!(1)));
        assert!(DataType::Int.accepts(&json!(3)));
        assert!(!DataType::Int.accepts(&json!(3.5)));
        assert!(DataType::Number.accepts(&json!(3.5)));
        assert!(DataType::Object.accepts(&json!({"a": 1})));
        assert!(DataType::Array.accepts(&json!([1])));
        assert!(DataType::Boolean.accepts(&json!(true)));
        assert!(DataType::All.accepts(&Value::Null));
    }

    #[test]
    fn test_port_names() {
        assert!(validate_port_name("in2").is_ok());
        assert!(validate_port_name("pkg/in_a.b").is_ok());
        assert!(validate_port_name("In").is_err());
        assert!(validate_port_name("").is_err());
        assert!(validate_port_name("a b").is_err());
    }

    #[test]
    fn test_port_ref_display() {
        assert_eq!(PortRef::from(("in2", 0)).to_string(), "in2[0]");
        assert_eq!(PortRef::from("in1").to_string(), "in1");
    }
}
