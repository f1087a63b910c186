// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Information packets.
//!
//! An [`Ip`] is the unit that travels over a [`Socket`](crate::socket::Socket).
//! It is either a data value or one half of a bracket pair, optionally tagged
//! with a [`ScopeId`] that partitions traffic into independent transactions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Identifier of a logical transaction.
///
/// Equality is structural within a variant only: `ScopeId::Int(1)` and
/// `ScopeId::Str("1")` are different scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeId {
    Int(i64),
    Str(String),
}

impl Display for ScopeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeId::Int(n) => write!(f, "{}", n),
            ScopeId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ScopeId {
    fn from(value: i64) -> Self {
        ScopeId::Int(value)
    }
}

impl From<i32> for ScopeId {
    fn from(value: i32) -> Self {
        ScopeId::Int(i64::from(value))
    }
}

impl From<&str> for ScopeId {
    fn from(value: &str) -> Self {
        ScopeId::Str(value.to_string())
    }
}

impl From<String> for ScopeId {
    fn from(value: String) -> Self {
        ScopeId::Str(value)
    }
}

/// Renders an optional scope the way logs and test transcripts show it.
pub fn scope_label(scope: &Option<ScopeId>) -> String {
    match scope {
        Some(s) => s.to_string(),
        None => "null".to_string(),
    }
}

/// Payload of an [`Ip`]. Bracket labels are arbitrary values; a close
/// bracket without a label carries `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Packet {
    Data(Value),
    OpenBracket(Value),
    CloseBracket(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpKind {
    Data,
    OpenBracket,
    CloseBracket,
}

/// An information packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Ip {
    pub packet: Packet,
    pub scope: Option<ScopeId>,
    /// Node that last emitted this packet. Diagnostic only.
    pub owner: Option<String>,
    /// Set on initial packets bound to a port by the graph.
    pub initial: bool,
}

impl Ip {
    fn new(packet: Packet) -> Self {
        Self {
            packet,
            scope: None,
            owner: None,
            initial: false,
        }
    }

    pub fn data(value: impl Into<Value>) -> Self {
        Self::new(Packet::Data(value.into()))
    }

    pub fn open_bracket(label: impl Into<Value>) -> Self {
        Self::new(Packet::OpenBracket(label.into()))
    }

    pub fn close_bracket(label: impl Into<Value>) -> Self {
        Self::new(Packet::CloseBracket(label.into()))
    }

    pub fn with_scope(mut self, scope: impl Into<ScopeId>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Replaces the scope, `None` included.
    pub fn in_scope(mut self, scope: Option<ScopeId>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn as_initial(mut self) -> Self {
        self.initial = true;
        self
    }

    pub fn kind(&self) -> IpKind {
        match self.packet {
            Packet::Data(_) => IpKind::Data,
            Packet::OpenBracket(_) => IpKind::OpenBracket,
            Packet::CloseBracket(_) => IpKind::CloseBracket,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self.packet, Packet::Data(_))
    }

    pub fn is_bracket(&self) -> bool {
        !self.is_data()
    }

    /// Data payload or bracket label.
    pub fn value(&self) -> &Value {
        match &self.packet {
            Packet::Data(v) | Packet::OpenBracket(v) | Packet::CloseBracket(v) => v,
        }
    }

    pub fn into_value(self) -> Value {
        match self.packet {
            Packet::Data(v) | Packet::OpenBracket(v) | Packet::CloseBracket(v) => v,
        }
    }
}

impl From<Packet> for Ip {
    fn from(packet: Packet) -> Self {
        Self::new(packet)
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `x < 1`, `x DATA payload`, `x >` with `null` for an absent scope.
impl Display for Ip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let scope = scope_label(&self.scope);
        match &self.packet {
            Packet::OpenBracket(label) => write!(f, "{} < {}", scope, render(label)),
            Packet::Data(value) => write!(f, "{} DATA {}", scope, render(value)),
            Packet::CloseBracket(_) => write!(f, "{} >", scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_identity_is_typed() {
        assert_ne!(ScopeId::from(1), ScopeId::from("1"));
        assert_eq!(ScopeId::from(1), ScopeId::Int(1));
        assert_eq!(ScopeId::from("x"), ScopeId::from("x".to_string()));
    }

    #[test]
    fn test_scope_deserializes_untagged() {
        let n: ScopeId = serde_json::from_value(json!(7)).unwrap();
        let s: ScopeId = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(n, ScopeId::Int(7));
        assert_eq!(s, ScopeId::Str("7".into()));
    }

    #[test]
    fn test_display_transcript_format() {
        assert_eq!(Ip::open_bracket(1).with_scope("x").to_string(), "x < 1");
        assert_eq!(Ip::data("one").to_string(), "null DATA one");
        assert_eq!(Ip::close_bracket(Value::Null).with_scope(2).to_string(), "2 >");
    }

    #[test]
    fn test_kind_and_value() {
        let ip = Ip::open_bracket("a").with_owner("Pc1");
        assert_eq!(ip.kind(), IpKind::OpenBracket);
        assert!(ip.is_bracket());
        assert_eq!(ip.value(), &json!("a"));
        assert_eq!(ip.owner.as_deref(), Some("Pc1"));
        assert!(!ip.initial);
        assert!(Ip::data(1).as_initial().initial);
    }
}
