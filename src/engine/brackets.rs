// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Arena of forwarded brackets.
//!
//! Each open bracket read from a forwarding source port becomes (or joins)
//! an entry in the arena. Entries are stacked per scope; an entry is held
//! by every source port that opened it and is released when the last of
//! them closes. Released entries leave the stack only from the top, so an
//! inner bracket that is still held keeps its released parents open.
//!
//! Open brackets are written to an output port lazily, the first time data
//! inside them is sent there. Closing an entry emits a close bracket only
//! on the ports that saw the matching open. An entry that finishes without
//! ever being written is an empty group and goes out as an open and close
//! pair on every target, inside its enclosing brackets.

use crate::packet::{Ip, ScopeId};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

pub type BracketId = u64;

/// A forwarding source: one port (or port index) at one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SourceKey {
    pub port: String,
    pub index: Option<usize>,
    pub scope: Option<ScopeId>,
}

#[derive(Debug)]
struct ForwardedBracket {
    label: Value,
    scope: Option<ScopeId>,
    targets: Vec<String>,
    holders: BTreeSet<SourceKey>,
    released: bool,
    opened_on: Vec<String>,
    /// Enclosing entries, outermost first.
    parents: Vec<BracketId>,
}

#[derive(Debug, Default)]
pub(crate) struct BracketArena {
    next: BracketId,
    entries: HashMap<BracketId, ForwardedBracket>,
    live: HashMap<Option<ScopeId>, Vec<BracketId>>,
    sources: HashMap<SourceKey, Vec<BracketId>>,
}

impl BracketArena {
    /// Records an open bracket from `source`.
    ///
    /// When another source already opened a bracket with the same label at
    /// the same depth of this scope's stack, `source` joins it instead of
    /// creating a second one.
    pub fn open(&mut self, source: SourceKey, label: Value, targets: &[String]) -> BracketId {
        let depth = self.sources.get(&source).map(Vec::len).unwrap_or(0);
        let stack = self.live.entry(source.scope.clone()).or_default();

        if let Some(&candidate) = stack.get(depth) {
            if let Some(entry) = self.entries.get_mut(&candidate) {
                if !entry.released && entry.label == label && !entry.holders.contains(&source) {
                    entry.holders.insert(source.clone());
                    for target in targets {
                        if !entry.targets.contains(target) {
                            entry.targets.push(target.clone());
                        }
                    }
                    self.sources.entry(source).or_default().push(candidate);
                    return candidate;
                }
            }
        }

        let id = self.next;
        self.next += 1;
        let parents = stack.clone();
        stack.push(id);
        self.entries.insert(
            id,
            ForwardedBracket {
                label,
                scope: source.scope.clone(),
                targets: targets.to_vec(),
                holders: BTreeSet::from([source.clone()]),
                released: false,
                opened_on: Vec::new(),
                parents,
            },
        );
        self.sources.entry(source).or_default().push(id);
        id
    }

    /// Records a close bracket from `source`.
    ///
    /// Returns the entries that left the stack as a result, innermost
    /// first, or `None` when `source` had nothing open.
    pub fn close(&mut self, source: &SourceKey) -> Option<Vec<BracketId>> {
        let held = self.sources.get_mut(source)?;
        let id = held.pop()?;
        if held.is_empty() {
            self.sources.remove(source);
        }

        let entry = self.entries.get_mut(&id)?;
        entry.holders.remove(source);
        if entry.holders.is_empty() {
            entry.released = true;
        }
        let scope = entry.scope.clone();

        let mut finished = Vec::new();
        if let Some(stack) = self.live.get_mut(&scope) {
            while let Some(&top) = stack.last() {
                let released = self.entries.get(&top).map(|e| e.released).unwrap_or(true);
                if !released {
                    break;
                }
                stack.pop();
                finished.push(top);
            }
            if stack.is_empty() {
                self.live.remove(&scope);
            }
        }
        Some(finished)
    }

    /// Brackets currently open at `scope`, outermost first.
    pub fn context(&self, scope: &Option<ScopeId>) -> Vec<BracketId> {
        self.live.get(scope).cloned().unwrap_or_default()
    }

    pub fn targets(&self, id: BracketId) -> Vec<String> {
        self.entries
            .get(&id)
            .map(|e| e.targets.clone())
            .unwrap_or_default()
    }

    /// Open brackets from `context` that still have to be written to `port`
    /// before data can be sent there.
    pub fn ensure_open(&mut self, context: &[BracketId], port: &str) -> Vec<Ip> {
        let mut opens = Vec::new();
        for id in context {
            if let Some(entry) = self.entries.get_mut(id) {
                let wanted = entry.targets.iter().any(|t| t == port);
                let written = entry.opened_on.iter().any(|p| p == port);
                if wanted && !written {
                    entry.opened_on.push(port.to_string());
                    opens.push(Ip::open_bracket(entry.label.clone()).in_scope(entry.scope.clone()));
                }
            }
        }
        opens
    }

    /// Drops a released entry and yields its close bracket for every port
    /// the open was written to. An entry never written anywhere yields its
    /// enclosing opens, then an open and close pair, for each target.
    pub fn finish(&mut self, id: BracketId) -> Vec<(String, Ip)> {
        let Some(entry) = self.entries.remove(&id) else {
            return Vec::new();
        };
        let open = Ip::open_bracket(entry.label.clone()).in_scope(entry.scope.clone());
        let close = Ip::close_bracket(entry.label).in_scope(entry.scope);
        if !entry.opened_on.is_empty() {
            return entry
                .opened_on
                .into_iter()
                .map(|port| (port, close.clone()))
                .collect();
        }

        let mut written = Vec::new();
        for target in entry.targets {
            for parent in self.ensure_open(&entry.parents, &target) {
                written.push((target.clone(), parent));
            }
            written.push((target.clone(), open.clone()));
            written.push((target, close.clone()));
        }
        written
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(port: &str, scope: Option<&str>) -> SourceKey {
        SourceKey {
            port: port.to_string(),
            index: None,
            scope: scope.map(ScopeId::from),
        }
    }

    fn out() -> Vec<String> {
        vec!["out".to_string()]
    }

    #[test]
    fn test_nested_open_and_close() {
        let mut arena = BracketArena::default();
        let in1 = source("in1", None);
        let outer = arena.open(in1.clone(), json!(1), &out());
        let inner = arena.open(in1.clone(), json!("a"), &out());
        assert_eq!(arena.context(&None), vec![outer, inner]);

        let opens = arena.ensure_open(&[outer, inner], "out");
        assert_eq!(opens.len(), 2);
        assert_eq!(opens[0].to_string(), "null < 1");
        assert!(arena.ensure_open(&[outer, inner], "out").is_empty());

        assert_eq!(arena.close(&in1), Some(vec![inner]));
        assert_eq!(arena.finish(inner).len(), 1);
        assert_eq!(arena.close(&in1), Some(vec![outer]));
        assert_eq!(arena.finish(outer)[0].1.to_string(), "null >");
        assert!(arena.is_empty());
        assert_eq!(arena.close(&in1), None);
    }

    #[test]
    fn test_second_source_joins_matching_bracket() {
        let mut arena = BracketArena::default();
        let in1 = source("in1", Some("x"));
        let in2 = source("in2", Some("x"));
        let first = arena.open(in1.clone(), json!("g"), &out());
        let second = arena.open(in2.clone(), json!("g"), &out());
        assert_eq!(first, second);
        assert_eq!(arena.context(&Some(ScopeId::from("x"))), vec![first]);

        assert_eq!(arena.close(&in1), Some(vec![]));
        assert_eq!(arena.close(&in2), Some(vec![first]));
    }

    #[test]
    fn test_different_labels_do_not_join() {
        let mut arena = BracketArena::default();
        let a = arena.open(source("in1", None), json!("a"), &out());
        let b = arena.open(source("in2", None), json!("b"), &out());
        assert_ne!(a, b);
        assert_eq!(arena.context(&None), vec![a, b]);
    }

    #[test]
    fn test_released_parent_waits_for_held_child() {
        let mut arena = BracketArena::default();
        let in1 = source("in1", None);
        let in2 = source("in2", None);
        let parent = arena.open(in1.clone(), json!("p"), &out());
        let child = arena.open(in2.clone(), json!("c"), &out());

        // Closing the parent's only holder does not pop it while the child is open.
        assert_eq!(arena.close(&in1), Some(vec![]));
        assert_eq!(arena.context(&None), vec![parent, child]);
        assert_eq!(arena.close(&in2), Some(vec![child, parent]));
        assert!(arena.context(&None).is_empty());
    }

    #[test]
    fn test_scopes_have_separate_stacks() {
        let mut arena = BracketArena::default();
        let x = arena.open(source("in1", Some("x")), json!(1), &out());
        let y = arena.open(source("in1", Some("y")), json!(1), &out());
        assert_ne!(x, y);
        assert_eq!(arena.context(&Some(ScopeId::from("x"))), vec![x]);
        assert_eq!(arena.context(&Some(ScopeId::from("y"))), vec![y]);
    }

    #[test]
    fn test_unwritten_group_is_emitted_inside_its_parents() {
        let mut arena = BracketArena::default();
        let in1 = source("in", None);
        let outer = arena.open(in1.clone(), json!("a"), &out());
        let empty = arena.open(in1.clone(), json!("e"), &out());
        assert_eq!(arena.close(&in1), Some(vec![empty]));

        let written: Vec<String> = arena
            .finish(empty)
            .into_iter()
            .map(|(port, ip)| format!("{} {}", port, ip))
            .collect();
        assert_eq!(written, vec!["out null < a", "out null < e", "out null >"]);

        // The parent was opened on the way, so its close follows normally.
        assert!(arena.ensure_open(&[outer], "out").is_empty());
        assert_eq!(arena.close(&in1), Some(vec![outer]));
        assert_eq!(arena.finish(outer).len(), 1);
        assert!(arena.is_empty());
    }

    #[test]
    fn test_close_only_written_where_opened() {
        let mut arena = BracketArena::default();
        let targets = vec!["a".to_string(), "b".to_string()];
        let id = arena.open(source("in", None), json!(1), &targets);
        arena.ensure_open(&[id], "a");
        assert!(arena.ensure_open(&[id], "c").is_empty());
        arena.close(&source("in", None));
        let closes = arena.finish(id);
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].0, "a");
    }
}
