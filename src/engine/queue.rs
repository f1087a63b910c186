// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ordered output of one node.
//!
//! Activations and forwarded closes are queued in the order they
//! happened. Output is released strictly from the front, so an
//! asynchronous activation that completes late still delays everything
//! queued after it.

use crate::engine::activity::Activity;
use crate::engine::brackets::BracketId;
use crate::packet::{Packet, ScopeId};
use std::collections::VecDeque;

pub(crate) type ActivationId = u64;

/// One validated packet waiting to be written to an output port.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OutputItem {
    pub port: String,
    pub index: Option<usize>,
    pub packet: Packet,
}

#[derive(Debug)]
enum Slot {
    Activation {
        id: ActivationId,
        scope: Option<ScopeId>,
        context: Vec<BracketId>,
        items: VecDeque<OutputItem>,
        done: bool,
        aborted: bool,
    },
    Close {
        ids: Vec<BracketId>,
    },
}

#[derive(Debug, PartialEq)]
pub(crate) enum Ready {
    Item {
        scope: Option<ScopeId>,
        context: Vec<BracketId>,
        item: OutputItem,
    },
    Close {
        ids: Vec<BracketId>,
    },
}

/// Every queued slot holds one unit of network activity until it is
/// released.
#[derive(Debug)]
pub(crate) struct OutputQueue {
    slots: VecDeque<Slot>,
    activity: Activity,
}

impl OutputQueue {
    pub fn new(activity: Activity) -> Self {
        Self {
            slots: VecDeque::new(),
            activity,
        }
    }

    fn push(&mut self, slot: Slot) {
        self.activity.enter();
        self.slots.push_back(slot);
    }

    pub fn push_activation(&mut self, id: ActivationId, scope: Option<ScopeId>, context: Vec<BracketId>) {
        self.push(Slot::Activation {
            id,
            scope,
            context,
            items: VecDeque::new(),
            done: false,
            aborted: false,
        });
    }

    pub fn push_close(&mut self, ids: Vec<BracketId>) {
        if !ids.is_empty() {
            self.push(Slot::Close { ids });
        }
    }

    fn activation_mut(&mut self, wanted: ActivationId) -> Option<&mut Slot> {
        self.slots
            .iter_mut()
            .find(|slot| matches!(slot, Slot::Activation { id, .. } if *id == wanted))
    }

    /// Adds output to an activation. Returns false when the activation is
    /// unknown, finished or aborted.
    pub fn append(&mut self, activation: ActivationId, output: Vec<OutputItem>) -> bool {
        match self.activation_mut(activation) {
            Some(Slot::Activation {
                items,
                done: false,
                aborted: false,
                ..
            }) => {
                items.extend(output);
                true
            }
            _ => false,
        }
    }

    pub fn finish(&mut self, activation: ActivationId) -> bool {
        match self.activation_mut(activation) {
            Some(Slot::Activation { done, .. }) => {
                *done = true;
                true
            }
            _ => false,
        }
    }

    /// Marks an activation failed and drops its unwritten output.
    pub fn abort(&mut self, activation: ActivationId) -> bool {
        match self.activation_mut(activation) {
            Some(Slot::Activation {
                items,
                done,
                aborted,
                ..
            }) => {
                items.clear();
                *done = true;
                *aborted = true;
                true
            }
            _ => false,
        }
    }

    /// Next piece of output that may be written now.
    pub fn next_ready(&mut self) -> Option<Ready> {
        loop {
            let front = self.slots.front_mut()?;
            let ready = match front {
                Slot::Activation {
                    scope,
                    context,
                    items,
                    done,
                    ..
                } => {
                    if let Some(item) = items.pop_front() {
                        return Some(Ready::Item {
                            scope: scope.clone(),
                            context: context.clone(),
                            item,
                        });
                    }
                    if !*done {
                        return None;
                    }
                    None
                }
                Slot::Close { ids } => Some(Ready::Close {
                    ids: std::mem::take(ids),
                }),
            };
            self.slots.pop_front();
            self.activity.exit();
            if ready.is_some() {
                return ready;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
