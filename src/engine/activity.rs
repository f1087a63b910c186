// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use tokio::sync::watch;

/// Network-wide count of outstanding work.
///
/// Every in-flight delivery, open inbound stream and queued activation holds
/// one unit. The idle watcher observes the count through [`Activity::subscribe`].
#[derive(Debug, Clone)]
pub struct Activity {
    tx: Arc<watch::Sender<usize>>,
}

impl Activity {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn enter(&self) {
        self.tx.send_modify(|n| *n += 1);
    }

    pub fn exit(&self) {
        self.tx.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub fn reset(&self) {
        self.tx.send_replace(0);
    }

    pub fn pending(&self) -> usize {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.tx.subscribe()
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}
