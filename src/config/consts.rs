// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Quiet period the activity count must stay at zero before a run ends (milliseconds)
pub const DEFAULT_IDLE_DEBOUNCE_MS: u64 = 10;
/// Capacity of the network event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
/// Prefix of the built-in component library
pub const CORE_LIBRARY: &str = "core";
