// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod delay;
pub mod discard;
pub mod repeat;
pub mod unscope;
pub mod zip;

pub use delay::*;
pub use discard::*;
pub use repeat::*;
pub use unscope::*;
pub use zip::*;
