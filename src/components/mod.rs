// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in component library.

pub mod core;   // core/* components

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::config::ComponentRegistry;
use crate::errors::LoadError;
use crate::traits::Component;

use self::core::{Delay, DelayConfig, Discard, Repeat, Unscope, Zip};

/// Registers the core components under `library` (`core/Repeat`, ...).
pub fn register_core(registry: &mut ComponentRegistry, library: &str) {
    registry
        .register(library, "Repeat", |_| shared(Repeat::new()))
        .register(library, "Delay", |metadata| {
            let config: DelayConfig = metadata_or_default("core/Delay", metadata)?;
            shared(Delay::new(config))
        })
        .register(library, "Zip", |_| shared(Zip::new()))
        .register(library, "Unscope", |_| shared(Unscope::new()))
        .register(library, "Drop", |_| shared(Discard::new()));
}

fn shared<C: Component + 'static>(component: C) -> Result<Arc<dyn Component>, LoadError> {
    let component: Arc<dyn Component> = Arc::new(component);
    Ok(component)
}

/// Reads a component's configuration from node metadata. Absent metadata
/// yields the default configuration.
pub fn metadata_or_default<T>(component: &str, metadata: &Value) -> Result<T, LoadError>
where
    T: DeserializeOwned + Default,
{
    if metadata.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(metadata.clone()).map_err(|e| LoadError::InvalidMetadata {
        component: component.to_string(),
        reason: e.to_string(),
    })
}
