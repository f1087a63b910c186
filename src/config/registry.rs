// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::components;
use crate::config::consts::CORE_LIBRARY;
use crate::errors::LoadError;
use crate::traits::Component;

/// Resolves a component name from a graph description into an instance.
pub trait ComponentLoader: Send + Sync {
    /// Create a fresh instance of `component`, configured by the node's
    /// metadata.
    fn load(&self, component: &str, metadata: &Value) -> Result<Arc<dyn Component>, LoadError>;

    /// Every component name this loader can resolve.
    fn names(&self) -> Vec<String>;
}

type Factory = dyn Fn(&Value) -> Result<Arc<dyn Component>, LoadError> + Send + Sync;

/// In-memory [`ComponentLoader`] mapping `library/Name` to a factory.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, Arc<Factory>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in `core/*` components.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        components::register_core(&mut registry, CORE_LIBRARY);
        registry
    }

    /// Register a factory under `library/name`. A later registration under
    /// the same name replaces the earlier one.
    pub fn register<F>(&mut self, library: &str, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Arc<dyn Component>, LoadError> + Send + Sync + 'static,
    {
        self.factories
            .insert(format!("{}/{}", library, name), Arc::new(factory));
        self
    }

    pub fn contains(&self, component: &str) -> bool {
        self.factories.contains_key(component)
    }
}

impl ComponentLoader for ComponentRegistry {
    fn load(&self, component: &str, metadata: &Value) -> Result<Arc<dyn Component>, LoadError> {
        let factory = self
            .factories
            .get(component)
            .ok_or_else(|| LoadError::UnknownComponent(component.to_string()))?;
        factory(metadata)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.names())
            .finish()
    }
}
