//! Built-in and user-registered element kinds.
//!
//! Each entry pairs a static descriptor with a factory producing a fresh,
//! unstarted instance. Elements are found by name or by descriptor id.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use super::{Element, ElementDescriptor};
use crate::elements::{EchoElement, LabelTrigger, WebhookForwarder};

/// Builds a fresh, not yet started element instance.
pub type ElementFactory = fn() -> Box<dyn Element>;

struct Entry {
    descriptor: ElementDescriptor,
    factory: ElementFactory,
}

/// Registry of element kinds, keyed by name. Lookups also accept the id.
pub struct ElementRegistry {
    entries: BTreeMap<&'static str, Entry>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding every element shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(|| -> Box<dyn Element> { Box::new(EchoElement::new()) });
        registry.register(|| -> Box<dyn Element> { Box::new(LabelTrigger::new()) });
        registry.register(|| -> Box<dyn Element> { Box::new(WebhookForwarder::new()) });
        registry
    }

    /// Register an element kind. A later registration with the same name
    /// replaces the earlier one.
    pub fn register(&mut self, factory: ElementFactory) {
        let descriptor = factory().descriptor();
        self.entries.insert(
            descriptor.name,
            Entry {
                descriptor,
                factory,
            },
        );
    }

    fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries
            .get(key)
            .or_else(|| self.entries.values().find(|e| e.descriptor.id == key))
    }

    pub fn descriptor(&self, key: &str) -> Option<ElementDescriptor> {
        self.entry(key).map(|e| e.descriptor)
    }

    /// Create a new instance by name or id.
    pub fn create(&self, key: &str) -> Result<Box<dyn Element>> {
        self.entry(key)
            .map(|e| (e.factory)())
            .ok_or_else(|| anyhow!("element '{}' not registered", key))
    }

    /// Registered descriptors, ordered by name.
    pub fn list(&self) -> Vec<ElementDescriptor> {
        self.entries.values().map(|e| e.descriptor).collect()
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}
