//! Extension registry consulted while parsing.

use std::sync::Arc;

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::descriptor::{FieldDescriptor, MessageDescriptor};

lazy_static! {
    static ref EMPTY_REGISTRY: ExtensionRegistry = ExtensionRegistry::new();
}

/// Extensions known to the parser, keyed by extended type and number.
///
/// The extended type is matched by descriptor id, not by name. Numbers in
/// an extension range that are not registered here are preserved as
/// unknown fields.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    by_number: FxHashMap<(u64, u32), Arc<FieldDescriptor>>,
    by_name: FxHashMap<String, Arc<FieldDescriptor>>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry with no extensions.
    pub fn empty() -> &'static ExtensionRegistry {
        &EMPTY_REGISTRY
    }

    /// Registers an extension. A later registration for the same
    /// extended type and number replaces the earlier one. Declared
    /// (non-extension) fields are ignored.
    pub fn add(&mut self, extension: Arc<FieldDescriptor>) {
        let Some(extendee_id) = extension.extendee_id() else {
            return;
        };
        let key = (extendee_id, extension.number());
        self.by_name.insert(extension.full_name(), extension.clone());
        self.by_number.insert(key, extension);
    }

    /// Finds an extension of `extendee` by field number.
    pub fn find_by_number(&self, extendee: &MessageDescriptor, number: u32) -> Option<&Arc<FieldDescriptor>> {
        self.by_number.get(&(extendee.id(), number))
    }

    /// Finds an extension by its full name (`extended.Type.name`).
    pub fn find_by_name(&self, full_name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.by_name.get(full_name)
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}
