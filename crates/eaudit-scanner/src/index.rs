//! Name index used to resolve free-text references to attributes

use crate::types::{Attribute, AttributeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Normalize a referenced name for lookup
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Case-insensitive, whitespace-trimmed map from attribute name to identifier.
///
/// When two attributes share a normalized name the first one seen keeps the
/// entry; later ones stay in the attribute list but cannot be resolved by name.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: HashMap<String, AttributeId>,
}

impl NameIndex {
    /// Build the index from the enumerated attributes
    pub fn build(attributes: &[Attribute]) -> Self {
        let mut entries = HashMap::with_capacity(attributes.len());

        for attr in attributes {
            let key = normalize(&attr.name);
            if key.is_empty() {
                continue;
            }
            match entries.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(attr.id);
                }
                Entry::Occupied(slot) => {
                    tracing::debug!(
                        name = %attr.name,
                        kept = *slot.get(),
                        dropped = attr.id,
                        "duplicate attribute name; keeping first"
                    );
                }
            }
        }

        Self { entries }
    }

    /// Resolve a referenced name
    pub fn resolve(&self, name: &str) -> Option<AttributeId> {
        self.entries.get(&normalize(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
