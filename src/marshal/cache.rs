//! Memoized type mappings

use crate::types::TypeId;
use rustc_hash::FxHashMap;

/// How much cached state to discard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearCacheMode {
    /// Drop the mapper's type mappings
    #[default]
    Default,
    /// Also drop backend-owned caches (synthesized view types)
    Everything,
}

/// Host type to target type mappings of one mapper instance
///
/// Not synchronized. Once a key is inserted its value never changes until the
/// whole cache is cleared.
#[derive(Debug, Default)]
pub struct TypeMappingCache {
    entries: FxHashMap<TypeId, TypeId>,
}

impl TypeMappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: TypeId) -> Option<TypeId> {
        self.entries.get(&source).copied()
    }

    pub fn insert(&mut self, source: TypeId, target: TypeId) {
        let previous = self.entries.insert(source, target);
        debug_assert!(
            previous.is_none_or(|p| p == target),
            "type mapping changed while cached"
        );
    }

    pub fn contains(&self, source: TypeId) -> bool {
        self.entries.contains_key(&source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
