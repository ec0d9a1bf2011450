//!
//! Bone name to integer ID table of the foreign-memory strategy.
//!

use bimap::BiHashMap;

use crate::base::{DeterministicState, NO_PARENT_BONE_ID};

/// Two-way bone name / bone ID table.
///
/// The empty name is bound to `NO_PARENT_BONE_ID` at construction. Every
/// other name gets the next unused ID the first time it is seen. IDs are
/// never reused.
#[derive(Debug)]
pub struct BoneRegistry {
    ids: BiHashMap<String, u32, DeterministicState, DeterministicState>,
    next_id: u32,
}

impl Default for BoneRegistry {
    fn default() -> BoneRegistry {
        BoneRegistry::new()
    }
}

impl BoneRegistry {
    pub fn new() -> BoneRegistry {
        let mut ids = BiHashMap::with_hashers(DeterministicState::new(), DeterministicState::new());
        ids.insert(String::new(), NO_PARENT_BONE_ID);
        BoneRegistry {
            ids,
            next_id: NO_PARENT_BONE_ID + 1,
        }
    }

    /// ID of `name`, assigning a new one if the name is unknown.
    pub fn id_or_insert(&mut self, name: &str) -> u32 {
        if let Some(id) = self.ids.get_by_left(name) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(name.to_string(), id);
        log::debug!("Bone {} registered with id {}", name, id);
        id
    }

    #[inline]
    pub fn id(&self, name: &str) -> Option<u32> {
        self.ids.get_by_left(name).copied()
    }

    #[inline]
    pub fn name(&self, id: u32) -> Option<&str> {
        self.ids.get_by_right(&id).map(String::as_str)
    }

    /// Number of bound names, the root parent included.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bone_registry() {
        let mut registry = BoneRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.id(""), Some(NO_PARENT_BONE_ID));
        assert_eq!(registry.id_or_insert(""), NO_PARENT_BONE_ID);

        let hips = registry.id_or_insert("hips");
        let spine = registry.id_or_insert("spine");
        assert_eq!(hips, 1);
        assert_eq!(spine, 2);
        assert_eq!(registry.id_or_insert("hips"), hips);
        assert_eq!(registry.name(spine), Some("spine"));
        assert_eq!(registry.id("hand"), None);
        assert_eq!(registry.name(99), None);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_registries_are_independent() {
        let mut a = BoneRegistry::new();
        let mut b = BoneRegistry::new();
        a.id_or_insert("hips");
        assert_eq!(a.id_or_insert("spine"), 2);
        assert_eq!(b.id_or_insert("spine"), 1);
    }
}
