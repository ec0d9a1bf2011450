//!
//! Base types, traits and utils.
//!

use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Skinning error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkinError {
    /// Model bone names and bone offsets have different lengths.
    #[error("Invalid model: {names} bone names, {offsets} bone offsets")]
    InvalidModel { names: usize, offsets: usize },
    /// An animated bone channel has no keyframe.
    #[error("Empty {channel} channel")]
    EmptyChannel { channel: &'static str },

    /// A static bone references a parent that is not part of the hierarchy.
    #[error("Orphan bone {bone}: parent {parent} not found")]
    OrphanBone { bone: String, parent: String },
    /// More than one bone has no parent.
    #[error("Multiple roots: {0} and {1}")]
    MultipleRoots(String, String),
    /// No bone without parent.
    #[error("No root bone")]
    NoRoot,

    /// Arena access outside the allocated region.
    #[error("Arena out of bounds: offset {offset}, size {size}")]
    ArenaOutOfBounds { offset: usize, size: usize },

    /// Invalid dancing entity parameters.
    #[error("Invalid entity: {0}")]
    InvalidEntity(&'static str),
    /// Unknown animation manager kind.
    #[error("Unknown manager: {0}")]
    UnknownManager(String),
}

impl SkinError {
    pub fn is_invalid_model(&self) -> bool {
        matches!(self, SkinError::InvalidModel { .. })
    }

    pub fn is_empty_channel(&self) -> bool {
        matches!(self, SkinError::EmptyChannel { .. })
    }

    pub fn is_orphan_bone(&self) -> bool {
        matches!(self, SkinError::OrphanBone { .. })
    }

    pub fn is_multiple_roots(&self) -> bool {
        matches!(self, SkinError::MultipleRoots(..))
    }

    pub fn is_no_root(&self) -> bool {
        matches!(self, SkinError::NoRoot)
    }

    pub fn is_arena_out_of_bounds(&self) -> bool {
        matches!(self, SkinError::ArenaOutOfBounds { .. })
    }

    pub fn is_invalid_entity(&self) -> bool {
        matches!(self, SkinError::InvalidEntity(_))
    }

    pub fn is_unknown_manager(&self) -> bool {
        matches!(self, SkinError::UnknownManager(_))
    }
}

/// Bone ID of the parent of the root bone (which has no parent in fact).
/// The empty bone name is bound to this ID, evaluating it yields identity.
pub const NO_PARENT_BONE_ID: u32 = 0;

/// Number of floats in one bone matrix of an `AnimationResult`.
pub const MATRIX_FLOATS: usize = 16;

/// A hasher builder that creates `DefaultHasher` with default keys.
///
/// Bone maps iterate in the same order on every run, so bone IDs assigned by
/// the foreign-memory manager are reproducible.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicState;

impl DeterministicState {
    /// Creates a new `DeterministicState` that builds `DefaultHasher` with default keys.
    pub const fn new() -> DeterministicState {
        DeterministicState
    }
}

impl BuildHasher for DeterministicState {
    type Hasher = DefaultHasher;

    fn build_hasher(&self) -> DefaultHasher {
        DefaultHasher::default()
    }
}

#[inline(always)]
pub(crate) fn align_usize(size: usize, align: usize) -> usize {
    assert!(align.is_power_of_two());
    (size + align - 1) & !(align - 1)
}

/// Represents a reference to a shared skinning resource.
/// `T` usually is `Animation` or `ModelData`.
///
/// We use `SkinObj` to support `T`, `&T`, `Rc<T>` and `Arc<T>` at same time.
/// Or you can implement this trait to support your own reference type.
pub trait SkinObj<T: Debug> {
    fn obj(&self) -> &T;
}

impl<T: Debug> SkinObj<T> for T {
    #[inline(always)]
    fn obj(&self) -> &T {
        self
    }
}

impl<T: Debug> SkinObj<T> for &T {
    #[inline(always)]
    fn obj(&self) -> &T {
        self
    }
}

impl<T: Debug> SkinObj<T> for Rc<T> {
    #[inline(always)]
    fn obj(&self) -> &T {
        self.as_ref()
    }
}

impl<T: Debug> SkinObj<T> for Arc<T> {
    #[inline(always)]
    fn obj(&self) -> &T {
        self.as_ref()
    }
}
