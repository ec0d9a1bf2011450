//!
//! Fixed-size records of animations and models marshalled into an `Arena`.
//!
//! Every field is 4 bytes wide so records pack without padding. Offsets are
//! arena addresses of the first element of a sub-table.
//!

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use static_assertions::const_assert_eq;
use std::mem;

use crate::animation::{Keyframe, KeyframeValue};

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AnimationHeader {
    pub duration: f32,
    pub num_static_bones: u32,
    pub static_bones: u32,
    pub num_animated_bones: u32,
    pub animated_bones: u32,
}
const_assert_eq!(mem::size_of::<AnimationHeader>(), 20);

/// A bone of the hierarchy. Sorted by `id` in its table.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StaticBoneRecord {
    pub id: u32,
    pub parent_id: u32,
    pub transform: [f32; 16],
}
const_assert_eq!(mem::size_of::<StaticBoneRecord>(), 72);

/// Keyframe channels of an animated bone. Sorted by `id` in its table.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AnimatedBoneRecord {
    pub id: u32,
    pub num_position_keys: u32,
    pub position_keys: u32,
    pub num_rotation_keys: u32,
    pub rotation_keys: u32,
    pub num_scaling_keys: u32,
    pub scaling_keys: u32,
}
const_assert_eq!(mem::size_of::<AnimatedBoneRecord>(), 28);

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vec3KeyRecord {
    pub time: f32,
    pub value: [f32; 3],
}
const_assert_eq!(mem::size_of::<Vec3KeyRecord>(), 16);

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuatKeyRecord {
    pub time: f32,
    pub value: [f32; 4],
}
const_assert_eq!(mem::size_of::<QuatKeyRecord>(), 20);

pub type PositionKeyRecord = Vec3KeyRecord;
pub type RotationKeyRecord = QuatKeyRecord;
pub type ScalingKeyRecord = Vec3KeyRecord;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelHeader {
    pub num_bones: u32,
    pub bone_ids: u32,
    pub bone_offsets: u32,
}
const_assert_eq!(mem::size_of::<ModelHeader>(), 12);

/// Bind-pose offset matrix, column-major.
pub type MatrixRecord = [f32; 16];

/// A keyframe record as stored in the arena.
pub trait KeyRecord: Pod {
    type Value: KeyframeValue;

    fn time(&self) -> f32;
    fn value(&self) -> Self::Value;
}

impl KeyRecord for Vec3KeyRecord {
    type Value = Vec3;

    #[inline]
    fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    fn value(&self) -> Vec3 {
        Vec3::from(self.value)
    }
}

impl KeyRecord for QuatKeyRecord {
    type Value = Quat;

    #[inline]
    fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    fn value(&self) -> Quat {
        Quat::from_array(self.value)
    }
}

impl From<&Keyframe<Vec3>> for Vec3KeyRecord {
    fn from(key: &Keyframe<Vec3>) -> Vec3KeyRecord {
        Vec3KeyRecord {
            time: key.time,
            value: key.value.to_array(),
        }
    }
}

impl From<&Keyframe<Quat>> for QuatKeyRecord {
    fn from(key: &Keyframe<Quat>) -> QuatKeyRecord {
        QuatKeyRecord {
            time: key.time,
            value: key.value.to_array(),
        }
    }
}

impl StaticBoneRecord {
    pub fn new(id: u32, parent_id: u32, transform: &Mat4) -> StaticBoneRecord {
        StaticBoneRecord {
            id,
            parent_id,
            transform: transform.to_cols_array(),
        }
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array(&self.transform)
    }
}
