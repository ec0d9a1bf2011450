//!
//! Animation data structure definition.
//!

use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::base::{DeterministicState, SkinError};
use crate::math::{mat4_from_rotation_translation_scale, quat_slerp, vec3_lerp};

/// Value type that can be stored in a keyframe channel.
pub trait KeyframeValue
where
    Self: Debug + Copy + Clone + PartialEq,
{
    /// Interpolation between two neighbouring keyframe values.
    fn interpolate(a: Self, b: Self, t: f32) -> Self;
}

impl KeyframeValue for Vec3 {
    #[inline]
    fn interpolate(a: Vec3, b: Vec3, t: f32) -> Vec3 {
        vec3_lerp(a, b, t)
    }
}

impl KeyframeValue for Quat {
    #[inline]
    fn interpolate(a: Quat, b: Quat, t: f32) -> Quat {
        quat_slerp(a, b, t)
    }
}

/// A value at a point in time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe<T: KeyframeValue> {
    pub time: f32,
    pub value: T,
}

impl<T: KeyframeValue> Keyframe<T> {
    #[inline]
    pub fn new(time: f32, value: T) -> Keyframe<T> {
        Keyframe { time, value }
    }
}

pub type PositionKeyframe = Keyframe<Vec3>;
pub type RotationKeyframe = Keyframe<Quat>;
pub type ScalingKeyframe = Keyframe<Vec3>;

/// Wraps `time` into `[0, period)`, negative times included.
#[inline]
pub(crate) fn loop_time(time: f32, period: f32) -> f32 {
    let t = time % period;
    if t < 0.0 {
        return t + period;
    }
    t
}

/// Samples a time sorted channel at `time`.
///
/// Channels loop over their last keyframe time. A single keyframe is returned
/// as is, whatever the time. The interpolation ratio is not clamped, so a time
/// before the first keyframe extrapolates from the first interval.
///
/// Returns `None` for an empty channel.
pub fn sample_channel<T: KeyframeValue>(channel: &[Keyframe<T>], time: f32) -> Option<T> {
    let len = channel.len();
    match len {
        0 => return None,
        1 => return Some(channel[0].value),
        _ => {}
    }

    let period = channel[len - 1].time;
    if !(period > 0.0) {
        return Some(channel[0].value);
    }

    let t = loop_time(time, period);
    let mut idx = 0;
    while idx + 2 < len && channel[idx].time <= t && channel[idx + 1].time <= t {
        idx += 1;
    }

    let left = &channel[idx];
    let right = &channel[idx + 1];
    let interval = right.time - left.time;
    if !(interval > 0.0) {
        return Some(left.value);
    }
    let ratio = (t - left.time) / interval;
    Some(T::interpolate(left.value, right.value, ratio))
}

/// Bone whose parent-relative transform is driven by keyframes.
///
/// Each channel holds at least one keyframe and is sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedBone {
    position: Vec<PositionKeyframe>,
    rotation: Vec<RotationKeyframe>,
    scaling: Vec<ScalingKeyframe>,
}

impl AnimatedBone {
    /// Builds an animated bone, sorting every channel by time.
    pub fn new(
        mut position: Vec<PositionKeyframe>,
        mut rotation: Vec<RotationKeyframe>,
        mut scaling: Vec<ScalingKeyframe>,
    ) -> Result<AnimatedBone, SkinError> {
        if position.is_empty() {
            return Err(SkinError::EmptyChannel { channel: "position" });
        }
        if rotation.is_empty() {
            return Err(SkinError::EmptyChannel { channel: "rotation" });
        }
        if scaling.is_empty() {
            return Err(SkinError::EmptyChannel { channel: "scaling" });
        }

        position.sort_by(|a, b| a.time.total_cmp(&b.time));
        rotation.sort_by(|a, b| a.time.total_cmp(&b.time));
        scaling.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(AnimatedBone {
            position,
            rotation,
            scaling,
        })
    }

    #[inline]
    pub fn position_channel(&self) -> &[PositionKeyframe] {
        &self.position
    }

    #[inline]
    pub fn rotation_channel(&self) -> &[RotationKeyframe] {
        &self.rotation
    }

    #[inline]
    pub fn scaling_channel(&self) -> &[ScalingKeyframe] {
        &self.scaling
    }

    /// Interpolated position, rotation and scale at `time`.
    pub fn sample(&self, time: f32) -> (Vec3, Quat, Vec3) {
        let position = sample_channel(&self.position, time).unwrap_or(Vec3::ZERO);
        let rotation = sample_channel(&self.rotation, time).unwrap_or(Quat::IDENTITY);
        let scale = sample_channel(&self.scaling, time).unwrap_or(Vec3::ONE);
        (position, rotation, scale)
    }

    /// Parent-relative transform at `time`.
    pub fn transform_at(&self, time: f32) -> Mat4 {
        let (position, rotation, scale) = self.sample(time);
        mat4_from_rotation_translation_scale(rotation, position, scale)
    }
}

/// Bone of the hierarchy with its fixed parent-relative transform.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticBone {
    pub parent: Option<String>,
    pub transform: Mat4,
}

static NEXT_ANIMATION_ID: AtomicU32 = AtomicU32::new(1);

/// A bone hierarchy plus the keyframe channels of its animated bones.
///
/// Every animation gets a process-unique id at construction. Evaluation
/// strategies key their caches by this id.
#[derive(Debug)]
pub struct Animation {
    id: u32,
    name: String,
    duration: f32,
    static_bones: HashMap<String, StaticBone, DeterministicState>,
    animated_bones: HashMap<String, AnimatedBone, DeterministicState>,
}

impl Animation {
    pub fn new(name: impl Into<String>, duration: f32) -> Animation {
        Animation {
            id: NEXT_ANIMATION_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            duration,
            static_bones: HashMap::with_hasher(DeterministicState::new()),
            animated_bones: HashMap::with_hasher(DeterministicState::new()),
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Duration in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[inline]
    pub fn static_bones(&self) -> &HashMap<String, StaticBone, DeterministicState> {
        &self.static_bones
    }

    #[inline]
    pub fn animated_bones(&self) -> &HashMap<String, AnimatedBone, DeterministicState> {
        &self.animated_bones
    }

    #[inline]
    pub fn static_bone(&self, name: &str) -> Option<&StaticBone> {
        self.static_bones.get(name)
    }

    #[inline]
    pub fn animated_bone(&self, name: &str) -> Option<&AnimatedBone> {
        self.animated_bones.get(name)
    }

    /// Whether `name` is a static or an animated bone of this animation.
    #[inline]
    pub fn has_bone(&self, name: &str) -> bool {
        self.static_bones.contains_key(name) || self.animated_bones.contains_key(name)
    }

    /// Adds a bone to the hierarchy. A duplicated name replaces the previous bone.
    pub fn insert_static_bone(&mut self, name: impl Into<String>, parent: Option<&str>, transform: Mat4) {
        let name = name.into();
        if name.is_empty() {
            log::error!("Animation {}: empty bone name is reserved for the root parent", self.name);
            return;
        }
        let bone = StaticBone {
            parent: parent.filter(|p| !p.is_empty()).map(str::to_string),
            transform,
        };
        if self.static_bones.insert(name.clone(), bone).is_some() {
            log::error!("Animation {}: duplicate static bone {}, last one wins", self.name, name);
        }
    }

    /// Attaches keyframe channels to a bone. A duplicated name replaces the previous channels.
    pub fn insert_animated_bone(&mut self, name: impl Into<String>, bone: AnimatedBone) {
        let name = name.into();
        if name.is_empty() {
            log::error!("Animation {}: empty bone name is reserved for the root parent", self.name);
            return;
        }
        if self.animated_bones.insert(name.clone(), bone).is_some() {
            log::error!("Animation {}: duplicate animated bone {}, last one wins", self.name, name);
        }
    }

    /// Name of a bone without parent, if any.
    pub fn root(&self) -> Option<&str> {
        self.static_bones
            .iter()
            .find(|(_, bone)| bone.parent.is_none())
            .map(|(name, _)| name.as_str())
    }

    /// Checks the hierarchy: parents must be known bones and exactly one bone is the root.
    pub fn validate(&self) -> Result<(), SkinError> {
        let mut roots: Vec<&str> = Vec::new();
        for (name, bone) in self.static_bones.iter() {
            match &bone.parent {
                None => roots.push(name),
                Some(parent) if !self.static_bones.contains_key(parent) => {
                    return Err(SkinError::OrphanBone {
                        bone: name.clone(),
                        parent: parent.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        roots.sort_unstable();
        match roots.as_slice() {
            [] => Err(SkinError::NoRoot),
            [_] => Ok(()),
            [first, second, ..] => Err(SkinError::MultipleRoots(first.to_string(), second.to_string())),
        }
    }

    pub(crate) fn from_raw(raw: AnimationRaw) -> Result<Animation, SkinError> {
        let mut animation = Animation::new(raw.name, raw.duration);
        for (name, bone) in raw.static_bones {
            animation.insert_static_bone(name, bone.parent.as_deref(), bone.transform);
        }
        for (name, bone) in raw.animated_bones {
            let bone = AnimatedBone::new(bone.position, bone.rotation, bone.scaling)?;
            animation.insert_animated_bone(name, bone);
        }
        Ok(animation)
    }

    pub(crate) fn to_raw(&self) -> AnimationRaw {
        AnimationRaw {
            name: self.name.clone(),
            duration: self.duration,
            static_bones: self
                .static_bones
                .iter()
                .map(|(name, bone)| (name.clone(), bone.clone()))
                .collect(),
            animated_bones: self
                .animated_bones
                .iter()
                .map(|(name, bone)| (name.clone(), bone.to_raw()))
                .collect(),
        }
    }
}

impl AnimatedBone {
    fn to_raw(&self) -> AnimatedBoneRaw {
        AnimatedBoneRaw {
            position: self.position.clone(),
            rotation: self.rotation.clone(),
            scaling: self.scaling.clone(),
        }
    }
}

#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct AnimatedBoneRaw {
    pub position: Vec<PositionKeyframe>,
    pub rotation: Vec<RotationKeyframe>,
    pub scaling: Vec<ScalingKeyframe>,
}

#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct AnimationRaw {
    pub name: String,
    pub duration: f32,
    pub static_bones: std::collections::BTreeMap<String, StaticBone>,
    pub animated_bones: std::collections::BTreeMap<String, AnimatedBoneRaw>,
}

#[cfg(feature = "serde")]
const _: () = {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for AnimatedBone {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.to_raw().serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for AnimatedBone {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<AnimatedBone, D::Error> {
            let raw = AnimatedBoneRaw::deserialize(deserializer)?;
            AnimatedBone::new(raw.position, raw.rotation, raw.scaling).map_err(D::Error::custom)
        }
    }

    impl Serialize for Animation {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let raw = self.to_raw();
            raw.serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Animation {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Animation, D::Error> {
            let raw = AnimationRaw::deserialize(deserializer)?;
            Animation::from_raw(raw).map_err(D::Error::custom)
        }
    }
};
