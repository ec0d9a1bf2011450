//!
//! Native side of the foreign-memory strategy.
//!
//! Everything here works on arena addresses only: it never sees an
//! `Animation` or a `ModelData`. Errors are not returned but reported
//! through a numeric alert channel, and evaluation carries on.
//!

use glam::Mat4;

use crate::animation::{loop_time, KeyframeValue};
use crate::arena::{Arena, ArenaSlice};
use crate::base::{MATRIX_FLOATS, NO_PARENT_BONE_ID};
use crate::foreign_layout::{
    AnimatedBoneRecord, AnimationHeader, KeyRecord, MatrixRecord, ModelHeader, PositionKeyRecord, RotationKeyRecord,
    ScalingKeyRecord, StaticBoneRecord,
};
use crate::math::{lerp_slice, mat4_from_rotation_translation_scale};

pub const ERR_NULLPTR: u32 = 0;
pub const ERR_DEBUGMSG: u32 = 1;
pub const ERR_NOTFOUND: u32 = 2;

const ALERT_MESSAGES: [&str; 3] = ["null pointer access", "debug message", "value not found"];

/// Message of an alert code, `None` for unknown codes.
pub fn alert_message(code: u32) -> Option<&'static str> {
    ALERT_MESSAGES.get(code as usize).copied()
}

/// One report on the alert channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub code: u32,
    pub line: u32,
    pub aux: u32,
}

/// Alerts raised so far.
#[derive(Debug, Default, Clone)]
pub struct AlertLog {
    count: usize,
    last: Option<Alert>,
}

impl AlertLog {
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn last(&self) -> Option<Alert> {
        self.last
    }
}

/// Samples keyframe records the same way `sample_channel` samples keyframes,
/// with a binary search for the interval.
pub fn sample_keys<R: KeyRecord>(keys: &[R], time: f32) -> Option<R::Value> {
    let len = keys.len();
    match len {
        0 => return None,
        1 => return Some(keys[0].value()),
        _ => {}
    }

    let period = keys[len - 1].time();
    if !(period > 0.0) {
        return Some(keys[0].value());
    }

    let t = loop_time(time, period);
    let idx = keys.partition_point(|k| k.time() <= t).saturating_sub(1).min(len - 2);
    let left = &keys[idx];
    let right = &keys[idx + 1];
    let interval = right.time() - left.time();
    if !(interval > 0.0) {
        return Some(left.value());
    }
    let ratio = (t - left.time()) / interval;
    Some(R::Value::interpolate(left.value(), right.value(), ratio))
}

/// Evaluation routines over marshalled animations and models.
#[derive(Debug, Default)]
pub struct ForeignModule {
    alerts: AlertLog,
}

impl ForeignModule {
    pub fn new() -> ForeignModule {
        ForeignModule::default()
    }

    #[inline]
    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    /// Reports an error with the source line it was raised at and an auxiliary value.
    pub fn alert_error(&mut self, code: u32, line: u32, aux: u32) {
        match alert_message(code) {
            Some(message) => log::error!("Foreign module alert {} ({}) at line {}, aux {}", code, message, line, aux),
            None => log::error!("Foreign module alert {} (unknown code) at line {}, aux {}", code, line, aux),
        }
        self.alerts.count += 1;
        self.alerts.last = Some(Alert { code, line, aux });
    }

    /// Writes the skinned matrix of every model bone into `out`.
    pub fn get_single_animation(&mut self, arena: &mut Arena, out: ArenaSlice<f32>, animation: u32, model: u32, time: f32) {
        let Some((header, model_header)) = self.read_headers(arena, out, animation, model) else {
            return;
        };

        for idx in 0..model_header.num_bones as usize {
            let Some((id, offset)) = self.model_bone(arena, &model_header, idx) else {
                return;
            };
            let world = self.animated_node_transform(arena, &header, time, id, 0);
            let skinned = world * offset;
            if arena.write(out, idx * MATRIX_FLOATS, &skinned.to_cols_array()).is_err() {
                self.alert_error(ERR_NULLPTR, line!(), idx as u32);
                return;
            }
        }
    }

    /// Writes the element-wise blend of two skinned evaluations into `out`.
    pub fn get_blended_animation(
        &mut self,
        arena: &mut Arena,
        out: ArenaSlice<f32>,
        animations: [u32; 2],
        model: u32,
        times: [f32; 2],
        blend_factor: f32,
    ) {
        let Some((first, model_header)) = self.read_headers(arena, out, animations[0], model) else {
            return;
        };
        let Some((second, _)) = self.read_headers(arena, out, animations[1], model) else {
            return;
        };

        for idx in 0..model_header.num_bones as usize {
            let Some((id, offset)) = self.model_bone(arena, &model_header, idx) else {
                return;
            };
            let m1 = self.animated_node_transform(arena, &first, times[0], id, 0) * offset;
            let m2 = self.animated_node_transform(arena, &second, times[1], id, 0) * offset;
            let mut blended = [0.0; MATRIX_FLOATS];
            lerp_slice(&m1.to_cols_array(), &m2.to_cols_array(), blend_factor, &mut blended);
            if arena.write(out, idx * MATRIX_FLOATS, &blended).is_err() {
                self.alert_error(ERR_NULLPTR, line!(), idx as u32);
                return;
            }
        }
    }

    fn read_headers(
        &mut self,
        arena: &Arena,
        out: ArenaSlice<f32>,
        animation: u32,
        model: u32,
    ) -> Option<(AnimationHeader, ModelHeader)> {
        if out.is_null() {
            self.alert_error(ERR_NULLPTR, line!(), 0);
            return None;
        }
        if animation == 0 {
            self.alert_error(ERR_NULLPTR, line!(), 0);
            return None;
        }
        if model == 0 {
            self.alert_error(ERR_NULLPTR, line!(), 0);
            return None;
        }

        let header = match arena.read::<AnimationHeader>(animation) {
            Ok(header) => header,
            Err(_) => {
                self.alert_error(ERR_NULLPTR, line!(), animation);
                return None;
            }
        };
        let model_header = match arena.read::<ModelHeader>(model) {
            Ok(header) => header,
            Err(_) => {
                self.alert_error(ERR_NULLPTR, line!(), model);
                return None;
            }
        };
        if model_header.num_bones > 0 && model_header.bone_offsets == 0 {
            self.alert_error(ERR_NULLPTR, line!(), model);
            return None;
        }
        if out.len() < model_header.num_bones as usize * MATRIX_FLOATS {
            self.alert_error(ERR_NULLPTR, line!(), out.len() as u32);
            return None;
        }
        Some((header, model_header))
    }

    fn model_bone(&mut self, arena: &Arena, header: &ModelHeader, idx: usize) -> Option<(u32, Mat4)> {
        let ids = ArenaSlice::<u32>::new(header.bone_ids, header.num_bones);
        let offsets = ArenaSlice::<MatrixRecord>::new(header.bone_offsets, header.num_bones);
        match (arena.get(ids, idx), arena.get(offsets, idx)) {
            (Ok(id), Ok(offset)) => Some((id, Mat4::from_cols_array(&offset))),
            _ => {
                self.alert_error(ERR_NULLPTR, line!(), idx as u32);
                None
            }
        }
    }

    fn animated_node_transform(
        &mut self,
        arena: &Arena,
        header: &AnimationHeader,
        time: f32,
        id: u32,
        depth: u32,
    ) -> Mat4 {
        if id == NO_PARENT_BONE_ID {
            return Mat4::IDENTITY;
        }
        if depth > header.num_static_bones {
            // Parent chain longer than the hierarchy: it loops.
            self.alert_error(ERR_DEBUGMSG, line!(), id);
            return Mat4::IDENTITY;
        }

        let statics = ArenaSlice::<StaticBoneRecord>::new(header.static_bones, header.num_static_bones);
        let static_bone = match arena.slice(statics) {
            Ok(bones) => match bones.binary_search_by_key(&id, |b| b.id) {
                Ok(pos) => bones[pos],
                Err(_) => {
                    self.alert_error(ERR_NOTFOUND, line!(), id);
                    return Mat4::IDENTITY;
                }
            },
            Err(_) => {
                self.alert_error(ERR_NULLPTR, line!(), id);
                return Mat4::IDENTITY;
            }
        };

        let parent_transform = self.animated_node_transform(arena, header, time, static_bone.parent_id, depth + 1);

        let animated = ArenaSlice::<AnimatedBoneRecord>::new(header.animated_bones, header.num_animated_bones);
        let animated_bone = match arena.slice(animated) {
            Ok(bones) => bones
                .binary_search_by_key(&id, |b| b.id)
                .ok()
                .map(|pos| bones[pos]),
            Err(_) => {
                self.alert_error(ERR_NULLPTR, line!(), id);
                None
            }
        };

        match animated_bone {
            Some(bone) => parent_transform * self.transform_at_time(arena, &bone, time),
            None => parent_transform * static_bone.transform(),
        }
    }

    fn transform_at_time(&mut self, arena: &Arena, bone: &AnimatedBoneRecord, time: f32) -> Mat4 {
        let positions = ArenaSlice::<PositionKeyRecord>::new(bone.position_keys, bone.num_position_keys);
        let rotations = ArenaSlice::<RotationKeyRecord>::new(bone.rotation_keys, bone.num_rotation_keys);
        let scalings = ArenaSlice::<ScalingKeyRecord>::new(bone.scaling_keys, bone.num_scaling_keys);

        let position = arena.slice(positions).ok().and_then(|keys| sample_keys(keys, time));
        let rotation = arena.slice(rotations).ok().and_then(|keys| sample_keys(keys, time));
        let scale = arena.slice(scalings).ok().and_then(|keys| sample_keys(keys, time));
        match (position, rotation, scale) {
            (Some(position), Some(rotation), Some(scale)) => {
                mat4_from_rotation_translation_scale(rotation, position, scale)
            }
            _ => {
                self.alert_error(ERR_NULLPTR, line!(), bone.id);
                Mat4::IDENTITY
            }
        }
    }
}
