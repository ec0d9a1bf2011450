//!
//! Baked strategy: every associated (animation, model) pair is pre-computed
//! at a fixed frame rate into one growable cache.
//!

use std::collections::HashMap;
use std::mem;

use crate::animation::{loop_time, Animation};
use crate::base::DeterministicState;
use crate::manager::{blend_bone_data, check_association, AnimationManager, AnimationResult, ManagerKind};
use crate::model::ModelData;
use crate::naive_manager::NaiveAnimationManager;

pub const DEFAULT_FRAME_RATE: f32 = 60.0;

/// Upper bound of frames baked for one (animation, model) pair.
pub const MAX_BAKED_FRAMES: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq)]
struct BakedRange {
    /// Index of the first float of the first frame in the cache.
    first_frame: usize,
    num_frames: usize,
    /// Floats per frame.
    stride: usize,
    duration: f32,
}

/// Trades memory for lookups.
///
/// - Registering an animation or a model stores nothing.
/// - Association bakes one frame per `1 / frame_rate` seconds of the
///   animation. A failed association allocates nothing.
/// - Evaluation returns a borrowed view of the nearest baked frame, looping
///   over the animation duration.
/// - Resting memory is the size of the cache.
#[derive(Debug)]
pub struct BakedAnimationManager {
    frame_rate: f32,
    cache: Vec<f32>,
    ranges: HashMap<(u32, u32), BakedRange, DeterministicState>,
}

impl Default for BakedAnimationManager {
    fn default() -> BakedAnimationManager {
        BakedAnimationManager::new()
    }
}

impl BakedAnimationManager {
    pub fn new() -> BakedAnimationManager {
        BakedAnimationManager::with_frame_rate(DEFAULT_FRAME_RATE)
    }

    pub fn with_frame_rate(frame_rate: f32) -> BakedAnimationManager {
        let frame_rate = if frame_rate > 0.0 && frame_rate.is_finite() {
            frame_rate
        } else {
            log::warn!("Invalid frame rate {}, using {}", frame_rate, DEFAULT_FRAME_RATE);
            DEFAULT_FRAME_RATE
        };
        BakedAnimationManager {
            frame_rate,
            cache: Vec::new(),
            ranges: HashMap::with_hasher(DeterministicState::new()),
        }
    }

    #[inline]
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Number of frames baked for the pair, `None` if the pair is not associated.
    pub fn num_frames(&self, animation: &Animation, model: &ModelData) -> Option<usize> {
        self.ranges
            .get(&(animation.id(), model.id()))
            .map(|range| range.num_frames)
    }

    fn frames_for(&self, duration: f32) -> Option<usize> {
        if !(duration > 0.0) {
            return Some(1);
        }
        let frames = (duration * self.frame_rate).ceil();
        if frames.is_finite() && frames <= MAX_BAKED_FRAMES as f32 {
            Some((frames as usize).max(1))
        } else {
            None
        }
    }

    fn frame(&self, animation: &Animation, model: &ModelData, time: f32) -> Option<&[f32]> {
        let Some(range) = self.ranges.get(&(animation.id(), model.id())) else {
            log::error!(
                "Animation {} and model {} are not associated",
                animation.name(),
                model.name()
            );
            return None;
        };

        let t = if range.duration > 0.0 {
            loop_time(time, range.duration)
        } else {
            0.0
        };
        let idx = ((t * self.frame_rate).round() as usize) % range.num_frames;
        let start = range.first_frame + idx * range.stride;
        self.cache.get(start..start + range.stride)
    }
}

impl AnimationManager for BakedAnimationManager {
    fn register_animation(&mut self, _animation: &Animation) {}

    fn register_model(&mut self, _model: &ModelData) {}

    fn associate_model_and_animation(&mut self, animation: &Animation, model: &ModelData) -> bool {
        if !check_association(animation, model) {
            return false;
        }
        let key = (animation.id(), model.id());
        if self.ranges.contains_key(&key) {
            return true;
        }

        let stride = model.num_floats();
        let first_frame = self.cache.len();
        let cache_len = self
            .frames_for(animation.duration())
            .and_then(|num_frames| num_frames.checked_mul(stride).map(|floats| (num_frames, floats)))
            .and_then(|(num_frames, floats)| first_frame.checked_add(floats).map(|len| (num_frames, len)));
        let Some((num_frames, cache_len)) = cache_len else {
            log::error!(
                "Animation {} of {} seconds is too long to bake at {} fps",
                animation.name(),
                animation.duration(),
                self.frame_rate
            );
            return false;
        };
        self.cache.resize(cache_len, 0.0);
        for idx in 0..num_frames {
            let start = first_frame + idx * stride;
            let time = idx as f32 / self.frame_rate;
            NaiveAnimationManager::evaluate_into(animation, model, time, &mut self.cache[start..start + stride]);
        }

        log::debug!(
            "Baked {} frames of animation {} for model {}, cache {} bytes",
            num_frames,
            animation.name(),
            model.name(),
            self.resting_memory_usage()
        );
        self.ranges.insert(
            key,
            BakedRange {
                first_frame,
                num_frames,
                stride,
                duration: animation.duration(),
            },
        );
        true
    }

    fn get_single_animation(&mut self, animation: &Animation, model: &ModelData, time: f32) -> AnimationResult<'_> {
        match self.frame(animation, model, time) {
            Some(frame) => AnimationResult::borrowed(frame, 0),
            None => AnimationResult::empty(),
        }
    }

    fn get_blended_animation(
        &mut self,
        animations: [&Animation; 2],
        model: &ModelData,
        times: [f32; 2],
        blend_factor: f32,
    ) -> AnimationResult<'_> {
        let (Some(first), Some(second)) = (
            self.frame(animations[0], model, times[0]),
            self.frame(animations[1], model, times[1]),
        ) else {
            return AnimationResult::empty();
        };
        let bone_data = blend_bone_data(first, second, blend_factor);
        let extra = bone_data.len() * mem::size_of::<f32>();
        AnimationResult::owned(bone_data, extra)
    }

    fn resting_memory_usage(&self) -> usize {
        self.cache.len() * mem::size_of::<f32>()
    }

    fn kind(&self) -> ManagerKind {
        ManagerKind::Baked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_model, sample_walk_animation};
    use glam::Vec3;

    #[test]
    fn test_associate() {
        let animation = sample_walk_animation();
        let model = sample_model(&["root", "child"]);
        let mut manager = BakedAnimationManager::with_frame_rate(10.0);
        assert_eq!(manager.resting_memory_usage(), 0);

        assert!(manager.associate_model_and_animation(&animation, &model));
        assert_eq!(manager.num_frames(&animation, &model), Some(20));
        assert_eq!(manager.resting_memory_usage(), 20 * 32 * 4);

        assert!(manager.associate_model_and_animation(&animation, &model));
        assert_eq!(manager.resting_memory_usage(), 20 * 32 * 4);

        let bad = sample_model(&["root", "wing"]);
        assert!(!manager.associate_model_and_animation(&animation, &bad));
        assert_eq!(manager.num_frames(&animation, &bad), None);
        assert_eq!(manager.resting_memory_usage(), 20 * 32 * 4);
    }

    #[test]
    fn test_get_single_animation() {
        let animation = sample_walk_animation();
        let model = sample_model(&["root", "child"]);
        let mut manager = BakedAnimationManager::new();
        assert!(manager.get_single_animation(&animation, &model, 0.5).is_empty());

        assert!(manager.associate_model_and_animation(&animation, &model));
        let result = manager.get_single_animation(&animation, &model, 0.5);
        assert_eq!(result.extra_memory_usage, 0);
        let child = result.matrix(1).unwrap();
        assert!(child.w_axis.truncate().abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), 1e-4));

        let looped = manager.get_single_animation(&animation, &model, 2.5).into_owned();
        let first = manager.get_single_animation(&animation, &model, 0.5).into_owned();
        assert_eq!(looped, first);
    }

    #[test]
    fn test_get_blended_animation() {
        let animation = sample_walk_animation();
        let model = sample_model(&["root", "child"]);
        let mut manager = BakedAnimationManager::with_frame_rate(4.0);
        assert!(manager.associate_model_and_animation(&animation, &model));

        let result = manager.get_blended_animation([&animation, &animation], &model, [0.25, 0.75], 0.5);
        let root = result.matrix(0).unwrap();
        assert!(root.w_axis.truncate().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
        assert_eq!(result.extra_memory_usage, 32 * 4);
    }

    #[test]
    fn test_associate_too_long() {
        let model = sample_model(&["root"]);
        let mut manager = BakedAnimationManager::new();
        for duration in [f32::INFINITY, 1e30, MAX_BAKED_FRAMES as f32] {
            let mut animation = Animation::new("endless", duration);
            animation.insert_static_bone("root", None, glam::Mat4::IDENTITY);
            assert!(!manager.associate_model_and_animation(&animation, &model));
            assert_eq!(manager.num_frames(&animation, &model), None);
        }
        assert_eq!(manager.resting_memory_usage(), 0);
    }

    #[test]
    fn test_invalid_frame_rate() {
        assert_eq!(BakedAnimationManager::with_frame_rate(0.0).frame_rate(), DEFAULT_FRAME_RATE);
        assert_eq!(BakedAnimationManager::with_frame_rate(f32::NAN).frame_rate(), DEFAULT_FRAME_RATE);
        assert_eq!(BakedAnimationManager::with_frame_rate(24.0).frame_rate(), 24.0);
    }
}
