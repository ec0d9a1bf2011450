//!
//! Naive strategy, re-evaluating the bone hierarchy from keyframes on every call.
//!

use glam::Mat4;
use std::mem;

use crate::animation::Animation;
use crate::base::MATRIX_FLOATS;
use crate::manager::{blend_bone_data, check_association, AnimationManager, AnimationResult, ManagerKind};
use crate::math::mat4_mul;
use crate::model::ModelData;

/// Transient floats of one local transform evaluation: position, rotation and scale.
const SAMPLE_FLOATS: usize = 10;

/// Recomputes every bone matrix on every request.
///
/// - Registering an animation or a model does nothing.
/// - Association only checks bone names.
/// - Evaluation walks from each model bone up to the root, interpolating
///   keyframes on the way. Nothing is cached between calls.
/// - Resting memory is 0.
#[derive(Debug, Default)]
pub struct NaiveAnimationManager {}

impl NaiveAnimationManager {
    pub fn new() -> NaiveAnimationManager {
        NaiveAnimationManager {}
    }

    /// World transform of bone `name` at `time`, composed from the root down.
    ///
    /// The empty name is the parent of the root and yields identity, so does
    /// an unknown bone (with a warning).
    pub fn animated_node_transform(animation: &Animation, time: f32, name: &str) -> Mat4 {
        Self::node_transform(animation, time, name, 0)
    }

    fn node_transform(animation: &Animation, time: f32, name: &str, depth: usize) -> Mat4 {
        if name.is_empty() {
            return Mat4::IDENTITY;
        }
        if depth > animation.static_bones().len() {
            log::error!("Bone hierarchy of animation {} loops at {}", animation.name(), name);
            return Mat4::IDENTITY;
        }

        let static_bone = match animation.static_bone(name) {
            Some(bone) => bone,
            None => {
                log::warn!("Bone {} not found in animation {}, using identity", name, animation.name());
                return Mat4::IDENTITY;
            }
        };

        let parent = static_bone.parent.as_deref().unwrap_or("");
        let parent_transform = Self::node_transform(animation, time, parent, depth + 1);
        match animation.animated_bone(name) {
            Some(animated) => mat4_mul(&parent_transform, &animated.transform_at(time)),
            None => mat4_mul(&parent_transform, &static_bone.transform),
        }
    }

    fn evaluate(animation: &Animation, model: &ModelData, time: f32) -> Vec<f32> {
        let mut bone_data = vec![0.0; model.num_floats()];
        Self::evaluate_into(animation, model, time, &mut bone_data);
        bone_data
    }

    /// Writes the skinned matrices of `model` into `out`, which holds `model.num_floats()` floats.
    pub(crate) fn evaluate_into(animation: &Animation, model: &ModelData, time: f32, out: &mut [f32]) {
        for (idx, (name, offset)) in model.bone_names().iter().zip(model.bone_offsets()).enumerate() {
            let world = Self::animated_node_transform(animation, time, name);
            let skinned = mat4_mul(&world, offset);
            let start = idx * MATRIX_FLOATS;
            skinned.write_cols_to_slice(&mut out[start..start + MATRIX_FLOATS]);
        }
    }

    fn single_extra_memory(model: &ModelData) -> usize {
        let buffer = model.num_floats() * mem::size_of::<f32>();
        buffer + (SAMPLE_FLOATS + MATRIX_FLOATS) * mem::size_of::<f32>()
    }
}

impl AnimationManager for NaiveAnimationManager {
    fn register_animation(&mut self, _animation: &Animation) {}

    fn register_model(&mut self, _model: &ModelData) {}

    fn associate_model_and_animation(&mut self, animation: &Animation, model: &ModelData) -> bool {
        check_association(animation, model)
    }

    fn get_single_animation(&mut self, animation: &Animation, model: &ModelData, time: f32) -> AnimationResult<'_> {
        let bone_data = Self::evaluate(animation, model, time);
        AnimationResult::owned(bone_data, Self::single_extra_memory(model))
    }

    fn get_blended_animation(
        &mut self,
        animations: [&Animation; 2],
        model: &ModelData,
        times: [f32; 2],
        blend_factor: f32,
    ) -> AnimationResult<'_> {
        let first = Self::evaluate(animations[0], model, times[0]);
        let second = Self::evaluate(animations[1], model, times[1]);
        let bone_data = blend_bone_data(&first, &second, blend_factor);

        let extra = Self::single_extra_memory(model) * 2 + bone_data.len() * mem::size_of::<f32>();
        AnimationResult::owned(bone_data, extra)
    }

    fn resting_memory_usage(&self) -> usize {
        0
    }

    fn kind(&self) -> ManagerKind {
        ManagerKind::Naive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_model, sample_walk_animation};
    use glam::Vec3;

    #[test]
    fn test_animated_node_transform() {
        let animation = sample_walk_animation();
        assert_eq!(
            NaiveAnimationManager::animated_node_transform(&animation, 0.5, ""),
            Mat4::IDENTITY
        );
        assert_eq!(
            NaiveAnimationManager::animated_node_transform(&animation, 0.5, "tail"),
            Mat4::IDENTITY
        );

        let root = NaiveAnimationManager::animated_node_transform(&animation, 0.5, "root");
        assert!(root.w_axis.truncate().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
        let child = NaiveAnimationManager::animated_node_transform(&animation, 0.5, "child");
        assert!(child.w_axis.truncate().abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_get_single_animation() {
        let animation = sample_walk_animation();
        let model = sample_model(&["root", "child"]);
        let mut manager = NaiveAnimationManager::new();
        manager.register_animation(&animation);
        manager.register_model(&model);
        assert!(manager.associate_model_and_animation(&animation, &model));

        let result = manager.get_single_animation(&animation, &model, 0.5);
        assert_eq!(result.num_bones(), 2);
        assert_eq!(result.extra_memory_usage, 32 * 4 + 26 * 4);
        let child = result.matrix(1).unwrap();
        assert!(child.w_axis.truncate().abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), 1e-5));
        assert_eq!(manager.resting_memory_usage(), 0);
    }

    #[test]
    fn test_get_blended_animation() {
        let animation = sample_walk_animation();
        let model = sample_model(&["root", "child"]);
        let mut manager = NaiveAnimationManager::new();

        let result = manager.get_blended_animation([&animation, &animation], &model, [0.25, 0.75], 0.5);
        let root = result.matrix(0).unwrap();
        assert!(root.w_axis.truncate().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
        assert_eq!(result.extra_memory_usage, (32 * 4 + 26 * 4) * 2 + 32 * 4);
    }

    #[test]
    fn test_looping_hierarchy() {
        let mut animation = Animation::new("loop", 1.0);
        animation.insert_static_bone("a", Some("b"), Mat4::IDENTITY);
        animation.insert_static_bone("b", Some("a"), Mat4::IDENTITY);
        assert_eq!(
            NaiveAnimationManager::animated_node_transform(&animation, 0.0, "a"),
            Mat4::IDENTITY
        );
    }

    #[test]
    fn test_association_failure() {
        let animation = sample_walk_animation();
        let model = sample_model(&["root", "hand"]);
        let mut manager = NaiveAnimationManager::new();
        assert!(!manager.associate_model_and_animation(&animation, &model));
    }
}
