//!
//! Evaluation engine interface shared by every skinning strategy.
//!

use glam::Mat4;
use std::borrow::Cow;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use crate::animation::Animation;
use crate::baked_manager::BakedAnimationManager;
use crate::base::{SkinError, MATRIX_FLOATS};
use crate::foreign_manager::ForeignAnimationManager;
use crate::math::lerp_slice;
use crate::model::ModelData;
use crate::naive_manager::NaiveAnimationManager;

/// Bone matrices of one evaluation.
///
/// `bone_data` holds one column-major 4x4 matrix per bone of the model, in the
/// model's bone order. Strategies that evaluate into an internal buffer return
/// a borrowed view of it: the view is only valid until the next call on the
/// same manager, which the borrow checker enforces through the lifetime.
///
/// `extra_memory_usage` is the transient memory in bytes used to produce this
/// result, on top of the manager's resting memory.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationResult<'a> {
    pub bone_data: Cow<'a, [f32]>,
    pub extra_memory_usage: usize,
}

impl<'a> AnimationResult<'a> {
    /// Result returned when an evaluation cannot be done. Nothing to render this frame.
    pub fn empty() -> AnimationResult<'static> {
        AnimationResult {
            bone_data: Cow::Owned(Vec::new()),
            extra_memory_usage: 0,
        }
    }

    pub fn owned(bone_data: Vec<f32>, extra_memory_usage: usize) -> AnimationResult<'static> {
        AnimationResult {
            bone_data: Cow::Owned(bone_data),
            extra_memory_usage,
        }
    }

    pub fn borrowed(bone_data: &'a [f32], extra_memory_usage: usize) -> AnimationResult<'a> {
        AnimationResult {
            bone_data: Cow::Borrowed(bone_data),
            extra_memory_usage,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bone_data.is_empty()
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.bone_data.len() / MATRIX_FLOATS
    }

    /// Matrix of the `idx`th model bone.
    pub fn matrix(&self, idx: usize) -> Option<Mat4> {
        let start = idx.checked_mul(MATRIX_FLOATS)?;
        let cols = self.bone_data.get(start..start.checked_add(MATRIX_FLOATS)?)?;
        Some(Mat4::from_cols_slice(cols))
    }

    /// Detaches the result from the manager that produced it.
    pub fn into_owned(self) -> AnimationResult<'static> {
        AnimationResult {
            bone_data: Cow::Owned(self.bone_data.into_owned()),
            extra_memory_usage: self.extra_memory_usage,
        }
    }
}

/// A skinning strategy.
///
/// None of the operations fail loudly: invalid or unregistered input is
/// logged and degrades to `false`, an empty result, or identity bones.
pub trait AnimationManager: Debug {
    /// Ingests an animation. Strategies may pre-process it or do nothing.
    fn register_animation(&mut self, animation: &Animation);

    /// Ingests a model. Registering the same model again only warns.
    fn register_model(&mut self, model: &ModelData);

    /// Checks that every bone of the model is a bone of the animation.
    /// Returns `false` on mismatch. On success a strategy may pre-compute data for the pair.
    fn associate_model_and_animation(&mut self, animation: &Animation, model: &ModelData) -> bool;

    /// Bone matrices of `animation` sampled at `time` for `model`.
    fn get_single_animation(&mut self, animation: &Animation, model: &ModelData, time: f32) -> AnimationResult<'_>;

    /// Blends two animations sampled at their own times.
    ///
    /// The blend is an element-wise interpolation of the two skinned matrix
    /// buffers, not a blend of translations, rotations and scales. It is an
    /// approximation, visibly wrong for large rotation differences.
    fn get_blended_animation(
        &mut self,
        animations: [&Animation; 2],
        model: &ModelData,
        times: [f32; 2],
        blend_factor: f32,
    ) -> AnimationResult<'_>;

    /// Long-lived memory held by the manager, in bytes.
    fn resting_memory_usage(&self) -> usize;

    fn kind(&self) -> ManagerKind;
}

/// Checks that every bone of `model` exists in `animation`.
pub fn check_association(animation: &Animation, model: &ModelData) -> bool {
    for name in model.bone_names() {
        if !animation.has_bone(name) {
            log::warn!(
                "Association failed: bone {} of model {} missing from animation {}",
                name,
                model.name(),
                animation.name()
            );
            return false;
        }
    }
    true
}

/// Element-wise blend of two bone matrix buffers.
pub(crate) fn blend_bone_data(first: &[f32], second: &[f32], blend_factor: f32) -> Vec<f32> {
    let mut out = vec![0.0; first.len().min(second.len())];
    lerp_slice(first, second, blend_factor, &mut out);
    out
}

/// Available skinning strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerKind {
    /// Re-evaluates everything from keyframes on every call.
    Naive,
    /// Marshals data into a linear arena and evaluates it there.
    Foreign,
    /// Pre-computes frames for every associated pair.
    Baked,
}

impl ManagerKind {
    pub const ALL: [ManagerKind; 3] = [ManagerKind::Naive, ManagerKind::Foreign, ManagerKind::Baked];

    pub fn name(&self) -> &'static str {
        match self {
            ManagerKind::Naive => "naive",
            ManagerKind::Foreign => "foreign",
            ManagerKind::Baked => "baked",
        }
    }
}

impl Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ManagerKind {
    type Err = SkinError;

    fn from_str(s: &str) -> Result<ManagerKind, SkinError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" | "naivejs" => Ok(ManagerKind::Naive),
            "foreign" | "naivewasm" => Ok(ManagerKind::Foreign),
            "baked" | "speedyjs" => Ok(ManagerKind::Baked),
            _ => Err(SkinError::UnknownManager(s.to_string())),
        }
    }
}

/// Creates a manager of the given kind with its default configuration.
pub fn new_manager(kind: ManagerKind) -> Box<dyn AnimationManager> {
    match kind {
        ManagerKind::Naive => Box::new(NaiveAnimationManager::new()),
        ManagerKind::Foreign => Box::new(ForeignAnimationManager::new()),
        ManagerKind::Baked => Box::new(BakedAnimationManager::new()),
    }
}
