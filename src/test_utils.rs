//!
//! Helpers shared by unit tests, integration tests and benchmarks:
//! small sample rigs and a bone data comparison.
//!

use glam::{Mat4, Quat, Vec3};

use crate::animation::{AnimatedBone, Animation, Keyframe};
use crate::math::{mat4_invert, quat_from_axis_angle};
use crate::model::ModelData;

/// Indices where two bone data buffers differ by more than `tolerance`.
///
/// The difference is relative, `|a - b| / |a + b| / 2`, and only checked
/// where both values are non-zero. Indices past the shorter buffer always
/// count as mismatches.
pub fn compare_bone_data(a: &[f32], b: &[f32], tolerance: f32) -> Vec<usize> {
    let mut mismatches = Vec::new();
    for (idx, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        if *x != 0.0 && *y != 0.0 {
            let diff = ((x - y).abs() / (x + y).abs()) / 2.0;
            if !(diff <= tolerance) {
                mismatches.push(idx);
            }
        }
    }
    mismatches.extend(a.len().min(b.len())..a.len().max(b.len()));
    mismatches
}

/// Two-bone animation of 2 seconds.
///
/// `root` moves from (0, 0, 0) to (10, 0, 0) over its first second, looping
/// every second. `child` sits statically at (0, 1, 0) under `root`.
pub fn sample_walk_animation() -> Animation {
    let mut animation = Animation::new("walk", 2.0);
    animation.insert_static_bone("root", None, Mat4::IDENTITY);
    animation.insert_static_bone("child", Some("root"), Mat4::from_translation(Vec3::Y));

    let root = AnimatedBone::new(
        vec![
            Keyframe::new(0.0, Vec3::ZERO),
            Keyframe::new(1.0, Vec3::new(10.0, 0.0, 0.0)),
        ],
        vec![Keyframe::new(0.0, Quat::IDENTITY)],
        vec![Keyframe::new(0.0, Vec3::ONE)],
    )
    .unwrap();
    animation.insert_animated_bone("root", root);
    animation
}

/// Bind transforms of the `sample_rig_animation` hierarchy, parent-relative.
pub const RIG_BONES: [(&str, Option<&str>, [f32; 3]); 5] = [
    ("hips", None, [0.0, 1.0, 0.0]),
    ("spine", Some("hips"), [0.0, 0.5, 0.0]),
    ("arm", Some("spine"), [0.4, 0.3, 0.0]),
    ("hand", Some("arm"), [0.5, 0.0, 0.0]),
    ("leg", Some("hips"), [0.2, -0.5, 0.0]),
];

/// Five-bone looping animation with translation, rotation and scale keys.
///
/// `phase` shifts the key values so that different animations of the same
/// rig can be told apart.
pub fn sample_rig_animation(name: &str, duration: f32, phase: f32) -> Animation {
    let mut animation = Animation::new(name, duration);
    for (bone, parent, offset) in RIG_BONES.iter() {
        animation.insert_static_bone(*bone, *parent, Mat4::from_translation(Vec3::from(*offset)));
    }

    let third = duration / 3.0;
    let hips = AnimatedBone::new(
        vec![
            Keyframe::new(duration, Vec3::new(0.0, 1.0, 2.0 + phase)),
            Keyframe::new(0.0, Vec3::new(0.0, 1.0, phase)),
            Keyframe::new(third, Vec3::new(0.1, 1.1, 0.7 + phase)),
        ],
        vec![
            Keyframe::new(0.0, quat_from_axis_angle(Vec3::Y, phase)),
            Keyframe::new(duration, quat_from_axis_angle(Vec3::Y, phase + 0.6)),
        ],
        vec![Keyframe::new(0.0, Vec3::ONE)],
    )
    .unwrap();
    let arm = AnimatedBone::new(
        vec![Keyframe::new(0.0, Vec3::new(0.4, 0.3, 0.0))],
        vec![
            Keyframe::new(0.0, quat_from_axis_angle(Vec3::Z, 0.2 + phase)),
            Keyframe::new(third, quat_from_axis_angle(Vec3::new(1.0, 0.0, 1.0), 1.1 + phase)),
            Keyframe::new(2.0 * third, quat_from_axis_angle(Vec3::X, -0.4)),
            Keyframe::new(duration, quat_from_axis_angle(Vec3::Z, 0.2 + phase)),
        ],
        vec![
            Keyframe::new(0.0, Vec3::ONE),
            Keyframe::new(duration * 0.5, Vec3::new(1.0, 1.2 + phase * 0.1, 1.0)),
            Keyframe::new(duration, Vec3::ONE),
        ],
    )
    .unwrap();
    animation.insert_animated_bone("hips", hips);
    animation.insert_animated_bone("arm", arm);
    animation
}

/// Model over `bones` with identity bind offsets.
pub fn sample_model(bones: &[&str]) -> ModelData {
    let names = bones.iter().map(|name| name.to_string()).collect::<Vec<_>>();
    let offsets = vec![Mat4::IDENTITY; names.len()];
    ModelData::new("sample", names, offsets).unwrap()
}

/// Model over the `sample_rig_animation` bones, with the inverse bind pose as offsets.
pub fn sample_rig_model() -> ModelData {
    let mut names = Vec::new();
    let mut offsets = Vec::new();
    for (idx, (bone, _, _)) in RIG_BONES.iter().enumerate().rev() {
        let mut bind = Mat4::IDENTITY;
        let mut current = Some(idx);
        while let Some(i) = current {
            let (_, parent, offset) = RIG_BONES[i];
            bind = Mat4::from_translation(Vec3::from(offset)) * bind;
            current = parent.and_then(|p| RIG_BONES.iter().position(|(name, _, _)| *name == p));
        }
        names.push(bone.to_string());
        offsets.push(mat4_invert(&bind).unwrap_or(Mat4::IDENTITY));
    }
    ModelData::new("rig", names, offsets).unwrap()
}
