#![allow(unused_imports)]
#![allow(dead_code)]

use glam::Mat4;
use skin_anim_rs::test_utils::compare_bone_data;
use skin_anim_rs::*;

pub const FRAME_RATE: f32 = 60.0;
pub const TOLERANCE: f32 = 0.05;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Times of the first `count` frames at `FRAME_RATE`.
pub fn frame_times(count: usize) -> Vec<f32> {
    (0..count).map(|idx| idx as f32 / FRAME_RATE).collect()
}

/// One manager of every kind, each with `animations` and `model` registered and associated.
pub fn prepared_managers(animations: &[&Animation], model: &ModelData) -> Vec<Box<dyn AnimationManager>> {
    ManagerKind::ALL
        .iter()
        .map(|kind| {
            let mut manager = new_manager(*kind);
            manager.register_model(model);
            for animation in animations {
                manager.register_animation(animation);
                assert!(
                    manager.associate_model_and_animation(animation, model),
                    "{} failed to associate {}",
                    kind,
                    animation.name()
                );
            }
            manager
        })
        .collect()
}

pub fn assert_bone_data_eq(kind: ManagerKind, expected: &[f32], actual: &[f32], time: f32) {
    let mismatches = compare_bone_data(expected, actual, TOLERANCE);
    assert!(
        mismatches.is_empty(),
        "{} at {}: mismatched floats {:?}",
        kind,
        time,
        mismatches
    );
}

pub fn translation(matrix: &Mat4) -> glam::Vec3 {
    matrix.w_axis.truncate()
}
