use skin_anim_rs::test_utils::{sample_rig_animation, sample_rig_model};
use skin_anim_rs::*;

mod common;

#[test]
fn test_single_consistency() {
    common::init_logger();
    let animation = sample_rig_animation("sway", 1.5, 0.0);
    let model = sample_rig_model();
    let mut managers = common::prepared_managers(&[&animation], &model);
    let mut reference = NaiveAnimationManager::new();

    for time in common::frame_times(90) {
        let expected = reference.get_single_animation(&animation, &model, time).into_owned();
        assert_eq!(expected.num_bones(), model.num_bones());
        for manager in managers.iter_mut() {
            let kind = manager.kind();
            let actual = manager.get_single_animation(&animation, &model, time);
            common::assert_bone_data_eq(kind, &expected.bone_data, &actual.bone_data, time);
        }
    }
}

#[test]
fn test_blended_consistency() {
    common::init_logger();
    let sway = sample_rig_animation("sway", 1.5, 0.0);
    let wave = sample_rig_animation("wave", 1.0, 0.3);
    let model = sample_rig_model();
    let mut managers = common::prepared_managers(&[&sway, &wave], &model);
    let mut reference = NaiveAnimationManager::new();

    for (idx, time) in common::frame_times(60).into_iter().enumerate() {
        let times = [time, common::frame_times(60)[(idx * 7) % 60]];
        let blend_factor = idx as f32 / 60.0;
        let expected = reference
            .get_blended_animation([&sway, &wave], &model, times, blend_factor)
            .into_owned();
        for manager in managers.iter_mut() {
            let kind = manager.kind();
            let actual = manager.get_blended_animation([&sway, &wave], &model, times, blend_factor);
            common::assert_bone_data_eq(kind, &expected.bone_data, &actual.bone_data, time);
        }
    }
}

#[test]
fn test_bind_pose_cancels_offsets() {
    common::init_logger();
    // A rig animation without animated bones stays in bind pose, so every
    // skinned matrix is identity.
    let mut animation = Animation::new("bind", 1.0);
    for (bone, parent, offset) in test_utils::RIG_BONES.iter() {
        animation.insert_static_bone(*bone, *parent, glam::Mat4::from_translation(glam::Vec3::from(*offset)));
    }
    let model = sample_rig_model();

    for mut manager in common::prepared_managers(&[&animation], &model) {
        let kind = manager.kind();
        let result = manager.get_single_animation(&animation, &model, 0.5);
        for idx in 0..model.num_bones() {
            let matrix = result.matrix(idx).unwrap();
            assert!(matrix.abs_diff_eq(glam::Mat4::IDENTITY, 1e-5), "{} bone {}", kind, idx);
        }
    }
}

#[test]
fn test_orphan_parent_is_skipped() {
    common::init_logger();
    let mut animation = Animation::new("orphan", 1.0);
    animation.insert_static_bone("hips", None, glam::Mat4::IDENTITY);
    animation.insert_static_bone("hand", Some("ghost"), glam::Mat4::from_translation(glam::Vec3::Y));
    assert!(animation.validate().unwrap_err().is_orphan_bone());
    let model = test_utils::sample_model(&["hips", "hand"]);

    for mut manager in common::prepared_managers(&[&animation], &model) {
        let kind = manager.kind();
        let result = manager.get_single_animation(&animation, &model, 0.5);
        assert_eq!(result.num_bones(), 2, "{}", kind);
        let hand = result.matrix(1).unwrap();
        assert!(
            common::translation(&hand).abs_diff_eq(glam::Vec3::Y, 1e-5),
            "{}: {:?}",
            kind,
            hand
        );
    }
}

#[test]
fn test_single_keyframes_ignore_time() {
    common::init_logger();
    let mut animation = Animation::new("pose", 1.0);
    for (bone, parent, offset) in test_utils::RIG_BONES.iter() {
        animation.insert_static_bone(*bone, *parent, glam::Mat4::from_translation(glam::Vec3::from(*offset)));
    }
    let arm = AnimatedBone::new(
        vec![Keyframe::new(0.4, glam::Vec3::new(0.4, 0.3, 0.0))],
        vec![Keyframe::new(0.7, quat_from_axis_angle(glam::Vec3::Z, 0.8))],
        vec![Keyframe::new(0.2, glam::Vec3::new(1.0, 1.5, 1.0))],
    )
    .unwrap();
    animation.insert_animated_bone("arm", arm);
    let model = sample_rig_model();

    for mut manager in common::prepared_managers(&[&animation], &model) {
        let kind = manager.kind();
        let expected = manager.get_single_animation(&animation, &model, 0.0).into_owned();
        for time in [0.25, 0.5, 0.9, 3.0, -2.0] {
            let actual = manager.get_single_animation(&animation, &model, time);
            common::assert_bone_data_eq(kind, &expected.bone_data, &actual.bone_data, time);
        }
    }
}
