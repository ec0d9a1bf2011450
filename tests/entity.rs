use rand::rngs::StdRng;
use rand::SeedableRng;
use skin_anim_rs::test_utils::{sample_rig_animation, sample_rig_model};
use skin_anim_rs::*;
use std::rc::Rc;
use std::sync::Arc;

mod common;

fn dancing_entity(seed: u64, distance: f32, velocity: f32) -> EntityRc {
    let run = Rc::new(sample_rig_animation("run", 0.8, 0.0));
    let dances = vec![
        Rc::new(sample_rig_animation("samba", 2.4, 0.5)),
        Rc::new(sample_rig_animation("wave", 1.2, 0.9)),
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    create_random_dancing_entity(run, &dances, distance, velocity, &DancingEntityOptions::default(), &mut rng)
        .unwrap()
}

#[test]
fn test_dancing_entity_reaches_distance() {
    common::init_logger();
    for seed in 0..16 {
        let mut entity = dancing_entity(seed, 60.0, 4.0);
        let total = entity.total_duration();
        let summed: f32 = entity.segments().iter().map(|s| s.duration).sum();
        assert_eq!(total, summed);

        let mut last_position = entity.track_position();
        while !entity.is_finished() {
            entity.advance(1.0 / common::FRAME_RATE);
            let position = entity.track_position();
            assert!(position + 1e-3 >= last_position, "seed {} moved backwards", seed);
            last_position = position;
        }
        assert!((entity.track_position() - 60.0).abs() < 1e-3, "seed {}", seed);
    }
}

#[test]
fn test_dancing_entity_is_deterministic() {
    let first = dancing_entity(42, 30.0, 3.0);
    let second = dancing_entity(42, 30.0, 3.0);
    assert_eq!(first.segments().len(), second.segments().len());
    for (a, b) in first.segments().iter().zip(second.segments()) {
        assert_eq!(a.duration, b.duration);
        assert_eq!(a.primary.animation.name(), b.primary.animation.name());
        assert_eq!(a.end_position, b.end_position);
    }
}

#[test]
fn test_dancing_entity_feeds_managers() {
    common::init_logger();
    let run = Arc::new(sample_rig_animation("run", 0.8, 0.0));
    let dances = vec![Arc::new(sample_rig_animation("samba", 2.4, 0.5))];
    let model = sample_rig_model();
    let options = DancingEntityOptions {
        min_dance_breaks: Some(1),
        max_dance_breaks: Some(1),
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(3);
    let mut entity: EntityArc =
        create_random_dancing_entity(run.clone(), &dances, 20.0, 4.0, &options, &mut rng).unwrap();
    assert!(entity.segments().iter().any(|s| s.secondary.is_some()));

    let mut managers = common::prepared_managers(&[&*run, &*dances[0]], &model);
    let mut frames = 0;
    while !entity.is_finished() {
        for manager in managers.iter_mut() {
            let result = entity.animation_data(manager.as_mut(), &model);
            assert_eq!(result.num_bones(), model.num_bones());
        }
        entity.advance(1.0 / common::FRAME_RATE);
        frames += 1;
    }
    assert!(frames as f32 >= entity.total_duration() * common::FRAME_RATE - 1.0);
    for manager in managers.iter_mut() {
        assert!(entity.animation_data(manager.as_mut(), &model).is_empty());
    }
}

#[test]
fn test_dancing_entity_invalid_options() {
    let run = Rc::new(Animation::new("run", 1.0));
    let dances = vec![Rc::new(Animation::new("samba", 2.0))];
    let mut rng = StdRng::seed_from_u64(1);

    let err = create_random_dancing_entity(run.clone(), &[], 10.0, 1.0, &DancingEntityOptions::default(), &mut rng)
        .unwrap_err();
    assert!(err.is_invalid_entity());

    let options = DancingEntityOptions {
        min_dance_cycles: Some(3),
        max_dance_cycles: Some(1),
        ..Default::default()
    };
    let err = create_random_dancing_entity(run, &dances, 10.0, 1.0, &options, &mut rng).unwrap_err();
    assert!(err.is_invalid_entity());
}
