mod animation;
mod arena;
mod baked_manager;
mod base;
mod bone_registry;
mod entity;
mod foreign_layout;
mod foreign_manager;
mod foreign_module;
mod manager;
mod math;
mod model;
mod naive_manager;

pub mod test_utils;

pub use animation::{
    sample_channel, AnimatedBone, Animation, Keyframe, KeyframeValue, PositionKeyframe, RotationKeyframe,
    ScalingKeyframe, StaticBone,
};
pub use arena::{Arena, ArenaSlice, DEFAULT_RESERVED_BYTES, PAGE_SIZE};
pub use baked_manager::{BakedAnimationManager, DEFAULT_FRAME_RATE, MAX_BAKED_FRAMES};
pub use base::*;
pub use bone_registry::BoneRegistry;
pub use entity::{
    create_random_dancing_entity, AnimationQuery, DancingEntityOptions, Entity, EntityArc, EntityRc, EntityRef,
    Segment, TrackInput,
};
pub use foreign_layout::{
    AnimatedBoneRecord, AnimationHeader, KeyRecord, MatrixRecord, ModelHeader, PositionKeyRecord, QuatKeyRecord,
    RotationKeyRecord, ScalingKeyRecord, StaticBoneRecord, Vec3KeyRecord,
};
pub use foreign_manager::{ForeignAnimationManager, ForeignConfig};
pub use foreign_module::{
    alert_message, sample_keys, Alert, AlertLog, ForeignModule, ERR_DEBUGMSG, ERR_NOTFOUND, ERR_NULLPTR,
};
pub use manager::{check_association, new_manager, AnimationManager, AnimationResult, ManagerKind};
pub use math::*;
pub use model::ModelData;
pub use naive_manager::NaiveAnimationManager;
