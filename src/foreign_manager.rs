//!
//! Foreign-memory strategy: animations and models are marshalled once into a
//! linear arena, and evaluated there by the native-side `ForeignModule`.
//!

use std::collections::HashMap;

use crate::animation::{AnimatedBone, Animation};
use crate::arena::{Arena, ArenaSlice, DEFAULT_RESERVED_BYTES, PAGE_SIZE};
use crate::base::{DeterministicState, SkinError, NO_PARENT_BONE_ID};
use crate::bone_registry::BoneRegistry;
use crate::foreign_layout::{
    AnimatedBoneRecord, AnimationHeader, MatrixRecord, ModelHeader, PositionKeyRecord, RotationKeyRecord,
    ScalingKeyRecord, StaticBoneRecord,
};
use crate::foreign_module::{AlertLog, ForeignModule};
use crate::manager::{check_association, AnimationManager, AnimationResult, ManagerKind};
use crate::model::ModelData;

/// Arena settings of a `ForeignAnimationManager`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForeignConfig {
    /// Bytes at the start of the arena never allocated from.
    pub reserved_bytes: usize,
    /// Free pages allocated up front.
    pub initial_pages: usize,
    /// Arena growth step in bytes.
    pub page_size: usize,
}

impl Default for ForeignConfig {
    fn default() -> ForeignConfig {
        ForeignConfig {
            reserved_bytes: DEFAULT_RESERVED_BYTES,
            initial_pages: 0,
            page_size: PAGE_SIZE,
        }
    }
}

/// Pays memory and marshalling time at registration to evaluate from compact records.
///
/// - Registering an animation assigns bone IDs and writes the whole
///   animation into the arena.
/// - Registering a model writes its bone IDs and offset matrices.
/// - Association only checks bone names, nothing is written.
/// - Evaluation writes into one scratch region of the arena, reused by every
///   call. The returned result borrows it, so it must be dropped before the
///   next call.
/// - Resting memory is everything allocated in the arena.
///
/// Not meant for concurrent use: registration and evaluation both mutate the arena.
#[derive(Debug)]
pub struct ForeignAnimationManager {
    config: ForeignConfig,
    arena: Arena,
    registry: BoneRegistry,
    module: ForeignModule,
    animations: HashMap<u32, u32, DeterministicState>,
    models: HashMap<u32, u32, DeterministicState>,
    scratch: Option<ArenaSlice<f32>>,
}

impl Default for ForeignAnimationManager {
    fn default() -> ForeignAnimationManager {
        ForeignAnimationManager::new()
    }
}

impl ForeignAnimationManager {
    pub fn new() -> ForeignAnimationManager {
        ForeignAnimationManager::with_config(ForeignConfig::default())
    }

    pub fn with_config(config: ForeignConfig) -> ForeignAnimationManager {
        ForeignAnimationManager {
            config,
            arena: Arena::new(config.reserved_bytes, config.initial_pages, config.page_size),
            registry: BoneRegistry::new(),
            module: ForeignModule::new(),
            animations: HashMap::with_hasher(DeterministicState::new()),
            models: HashMap::with_hasher(DeterministicState::new()),
            scratch: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &ForeignConfig {
        &self.config
    }

    #[inline]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    #[inline]
    pub fn registry(&self) -> &BoneRegistry {
        &self.registry
    }

    /// Alerts raised by the native side.
    #[inline]
    pub fn alerts(&self) -> &AlertLog {
        self.module.alerts()
    }

    /// Arena address of a registered animation.
    #[inline]
    pub fn animation_address(&self, animation: &Animation) -> Option<u32> {
        self.animations.get(&animation.id()).copied()
    }

    /// Arena address of a registered model.
    #[inline]
    pub fn model_address(&self, model: &ModelData) -> Option<u32> {
        self.models.get(&model.id()).copied()
    }

    fn marshal_animation(&mut self, animation: &Animation) -> Result<u32, SkinError> {
        let mut names: Vec<&String> = animation
            .static_bones()
            .keys()
            .chain(animation.animated_bones().keys())
            .collect();
        names.sort_unstable();
        names.dedup();
        for name in names {
            self.registry.id_or_insert(name);
        }

        let mut statics = Vec::with_capacity(animation.static_bones().len());
        for (name, bone) in animation.static_bones() {
            let Some(id) = self.registry.id(name) else {
                log::error!("Bone {} has no id in animation {}", name, animation.name());
                continue;
            };
            let parent_id = match &bone.parent {
                None => NO_PARENT_BONE_ID,
                Some(parent) => match self.registry.id(parent) {
                    Some(parent_id) => parent_id,
                    None => {
                        log::error!(
                            "Parent {} of bone {} has no id in animation {}, using root",
                            parent,
                            name,
                            animation.name()
                        );
                        NO_PARENT_BONE_ID
                    }
                },
            };
            statics.push(StaticBoneRecord::new(id, parent_id, &bone.transform));
        }
        statics.sort_unstable_by_key(|r| r.id);

        let mut animated = Vec::with_capacity(animation.animated_bones().len());
        for (name, bone) in animation.animated_bones() {
            let Some(id) = self.registry.id(name) else {
                log::error!("Bone {} has no id in animation {}", name, animation.name());
                continue;
            };
            animated.push(self.marshal_animated_bone(id, bone)?);
        }
        animated.sort_unstable_by_key(|r| r.id);

        let static_bones = self.arena.alloc_from(&statics)?;
        let animated_bones = self.arena.alloc_from(&animated)?;
        let header = self.arena.alloc_from(&[AnimationHeader {
            duration: animation.duration(),
            num_static_bones: static_bones.len() as u32,
            static_bones: static_bones.offset(),
            num_animated_bones: animated_bones.len() as u32,
            animated_bones: animated_bones.offset(),
        }])?;
        Ok(header.offset())
    }

    fn marshal_animated_bone(&mut self, id: u32, bone: &AnimatedBone) -> Result<AnimatedBoneRecord, SkinError> {
        let positions: Vec<PositionKeyRecord> = bone.position_channel().iter().map(Into::into).collect();
        let rotations: Vec<RotationKeyRecord> = bone.rotation_channel().iter().map(Into::into).collect();
        let scalings: Vec<ScalingKeyRecord> = bone.scaling_channel().iter().map(Into::into).collect();

        let positions = self.arena.alloc_from(&positions)?;
        let rotations = self.arena.alloc_from(&rotations)?;
        let scalings = self.arena.alloc_from(&scalings)?;
        Ok(AnimatedBoneRecord {
            id,
            num_position_keys: positions.len() as u32,
            position_keys: positions.offset(),
            num_rotation_keys: rotations.len() as u32,
            rotation_keys: rotations.offset(),
            num_scaling_keys: scalings.len() as u32,
            scaling_keys: scalings.offset(),
        })
    }

    fn marshal_model(&mut self, model: &ModelData) -> Result<u32, SkinError> {
        let ids: Vec<u32> = model
            .bone_names()
            .iter()
            .map(|name| self.registry.id_or_insert(name))
            .collect();
        let offsets: Vec<MatrixRecord> = model.bone_offsets().iter().map(|m| m.to_cols_array()).collect();

        let bone_ids = self.arena.alloc_from(&ids)?;
        let bone_offsets = self.arena.alloc_from(&offsets)?;
        let header = self.arena.alloc_from(&[ModelHeader {
            num_bones: model.num_bones() as u32,
            bone_ids: bone_ids.offset(),
            bone_offsets: bone_offsets.offset(),
        }])?;
        Ok(header.offset())
    }

    /// Scratch region of at least `floats` floats. Reallocated when too small,
    /// the previous region is not reclaimed.
    fn scratch(&mut self, floats: usize) -> Result<ArenaSlice<f32>, SkinError> {
        if let Some(scratch) = self.scratch {
            if scratch.len() >= floats {
                return Ok(scratch);
            }
        }
        let scratch = self.arena.alloc::<f32>(floats)?;
        log::debug!("Scratch region of {} floats at {}", floats, scratch.offset());
        self.scratch = Some(scratch);
        Ok(scratch)
    }

    fn addresses(&self, animations: &[&Animation], model: &ModelData) -> Option<(Vec<u32>, u32)> {
        let mut addresses = Vec::with_capacity(animations.len());
        for animation in animations {
            match self.animation_address(animation) {
                Some(address) => addresses.push(address),
                None => {
                    log::error!("Animation {} is not registered", animation.name());
                    return None;
                }
            }
        }
        match self.model_address(model) {
            Some(address) => Some((addresses, address)),
            None => {
                log::error!("Model {} is not registered", model.name());
                None
            }
        }
    }

    fn scratch_result(&self, scratch: ArenaSlice<f32>, floats: usize) -> AnimationResult<'_> {
        match self.arena.slice(scratch) {
            Ok(data) => AnimationResult::borrowed(&data[..floats], 0),
            Err(err) => {
                log::error!("Scratch region unreadable: {}", err);
                AnimationResult::empty()
            }
        }
    }
}

impl AnimationManager for ForeignAnimationManager {
    fn register_animation(&mut self, animation: &Animation) {
        if self.animations.contains_key(&animation.id()) {
            log::warn!("Animation {} already registered", animation.name());
            return;
        }
        match self.marshal_animation(animation) {
            Ok(address) => {
                log::debug!(
                    "Animation {} marshalled at {}, arena used {} bytes",
                    animation.name(),
                    address,
                    self.arena.used()
                );
                self.animations.insert(animation.id(), address);
            }
            Err(err) => log::error!("Failed to marshal animation {}: {}", animation.name(), err),
        }
    }

    fn register_model(&mut self, model: &ModelData) {
        if self.models.contains_key(&model.id()) {
            log::warn!("Model {} already registered", model.name());
            return;
        }
        match self.marshal_model(model) {
            Ok(address) => {
                log::debug!("Model {} marshalled at {}", model.name(), address);
                self.models.insert(model.id(), address);
            }
            Err(err) => log::error!("Failed to marshal model {}: {}", model.name(), err),
        }
    }

    fn associate_model_and_animation(&mut self, animation: &Animation, model: &ModelData) -> bool {
        check_association(animation, model)
    }

    fn get_single_animation(&mut self, animation: &Animation, model: &ModelData, time: f32) -> AnimationResult<'_> {
        let Some((animations, model_address)) = self.addresses(&[animation], model) else {
            return AnimationResult::empty();
        };
        let floats = model.num_floats();
        let scratch = match self.scratch(floats) {
            Ok(scratch) => scratch,
            Err(err) => {
                log::error!("No scratch region for model {}: {}", model.name(), err);
                return AnimationResult::empty();
            }
        };

        self.module
            .get_single_animation(&mut self.arena, scratch, animations[0], model_address, time);
        self.scratch_result(scratch, floats)
    }

    fn get_blended_animation(
        &mut self,
        animations: [&Animation; 2],
        model: &ModelData,
        times: [f32; 2],
        blend_factor: f32,
    ) -> AnimationResult<'_> {
        let Some((addresses, model_address)) = self.addresses(&animations, model) else {
            return AnimationResult::empty();
        };
        let floats = model.num_floats();
        let scratch = match self.scratch(floats) {
            Ok(scratch) => scratch,
            Err(err) => {
                log::error!("No scratch region for model {}: {}", model.name(), err);
                return AnimationResult::empty();
            }
        };

        self.module.get_blended_animation(
            &mut self.arena,
            scratch,
            [addresses[0], addresses[1]],
            model_address,
            times,
            blend_factor,
        );
        self.scratch_result(scratch, floats)
    }

    fn resting_memory_usage(&self) -> usize {
        self.arena.used()
    }

    fn kind(&self) -> ManagerKind {
        ManagerKind::Foreign
    }
}
