//!
//! Entity track sequencer: a forward-only playlist of timed animation segments.
//!

use rand::Rng;
use std::rc::Rc;
use std::sync::Arc;

use crate::animation::Animation;
use crate::base::{SkinError, SkinObj};
use crate::manager::{AnimationManager, AnimationResult};
use crate::model::ModelData;

/// An animation played from `start_time` on.
#[derive(Debug, Clone)]
pub struct TrackInput<A: SkinObj<Animation>> {
    pub animation: A,
    pub start_time: f32,
}

impl<A: SkinObj<Animation>> TrackInput<A> {
    #[inline]
    pub fn new(animation: A, start_time: f32) -> TrackInput<A> {
        TrackInput { animation, start_time }
    }
}

/// One step of an entity track.
///
/// With a `secondary` input the segment cross-fades from `primary` to
/// `secondary` over its duration. The track position moves linearly from
/// `start_position` to `end_position`.
#[derive(Debug, Clone)]
pub struct Segment<A: SkinObj<Animation>> {
    pub duration: f32,
    pub primary: TrackInput<A>,
    pub secondary: Option<TrackInput<A>>,
    pub start_position: f32,
    pub end_position: f32,
}

impl<A: SkinObj<Animation>> Segment<A> {
    pub fn single(duration: f32, input: TrackInput<A>, start_position: f32, end_position: f32) -> Segment<A> {
        Segment {
            duration,
            primary: input,
            secondary: None,
            start_position,
            end_position,
        }
    }

    pub fn blended(duration: f32, from: TrackInput<A>, to: TrackInput<A>, position: f32) -> Segment<A> {
        Segment {
            duration,
            primary: from,
            secondary: Some(to),
            start_position: position,
            end_position: position,
        }
    }

    /// Fraction of the segment done after `tick` seconds.
    #[inline]
    fn progress(&self, tick: f32) -> f32 {
        if self.duration > 0.0 {
            tick / self.duration
        } else {
            1.0
        }
    }

    pub fn query(&self, tick: f32) -> AnimationQuery<'_> {
        let primary = &self.primary;
        match &self.secondary {
            None => AnimationQuery::Single {
                animation: primary.animation.obj(),
                time: primary.start_time + tick,
            },
            Some(secondary) => AnimationQuery::Blended {
                animations: [primary.animation.obj(), secondary.animation.obj()],
                times: [primary.start_time + tick, secondary.start_time + tick],
                blend_factor: self.progress(tick),
            },
        }
    }

    pub fn track_position(&self, tick: f32) -> f32 {
        (self.end_position - self.start_position) * self.progress(tick) + self.start_position
    }
}

/// What to ask an `AnimationManager` for the current frame.
#[derive(Debug, Clone, Copy)]
pub enum AnimationQuery<'a> {
    Single {
        animation: &'a Animation,
        time: f32,
    },
    Blended {
        animations: [&'a Animation; 2],
        times: [f32; 2],
        blend_factor: f32,
    },
}

impl<'a> AnimationQuery<'a> {
    pub fn run<'m, M>(&self, manager: &'m mut M, model: &ModelData) -> AnimationResult<'m>
    where
        M: AnimationManager + ?Sized,
    {
        match *self {
            AnimationQuery::Single { animation, time } => manager.get_single_animation(animation, model, time),
            AnimationQuery::Blended {
                animations,
                times,
                blend_factor,
            } => manager.get_blended_animation(animations, model, times, blend_factor),
        }
    }
}

/// Plays its segments one after the other, then stays finished.
#[derive(Debug, Clone)]
pub struct Entity<A: SkinObj<Animation> = Rc<Animation>> {
    segments: Vec<Segment<A>>,
    index: usize,
    tick: f32,
}

pub type EntityRef<'t> = Entity<&'t Animation>;
pub type EntityRc = Entity<Rc<Animation>>;
pub type EntityArc = Entity<Arc<Animation>>;

impl<A: SkinObj<Animation>> Entity<A> {
    pub fn new(segments: Vec<Segment<A>>) -> Entity<A> {
        Entity {
            segments,
            index: 0,
            tick: 0.0,
        }
    }

    #[inline]
    pub fn segments(&self) -> &[Segment<A>] {
        &self.segments
    }

    /// Index of the active segment, equal to the number of segments once finished.
    #[inline]
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Seconds spent in the active segment.
    #[inline]
    pub fn tick(&self) -> f32 {
        self.tick
    }

    pub fn total_duration(&self) -> f32 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.index >= self.segments.len()
    }

    /// Moves the cursor `dt` seconds forward. Time left over at the end of a
    /// segment is carried into the next ones.
    pub fn advance(&mut self, dt: f32) {
        if self.is_finished() {
            return;
        }
        if dt > 0.0 {
            self.tick += dt;
        }
        while let Some(segment) = self.segments.get(self.index) {
            if self.tick < segment.duration {
                break;
            }
            self.tick -= segment.duration.max(0.0);
            self.index += 1;
        }
        if self.is_finished() {
            self.tick = 0.0;
        }
    }

    pub fn current_animation_query(&self) -> Option<AnimationQuery<'_>> {
        self.segments.get(self.index).map(|segment| segment.query(self.tick))
    }

    /// Distance travelled along the path. Once finished, the end of the last segment.
    pub fn track_position(&self) -> f32 {
        match self.segments.get(self.index) {
            Some(segment) => segment.track_position(self.tick),
            None => self.segments.last().map(|s| s.end_position).unwrap_or(0.0),
        }
    }

    /// Bone matrices for the current frame. Empty once finished.
    pub fn animation_data<'m, M>(&self, manager: &'m mut M, model: &ModelData) -> AnimationResult<'m>
    where
        M: AnimationManager + ?Sized,
    {
        match self.current_animation_query() {
            Some(query) => query.run(manager, model),
            None => AnimationResult::empty(),
        }
    }
}

/// Bounds of a randomized dancing entity. Unset fields are derived from the
/// run time `distance / velocity`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DancingEntityOptions {
    /// Defaults to 10% of the run time.
    pub min_start_run_time: Option<f32>,
    /// Defaults to 80% of the run time.
    pub max_start_run_time: Option<f32>,
    /// Defaults to 10% of the run time.
    pub min_end_run_time: Option<f32>,
    /// Defaults to 20% of the run time.
    pub max_end_run_time: Option<f32>,
    /// Defaults to 1.
    pub min_dance_breaks: Option<u32>,
    /// Defaults to 4.
    pub max_dance_breaks: Option<u32>,
    /// Defaults to 1.
    pub min_dance_cycles: Option<u32>,
    /// Defaults to 2.
    pub max_dance_cycles: Option<u32>,
    /// Defaults to 0.2 seconds.
    pub dance_fade_in_time: Option<f32>,
    /// Defaults to the fade in time.
    pub dance_fade_out_time: Option<f32>,
}

struct DanceBounds {
    start_run: (f32, f32),
    end_run: (f32, f32),
    dance_breaks: (u32, u32),
    dance_cycles: (u32, u32),
    fade_in: f32,
    fade_out: f32,
}

impl DancingEntityOptions {
    fn resolve(&self, run_time: f32) -> Result<DanceBounds, SkinError> {
        let fade_in = self.dance_fade_in_time.unwrap_or(0.2);
        let bounds = DanceBounds {
            start_run: (
                self.min_start_run_time.unwrap_or(run_time * 0.1),
                self.max_start_run_time.unwrap_or(run_time * 0.8),
            ),
            end_run: (
                self.min_end_run_time.unwrap_or(run_time * 0.1),
                self.max_end_run_time.unwrap_or(run_time * 0.2),
            ),
            dance_breaks: (self.min_dance_breaks.unwrap_or(1), self.max_dance_breaks.unwrap_or(4)),
            dance_cycles: (self.min_dance_cycles.unwrap_or(1), self.max_dance_cycles.unwrap_or(2)),
            fade_in,
            fade_out: self.dance_fade_out_time.unwrap_or(fade_in),
        };

        if bounds.start_run.0 > bounds.start_run.1 || bounds.start_run.0 < 0.0 {
            return Err(SkinError::InvalidEntity("bad start run time bounds"));
        }
        if bounds.end_run.0 > bounds.end_run.1 || bounds.end_run.0 < 0.0 {
            return Err(SkinError::InvalidEntity("bad end run time bounds"));
        }
        if bounds.dance_breaks.0 > bounds.dance_breaks.1 {
            return Err(SkinError::InvalidEntity("bad dance break bounds"));
        }
        if bounds.dance_cycles.0 > bounds.dance_cycles.1 {
            return Err(SkinError::InvalidEntity("bad dance cycle bounds"));
        }
        if bounds.fade_in < 0.0 || bounds.fade_out < 0.0 {
            return Err(SkinError::InvalidEntity("negative fade time"));
        }
        Ok(bounds)
    }
}

fn random_f32<R: Rng + ?Sized>(rng: &mut R, (min, max): (f32, f32)) -> f32 {
    rng.gen::<f32>() * (max - min) + min
}

fn random_u32<R: Rng + ?Sized>(rng: &mut R, (min, max): (u32, u32)) -> u32 {
    (rng.gen::<f32>() * (max - min) as f32).round() as u32 + min
}

/// Builds a run, dance, run performance covering `distance` at `velocity`.
///
/// The entity runs for a random time, then takes a random number of dance
/// breaks. Each break fades into a random dance, loops it a random number of
/// times, fades back to running and runs on. A final run segment brings the
/// entity to `distance`. Dancing does not move the entity.
pub fn create_random_dancing_entity<A, R>(
    run: A,
    dances: &[A],
    distance: f32,
    velocity: f32,
    options: &DancingEntityOptions,
    rng: &mut R,
) -> Result<Entity<A>, SkinError>
where
    A: SkinObj<Animation> + Clone,
    R: Rng + ?Sized,
{
    if dances.is_empty() {
        return Err(SkinError::InvalidEntity("no dance animation"));
    }
    if !(velocity > 0.0) || !velocity.is_finite() {
        return Err(SkinError::InvalidEntity("velocity must be positive"));
    }
    if !(distance >= 0.0) || !distance.is_finite() {
        return Err(SkinError::InvalidEntity("distance must not be negative"));
    }

    let run_time = distance / velocity;
    let bounds = options.resolve(run_time)?;

    let end_run_time = random_f32(rng, bounds.end_run);
    let start_run_time = random_f32(rng, bounds.start_run);
    let mut remaining = run_time - start_run_time;

    let mut segments = Vec::new();
    let mut position = velocity * start_run_time;
    segments.push(Segment::single(
        start_run_time,
        TrackInput::new(run.clone(), 0.0),
        0.0,
        position,
    ));
    let mut run_clock = start_run_time;

    let num_breaks = random_u32(rng, bounds.dance_breaks);
    let time_delta = if num_breaks > 0 {
        (remaining - end_run_time) / num_breaks as f32
    } else {
        0.0
    };
    if time_delta < -run_time * 1e-4 {
        return Err(SkinError::InvalidEntity("run times exceed the travel time"));
    }
    let time_delta = time_delta.max(0.0);

    for _ in 0..num_breaks {
        let dance = &dances[rng.gen_range(0..dances.len())];
        let num_cycles = random_u32(rng, bounds.dance_cycles);
        let dance_duration = dance.obj().duration();

        if bounds.fade_in > 0.0 {
            segments.push(Segment::blended(
                bounds.fade_in,
                TrackInput::new(run.clone(), 0.0),
                TrackInput::new(dance.clone(), 0.0),
                position,
            ));
        }

        let dance_time = (num_cycles as f32 * dance_duration - bounds.fade_in - bounds.fade_out).max(0.0);
        segments.push(Segment::single(
            dance_time,
            TrackInput::new(dance.clone(), bounds.fade_in),
            position,
            position,
        ));

        if bounds.fade_out > 0.0 {
            segments.push(Segment::blended(
                bounds.fade_out,
                TrackInput::new(dance.clone(), dance_duration - bounds.fade_out),
                TrackInput::new(run.clone(), 0.0),
                position,
            ));
        }

        let next = position + velocity * time_delta;
        segments.push(Segment::single(
            time_delta,
            TrackInput::new(run.clone(), bounds.fade_out),
            position,
            next,
        ));
        position = next;
        remaining -= time_delta;
        run_clock = bounds.fade_out + time_delta;
    }

    segments.push(Segment::single(
        remaining.max(0.0),
        TrackInput::new(run, run_clock),
        position,
        distance,
    ));

    log::debug!(
        "Dancing entity: {} dance breaks, {} segments, {} seconds",
        num_breaks,
        segments.len(),
        segments.iter().map(|s| s.duration).sum::<f32>()
    );
    Ok(Entity::new(segments))
}
