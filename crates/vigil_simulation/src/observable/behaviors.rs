//! Observable behaviours (enum dispatch)
//!
//! Вместо coroutines — явные записи с временем (`ColorFade`, `Motion`, `PendingSound`),
//! их продвигает `advance_observable_behaviors` каждый fixed step.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PerceptionError;
use crate::perception::{HookContext, HookEffect, ObservationDirection};

/// Задержка relocate при телепорте (секунды от старта)
pub const TELEPORT_RELOCATE_DELAY: f32 = 0.2;
/// Конец телепорта (mover снова может двигаться)
pub const TELEPORT_DURATION: f32 = 0.3;

/// Что делает observable, когда hook сработал
#[derive(Debug, Clone, PartialEq)]
pub enum ObservableBehavior {
    /// Только engine events (gameplay слушает ObservationFired)
    EventsOnly,
    MaterialChanger(MaterialChanger),
    Mover(Mover),
    SoundTrigger(SoundTrigger),
}

impl Default for ObservableBehavior {
    fn default() -> Self {
        Self::EventsOnly
    }
}

impl ObservableBehavior {
    pub fn on_became_observed(&mut self, ctx: &mut HookContext<'_>, _volume: f32) {
        match self {
            Self::EventsOnly => {}
            Self::MaterialChanger(changer) => changer.apply(ObservationDirection::Observed, ctx.now),
            Self::Mover(_) => {
                crate::logger::log(&format!("🗿 {:?} stopped moving - being watched", ctx.entity));
            }
            Self::SoundTrigger(trigger) => trigger.roll(ObservationDirection::Observed, ctx),
        }
    }

    pub fn on_left_observation(&mut self, ctx: &mut HookContext<'_>, volume: f32) {
        match self {
            Self::EventsOnly => {}
            Self::MaterialChanger(changer) => changer.apply(ObservationDirection::Unobserved, ctx.now),
            Self::Mover(mover) => mover.start_relocation(ctx, volume),
            Self::SoundTrigger(trigger) => trigger.roll(ObservationDirection::Unobserved, ctx),
        }
    }

    /// Продвинуть time-driven записи до `ctx.now`
    pub fn advance(&mut self, ctx: &mut HookContext<'_>, volume: f32) {
        match self {
            Self::EventsOnly => {}
            Self::MaterialChanger(changer) => changer.advance(ctx.now),
            Self::Mover(mover) => mover.advance(ctx, volume),
            Self::SoundTrigger(trigger) => trigger.advance(ctx, volume),
        }
    }

    pub fn validate(&self) -> Result<(), PerceptionError> {
        match self {
            Self::EventsOnly => Ok(()),
            Self::MaterialChanger(changer) => changer.validate(),
            Self::Mover(mover) => mover.validate(),
            Self::SoundTrigger(trigger) => trigger.validate(),
        }
    }

    /// Есть ли незавершённая работа (fade / motion / pending sounds)
    pub fn is_animating(&self) -> bool {
        match self {
            Self::EventsOnly => false,
            Self::MaterialChanger(changer) => changer.fade.is_some(),
            Self::Mover(mover) => mover.is_moving(),
            Self::SoundTrigger(trigger) => !trigger.pending.is_empty(),
        }
    }
}

/// Конечное и >= 0
fn require_non_negative(field: &str, value: f32) -> Result<(), PerceptionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PerceptionError::InvalidConfig(format!(
            "{} must be finite and >= 0, got {}",
            field, value
        )))
    }
}

/// Случайный клип из списка → HookEffect::Sound (пустой список → тишина)
fn play_random_clip(ctx: &mut HookContext<'_>, clips: &[String], volume: f32) {
    if clips.is_empty() {
        return;
    }
    let index = ctx.rng.gen_range(0..clips.len());
    ctx.push(HookEffect::Sound {
        clip: clips[index].clone(),
        volume,
    });
}

// ============================================================================
// MaterialChanger
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaterialMode {
    /// Мгновенная смена material id (None → оставить текущий)
    Swap {
        observed: Option<String>,
        unobserved: Option<String>,
    },
    /// Плавный переход цвета (rgba)
    ColorFade {
        observed_color: Vec4,
        unobserved_color: Vec4,
        transition_time: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorFade {
    pub from: Vec4,
    pub to: Vec4,
    pub started_at: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialChanger {
    pub mode: MaterialMode,
    pub material: Option<String>,
    pub color: Vec4,
    pub fade: Option<ColorFade>,
}

impl MaterialChanger {
    pub fn swap(original: impl Into<String>, observed: Option<String>, unobserved: Option<String>) -> Self {
        Self {
            mode: MaterialMode::Swap { observed, unobserved },
            material: Some(original.into()),
            color: Vec4::ONE,
            fade: None,
        }
    }

    /// Дефолтные цвета: observed = белый, unobserved = красный, 1 секунда
    pub fn color_fade(initial: Vec4) -> Self {
        Self {
            mode: MaterialMode::ColorFade {
                observed_color: Vec4::ONE,
                unobserved_color: Vec4::new(1.0, 0.0, 0.0, 1.0),
                transition_time: 1.0,
            },
            material: None,
            color: initial,
            fade: None,
        }
    }

    pub fn validate(&self) -> Result<(), PerceptionError> {
        match &self.mode {
            MaterialMode::Swap { .. } => Ok(()),
            MaterialMode::ColorFade { transition_time, .. } => {
                require_non_negative("transition_time", *transition_time)
            }
        }
    }

    fn apply(&mut self, direction: ObservationDirection, now: f32) {
        // Новый hook отменяет незавершённый fade
        self.fade = None;

        match &self.mode {
            MaterialMode::Swap { observed, unobserved } => {
                let target = match direction {
                    ObservationDirection::Observed => observed,
                    ObservationDirection::Unobserved => unobserved,
                };
                if let Some(material) = target {
                    self.material = Some(material.clone());
                }
            }
            MaterialMode::ColorFade {
                observed_color,
                unobserved_color,
                transition_time,
            } => {
                let to = match direction {
                    ObservationDirection::Observed => *observed_color,
                    ObservationDirection::Unobserved => *unobserved_color,
                };
                self.fade = Some(ColorFade {
                    from: self.color,
                    to,
                    started_at: now,
                    duration: *transition_time,
                });
                self.advance(now);
            }
        }
    }

    fn advance(&mut self, now: f32) {
        let Some(fade) = self.fade else {
            return;
        };

        let t = if fade.duration > 0.0 {
            (now - fade.started_at) / fade.duration
        } else {
            1.0
        };

        if t >= 1.0 {
            self.color = fade.to;
            self.fade = None;
        } else {
            self.color = fade.from.lerp(fade.to, t.max(0.0));
        }
    }
}

// ============================================================================
// Mover
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementType {
    Instant,
    Smooth,
    Teleport,
}

/// Ease-in-out (smoothstep), t ∈ [0, 1]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Smooth {
        from: Vec3,
        to: Vec3,
        started_at: f32,
        duration: f32,
    },
    Teleport {
        target: Vec3,
        started_at: f32,
        relocated: bool,
    },
}

/// Перемещается, пока на него не смотрят
#[derive(Debug, Clone, PartialEq)]
pub struct Mover {
    pub positions: Vec<Vec3>,
    pub movement_type: MovementType,
    pub speed: f32,
    pub min_move_distance: f32,
    pub movement_sounds: Vec<String>,
    pub teleport_sounds: Vec<String>,
    /// Particle effect при перемещении
    pub move_effect: bool,
    pub motion: Option<Motion>,
}

impl Default for Mover {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            movement_type: MovementType::Smooth,
            speed: 5.0,
            min_move_distance: 1.0,
            movement_sounds: Vec::new(),
            teleport_sounds: Vec::new(),
            move_effect: false,
            motion: None,
        }
    }
}

impl Mover {
    pub fn new(positions: Vec<Vec3>, movement_type: MovementType) -> Self {
        Self {
            positions,
            movement_type,
            ..Default::default()
        }
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    pub fn validate(&self) -> Result<(), PerceptionError> {
        require_non_negative("speed", self.speed)?;
        require_non_negative("min_move_distance", self.min_move_distance)?;
        if let Some(position) = self.positions.iter().find(|position| !position.is_finite()) {
            return Err(PerceptionError::InvalidConfig(format!(
                "mover position {} is not finite",
                position
            )));
        }
        Ok(())
    }

    /// Случайная позиция не ближе `min_move_distance` к текущей
    pub fn select_position(&self, current: Vec3, rng: &mut impl Rng) -> Option<Vec3> {
        let valid: Vec<Vec3> = self
            .positions
            .iter()
            .copied()
            .filter(|position| position.distance(current) >= self.min_move_distance)
            .collect();

        if valid.is_empty() {
            return None;
        }
        Some(valid[rng.gen_range(0..valid.len())])
    }

    fn start_relocation(&mut self, ctx: &mut HookContext<'_>, volume: f32) {
        if self.is_moving() {
            return;
        }

        let Some(target) = self.select_position(ctx.transform.translation, &mut *ctx.rng) else {
            crate::logger::log(&format!("🗿 {:?} has no valid position to move to", ctx.entity));
            return;
        };

        match self.movement_type {
            MovementType::Instant => {
                ctx.transform.translation = target;
                self.finish_move(ctx, volume);
            }
            MovementType::Smooth => {
                let from = ctx.transform.translation;
                let duration = if self.speed > 0.0 {
                    from.distance(target) / self.speed
                } else {
                    0.0
                };
                self.motion = Some(Motion::Smooth {
                    from,
                    to: target,
                    started_at: ctx.now,
                    duration,
                });
                self.advance(ctx, volume);
            }
            MovementType::Teleport => {
                play_random_clip(ctx, &self.teleport_sounds, volume);
                if self.move_effect {
                    ctx.push(HookEffect::Particles);
                }
                self.motion = Some(Motion::Teleport {
                    target,
                    started_at: ctx.now,
                    relocated: false,
                });
            }
        }
    }

    fn finish_move(&mut self, ctx: &mut HookContext<'_>, volume: f32) {
        play_random_clip(ctx, &self.movement_sounds, volume);
        if self.move_effect {
            ctx.push(HookEffect::Particles);
        }
    }

    fn advance(&mut self, ctx: &mut HookContext<'_>, volume: f32) {
        let Some(motion) = self.motion else {
            return;
        };

        match motion {
            Motion::Smooth {
                from,
                to,
                started_at,
                duration,
            } => {
                let t = if duration > 0.0 {
                    (ctx.now - started_at) / duration
                } else {
                    1.0
                };

                if t >= 1.0 {
                    ctx.transform.translation = to;
                    self.motion = None;
                    self.finish_move(ctx, volume);
                } else {
                    ctx.transform.translation = from.lerp(to, ease_in_out(t));
                }
            }
            Motion::Teleport {
                target,
                started_at,
                relocated,
            } => {
                let elapsed = ctx.now - started_at;
                let relocate_now = !relocated && elapsed >= TELEPORT_RELOCATE_DELAY;
                if relocate_now {
                    ctx.transform.translation = target;
                }

                self.motion = if elapsed >= TELEPORT_DURATION {
                    None
                } else {
                    Some(Motion::Teleport {
                        target,
                        started_at,
                        relocated: relocated || relocate_now,
                    })
                };
            }
        }
    }
}

// ============================================================================
// SoundTrigger
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSound {
    pub fire_at: f32,
    pub direction: ObservationDirection,
}

/// С шансом проигрывает звук через случайную задержку
#[derive(Debug, Clone, PartialEq)]
pub struct SoundTrigger {
    pub observed_sounds: Vec<String>,
    pub unobserved_sounds: Vec<String>,
    pub sound_chance: f32,
    pub min_delay: f32,
    pub max_delay: f32,
    pub pending: Vec<PendingSound>,
}

impl Default for SoundTrigger {
    fn default() -> Self {
        Self {
            observed_sounds: Vec::new(),
            unobserved_sounds: Vec::new(),
            sound_chance: 0.8,
            min_delay: 0.5,
            max_delay: 3.0,
            pending: Vec::new(),
        }
    }
}

impl SoundTrigger {
    pub fn new(observed_sounds: Vec<String>, unobserved_sounds: Vec<String>) -> Self {
        Self {
            observed_sounds,
            unobserved_sounds,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), PerceptionError> {
        if !(0.0..=1.0).contains(&self.sound_chance) {
            return Err(PerceptionError::InvalidConfig(format!(
                "sound_chance must be in [0, 1], got {}",
                self.sound_chance
            )));
        }
        require_non_negative("min_delay", self.min_delay)?;
        require_non_negative("max_delay", self.max_delay)
    }

    /// Задержка звука; None → диапазон непригоден (звук пропускается)
    fn roll_delay(&self, rng: &mut impl Rng) -> Option<f32> {
        let (min, max) = (self.min_delay, self.max_delay);
        if !min.is_finite() || min < 0.0 {
            return None;
        }
        if max.is_finite() && max > min {
            Some(rng.gen_range(min..=max))
        } else {
            Some(min)
        }
    }

    fn roll(&mut self, direction: ObservationDirection, ctx: &mut HookContext<'_>) {
        if ctx.rng.gen::<f32>() >= self.sound_chance {
            return;
        }

        let Some(delay) = self.roll_delay(&mut *ctx.rng) else {
            crate::logger::log_warning(&format!(
                "⚠️ {:?} sound delay range [{}, {}] unusable, sound skipped",
                ctx.entity, self.min_delay, self.max_delay
            ));
            return;
        };

        self.pending.push(PendingSound {
            fire_at: ctx.now + delay,
            direction,
        });
    }

    fn advance(&mut self, ctx: &mut HookContext<'_>, volume: f32) {
        let now = ctx.now;
        let (due, waiting): (Vec<PendingSound>, Vec<PendingSound>) =
            self.pending.drain(..).partition(|sound| sound.fire_at <= now);
        self.pending = waiting;

        for sound in due {
            let clips = match sound.direction {
                ObservationDirection::Observed => &self.observed_sounds,
                ObservationDirection::Unobserved => &self.unobserved_sounds,
            };
            play_random_clip(ctx, clips, volume);
        }
    }
}
