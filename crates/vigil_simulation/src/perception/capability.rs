//! Tracked capability — что именно отслеживает perception loop
//!
//! Один generic engine (`PerceptionLoop<C>`) вместо двух копий:
//! `Observable` (ambient поведение) и `Sortable` (puzzle объекты).

use bevy::ecs::component::Mutable;
use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::PerceptionError;
use crate::lighting::DarknessOracle;

/// Тег capability в engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    Observable,
    Sortable,
}

/// Направление observation transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationDirection {
    /// Объект попал в поле зрения
    Observed,
    /// Объект вышел из поля зрения
    Unobserved,
}

/// Побочный эффект hook'а → превращается в engine event после вызова
#[derive(Debug, Clone, PartialEq)]
pub enum HookEffect {
    /// Behaviour hook сработал (generic OnObserved/OnUnobserved event)
    Fired(ObservationDirection),
    /// Запрос на проигрывание звука (audio — внешний коллаборатор)
    Sound { clip: String, volume: f32 },
    /// Визуальный эффект (particles) на entity
    Particles,
}

/// Контекст вызова capability notification / behaviour hook
///
/// Hook видит только свою entity: transform, RNG симуляции, darkness oracle.
/// Эффекты копятся в `effects`, система превращает их в events.
pub struct HookContext<'a> {
    pub entity: Entity,
    pub now: f32,
    pub transform: &'a mut Transform,
    pub rng: &'a mut ChaCha8Rng,
    pub darkness: Option<&'a dyn DarknessOracle>,
    pub effects: Vec<HookEffect>,
}

impl<'a> HookContext<'a> {
    pub fn new(entity: Entity, now: f32, transform: &'a mut Transform, rng: &'a mut ChaCha8Rng) -> Self {
        Self {
            entity,
            now,
            transform,
            rng,
            darkness: None,
            effects: Vec::new(),
        }
    }

    pub fn with_darkness(mut self, darkness: Option<&'a dyn DarknessOracle>) -> Self {
        self.darkness = darkness;
        self
    }

    pub fn push(&mut self, effect: HookEffect) {
        self.effects.push(effect);
    }
}

/// Capability interface, которую perception loop вызывает на кандидатах
pub trait TrackedCapability: Component<Mutability = Mutable> {
    const KIND: CapabilityKind;

    /// Может ли объект сейчас наблюдаться (enabled, active)
    fn can_be_observed(&self) -> bool;

    fn handle_became_observed(&mut self, ctx: &mut HookContext<'_>);

    fn handle_left_observation(&mut self, ctx: &mut HookContext<'_>);

    /// Кандидат в радиусе, но не прошёл visibility test на этом tick
    fn on_in_range_hidden(&mut self) {}

    /// Битый конфиг → entity пропускается perception tick'ом (warning один раз)
    fn validate_config(&self) -> Result<(), PerceptionError> {
        Ok(())
    }
}
