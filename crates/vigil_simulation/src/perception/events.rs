//! Perception events (engine → gameplay / audio / UI)

use bevy::prelude::*;

use super::capability::{CapabilityKind, ObservationDirection};

/// Объект вошёл в visible set наблюдателя
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectBecameVisible {
    pub viewer: Entity,
    pub entity: Entity,
    pub capability: CapabilityKind,
}

/// Объект покинул visible set (в т.ч. despawned)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLeftView {
    pub viewer: Entity,
    pub entity: Entity,
    pub capability: CapabilityKind,
}

/// Состояние capability изменилось (UI / save слушают)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityStateChanged {
    pub entity: Entity,
    pub capability: CapabilityKind,
}

/// Behaviour hook сработал (OnObserved / OnUnobserved)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationFired {
    pub entity: Entity,
    pub direction: ObservationDirection,
}

/// Запрос на звук (проигрывание — audio layer)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct SoundCue {
    pub entity: Entity,
    pub clip: String,
    pub volume: f32,
}

/// Particle effect на позиции entity
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectTriggered {
    pub entity: Entity,
}
