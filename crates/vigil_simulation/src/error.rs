//! Perception error taxonomy
//!
//! Все ошибки восстанавливаются локально: система логирует и продолжает tick.
//! Ни одна не пересекает границу perception tick.

use bevy::prelude::Entity;
use thiserror::Error;

use crate::perception::ObservationDirection;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PerceptionError {
    /// Нет projection source и custom FOV выключен → frustum/viewport stages пропускаются
    #[error("viewer {viewer:?} has no projection and custom FOV is off; frustum and viewport checks skipped")]
    MissingProjection { viewer: Entity },

    /// Кандидат без bounds или без capability → пропускаем только его
    #[error("candidate {entity:?} skipped: {reason}")]
    InvalidCandidate { entity: Entity, reason: &'static str },

    /// Delayed trigger запрошен, пока такой же ещё pending (policy: replace)
    #[error("entity {entity:?} already had a pending {direction:?} trigger; replaced")]
    SchedulingConflict {
        entity: Entity,
        direction: ObservationDirection,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
