//! Observable systems (после perception tick)

use bevy::prelude::*;

use crate::perception::{CapabilityKind, HookContext, PerceptionEvents};
use crate::DeterministicRng;

use super::components::Observable;

/// System: отложенные observed/unobserved triggers, чьё время пришло
///
/// Gate НЕ перепроверяется (проверен в момент запроса).
pub fn fire_due_observation_triggers(
    time: Res<Time>,
    mut rng: ResMut<DeterministicRng>,
    mut observables: Query<(Entity, &mut Observable, &mut Transform)>,
    mut events: PerceptionEvents,
) {
    let now = time.elapsed_secs();

    for (entity, mut observable, mut transform) in observables.iter_mut() {
        // Битый конфиг: ждём починки (warning уже выдал perception tick)
        if !observable.state.has_pending() || observable.validate().is_err() {
            continue;
        }

        let mut ctx = HookContext::new(entity, now, &mut transform, &mut rng.rng);
        observable.fire_due(&mut ctx);
        let effects = ctx.effects;
        events.flush_hook_effects(entity, CapabilityKind::Observable, effects);
    }
}

/// System: продвинуть motion / color fade / delayed sounds
pub fn advance_observable_behaviors(
    time: Res<Time>,
    mut rng: ResMut<DeterministicRng>,
    mut observables: Query<(Entity, &mut Observable, &mut Transform)>,
    mut events: PerceptionEvents,
) {
    let now = time.elapsed_secs();

    for (entity, mut observable, mut transform) in observables.iter_mut() {
        if !observable.behavior.is_animating() {
            continue;
        }

        let volume = observable.config.audio_volume;
        let mut ctx = HookContext::new(entity, now, &mut transform, &mut rng.rng);
        observable.behavior.advance(&mut ctx, volume);
        let effects = ctx.effects;
        events.flush_hook_effects(entity, CapabilityKind::Observable, effects);
    }
}
