//! Perception systems
//!
//! `perception_tick::<C>` — generic system, один на capability.
//! Порядок внутри tick: invalid → hidden → enters → exits.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::error::PerceptionError;
use crate::lighting::{DarknessOracle, LightSwitch};
use crate::spatial::PhysicsScene;
use crate::DeterministicRng;

use super::capability::{CapabilityKind, HookContext, HookEffect, TrackedCapability};
use super::events::{
    EffectTriggered, EntityStateChanged, ObjectBecameVisible, ObjectLeftView, ObservationFired, SoundCue,
};
use super::tracker::PerceptionLoop;
use super::viewer::{Viewer, ViewerPose};

/// Все event writers perception engine одним параметром
#[derive(SystemParam)]
pub struct PerceptionEvents<'w> {
    pub became_visible: EventWriter<'w, ObjectBecameVisible>,
    pub left_view: EventWriter<'w, ObjectLeftView>,
    pub state_changed: EventWriter<'w, EntityStateChanged>,
    pub fired: EventWriter<'w, ObservationFired>,
    pub sounds: EventWriter<'w, SoundCue>,
    pub effects: EventWriter<'w, EffectTriggered>,
}

impl PerceptionEvents<'_> {
    /// HookEffect (накопленные в HookContext) → engine events
    pub fn flush_hook_effects(&mut self, entity: Entity, capability: CapabilityKind, effects: Vec<HookEffect>) {
        for effect in effects {
            match effect {
                HookEffect::Fired(direction) => {
                    self.fired.write(ObservationFired { entity, direction });
                    self.state_changed.write(EntityStateChanged { entity, capability });
                }
                HookEffect::Sound { clip, volume } => {
                    self.sounds.write(SoundCue { entity, clip, volume });
                }
                HookEffect::Particles => {
                    self.effects.write(EffectTriggered { entity });
                }
            }
        }
    }
}

/// System: perception tick для всех viewers с `PerceptionLoop<C>`
///
/// Due tick → spatial query → visibility test → diff →
/// enter notifications (все) → exit notifications (все) → events.
///
/// Entity с `Viewer` и `C` одновременно не участвует ни как viewer, ни как цель
/// (`Without<C>` / `Without<Viewer>`); логируется один раз при добавлении `C`.
pub fn perception_tick<C: TrackedCapability>(
    time: Res<Time>,
    scene: PhysicsScene,
    light: Option<Res<LightSwitch>>,
    mut rng: ResMut<DeterministicRng>,
    mut viewers: Query<(Entity, &Viewer, &Transform, &mut PerceptionLoop<C>), Without<C>>,
    mut tracked: Query<(&mut C, &mut Transform), Without<Viewer>>,
    tracked_viewers: Query<Entity, (With<C>, With<Viewer>, Added<C>)>,
    mut events: PerceptionEvents,
) {
    for entity in tracked_viewers.iter() {
        crate::logger::log_warning(&format!(
            "⚠️ {:?} is both Viewer and {:?}: skipped by its perception",
            entity,
            C::KIND
        ));
    }

    let now = time.elapsed_secs();
    let darkness = light.as_deref().map(|switch| switch as &dyn DarknessOracle);

    for (viewer_entity, viewer, viewer_transform, mut tracker) in viewers.iter_mut() {
        if !tracker.is_due(now) {
            continue;
        }

        if let Err(error) = viewer.config.validate() {
            if tracker.report_invalid_config() {
                crate::logger::log_warning(&format!("⚠️ Viewer {:?} skipped: {}", viewer_entity, error));
            }
            continue;
        }
        tracker.clear_invalid_config();
        tracker.advance_schedule(now, viewer.config.update_period);

        let pose = ViewerPose::new(viewer, viewer_transform).with_entity(viewer_entity);
        if pose.missing_projection() && tracker.report_missing_projection() {
            crate::logger::log_warning(
                &PerceptionError::MissingProjection {
                    viewer: viewer_entity,
                }
                .to_string(),
            );
        }

        let report = tracker.evaluate(
            &pose,
            &scene,
            &scene,
            viewer.config.candidate_layers,
            |entity| {
                tracked.get(entity).ok().map(|(capability, _)| {
                    capability
                        .validate_config()
                        .map(|()| capability.can_be_observed())
                })
            },
        );

        for error in &report.invalid {
            crate::logger::log_warning(&error.to_string());
        }

        for entity in report.hidden_in_range {
            if let Ok((mut capability, _)) = tracked.get_mut(entity) {
                capability.on_in_range_hidden();
            }
        }

        // Enters строго до exits
        for &entity in &report.diff.entered {
            crate::logger::log(&format!(
                "👁️ {:?} {:?} became visible to {:?}",
                C::KIND, entity, viewer_entity
            ));

            if let Ok((mut capability, mut transform)) = tracked.get_mut(entity) {
                let mut ctx = HookContext::new(entity, now, &mut transform, &mut rng.rng).with_darkness(darkness);
                capability.handle_became_observed(&mut ctx);
                let effects = ctx.effects;
                events.flush_hook_effects(entity, C::KIND, effects);
            }

            events.became_visible.write(ObjectBecameVisible {
                viewer: viewer_entity,
                entity,
                capability: C::KIND,
            });
        }

        for &entity in &report.diff.exited {
            crate::logger::log(&format!(
                "🙈 {:?} {:?} left view of {:?}",
                C::KIND, entity, viewer_entity
            ));

            // Despawned → только event, без capability call
            if let Ok((mut capability, mut transform)) = tracked.get_mut(entity) {
                let mut ctx = HookContext::new(entity, now, &mut transform, &mut rng.rng).with_darkness(darkness);
                capability.handle_left_observation(&mut ctx);
                let effects = ctx.effects;
                events.flush_hook_effects(entity, C::KIND, effects);
            }

            events.left_view.write(ObjectLeftView {
                viewer: viewer_entity,
                entity,
                capability: C::KIND,
            });
        }
    }
}
