//! Perception domain — кто что видит и когда это меняется
//!
//! Архитектура:
//! - `visibility` — pure stage pipeline (distance → FOV/frustum → viewport → occlusion)
//! - `tracker` — `PerceptionLoop<C>`: visible set + diff на viewer entity
//! - `systems` — generic `perception_tick::<C>`, dispatch в `TrackedCapability`
//!
//! Один engine, два инстанса: `PerceptionPlugin::<Observable>`, `PerceptionPlugin::<Sortable>`.

use std::marker::PhantomData;

use bevy::prelude::*;

pub mod capability;
pub mod events;
pub mod systems;
pub mod tracker;
pub mod viewer;
pub mod visibility;


pub use capability::*;
pub use events::*;
pub use systems::{perception_tick, PerceptionEvents};
pub use tracker::{PerceptionLoop, TickReport, VisibilityDiff};
pub use viewer::{Viewer, ViewerConfig, ViewerPose};
pub use visibility::{evaluate, is_visible, VisibilityVerdict};

use crate::spatial::SpatialPlugin;
use crate::DeterministicRng;

/// Порядок perception работы внутри одного fixed step
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerceptionSet {
    /// Свет, внешние команды
    Environment,
    /// perception_tick::<C>
    Tick,
    /// Delayed observation triggers
    Triggers,
    /// Motion / fades / delayed sounds
    Behaviors,
}

/// Общие ресурсы, events, physics backend и порядок sets (добавляется один раз)
pub struct PerceptionCorePlugin;

impl Plugin for PerceptionCorePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        if !app.is_plugin_added::<SpatialPlugin>() {
            app.add_plugins(SpatialPlugin);
        }

        app.add_event::<ObjectBecameVisible>()
            .add_event::<ObjectLeftView>()
            .add_event::<EntityStateChanged>()
            .add_event::<ObservationFired>()
            .add_event::<SoundCue>()
            .add_event::<EffectTriggered>()
            .configure_sets(
                FixedUpdate,
                (
                    PerceptionSet::Environment,
                    PerceptionSet::Tick,
                    PerceptionSet::Triggers,
                    PerceptionSet::Behaviors,
                )
                    .chain(),
            );
    }
}

/// Perception engine для capability `C`
pub struct PerceptionPlugin<C: TrackedCapability> {
    _capability: PhantomData<fn() -> C>,
}

impl<C: TrackedCapability> Default for PerceptionPlugin<C> {
    fn default() -> Self {
        Self {
            _capability: PhantomData,
        }
    }
}

impl<C: TrackedCapability> Plugin for PerceptionPlugin<C> {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<PerceptionCorePlugin>() {
            app.add_plugins(PerceptionCorePlugin);
        }

        app.add_systems(FixedUpdate, perception_tick::<C>.in_set(PerceptionSet::Tick));
    }
}
