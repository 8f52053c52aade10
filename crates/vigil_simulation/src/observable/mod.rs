//! Observable domain — объекты, которые меняются, когда на них смотрят (или нет)
//!
//! Архитектура:
//! - `components` — Observable (config + state machine), TrackedCapability impl
//! - `behaviors` — MaterialChanger / Mover / SoundTrigger
//! - `systems` — delayed triggers и time-driven behaviours

use bevy::prelude::*;

pub mod behaviors;
pub mod components;
pub mod systems;


pub use behaviors::*;
pub use components::*;
pub use systems::*;

use crate::perception::{PerceptionPlugin, PerceptionSet};

/// Observable Plugin (perception engine для Observable + behaviour systems)
pub struct ObservablePlugin;

impl Plugin for ObservablePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PerceptionPlugin::<Observable>::default())
            .add_systems(
                FixedUpdate,
                fire_due_observation_triggers.in_set(PerceptionSet::Triggers),
            )
            .add_systems(
                FixedUpdate,
                advance_observable_behaviors.in_set(PerceptionSet::Behaviors),
            );
    }
}
