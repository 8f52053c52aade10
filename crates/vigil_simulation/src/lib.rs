//! VIGIL Simulation Core
//!
//! ECS-симуляция на Bevy 0.16: perception engine (кто что видит) и
//! объекты, реагирующие на взгляд игрока.
//!
//! Архитектура:
//! - `spatial` — overlap sphere и raycast поверх Rapier query pipeline
//! - `perception` — visibility pipeline + generic `PerceptionLoop<C>`
//! - `observable` / `sortable` — две capability поверх одного engine
//! - `lighting` — выключатель света (darkness gate)
//!
//! Рендер, audio, UI и input — внешние слои, общаются через events.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod error;
pub mod lighting;
pub mod logger;
pub mod observable;
pub mod perception;
pub mod shared;
pub mod sortable;
pub mod spatial;

// Re-export основных типов для удобства
pub use error::PerceptionError;
pub use lighting::{DarknessOracle, LightCommand, LightSwitch, LightToggled, LightingPlugin};
pub use observable::{Observable, ObservableBehavior, ObservableConfig, ObservablePlugin};
pub use perception::{
    CapabilityKind, EffectTriggered, EntityStateChanged, ObjectBecameVisible, ObjectLeftView, ObservationDirection,
    ObservationFired, PerceptionLoop, PerceptionSet, SoundCue, TrackedCapability, Viewer, ViewerConfig,
};
pub use bevy_rapier3d::prelude::Collider;
pub use shared::{collision_groups, Bounds, LayerMask, PerspectiveLens};
pub use sortable::{Sortable, SortablePlugin, SortRequest, SortStateChanged, SortingRules};
pub use spatial::{PhysicsScene, SpatialPlugin};

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            // Подсистемы (DeterministicRng добавляется perception core, если seed не задан)
            .add_plugins((LightingPlugin, ObservablePlugin, SortablePlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    logger::init_logger();
    // TransformPlugin: GlobalTransform для коллайдеров Rapier
    app.add_plugins((MinimalPlugins, bevy::transform::TransformPlugin))
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Сериализуем в байты через Debug (простейший способ)
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
