//! Spatial/occlusion provider
//!
//! Perception спрашивает сцену только через два trait'а:
//! - `SpatialQuery` — кандидаты в радиусе (overlap sphere)
//! - `OcclusionQuery` — ближайшая поверхность вдоль луча
//!
//! Backend — Rapier query pipeline (`PhysicsScene`): коллайдеры живут в physics world,
//! слой collider'а = `CollisionGroups::memberships`.
//! Rapier step идёт в FixedPostUpdate, поэтому perception видит сцену предыдущего step.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::shared::{query_groups, transformed_bounds, Bounds, LayerMask};

#[cfg(test)]
mod scene_colliders;
#[cfg(test)]
pub use scene_colliders::SceneColliders;

/// Кандидат на видимость (валиден только в пределах одного tick)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub entity: Entity,
    pub bounds: Bounds,
    pub layers: LayerMask,
}

/// Результат raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub distance: f32,
}

pub trait SpatialQuery {
    /// Все коллайдеры на слоях `layers`, пересекающие сферу (center, radius)
    fn query_within_radius(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<Candidate>;
}

pub trait OcclusionQuery {
    /// Ближайший collider вдоль луча в пределах `max_distance`.
    ///
    /// `ignore` — collider самого наблюдателя (луч стартует внутри него).
    fn raycast_nearest(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
        ignore: Option<Entity>,
    ) -> Option<RayHit>;
}

/// Rapier context + коллайдеры сцены как `SpatialQuery` / `OcclusionQuery`
#[derive(SystemParam)]
pub struct PhysicsScene<'w, 's> {
    context: ReadRapierContext<'w, 's>,
    colliders: Query<'w, 's, (&'static Collider, &'static GlobalTransform, Option<&'static CollisionGroups>)>,
}

impl PhysicsScene<'_, '_> {
    /// World AABB и слой collider'а (None → entity без collider)
    pub fn candidate(&self, entity: Entity) -> Option<Candidate> {
        let (collider, global, groups) = self.colliders.get(entity).ok()?;

        let local = collider.raw.compute_local_aabb();
        let local = Bounds::from_min_max(
            Vec3::new(local.mins.x, local.mins.y, local.mins.z),
            Vec3::new(local.maxs.x, local.maxs.y, local.maxs.z),
        );
        // Scale уже применён к `raw` самим Rapier
        let (_, rotation, translation) = global.to_scale_rotation_translation();
        let pose = Transform::from_translation(translation).with_rotation(rotation);

        Some(Candidate {
            entity,
            bounds: transformed_bounds(&pose, local.center, local.half_extents),
            layers: groups.map_or(LayerMask::ALL, |groups| groups.memberships.into()),
        })
    }
}

impl SpatialQuery for PhysicsScene<'_, '_> {
    fn query_within_radius(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<Candidate> {
        let Ok(context) = self.context.single() else {
            return Vec::new();
        };

        let mut entities = Vec::new();
        let filter = QueryFilter::new().groups(query_groups(layers));
        context.intersect_shape(center, Quat::IDENTITY, &*Collider::ball(radius).raw, filter, |entity| {
            entities.push(entity);
            true
        });

        // Стабильный порядок кандидатов между прогонами
        entities.sort_unstable();
        entities.dedup();
        entities
            .into_iter()
            .filter_map(|entity| self.candidate(entity))
            .collect()
    }
}

impl OcclusionQuery for PhysicsScene<'_, '_> {
    fn raycast_nearest(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
        ignore: Option<Entity>,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        let Ok(context) = self.context.single() else {
            return None;
        };

        let mut filter = QueryFilter::new().groups(query_groups(layers));
        if let Some(entity) = ignore {
            filter = filter.exclude_collider(entity);
        }

        context
            .cast_ray(origin, direction, max_distance, true, filter)
            .map(|(entity, distance)| RayHit { entity, distance })
    }
}

/// Physics backend для spatial queries (Rapier в fixed schedule)
pub struct SpatialPlugin;

impl Plugin for SpatialPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<RapierPhysicsPlugin<NoUserData>>() {
            app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::ecs::system::SystemState;
    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::shared::{collision_groups, LAYER_DEFAULT, LAYER_OBSERVABLES, LAYER_SORTABLES, LAYER_VIEWERS};

    fn physics_app() -> App {
        let mut app = crate::create_headless_app(1);
        app.add_plugins(SpatialPlugin)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)));
        app
    }

    fn spawn_box(app: &mut App, center: Vec3, half: f32, layers: LayerMask) -> Entity {
        app.world_mut()
            .spawn((
                Collider::cuboid(half, half, half),
                collision_groups(layers),
                Transform::from_translation(center),
            ))
            .id()
    }

    fn settle(app: &mut App) {
        for _ in 0..4 {
            app.update();
        }
    }

    #[test]
    fn test_query_within_radius_filters_by_distance_and_layer() {
        let mut app = physics_app();
        let near = spawn_box(&mut app, Vec3::new(0.0, 0.0, 5.0), 0.5, LAYER_OBSERVABLES);
        spawn_box(&mut app, Vec3::new(0.0, 0.0, 40.0), 0.5, LAYER_OBSERVABLES);
        spawn_box(&mut app, Vec3::new(0.0, 0.0, 3.0), 0.5, LAYER_SORTABLES);
        settle(&mut app);

        let mut state = SystemState::<PhysicsScene>::new(app.world_mut());
        let scene = state.get(app.world());
        let found = scene.query_within_radius(Vec3::ZERO, 10.0, LAYER_OBSERVABLES);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity, near);
        assert!(found[0].bounds.center.distance(Vec3::new(0.0, 0.0, 5.0)) < 1e-4);
        assert!((found[0].bounds.half_extents - Vec3::splat(0.5)).abs().max_element() < 1e-4);
        assert_eq!(found[0].layers, LAYER_OBSERVABLES);
    }

    #[test]
    fn test_raycast_returns_nearest_hit() {
        let mut app = physics_app();
        spawn_box(&mut app, Vec3::new(0.0, 0.0, 10.0), 0.5, LAYER_DEFAULT);
        let front = spawn_box(&mut app, Vec3::new(0.0, 0.0, 5.0), 0.5, LAYER_DEFAULT);
        settle(&mut app);

        let mut state = SystemState::<PhysicsScene>::new(app.world_mut());
        let scene = state.get(app.world());
        let hit = scene
            .raycast_nearest(Vec3::ZERO, Vec3::Z, 20.0, LayerMask::ALL, None)
            .expect("ray should hit");

        assert_eq!(hit.entity, front);
        assert!((hit.distance - 4.5).abs() < 1e-3);
    }

    #[test]
    fn test_raycast_ignores_masked_layers() {
        let mut app = physics_app();
        spawn_box(&mut app, Vec3::new(0.0, 0.0, 5.0), 0.5, LAYER_SORTABLES);
        settle(&mut app);

        let mut state = SystemState::<PhysicsScene>::new(app.world_mut());
        let scene = state.get(app.world());

        assert!(scene
            .raycast_nearest(Vec3::ZERO, Vec3::Z, 20.0, LAYER_DEFAULT, None)
            .is_none());
    }

    #[test]
    fn test_raycast_skips_ignored_viewer_collider() {
        let mut app = physics_app();
        let viewer = spawn_box(&mut app, Vec3::ZERO, 0.5, LAYER_VIEWERS);
        let wall = spawn_box(&mut app, Vec3::new(0.0, 0.0, 5.0), 0.5, LAYER_DEFAULT);
        settle(&mut app);

        let mut state = SystemState::<PhysicsScene>::new(app.world_mut());
        let scene = state.get(app.world());

        // Луч стартует внутри viewer collider
        let hit = scene.raycast_nearest(Vec3::ZERO, Vec3::Z, 20.0, LayerMask::ALL, None);
        assert_eq!(hit.map(|hit| hit.entity), Some(viewer));

        let hit = scene.raycast_nearest(Vec3::ZERO, Vec3::Z, 20.0, LayerMask::ALL, Some(viewer));
        assert_eq!(hit.map(|hit| hit.entity), Some(wall));
    }

    #[test]
    fn test_raycast_zero_direction_is_miss() {
        let mut app = physics_app();
        spawn_box(&mut app, Vec3::new(0.0, 0.0, 5.0), 0.5, LAYER_DEFAULT);
        settle(&mut app);

        let mut state = SystemState::<PhysicsScene>::new(app.world_mut());
        let scene = state.get(app.world());

        assert!(scene
            .raycast_nearest(Vec3::ZERO, Vec3::ZERO, 20.0, LayerMask::ALL, None)
            .is_none());
    }
}
