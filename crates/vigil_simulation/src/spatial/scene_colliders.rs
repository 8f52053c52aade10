//! In-memory сцена из AABB для unit tests (без physics world)

use bevy::prelude::*;

use crate::shared::{Bounds, LayerMask};

use super::{Candidate, OcclusionQuery, RayHit, SpatialQuery};

#[derive(Debug, Clone, Default)]
pub struct SceneColliders {
    entries: Vec<Candidate>,
}

impl SceneColliders {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn insert(&mut self, entity: Entity, bounds: Bounds, layers: LayerMask) {
        self.entries.push(Candidate {
            entity,
            bounds,
            layers,
        });
    }
}

fn intersects_sphere(bounds: &Bounds, center: Vec3, radius: f32) -> bool {
    // Битые bounds отдаём perception на валидацию
    if !bounds.center.is_finite() || !bounds.half_extents.is_finite() {
        return true;
    }
    let closest = center.clamp(bounds.min().min(bounds.max()), bounds.max().max(bounds.min()));
    closest.distance_squared(center) <= radius * radius
}

/// Slab test; луч, стартующий внутри коробки, её не задевает
fn ray_entry(bounds: &Bounds, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
    let inverse = direction.recip();
    let t1 = (bounds.min() - origin) * inverse;
    let t2 = (bounds.max() - origin) * inverse;

    let t_enter = t1.min(t2).max_element();
    let t_exit = t1.max(t2).min_element();

    if t_enter.is_nan() || t_exit < t_enter || t_exit < 0.0 {
        return None;
    }
    if t_enter < 0.0 || t_enter > max_distance {
        return None;
    }
    Some(t_enter)
}

impl SpatialQuery for SceneColliders {
    fn query_within_radius(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<Candidate> {
        self.entries
            .iter()
            .filter(|entry| layers.contains_any(entry.layers))
            .filter(|entry| intersects_sphere(&entry.bounds, center, radius))
            .copied()
            .collect()
    }
}

impl OcclusionQuery for SceneColliders {
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

        self.entries
            .iter()
            .filter(|entry| layers.contains_any(entry.layers))
            .filter(|entry| Some(entry.entity) != ignore)
            .filter_map(|entry| {
                ray_entry(&entry.bounds, origin, direction, max_distance).map(|distance| RayHit {
                    entity: entry.entity,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
