//! Геометрия для perception: world-space AABB, frustum planes.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// World-space axis-aligned bounding box (center + half extents)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Bounds {
    /// Extents не нормализуются: битые (отрицательные) отсеивает perception
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self { center, half_extents }
    }

    /// Куб со стороной `size`
    pub fn cube(center: Vec3, size: f32) -> Self {
        Self::new(center, Vec3::splat(size * 0.5))
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }
}

/// Plane в форме `normal · p + distance >= 0` = внутри
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumPlane {
    pub normal: Vec3,
    pub distance: f32,
}

impl FrustumPlane {
    /// Из строки view-projection матрицы (Gribb/Hartmann), с нормализацией
    fn from_row(row: Vec4) -> Self {
        let normal = row.truncate();
        let length = normal.length();
        if length <= f32::EPSILON {
            return Self {
                normal: Vec3::ZERO,
                distance: row.w,
            };
        }
        Self {
            normal: normal / length,
            distance: row.w / length,
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Шесть плоскостей view frustum: left, right, bottom, top, near, far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [FrustumPlane; 6],
}

impl Frustum {
    /// Извлекает плоскости из `clip_from_world` (depth range 0..1, как `Mat4::perspective_rh`)
    pub fn from_clip_from_world(clip_from_world: Mat4) -> Self {
        let r0 = clip_from_world.row(0);
        let r1 = clip_from_world.row(1);
        let r2 = clip_from_world.row(2);
        let r3 = clip_from_world.row(3);

        Self {
            planes: [
                FrustumPlane::from_row(r3 + r0), // left
                FrustumPlane::from_row(r3 - r0), // right
                FrustumPlane::from_row(r3 + r1), // bottom
                FrustumPlane::from_row(r3 - r1), // top
                FrustumPlane::from_row(r2),      // near
                FrustumPlane::from_row(r3 - r2), // far
            ],
        }
    }

    /// Plane vs AABB: reject только если коробка целиком за какой-то плоскостью
    pub fn intersects_bounds(&self, bounds: &Bounds) -> bool {
        self.planes.iter().all(|plane| {
            let radius = plane.normal.abs().dot(bounds.half_extents);
            plane.signed_distance(bounds.center) + radius >= 0.0
        })
    }
}

/// World AABB повернутого/масштабированного box collider
pub fn transformed_bounds(transform: &Transform, offset: Vec3, half_extents: Vec3) -> Bounds {
    let scaled = half_extents * transform.scale.abs();
    let basis = Mat3::from_quat(transform.rotation);
    let extents = basis.x_axis.abs() * scaled.x
        + basis.y_axis.abs() * scaled.y
        + basis.z_axis.abs() * scaled.z;
    let center = transform.transform_point(offset);

    Bounds::new(center, extents)
}
