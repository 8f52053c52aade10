//! Camera projection provider
//!
//! Perception не владеет камерой: нужен только узкий интерфейс
//! (field of view, aspect, world → viewport, frustum planes).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::geometry::Frustum;

/// Projection provider для viewer
///
/// Viewport coordinates: x/y ∈ [0, 1] на экране, z = глубина вдоль forward
/// (≤ 0 → точка позади камеры).
pub trait ViewProjection: Send + Sync {
    /// Field of view камеры (градусы)
    fn fov_degrees(&self) -> f32;

    fn aspect(&self) -> f32;

    /// Projection matrix (view space → clip space, depth range 0..1)
    fn clip_from_view(&self) -> Mat4;

    fn world_to_viewport(&self, view_from_world: Mat4, point: Vec3) -> Vec3 {
        let clip = self.clip_from_view() * view_from_world * point.extend(1.0);
        let depth = clip.w;
        if depth.abs() <= f32::EPSILON {
            return Vec3::new(0.5, 0.5, depth);
        }

        let ndc = clip.truncate() / depth;
        Vec3::new((ndc.x + 1.0) * 0.5, (ndc.y + 1.0) * 0.5, depth)
    }

    fn frustum(&self, view_from_world: Mat4) -> Frustum {
        Frustum::from_clip_from_world(self.clip_from_view() * view_from_world)
    }
}

/// Perspective lens (аналог игровой камеры)
///
/// `fov_degrees` — вертикальный угол, как у камеры движка.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveLens {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveLens {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.3,
            far: 1000.0,
        }
    }
}

impl PerspectiveLens {
    pub fn new(fov_degrees: f32, aspect: f32) -> Self {
        Self {
            fov_degrees,
            aspect,
            ..Default::default()
        }
    }
}

impl ViewProjection for PerspectiveLens {
    fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    fn aspect(&self) -> f32 {
        self.aspect
    }

    fn clip_from_view(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

/// View matrix из Transform (scale игнорируется)
pub fn view_from_world(transform: &Transform) -> Mat4 {
    Mat4::from_rotation_translation(transform.rotation, transform.translation).inverse()
}
