//! Visibility test — виден ли кандидат наблюдателю прямо сейчас
//!
//! Stages (дешёвые первыми, short-circuit):
//! 1. Distance prune (центр bounds дальше max_detection_distance → нет)
//! 2. Custom FOV углы ИЛИ frustum planes vs AABB
//! 3. Viewport bounds (с 10% запасом за краем экрана против мерцания)
//! 4. Occlusion raycast (если включён)
//!
//! Детерминировано, без side effects.

use bevy::prelude::*;

use crate::spatial::{Candidate, OcclusionQuery};

use super::viewer::ViewerPose;

/// Запас за краем viewport: x/y ∈ [-0.1, 1.1]
pub const VIEWPORT_MARGIN: f32 = 0.1;

/// Поглощает f32 погрешность atan2 ровно на границе FOV (граница inclusive)
pub const FOV_EDGE_TOLERANCE_DEG: f32 = 1e-3;

/// На каком stage кандидат отсеян
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisibilityVerdict {
    Visible,
    TooFar { distance: f32 },
    OutsideFov { horizontal: f32, vertical: f32 },
    OutsideFrustum,
    OffScreen { viewport: Vec3 },
    Occluded { by: Entity },
}

impl VisibilityVerdict {
    pub fn is_visible(&self) -> bool {
        matches!(self, VisibilityVerdict::Visible)
    }
}

pub fn is_visible(pose: &ViewerPose, candidate: &Candidate, occlusion: &dyn OcclusionQuery) -> bool {
    evaluate(pose, candidate, occlusion).is_visible()
}

pub fn evaluate(
    pose: &ViewerPose,
    candidate: &Candidate,
    occlusion: &dyn OcclusionQuery,
) -> VisibilityVerdict {
    let center = candidate.bounds.center;
    let to_candidate = center - pose.position;
    let distance = to_candidate.length();

    // 1. Distance (cheapest)
    if distance > pose.max_distance {
        return VisibilityVerdict::TooFar { distance };
    }

    let direction = to_candidate.normalize_or_zero();

    // 2. FOV / frustum
    if let Some(fov) = pose.custom_fov {
        let angles = direction_angles(pose, direction);
        if !within_custom_fov(angles, fov) {
            return VisibilityVerdict::OutsideFov {
                horizontal: angles.x,
                vertical: angles.y,
            };
        }
    } else if let Some(projection) = pose.projection {
        if !projection.frustum(pose.view_from_world).intersects_bounds(&candidate.bounds) {
            return VisibilityVerdict::OutsideFrustum;
        }
    }

    // 3. Viewport bounds (объект действительно на экране)
    if let Some(projection) = pose.projection {
        let viewport = projection.world_to_viewport(pose.view_from_world, center);
        if !within_viewport(viewport) {
            return VisibilityVerdict::OffScreen { viewport };
        }
    }

    // 4. Occlusion (most expensive, do last)
    if let Some(layers) = pose.occlusion_layers {
        if let Some(hit) = occlusion.raycast_nearest(pose.position, direction, distance, layers, pose.viewer) {
            if hit.entity != candidate.entity {
                return VisibilityVerdict::Occluded { by: hit.entity };
            }
        }
    }

    VisibilityVerdict::Visible
}

/// (horizontal, vertical) углы от forward в градусах
pub fn direction_angles(pose: &ViewerPose, direction: Vec3) -> Vec2 {
    let local = pose.to_local(direction);
    Vec2::new(
        local.x.atan2(local.z).to_degrees(),
        local.y.atan2(local.z).to_degrees(),
    )
}

/// `fov` — полные углы (H, V); граница включительно
pub fn within_custom_fov(angles: Vec2, fov: Vec2) -> bool {
    let half = fov * 0.5;
    angles.x.abs() <= half.x + FOV_EDGE_TOLERANCE_DEG
        && angles.y.abs() <= half.y + FOV_EDGE_TOLERANCE_DEG
}

pub fn within_viewport(viewport: Vec3) -> bool {
    let min = -VIEWPORT_MARGIN;
    let max = 1.0 + VIEWPORT_MARGIN;

    viewport.z > 0.0
        && viewport.x >= min
        && viewport.x <= max
        && viewport.y >= min
        && viewport.y <= max
}
