//! Shared domain — cross-cutting типы
//!
//! Содержит типы используемые в нескольких доменах:
//! - Geometry (Bounds, Frustum)
//! - Layers (LayerMask, LAYER_* / MASK_* константы)
//! - Camera (PerspectiveLens, ViewProjection)

pub mod camera;
pub mod geometry;
pub mod layers;

pub use camera::*;
pub use geometry::*;
pub use layers::*;
