//! Viewer — наблюдатель (игрок / камера)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::PerceptionError;
use crate::shared::{view_from_world, LayerMask, PerspectiveLens, ViewProjection};

/// Параметры наблюдателя (дефолты = инспектор игры)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Радиус обнаружения (метры)
    pub max_detection_distance: f32,
    /// Период perception tick (секунды)
    pub update_period: f32,
    /// Слои, на которых ищем кандидатов
    pub candidate_layers: LayerMask,

    /// Custom FOV: угловой тест вместо frustum
    pub use_custom_fov: bool,
    /// Полный горизонтальный угол (градусы)
    pub horizontal_fov: f32,
    /// Полный вертикальный угол (градусы)
    pub vertical_fov: f32,
    /// Брать FOV из lens при создании viewer
    pub derive_fov_from_lens: bool,

    /// Occlusion raycast (самый дорогой stage)
    pub occlusion: bool,
    pub occlusion_layers: LayerMask,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            max_detection_distance: 50.0,
            update_period: 0.1,
            candidate_layers: LayerMask::ALL,
            use_custom_fov: false,
            horizontal_fov: 60.0,
            vertical_fov: 60.0,
            derive_fov_from_lens: true,
            occlusion: true,
            occlusion_layers: LayerMask::ALL,
        }
    }
}

impl ViewerConfig {
    /// Custom FOV конфиг с явными углами (без derive из lens)
    pub fn custom_fov(horizontal_fov: f32, vertical_fov: f32) -> Self {
        Self {
            use_custom_fov: true,
            horizontal_fov,
            vertical_fov,
            derive_fov_from_lens: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), PerceptionError> {
        if !(self.max_detection_distance > 0.0) {
            return Err(PerceptionError::InvalidConfig(format!(
                "max_detection_distance must be > 0, got {}",
                self.max_detection_distance
            )));
        }
        if !(self.update_period >= 0.0) {
            return Err(PerceptionError::InvalidConfig(format!(
                "update_period must be >= 0, got {}",
                self.update_period
            )));
        }
        for (name, fov) in [("horizontal_fov", self.horizontal_fov), ("vertical_fov", self.vertical_fov)] {
            // half-angle ∈ (0°, 180°)
            if !(fov > 0.0 && fov < 360.0) {
                return Err(PerceptionError::InvalidConfig(format!(
                    "{} must be in (0, 360) degrees, got {}",
                    name, fov
                )));
            }
        }
        Ok(())
    }
}

/// Viewer component (позиция/ориентация — из Transform той же entity)
#[derive(Component, Debug, Clone)]
pub struct Viewer {
    pub config: ViewerConfig,
    /// Projection source; None → frustum/viewport stages недоступны
    pub lens: Option<PerspectiveLens>,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(ViewerConfig::default(), Some(PerspectiveLens::default()))
    }
}

impl Viewer {
    pub fn new(config: ViewerConfig, lens: Option<PerspectiveLens>) -> Self {
        let mut viewer = Self { config, lens };
        if viewer.config.derive_fov_from_lens {
            viewer.refresh_fov_from_lens();
        }
        viewer
    }

    /// FOV из lens: horizontal = fov камеры, vertical = horizontal / aspect.
    ///
    /// Повторяет формулу игры (fov камеры там вертикальный, но трактуется как горизонтальный).
    /// Возвращает false если lens нет.
    pub fn refresh_fov_from_lens(&mut self) -> bool {
        let Some(lens) = self.lens.as_ref() else {
            return false;
        };
        if lens.aspect() <= 0.0 {
            return false;
        }

        self.config.horizontal_fov = lens.fov_degrees();
        self.config.vertical_fov = self.config.horizontal_fov / lens.aspect();
        crate::logger::log(&format!(
            "Viewer FOV updated from lens: H{:.1}° V{:.1}°",
            self.config.horizontal_fov, self.config.vertical_fov
        ));
        true
    }

    pub fn horizontal_fov(&self) -> f32 {
        self.config.horizontal_fov
    }

    pub fn vertical_fov(&self) -> f32 {
        self.config.vertical_fov
    }
}

/// Snapshot viewer на момент tick (всё, что нужно visibility test)
pub struct ViewerPose<'a> {
    pub position: Vec3,
    pub rotation: Quat,
    pub view_from_world: Mat4,
    pub max_distance: f32,
    /// Полные углы (H, V) в custom FOV режиме
    pub custom_fov: Option<Vec2>,
    pub projection: Option<&'a dyn ViewProjection>,
    /// Some → occlusion включён
    pub occlusion_layers: Option<LayerMask>,
    /// Entity наблюдателя: его collider не перекрывает собственный луч
    pub viewer: Option<Entity>,
}

impl<'a> ViewerPose<'a> {
    pub fn new(viewer: &'a Viewer, transform: &Transform) -> Self {
        let config = &viewer.config;
        Self {
            position: transform.translation,
            rotation: transform.rotation,
            view_from_world: view_from_world(transform),
            max_distance: config.max_detection_distance,
            custom_fov: config
                .use_custom_fov
                .then(|| Vec2::new(config.horizontal_fov, config.vertical_fov)),
            projection: viewer.lens.as_ref().map(|lens| lens as &dyn ViewProjection),
            occlusion_layers: config.occlusion.then_some(config.occlusion_layers),
            viewer: None,
        }
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.viewer = Some(entity);
        self
    }

    /// Направление в local basis: x = right, y = up, z = forward
    pub fn to_local(&self, direction: Vec3) -> Vec3 {
        let right = self.rotation * Vec3::X;
        let up = self.rotation * Vec3::Y;
        let forward = self.rotation * Vec3::NEG_Z;
        Vec3::new(direction.dot(right), direction.dot(up), direction.dot(forward))
    }

    /// Ни projection, ни custom FOV → frustum test невозможен
    pub fn missing_projection(&self) -> bool {
        self.custom_fov.is_none() && self.projection.is_none()
    }
}
