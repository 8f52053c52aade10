//! Collision/query layers — centralised constants для всего проекта.
//!
//! ## Архитектура:
//! - **Layer (битовая маска):** на каком слое находится collider
//! - **Mask (битовая маска):** какие слои видит query (overlap, raycast)
//!
//! ## Layers:
//! - Layer 1 (0b1 = 1): Default (стены, мебель, окклюдеры)
//! - Layer 2 (0b10 = 2): Observables (ambient объекты наблюдения)
//! - Layer 3 (0b100 = 4): Sortables (puzzle объекты)
//! - Layer 4 (0b1000 = 8): Viewers (игрок / камера)
//!
//! ## Использование:
//! ```rust,ignore
//! commands.spawn((
//!     Collider::cuboid(0.5, 0.5, 0.5),
//!     collision_groups(LAYER_OBSERVABLES),
//!     Transform::from_xyz(0.0, 0.0, 10.0),
//! ));
//! ```

use bevy_rapier3d::prelude::{CollisionGroups, Group};
use serde::{Deserialize, Serialize};

/// Битовая маска слоёв
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Все слои (аналог `-1` в инспекторе)
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    pub fn contains_any(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn with(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }
}

impl From<Group> for LayerMask {
    fn from(group: Group) -> Self {
        LayerMask(group.bits())
    }
}

impl From<LayerMask> for Group {
    fn from(mask: LayerMask) -> Self {
        Group::from_bits_truncate(mask.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// Layer 1: окклюдеры окружения (стены, двери, мебель)
pub const LAYER_DEFAULT: LayerMask = LayerMask(0b1);

/// Layer 2: ambient observables (MaterialChanger, Mover, SoundTrigger)
pub const LAYER_OBSERVABLES: LayerMask = LayerMask(0b10);

/// Layer 3: sortable puzzle объекты (двери, ящики, капли)
pub const LAYER_SORTABLES: LayerMask = LayerMask(0b100);

/// Layer 4: viewers (коллайдер игрока не должен перекрывать его же лучи)
pub const LAYER_VIEWERS: LayerMask = LayerMask(0b1000);

/// Mask: occlusion raycast — всё кроме viewers
pub const MASK_OCCLUSION: LayerMask =
    LayerMask(LAYER_DEFAULT.0 | LAYER_OBSERVABLES.0 | LAYER_SORTABLES.0);

/// Groups для collider на слое `layers` (виден любым query)
pub fn collision_groups(layers: LayerMask) -> CollisionGroups {
    CollisionGroups::new(layers.into(), Group::ALL)
}

/// Groups для query (overlap/raycast), который видит только `mask`
pub fn query_groups(mask: LayerMask) -> CollisionGroups {
    CollisionGroups::new(Group::ALL, mask.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occlusion_mask_excludes_viewers() {
        assert!(MASK_OCCLUSION.contains_any(LAYER_DEFAULT));
        assert!(MASK_OCCLUSION.contains_any(LAYER_SORTABLES));
        assert!(!MASK_OCCLUSION.contains_any(LAYER_VIEWERS));
    }

    #[test]
    fn test_default_mask_is_all() {
        assert_eq!(LayerMask::default(), LayerMask::ALL);
        assert!(!LayerMask::NONE.contains_any(LayerMask::ALL));
    }

    #[test]
    fn test_groups_round_trip_layer_bits() {
        let groups = collision_groups(LAYER_SORTABLES);

        assert_eq!(LayerMask::from(groups.memberships), LAYER_SORTABLES);
        assert_eq!(groups.filters, Group::ALL);

        let query = query_groups(MASK_OCCLUSION);
        assert_eq!(LayerMask::from(query.filters), MASK_OCCLUSION);
    }
}
