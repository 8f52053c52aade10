//! Sortable domain — puzzle объекты, которые игрок сортирует взглядом + interact
//!
//! Perception engine отмечает, что в кадре (`in_camera_range`), если
//! `SortingRules::highlight_visible` включён.
//! Interaction layer шлёт `SortRequest`, правила решают, принять ли его.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::perception::{
    CapabilityKind, EntityStateChanged, HookContext, ObjectBecameVisible, ObjectLeftView, PerceptionLoop,
    PerceptionPlugin, PerceptionSet, TrackedCapability,
};

/// Sortable component
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Sortable {
    pub name: String,
    pub is_sorted: bool,
    /// Сейчас виден sortable-viewer'у
    pub in_camera_range: bool,
    /// Outline (включает interaction layer, снимает perception)
    pub highlighted: bool,
    pub active: bool,
}

impl Sortable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_sorted: false,
            in_camera_range: false,
            highlighted: false,
            active: true,
        }
    }

    pub fn sort(&mut self) {
        self.is_sorted = true;
    }

    pub fn unsort(&mut self) {
        self.is_sorted = false;
    }

    /// Highlight только для объектов в кадре; возвращает итоговое состояние
    pub fn set_highlighted(&mut self, highlighted: bool) -> bool {
        self.highlighted = highlighted && self.in_camera_range;
        self.highlighted
    }

    fn leave_camera_range(&mut self) {
        self.in_camera_range = false;
        self.highlighted = false;
    }
}

impl TrackedCapability for Sortable {
    const KIND: CapabilityKind = CapabilityKind::Sortable;

    fn can_be_observed(&self) -> bool {
        self.active
    }

    // Enter/exit обрабатывает `update_sortable_highlight` (зависит от SortingRules)
    fn handle_became_observed(&mut self, _ctx: &mut HookContext<'_>) {}

    fn handle_left_observation(&mut self, _ctx: &mut HookContext<'_>) {}

    fn on_in_range_hidden(&mut self) {
        self.leave_camera_range();
    }
}

/// Правила взаимодействия с sortables
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortingRules {
    /// Отклонять запросы для объектов вне поля зрения
    pub only_visible: bool,
    /// Enter/exit обновляют `in_camera_range` (и снимают highlight на exit)
    pub highlight_visible: bool,
    pub sorted_color: Vec4,
    pub unsorted_color: Vec4,
}

impl Default for SortingRules {
    fn default() -> Self {
        Self {
            only_visible: true,
            highlight_visible: true,
            sorted_color: Vec4::new(0.0, 1.0, 0.0, 1.0),
            unsorted_color: Vec4::new(1.0, 0.0, 0.0, 1.0),
        }
    }
}

impl SortingRules {
    /// Цвет outline по состоянию сортировки
    pub fn highlight_color(&self, sortable: &Sortable) -> Vec4 {
        if sortable.is_sorted {
            self.sorted_color
        } else {
            self.unsorted_color
        }
    }
}

/// Запрос: переключить sort state (interaction layer)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortRequest {
    pub entity: Entity,
}

/// Событие: sort state изменился
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortStateChanged {
    pub entity: Entity,
    pub is_sorted: bool,
}

/// System: enter/exit sortables → `in_camera_range` (только при `highlight_visible`)
pub fn update_sortable_highlight(
    rules: Res<SortingRules>,
    mut became_visible: EventReader<ObjectBecameVisible>,
    mut left_view: EventReader<ObjectLeftView>,
    mut sortables: Query<&mut Sortable>,
) {
    let entered: Vec<Entity> = became_visible
        .read()
        .filter(|event| event.capability == CapabilityKind::Sortable)
        .map(|event| event.entity)
        .collect();
    let exited: Vec<Entity> = left_view
        .read()
        .filter(|event| event.capability == CapabilityKind::Sortable)
        .map(|event| event.entity)
        .collect();

    if !rules.highlight_visible {
        return;
    }

    for entity in entered {
        if let Ok(mut sortable) = sortables.get_mut(entity) {
            sortable.in_camera_range = true;
        }
    }
    // Despawned entity → просто пропускаем
    for entity in exited {
        if let Ok(mut sortable) = sortables.get_mut(entity) {
            sortable.leave_camera_range();
        }
    }
}

/// System: применить SortRequest (toggle) с учётом SortingRules
pub fn apply_sort_requests(
    mut requests: EventReader<SortRequest>,
    rules: Res<SortingRules>,
    viewers: Query<&PerceptionLoop<Sortable>>,
    mut sortables: Query<&mut Sortable>,
    mut sort_changed: EventWriter<SortStateChanged>,
    mut state_changed: EventWriter<EntityStateChanged>,
) {
    for request in requests.read() {
        let Ok(mut sortable) = sortables.get_mut(request.entity) else {
            crate::logger::log_warning(&format!("⚠️ SortRequest for {:?}: not a sortable", request.entity));
            continue;
        };

        let visible = viewers
            .iter()
            .any(|tracker| tracker.is_currently_visible(request.entity));

        if rules.only_visible && !visible {
            crate::logger::log(&format!("🚫 '{}' not visible, sort rejected", sortable.name));
            sortable.highlighted = false;
            continue;
        }

        if sortable.is_sorted {
            sortable.unsort();
        } else {
            sortable.sort();
        }
        crate::logger::log_info(&format!(
            "📦 '{}' has been {}",
            sortable.name,
            if sortable.is_sorted { "sorted" } else { "unsorted" }
        ));

        if visible && rules.highlight_visible {
            sortable.in_camera_range = true;
        }

        sort_changed.write(SortStateChanged {
            entity: request.entity,
            is_sorted: sortable.is_sorted,
        });
        state_changed.write(EntityStateChanged {
            entity: request.entity,
            capability: CapabilityKind::Sortable,
        });
    }
}

/// Sortable Plugin
pub struct SortablePlugin;

impl Plugin for SortablePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PerceptionPlugin::<Sortable>::default())
            .init_resource::<SortingRules>()
            .add_event::<SortRequest>()
            .add_event::<SortStateChanged>()
            .add_systems(
                FixedUpdate,
                (update_sortable_highlight, apply_sort_requests)
                    .chain()
                    .in_set(PerceptionSet::Triggers),
            );
    }
}
