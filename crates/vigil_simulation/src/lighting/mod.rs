//! Lighting — источник для darkness gate
//!
//! Observable с `requires_darkness` срабатывает только когда свет выключен.
//! Gate читает свет через `DarknessOracle`, не владея им.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::PerceptionSet;

/// Read-only источник освещённости
pub trait DarknessOracle: Send + Sync {
    fn is_light_on(&self) -> bool;
}

/// Главный выключатель света сцены
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSwitch {
    pub is_on: bool,
    /// Разрешено ли игроку щёлкать выключателем (`LightCommand::Toggle`)
    pub allow_toggle: bool,
}

impl Default for LightSwitch {
    fn default() -> Self {
        Self {
            is_on: true,
            allow_toggle: true,
        }
    }
}

impl LightSwitch {
    /// Возвращает `true`, если состояние реально изменилось
    pub fn set(&mut self, on: bool) -> bool {
        if self.is_on == on {
            return false;
        }
        self.is_on = on;
        true
    }

    pub fn toggle(&mut self) -> bool {
        let next = !self.is_on;
        self.set(next)
    }

    pub fn turn_on(&mut self) -> bool {
        self.set(true)
    }

    pub fn turn_off(&mut self) -> bool {
        self.set(false)
    }
}

impl DarknessOracle for LightSwitch {
    fn is_light_on(&self) -> bool {
        self.is_on
    }
}

/// Команда выключателю (input layer / скрипты)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCommand {
    /// Игрок нажал выключатель (уважает `allow_toggle`)
    Toggle,
    On,
    Off,
}

/// Событие: свет переключился
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightToggled {
    pub is_on: bool,
}

/// System: применить LightCommand → LightToggled
pub fn apply_light_commands(
    mut light_commands: EventReader<LightCommand>,
    mut switch: ResMut<LightSwitch>,
    mut toggled: EventWriter<LightToggled>,
) {
    for command in light_commands.read() {
        let changed = match command {
            LightCommand::Toggle if switch.allow_toggle => switch.toggle(),
            LightCommand::Toggle => false,
            LightCommand::On => switch.turn_on(),
            LightCommand::Off => switch.turn_off(),
        };

        if changed {
            crate::logger::log(&format!("💡 Light switched {}", if switch.is_on { "on" } else { "off" }));
            toggled.write(LightToggled {
                is_on: switch.is_on,
            });
        }
    }
}

/// Lighting Plugin
pub struct LightingPlugin;

impl Plugin for LightingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LightSwitch>()
            .add_event::<LightCommand>()
            .add_event::<LightToggled>()
            .add_systems(
                FixedUpdate,
                apply_light_commands.in_set(PerceptionSet::Environment),
            );
    }
}
