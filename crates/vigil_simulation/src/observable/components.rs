//! Observable components — state machine "наблюдают / не наблюдают"
//!
//! Gate (cooldown, one-shot, darkness) проверяется в момент запроса.
//! Delayed trigger срабатывает без повторной проверки gate.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::PerceptionError;
use crate::lighting::DarknessOracle;
use crate::perception::{CapabilityKind, HookContext, HookEffect, ObservationDirection, TrackedCapability};

use super::behaviors::ObservableBehavior;

/// Настройки observable (дефолты = инспектор игры)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableConfig {
    pub enabled: bool,
    pub cooldown_seconds: f32,
    /// Срабатывает только при выключенном свете
    pub requires_darkness: bool,
    pub only_trigger_once: bool,
    pub observed_delay_seconds: f32,
    pub unobserved_delay_seconds: f32,
    /// Громкость звуков behaviour
    pub audio_volume: f32,
}

impl Default for ObservableConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_seconds: 1.0,
            requires_darkness: false,
            only_trigger_once: false,
            observed_delay_seconds: 0.0,
            unobserved_delay_seconds: 0.0,
            audio_volume: 0.7,
        }
    }
}

impl ObservableConfig {
    pub fn validate(&self) -> Result<(), PerceptionError> {
        let checks = [
            ("cooldown_seconds", self.cooldown_seconds),
            ("observed_delay_seconds", self.observed_delay_seconds),
            ("unobserved_delay_seconds", self.unobserved_delay_seconds),
        ];
        for (name, value) in checks {
            if !(value >= 0.0) {
                return Err(PerceptionError::InvalidConfig(format!(
                    "{} must be >= 0, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.audio_volume) {
            return Err(PerceptionError::InvalidConfig(format!(
                "audio_volume must be in [0, 1], got {}",
                self.audio_volume
            )));
        }
        Ok(())
    }
}

/// Runtime state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationState {
    /// Выставляется сразу при прохождении gate (до delayed hook)
    pub is_observed: bool,
    /// None → ещё ни разу не срабатывал (cooldown gate проходит)
    pub last_action_at: Option<f32>,
    pub has_triggered_once: bool,
    /// Время срабатывания отложенного observed hook
    pub pending_observed: Option<f32>,
    pub pending_unobserved: Option<f32>,
}

impl ObservationState {
    pub fn has_pending(&self) -> bool {
        self.pending_observed.is_some() || self.pending_unobserved.is_some()
    }
}

/// Объект, реагирующий на взгляд игрока
#[derive(Component, Debug, Clone)]
pub struct Observable {
    pub name: String,
    pub config: ObservableConfig,
    pub state: ObservationState,
    pub behavior: ObservableBehavior,
    /// Аналог "active in hierarchy"
    pub active: bool,
}

impl Default for Observable {
    fn default() -> Self {
        Self::new("Observable", ObservableBehavior::EventsOnly)
    }
}

impl Observable {
    pub fn new(name: impl Into<String>, behavior: ObservableBehavior) -> Self {
        Self {
            name: name.into(),
            config: ObservableConfig::default(),
            state: ObservationState::default(),
            behavior,
            active: true,
        }
    }

    pub fn with_config(mut self, config: ObservableConfig) -> Self {
        self.config = config;
        self
    }

    /// Config + behaviour; битый observable пропускается perception и triggers
    pub fn validate(&self) -> Result<(), PerceptionError> {
        self.config.validate()?;
        self.behavior.validate()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_currently_observed(&self) -> bool {
        self.state.is_observed
    }

    /// Секунды с последнего срабатывания (None → не срабатывал)
    pub fn time_since_last_action(&self, now: f32) -> Option<f32> {
        self.state.last_action_at.map(|at| now - at)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Снимает one-shot блокировку
    pub fn reset_trigger_state(&mut self) {
        self.state.has_triggered_once = false;
    }

    /// Gate: enabled → one-shot → cooldown → darkness (нет oracle → проходит)
    pub fn can_trigger_action(&self, now: f32, darkness: Option<&dyn DarknessOracle>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if self.config.only_trigger_once && self.state.has_triggered_once {
            return false;
        }
        if let Some(last) = self.state.last_action_at {
            if now - last < self.config.cooldown_seconds {
                return false;
            }
        }
        if self.config.requires_darkness && darkness.is_some_and(|oracle| oracle.is_light_on()) {
            return false;
        }
        true
    }

    fn request(&mut self, direction: ObservationDirection, ctx: &mut HookContext<'_>) {
        if !self.can_trigger_action(ctx.now, ctx.darkness) {
            crate::logger::log(&format!(
                "🚫 Observable '{}' {:?} request gated at {:.2}s",
                self.name, direction, ctx.now
            ));
            return;
        }

        let delay = match direction {
            ObservationDirection::Observed => {
                self.state.is_observed = true;
                self.config.observed_delay_seconds
            }
            ObservationDirection::Unobserved => {
                self.state.is_observed = false;
                self.config.unobserved_delay_seconds
            }
        };

        if delay > 0.0 {
            self.schedule(direction, ctx.now + delay, ctx.entity);
        } else {
            self.trigger(direction, ctx);
        }
    }

    /// Отложенный trigger; повторный запрос в том же направлении заменяет время (replace)
    fn schedule(&mut self, direction: ObservationDirection, fire_at: f32, entity: Entity) {
        let slot = match direction {
            ObservationDirection::Observed => &mut self.state.pending_observed,
            ObservationDirection::Unobserved => &mut self.state.pending_unobserved,
        };

        if slot.is_some() {
            crate::logger::log(&PerceptionError::SchedulingConflict { entity, direction }.to_string());
        }
        *slot = Some(fire_at);
    }

    pub fn trigger_observed_action(&mut self, ctx: &mut HookContext<'_>) {
        self.trigger(ObservationDirection::Observed, ctx);
    }

    pub fn trigger_unobserved_action(&mut self, ctx: &mut HookContext<'_>) {
        self.trigger(ObservationDirection::Unobserved, ctx);
    }

    fn trigger(&mut self, direction: ObservationDirection, ctx: &mut HookContext<'_>) {
        self.state.last_action_at = Some(ctx.now);
        self.state.has_triggered_once = true;

        let volume = self.config.audio_volume;
        match direction {
            ObservationDirection::Observed => {
                crate::logger::log(&format!("👁️ Observable '{}' became observed", self.name));
                self.behavior.on_became_observed(ctx, volume);
            }
            ObservationDirection::Unobserved => {
                crate::logger::log(&format!("🌑 Observable '{}' left observation", self.name));
                self.behavior.on_left_observation(ctx, volume);
            }
        }
        ctx.push(HookEffect::Fired(direction));
    }

    /// Срабатывают pending triggers с fire_at <= now (по времени, observed первым при равенстве)
    pub fn fire_due(&mut self, ctx: &mut HookContext<'_>) {
        let now = ctx.now;
        let mut due: Vec<(f32, ObservationDirection)> = Vec::with_capacity(2);

        if let Some(at) = self.state.pending_observed.filter(|at| *at <= now) {
            self.state.pending_observed = None;
            due.push((at, ObservationDirection::Observed));
        }
        if let Some(at) = self.state.pending_unobserved.filter(|at| *at <= now) {
            self.state.pending_unobserved = None;
            due.push((at, ObservationDirection::Unobserved));
        }
        due.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, direction) in due {
            match direction {
                ObservationDirection::Observed => self.trigger_observed_action(ctx),
                ObservationDirection::Unobserved => self.trigger_unobserved_action(ctx),
            }
        }
    }
}

impl TrackedCapability for Observable {
    const KIND: CapabilityKind = CapabilityKind::Observable;

    fn can_be_observed(&self) -> bool {
        self.is_enabled() && self.active
    }

    fn handle_became_observed(&mut self, ctx: &mut HookContext<'_>) {
        self.request(ObservationDirection::Observed, ctx);
    }

    fn handle_left_observation(&mut self, ctx: &mut HookContext<'_>) {
        self.request(ObservationDirection::Unobserved, ctx);
    }

    fn validate_config(&self) -> Result<(), PerceptionError> {
        self.validate()
    }
}
