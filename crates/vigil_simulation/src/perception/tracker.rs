//! PerceptionLoop — кто кого видит (state для enter/exit diff)
//!
//! Компонент на viewer entity. Каждый due tick:
//! previous ← current, current пересобирается из spatial query + visibility test,
//! diff = (current \ previous, previous \ current).

use std::collections::HashSet;
use std::marker::PhantomData;

use bevy::prelude::*;

use crate::error::PerceptionError;
use crate::shared::LayerMask;
use crate::spatial::{Candidate, OcclusionQuery, SpatialQuery};

use super::capability::TrackedCapability;
use super::viewer::ViewerPose;
use super::visibility;

/// Переходы за один tick (отсортированы по Entity → детерминированный порядок hooks)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityDiff {
    pub entered: Vec<Entity>,
    pub exited: Vec<Entity>,
}

impl VisibilityDiff {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// Результат одного evaluate()
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub diff: VisibilityDiff,
    /// В радиусе, observable, но не прошли visibility test
    pub hidden_in_range: Vec<Entity>,
    /// Впервые замеченные битые кандидаты (одна запись на поломку)
    pub invalid: Vec<PerceptionError>,
}

/// Perception state наблюдателя для capability `C`
#[derive(Component, Debug)]
pub struct PerceptionLoop<C: TrackedCapability> {
    current: HashSet<Entity>,
    previous: HashSet<Entity>,
    last_diff: VisibilityDiff,
    /// None → tick на ближайшем step
    next_tick_at: Option<f32>,
    missing_projection_reported: bool,
    invalid_config_reported: bool,
    /// Битые на прошлом tick; починенные/пропавшие выпадают
    reported_invalid: HashSet<Entity>,
    _capability: PhantomData<fn() -> C>,
}

impl<C: TrackedCapability> Default for PerceptionLoop<C> {
    fn default() -> Self {
        Self {
            current: HashSet::new(),
            previous: HashSet::new(),
            last_diff: VisibilityDiff::default(),
            next_tick_at: None,
            missing_projection_reported: false,
            invalid_config_reported: false,
            reported_invalid: HashSet::new(),
            _capability: PhantomData,
        }
    }
}

impl<C: TrackedCapability> PerceptionLoop<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_due(&self, now: f32) -> bool {
        self.next_tick_at.map_or(true, |at| now >= at)
    }

    /// Следующий tick через `period` от запланированного (без дрейфа).
    /// Если отстали больше чем на период — от `now`, без серии догоняющих tick'ов.
    pub fn advance_schedule(&mut self, now: f32, period: f32) {
        let next = self.next_tick_at.unwrap_or(now) + period;
        self.next_tick_at = Some(if next <= now { now + period } else { next });
    }

    pub fn next_tick_at(&self) -> Option<f32> {
        self.next_tick_at
    }

    /// Один perception tick (без side effects вне self).
    ///
    /// `capability(entity)` → `None` если у entity нет `C`,
    /// `Some(Err)` если её конфиг битый, иначе `Some(Ok(can_be_observed))`.
    pub fn evaluate(
        &mut self,
        pose: &ViewerPose,
        spatial: &dyn SpatialQuery,
        occlusion: &dyn OcclusionQuery,
        layers: LayerMask,
        mut capability: impl FnMut(Entity) -> Option<Result<bool, PerceptionError>>,
    ) -> TickReport {
        self.previous = std::mem::take(&mut self.current);

        let mut report = TickReport::default();
        let mut still_invalid = HashSet::new();

        for candidate in spatial.query_within_radius(pose.position, pose.max_distance, layers) {
            let Some(status) = capability(candidate.entity) else {
                continue;
            };

            let can_be_observed = match validate_candidate(&candidate).and(status) {
                Ok(can_be_observed) => can_be_observed,
                Err(error) => {
                    if !self.reported_invalid.contains(&candidate.entity) {
                        report.invalid.push(error);
                    }
                    still_invalid.insert(candidate.entity);
                    continue;
                }
            };

            if !can_be_observed {
                continue;
            }

            if visibility::is_visible(pose, &candidate, occlusion) {
                self.current.insert(candidate.entity);
            } else {
                report.hidden_in_range.push(candidate.entity);
            }
        }

        self.reported_invalid = still_invalid;

        let mut entered: Vec<Entity> = self.current.difference(&self.previous).copied().collect();
        let mut exited: Vec<Entity> = self.previous.difference(&self.current).copied().collect();
        entered.sort_unstable();
        exited.sort_unstable();

        report.diff = VisibilityDiff { entered, exited };
        self.last_diff = report.diff.clone();
        report
    }

    pub fn is_currently_visible(&self, entity: Entity) -> bool {
        self.current.contains(&entity)
    }

    /// Копия текущего visible set
    pub fn visible(&self) -> HashSet<Entity> {
        self.current.clone()
    }

    pub fn last_diff(&self) -> &VisibilityDiff {
        &self.last_diff
    }

    /// `true` только при первом вызове (warning логируется один раз на viewer)
    pub fn report_missing_projection(&mut self) -> bool {
        !std::mem::replace(&mut self.missing_projection_reported, true)
    }

    pub fn report_invalid_config(&mut self) -> bool {
        !std::mem::replace(&mut self.invalid_config_reported, true)
    }

    /// Конфиг снова валиден → следующая поломка залогируется заново
    pub fn clear_invalid_config(&mut self) {
        self.invalid_config_reported = false;
    }
}

fn validate_candidate(candidate: &Candidate) -> Result<(), PerceptionError> {
    let bounds = &candidate.bounds;
    if !bounds.center.is_finite() {
        return Err(PerceptionError::InvalidCandidate {
            entity: candidate.entity,
            reason: "non-finite bounds center",
        });
    }
    if !bounds.half_extents.is_finite() || bounds.half_extents.min_element() < 0.0 {
        return Err(PerceptionError::InvalidCandidate {
            entity: candidate.entity,
            reason: "invalid bounds extents",
        });
    }
    Ok(())
}
