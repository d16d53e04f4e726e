//! One planning cycle: evaluate every target, score the candidates, commit
//! the winner's cadence and emit a plan.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::cadence::FilterCadence;
use super::entities::{ExposureRejection, PlanningProject, PlanningTarget, TargetRejection};
use super::history::PlanExecutionHistory;
use super::plan::{NoPlanReason, PlanOutcome, TargetPlan, WaitPlan};
use crate::astrometry::{Astrometry, HorizonParams, VisibilityRequest};
use crate::config::ProfilePreferences;
use crate::models::TargetId;
use crate::scoring::{EngineState, ScoringEngine, ScoringRule, ScoringRuleRegistry};

/// Live conditions reported by the observatory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Environment {
    /// Relative humidity in percent, when a sensor reports it.
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub now: DateTime<Utc>,
    pub preferences: ProfilePreferences,
    pub environment: Environment,
}

impl PlanningContext {
    pub fn new(now: DateTime<Utc>, preferences: ProfilePreferences) -> Self {
        Self {
            now,
            preferences,
            environment: Environment::default(),
        }
    }
}

pub struct Planner<'a> {
    astrometry: &'a dyn Astrometry,
    rules: Vec<Arc<dyn ScoringRule>>,
}

/// Index of a target as (project, target) positions.
type TargetSlot = (usize, usize);

impl<'a> Planner<'a> {
    /// Planner scoring with every registered rule.
    pub fn new(astrometry: &'a dyn Astrometry) -> Self {
        let rules: Vec<Arc<dyn ScoringRule>> =
            ScoringRuleRegistry::all().into_iter().map(Arc::from).collect();
        Self::with_rules(astrometry, rules)
    }

    pub fn with_rules(astrometry: &'a dyn Astrometry, rules: Vec<Arc<dyn ScoringRule>>) -> Self {
        Self { astrometry, rules }
    }

    pub fn rules(&self) -> &[Arc<dyn ScoringRule>] {
        &self.rules
    }

    /// Run one cycle over `projects`.
    ///
    /// Only the selected target's cadence is modified. A cancelled cycle
    /// leaves every cadence as it was and returns [`NoPlanReason::Cancelled`].
    pub fn plan(
        &self,
        ctx: &PlanningContext,
        projects: &mut [PlanningProject],
        history: &mut PlanExecutionHistory,
        cancel: &CancellationToken,
    ) -> PlanOutcome {
        if cancel.is_cancelled() {
            return no_plan(NoPlanReason::Cancelled);
        }

        if !projects.iter().any(PlanningProject::is_active) {
            return no_plan(NoPlanReason::NoActiveProjects);
        }

        let mut candidates: Vec<TargetSlot> = Vec::new();
        let mut any_enabled = false;
        let mut any_incomplete = false;
        let mut earliest: Option<(DateTime<Utc>, TargetId)> = None;

        for (p, project) in projects.iter_mut().enumerate() {
            if !project.is_active() {
                continue;
            }
            for (t, target) in project.targets.iter_mut().enumerate() {
                if cancel.is_cancelled() {
                    return no_plan(NoPlanReason::Cancelled);
                }
                self.evaluate_target(ctx, target);

                match target.rejection {
                    None => candidates.push((p, t)),
                    Some(TargetRejection::NotYetVisible) => {
                        if let Some(window) = target.visibility {
                            if earliest.map_or(true, |(at, _)| window.start < at) {
                                earliest = Some((window.start, target.id()));
                            }
                        }
                    }
                    Some(_) => {}
                }
                if target.rejection != Some(TargetRejection::TargetDisabled) {
                    any_enabled = true;
                    if target.rejection != Some(TargetRejection::AllExposurePlansComplete) {
                        any_incomplete = true;
                    }
                }
            }
        }

        if candidates.is_empty() {
            return self.plan_without_candidates(ctx, history, any_enabled, any_incomplete, earliest);
        }

        let state = EngineState::new(ctx.preferences.clone(), ctx.now)
            .with_previous_target(history.last_target());
        let engine = ScoringEngine::with_rules(state, self.rules.clone());

        let mut best: Option<(TargetSlot, f64)> = None;
        for &(p, t) in &candidates {
            if cancel.is_cancelled() {
                return no_plan(NoPlanReason::Cancelled);
            }
            let target = &mut projects[p].targets[t];
            let score = engine.score_target(target);
            log::debug!("Target '{}' scored {:.4}", target.target.name, score);
            // Strictly greater: the first candidate wins ties.
            if best.map_or(true, |(_, top)| score > top) {
                best = Some(((p, t), score));
            }
        }

        let Some(((p, t), score)) = best else {
            return no_plan(NoPlanReason::NoVisibleTargets);
        };
        if cancel.is_cancelled() {
            return no_plan(NoPlanReason::Cancelled);
        }

        let slew_needed = history.immediate_target_exposures().target_id
            != Some(projects[p].targets[t].id());
        let target = &mut projects[p].targets[t];
        self.commit(target);

        match TargetPlan::for_target(target, ctx.now, slew_needed) {
            Some(plan) => {
                log::info!(
                    "Selected target '{}' of project '{}' (score {:.4}), exposure {}",
                    plan.target_name,
                    plan.project_name,
                    score,
                    plan.exposure_plan_id
                );
                history.record_target_plan(&plan);
                PlanOutcome::Target(plan)
            }
            None => {
                log::warn!("Selected target '{}' has no plannable exposure", target.target.name);
                no_plan(NoPlanReason::NoIncompleteExposures)
            }
        }
    }

    fn plan_without_candidates(
        &self,
        ctx: &PlanningContext,
        history: &mut PlanExecutionHistory,
        any_enabled: bool,
        any_incomplete: bool,
        earliest: Option<(DateTime<Utc>, TargetId)>,
    ) -> PlanOutcome {
        if !any_enabled {
            return no_plan(NoPlanReason::NoEnabledTargets);
        }
        if !any_incomplete {
            return no_plan(NoPlanReason::NoIncompleteExposures);
        }
        match earliest {
            Some((until, target_id)) => {
                let wait = WaitPlan::new(
                    ctx.now,
                    until,
                    ctx.preferences.minimum_wait_secs,
                    ctx.preferences.park_on_wait,
                    Some(target_id),
                );
                log::info!("No target ready, waiting until {}", wait.wait_until);
                history.record_wait_plan(&wait);
                PlanOutcome::Wait(wait)
            }
            None => no_plan(NoPlanReason::NoVisibleTargets),
        }
    }

    /// Decide whether `target` is a candidate this cycle, recording the
    /// rejection on the target when it is not.
    fn evaluate_target(&self, ctx: &PlanningContext, target: &mut PlanningTarget) {
        target.reset();

        if !target.target.enabled {
            target.reject(TargetRejection::TargetDisabled);
            return;
        }
        if !target.has_remaining() {
            target.reject(TargetRejection::AllExposurePlansComplete);
            return;
        }

        let project = Arc::clone(&target.project);
        let request = VisibilityRequest {
            target_id: target.target.id,
            coordinates: &target.target.coordinates,
            horizon: HorizonParams {
                minimum_altitude: project.minimum_altitude,
                maximum_altitude: project.maximum_altitude,
                use_custom_horizon: project.use_custom_horizon,
                horizon_offset: project.horizon_offset,
            },
            at: ctx.now,
        };
        let full = self.astrometry.visibility(&request);
        let window = full.clip_to_meridian(project.meridian_window_minutes);
        target.visibility = Some(window);

        if !window.is_visible || ctx.now >= window.end {
            let reason = if full.is_visible && ctx.now < full.end && project.meridian_window_minutes > 0
            {
                TargetRejection::OutsideMeridianWindow
            } else {
                TargetRejection::NotVisible
            };
            target.reject(reason);
            return;
        }
        if window.start > ctx.now {
            target.reject(TargetRejection::NotYetVisible);
            return;
        }
        if window.remaining_minutes(ctx.now) < i64::from(project.minimum_time_minutes) {
            target.reject(TargetRejection::InsufficientTime);
            return;
        }

        self.evaluate_exposures(ctx, target);

        let cadence = FilterCadence::for_target(
            &target.target,
            &target.completion,
            project.dither_every,
            project.filter_switch_frequency,
        );
        let step = cadence.peek_where(|idx| target.accepts_exposure(idx));
        target.cadence = cadence;
        match step {
            Some(step) => target.selected = Some(step),
            None => target.reject(TargetRejection::NoExposuresAvailable),
        }
    }

    fn evaluate_exposures(&self, ctx: &PlanningContext, target: &mut PlanningTarget) {
        let twilight = self.astrometry.twilight_level(ctx.now);
        let moon_up = self.astrometry.moon_is_up(ctx.now);
        let coordinates = target.target.coordinates;

        for exposure in &mut target.exposures {
            let plan = &exposure.plan;
            exposure.moon_avoidance_score =
                self.astrometry
                    .moon_avoidance_score(&coordinates, plan, ctx.now);

            let rejection = if !plan.enabled {
                Some(ExposureRejection::Disabled)
            } else if exposure.remaining == 0 {
                Some(ExposureRejection::Complete)
            } else if twilight > plan.twilight_level {
                Some(ExposureRejection::TwilightLevel)
            } else if plan.moon_down_enabled && moon_up {
                Some(ExposureRejection::MoonDown)
            } else if humidity_exceeded(ctx.environment.humidity, plan.max_humidity) {
                Some(ExposureRejection::Humidity)
            } else if plan.moon_avoidance.enabled && exposure.moon_avoidance_score <= 0.0 {
                Some(ExposureRejection::MoonAvoidance)
            } else {
                None
            };

            if let Some(reason) = rejection {
                log::debug!(
                    "Exposure {} ({}) of target {} rejected: {}",
                    plan.id,
                    plan.filter_name,
                    target.target.id,
                    reason
                );
            }
            exposure.rejection = rejection;
        }
    }

    /// Advance the winner's cadence past the planned exposure.
    fn commit(&self, target: &mut PlanningTarget) {
        let mut cadence = target.cadence.clone();
        let step = cadence.take_where(|idx| target.accepts_exposure(idx));
        target.selected = step;
        target.store_cadence(cadence);
    }
}

fn humidity_exceeded(humidity: Option<f64>, max_humidity: f64) -> bool {
    max_humidity > 0.0 && humidity.is_some_and(|h| h > max_humidity)
}

fn no_plan(reason: NoPlanReason) -> PlanOutcome {
    log::info!("No plan: {}", reason);
    PlanOutcome::NoPlan { reason }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod planner_tests;
