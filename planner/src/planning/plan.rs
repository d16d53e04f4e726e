//! Plans emitted to the sequencer.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::entities::PlanningTarget;
use crate::models::{BinningMode, CadenceItem, Coordinates, ExposurePlanId, ProjectId, TargetId};
use crate::scoring::ScoringResults;

/// One step the sequencer executes for a target plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PlanInstruction {
    SlewAndCenter {
        target_id: TargetId,
        coordinates: Coordinates,
        rotation: f64,
    },
    Dither,
    SwitchFilter {
        filter_name: String,
    },
    TakeExposure {
        exposure_plan_id: ExposurePlanId,
        filter_name: String,
        exposure_secs: f64,
        gain: Option<i32>,
        offset: Option<i32>,
        binning: Option<BinningMode>,
        readout_mode: Option<i32>,
        roi: f64,
    },
}

/// The selected target and what to do with it.
#[derive(Debug, Clone, Serialize)]
pub struct TargetPlan {
    pub plan_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// End of the target's (meridian clipped) visibility window.
    pub end_time: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub project_id: ProjectId,
    pub project_name: String,
    pub target_id: TargetId,
    pub target_name: String,
    pub exposure_plan_id: ExposurePlanId,
    pub instructions: Vec<PlanInstruction>,
    /// Cadence after advancing past the planned exposure.
    pub filter_cadence: Vec<CadenceItem>,
    pub scoring_results: Option<ScoringResults>,
}

impl TargetPlan {
    /// Build the plan for `target`, whose cadence has already been advanced.
    /// Returns `None` when `target` has no selected exposure or visibility.
    pub fn for_target(
        target: &PlanningTarget,
        now: DateTime<Utc>,
        slew_needed: bool,
    ) -> Option<Self> {
        let step = target.selected?;
        let window = target.visibility?;
        let exposure = target.exposures.get(step.reference_index)?;
        let plan = &exposure.plan;

        let mut instructions = Vec::with_capacity(4);
        if slew_needed {
            instructions.push(PlanInstruction::SlewAndCenter {
                target_id: target.target.id,
                coordinates: target.target.coordinates,
                rotation: target.target.rotation,
            });
        }
        if step.dither_first {
            instructions.push(PlanInstruction::Dither);
        }
        instructions.push(PlanInstruction::SwitchFilter {
            filter_name: plan.filter_name.clone(),
        });
        instructions.push(PlanInstruction::TakeExposure {
            exposure_plan_id: plan.id,
            filter_name: plan.filter_name.clone(),
            exposure_secs: plan.exposure_secs,
            gain: plan.gain,
            offset: plan.offset,
            binning: plan.binning,
            readout_mode: plan.readout_mode,
            roi: target.target.roi,
        });

        Some(Self {
            plan_id: Uuid::new_v4(),
            start_time: now,
            end_time: window.end,
            window_start: window.start,
            project_id: target.project.id,
            project_name: target.project.name.clone(),
            target_id: target.target.id,
            target_name: target.target.name.clone(),
            exposure_plan_id: plan.id,
            instructions,
            filter_cadence: target.cadence.items().to_vec(),
            scoring_results: target.scoring_results.clone(),
        })
    }

    pub fn takes_exposure(&self) -> bool {
        self.instructions
            .iter()
            .any(|i| matches!(i, PlanInstruction::TakeExposure { .. }))
    }
}

/// Nothing can be imaged now, but a target becomes available later.
#[derive(Debug, Clone, Serialize)]
pub struct WaitPlan {
    pub plan_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub wait_until: DateTime<Utc>,
    /// Park the mount while waiting.
    pub park: bool,
    pub next_target: Option<TargetId>,
}

impl WaitPlan {
    /// Wait until `until`, but never less than `minimum_wait_secs` from `now`.
    pub fn new(
        now: DateTime<Utc>,
        until: DateTime<Utc>,
        minimum_wait_secs: u32,
        park: bool,
        next_target: Option<TargetId>,
    ) -> Self {
        let earliest = now + Duration::seconds(i64::from(minimum_wait_secs));
        Self {
            plan_id: Uuid::new_v4(),
            created_at: now,
            wait_until: until.max(earliest),
            park,
            next_target,
        }
    }
}

/// Why a cycle produced no plan. These are outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoPlanReason {
    NoActiveProjects,
    NoEnabledTargets,
    NoIncompleteExposures,
    NoVisibleTargets,
    Cancelled,
}

impl std::fmt::Display for NoPlanReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            NoPlanReason::NoActiveProjects => "no active projects",
            NoPlanReason::NoEnabledTargets => "no enabled targets",
            NoPlanReason::NoIncompleteExposures => "no incomplete exposure plans",
            NoPlanReason::NoVisibleTargets => "no visible targets for the rest of the night",
            NoPlanReason::Cancelled => "planning cancelled",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanOutcome {
    Target(TargetPlan),
    Wait(WaitPlan),
    NoPlan { reason: NoPlanReason },
}

impl PlanOutcome {
    pub fn target_plan(&self) -> Option<&TargetPlan> {
        match self {
            PlanOutcome::Target(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn wait_plan(&self) -> Option<&WaitPlan> {
        match self {
            PlanOutcome::Wait(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn no_plan_reason(&self) -> Option<NoPlanReason> {
        match self {
            PlanOutcome::NoPlan { reason } => Some(*reason),
            _ => None,
        }
    }
}
