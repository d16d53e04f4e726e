//! Append-only log of the plans emitted during one scheduling session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::plan::{TargetPlan, WaitPlan};
use crate::models::{ExposurePlanId, TargetId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanExecutionEntry {
    pub recorded_at: DateTime<Utc>,
    pub plan_id: Uuid,
    /// Start of the visibility window the plan was made for.
    pub window_start: DateTime<Utc>,
    /// `None` for wait plans.
    pub target_id: Option<TargetId>,
    pub exposures: Vec<ExposurePlanId>,
}

/// Target and exposures of the run of plans at the end of the history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImmediateTargetExposures {
    pub target_id: Option<TargetId>,
    /// Most recent first.
    pub exposures: Vec<ExposurePlanId>,
}

#[derive(Debug, Clone, Default)]
pub struct PlanExecutionHistory {
    entries: Vec<PlanExecutionEntry>,
}

impl PlanExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PlanExecutionEntry) {
        self.entries.push(entry);
    }

    pub fn record_target_plan(&mut self, plan: &TargetPlan) {
        self.push(PlanExecutionEntry {
            recorded_at: plan.start_time,
            plan_id: plan.plan_id,
            window_start: plan.window_start,
            target_id: Some(plan.target_id),
            exposures: vec![plan.exposure_plan_id],
        });
    }

    pub fn record_wait_plan(&mut self, plan: &WaitPlan) {
        self.push(PlanExecutionEntry {
            recorded_at: plan.created_at,
            plan_id: plan.plan_id,
            window_start: plan.created_at,
            target_id: None,
            exposures: Vec::new(),
        });
    }

    pub fn entries(&self) -> &[PlanExecutionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target of the most recent entry, if it was a target plan.
    pub fn last_target(&self) -> Option<TargetId> {
        self.entries.last().and_then(|entry| entry.target_id)
    }

    /// Walk back from the latest entry while entries share its target and
    /// window start, collecting their exposures. A wait plan or a change of
    /// target ends the run.
    pub fn immediate_target_exposures(&self) -> ImmediateTargetExposures {
        let Some(latest) = self.entries.last() else {
            return ImmediateTargetExposures::default();
        };
        let Some(target_id) = latest.target_id else {
            return ImmediateTargetExposures::default();
        };

        let exposures = self
            .entries
            .iter()
            .rev()
            .take_while(|entry| {
                entry.target_id == Some(target_id) && entry.window_start == latest.window_start
            })
            .flat_map(|entry| entry.exposures.iter().rev().copied())
            .collect();

        ImmediateTargetExposures {
            target_id: Some(target_id),
            exposures,
        }
    }
}
