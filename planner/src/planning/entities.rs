//! In-memory planning views over persisted records.
//!
//! A [`PlanningProject`] is rebuilt from its [`Project`] record every cycle.
//! Its targets and exposures carry the transient state of that cycle only:
//! visibility, rejection, the computed cadence, the selected exposure and the
//! scoring breakdown. Scoring rules see candidates through the
//! [`ProjectView`] / [`TargetView`] / [`ExposureView`] traits so they never
//! depend on storage types.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::cadence::{CadenceStep, FilterCadence};
use super::completion::ExposureCompletion;
use crate::astrometry::VisibilityWindow;
use crate::models::{
    ExposurePlan, ExposurePlanId, Project, ProjectId, ProjectPriority, RuleWeights, Target,
    TargetId,
};
use crate::scoring::ScoringResults;

pub trait ProjectView {
    fn project_id(&self) -> ProjectId;
    fn name(&self) -> &str;
    fn priority(&self) -> ProjectPriority;
    fn created_at(&self) -> DateTime<Utc>;
    fn meridian_window_minutes(&self) -> u32;
    fn is_mosaic(&self) -> bool;
    fn smart_exposure_order(&self) -> bool;
    fn rule_weights(&self) -> &RuleWeights;
}

pub trait ExposureView {
    fn plan_id(&self) -> ExposurePlanId;
    fn filter_name(&self) -> &str;
    fn remaining(&self) -> u32;
    /// Moon avoidance score from the astrometry collaborator, in [0, 1].
    fn moon_avoidance_score(&self) -> f64;
}

pub trait TargetView {
    fn target_id(&self) -> TargetId;
    fn name(&self) -> &str;
    fn project(&self) -> &dyn ProjectView;
    fn visibility(&self) -> Option<&VisibilityWindow>;
    /// Exposure the cadence would execute if this target were chosen.
    fn selected_exposure(&self) -> Option<&dyn ExposureView>;
    /// Overall completion in [0, 1], weighted by desired counts.
    fn completion_fraction(&self) -> f64;
    fn scoring_results(&self) -> Option<&ScoringResults>;
    fn set_scoring_results(&mut self, results: ScoringResults);
}

impl ProjectView for Project {
    fn project_id(&self) -> ProjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> ProjectPriority {
        self.priority
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn meridian_window_minutes(&self) -> u32 {
        self.meridian_window_minutes
    }

    fn is_mosaic(&self) -> bool {
        self.is_mosaic
    }

    fn smart_exposure_order(&self) -> bool {
        self.smart_exposure_order
    }

    fn rule_weights(&self) -> &RuleWeights {
        &self.rule_weights
    }
}

/// Why a target was excluded from this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetRejection {
    TargetDisabled,
    AllExposurePlansComplete,
    NotVisible,
    /// Visible later tonight; the planner may wait for it.
    NotYetVisible,
    OutsideMeridianWindow,
    InsufficientTime,
    NoExposuresAvailable,
}

impl fmt::Display for TargetRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TargetRejection::TargetDisabled => "target disabled",
            TargetRejection::AllExposurePlansComplete => "all exposure plans complete",
            TargetRejection::NotVisible => "not visible",
            TargetRejection::NotYetVisible => "not yet visible",
            TargetRejection::OutsideMeridianWindow => "outside meridian window",
            TargetRejection::InsufficientTime => "insufficient time",
            TargetRejection::NoExposuresAvailable => "no exposures available",
        };
        f.write_str(reason)
    }
}

/// Why an exposure plan cannot be used this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExposureRejection {
    Complete,
    Disabled,
    TwilightLevel,
    MoonAvoidance,
    MoonDown,
    Humidity,
}

impl fmt::Display for ExposureRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ExposureRejection::Complete => "complete",
            ExposureRejection::Disabled => "disabled",
            ExposureRejection::TwilightLevel => "twilight level",
            ExposureRejection::MoonAvoidance => "moon avoidance",
            ExposureRejection::MoonDown => "moon up",
            ExposureRejection::Humidity => "humidity",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone)]
pub struct PlanningExposure {
    pub plan: ExposurePlan,
    /// Position of `plan` in the target's exposure plans.
    pub reference_index: usize,
    pub remaining: u32,
    pub moon_avoidance_score: f64,
    pub rejection: Option<ExposureRejection>,
}

impl PlanningExposure {
    pub fn new(plan: ExposurePlan, reference_index: usize, completion: &ExposureCompletion) -> Self {
        Self {
            remaining: completion.remaining(&plan),
            plan,
            reference_index,
            moon_avoidance_score: 1.0,
            rejection: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.rejection.is_none() && self.remaining > 0
    }
}

impl ExposureView for PlanningExposure {
    fn plan_id(&self) -> ExposurePlanId {
        self.plan.id
    }

    fn filter_name(&self) -> &str {
        &self.plan.filter_name
    }

    fn remaining(&self) -> u32 {
        self.remaining
    }

    fn moon_avoidance_score(&self) -> f64 {
        self.moon_avoidance_score
    }
}

#[derive(Debug, Clone)]
pub struct PlanningTarget {
    pub project: Arc<Project>,
    pub target: Target,
    pub exposures: Vec<PlanningExposure>,
    pub completion: ExposureCompletion,
    pub visibility: Option<VisibilityWindow>,
    pub rejection: Option<TargetRejection>,
    pub cadence: FilterCadence,
    pub selected: Option<CadenceStep>,
    pub scoring_results: Option<ScoringResults>,
}

impl PlanningTarget {
    pub fn new(project: Arc<Project>, target: Target, completion: ExposureCompletion) -> Self {
        let exposures = target
            .exposure_plans
            .iter()
            .enumerate()
            .map(|(idx, plan)| PlanningExposure::new(plan.clone(), idx, &completion))
            .collect();
        let cadence = FilterCadence::from_items(target.filter_cadence.clone());
        Self {
            project,
            target,
            exposures,
            completion,
            visibility: None,
            rejection: None,
            cadence,
            selected: None,
            scoring_results: None,
        }
    }

    pub fn id(&self) -> TargetId {
        self.target.id
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    pub fn reject(&mut self, reason: TargetRejection) {
        log::debug!(
            "Target '{}' ({}) rejected: {}",
            self.target.name,
            self.target.id,
            reason
        );
        self.rejection = Some(reason);
        self.selected = None;
    }

    /// Clear the state left by a previous cycle.
    pub fn reset(&mut self) {
        self.visibility = None;
        self.rejection = None;
        self.selected = None;
        self.scoring_results = None;
        for exposure in &mut self.exposures {
            exposure.rejection = None;
        }
    }

    /// Whether any enabled plan still needs frames.
    pub fn has_remaining(&self) -> bool {
        self.exposures
            .iter()
            .any(|exposure| exposure.plan.enabled && exposure.remaining > 0)
    }

    pub fn accepts_exposure(&self, reference_index: usize) -> bool {
        self.exposures
            .get(reference_index)
            .is_some_and(PlanningExposure::is_available)
    }

    pub fn selected_plan(&self) -> Option<&PlanningExposure> {
        self.selected
            .and_then(|step| self.exposures.get(step.reference_index))
    }

    /// Replace the cadence and copy it onto the underlying record.
    pub fn store_cadence(&mut self, cadence: FilterCadence) {
        self.target.filter_cadence = cadence.items().to_vec();
        self.cadence = cadence;
    }
}

impl TargetView for PlanningTarget {
    fn target_id(&self) -> TargetId {
        self.target.id
    }

    fn name(&self) -> &str {
        &self.target.name
    }

    fn project(&self) -> &dyn ProjectView {
        self.project.as_ref()
    }

    fn visibility(&self) -> Option<&VisibilityWindow> {
        self.visibility.as_ref()
    }

    fn selected_exposure(&self) -> Option<&dyn ExposureView> {
        self.selected_plan().map(|exposure| exposure as &dyn ExposureView)
    }

    fn completion_fraction(&self) -> f64 {
        self.completion
            .completion_fraction(self.exposures.iter().map(|exposure| &exposure.plan))
    }

    fn scoring_results(&self) -> Option<&ScoringResults> {
        self.scoring_results.as_ref()
    }

    fn set_scoring_results(&mut self, results: ScoringResults) {
        self.scoring_results = Some(results);
    }
}

/// Planning view of a project for one cycle.
#[derive(Debug, Clone)]
pub struct PlanningProject {
    /// The project record, with its targets moved into `targets`.
    pub project: Arc<Project>,
    pub targets: Vec<PlanningTarget>,
}

impl PlanningProject {
    pub fn from_record(mut project: Project, throttle_percent: f64) -> Self {
        let completion = ExposureCompletion::new(project.enable_grader, throttle_percent);
        let targets = std::mem::take(&mut project.targets);
        let project = Arc::new(project);
        let targets = targets
            .into_iter()
            .map(|target| PlanningTarget::new(Arc::clone(&project), target, completion))
            .collect();
        Self { project, targets }
    }

    pub fn id(&self) -> ProjectId {
        self.project.id
    }

    pub fn is_active(&self) -> bool {
        self.project.is_active()
    }

    pub fn target(&self, target_id: TargetId) -> Option<&PlanningTarget> {
        self.targets.iter().find(|t| t.id() == target_id)
    }
}
