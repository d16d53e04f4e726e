use crate::models::ProjectPriority;
use crate::planning::TargetView;
use crate::scoring::{EngineState, ScoringRule};

/// High priority projects first.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectPriorityRule;

impl ProjectPriorityRule {
    pub const NAME: &'static str = "Project Priority";
}

impl ScoringRule for ProjectPriorityRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_weight(&self) -> i32 {
        50
    }

    fn score(&self, _state: &EngineState, target: &dyn TargetView) -> f64 {
        match target.project().priority() {
            ProjectPriority::High => 1.0,
            ProjectPriority::Normal => 0.5,
            ProjectPriority::Low => 0.0,
        }
    }
}

/// Older projects first, saturating after a year.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreationDateRule;

impl CreationDateRule {
    pub const NAME: &'static str = "Creation Date";

    const SATURATION_DAYS: f64 = 365.0;
}

impl ScoringRule for CreationDateRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_weight(&self) -> i32 {
        50
    }

    fn score(&self, state: &EngineState, target: &dyn TargetView) -> f64 {
        let age_days = (state.planning_time - target.project().created_at())
            .num_days()
            .max(0) as f64;
        (age_days / Self::SATURATION_DAYS).min(1.0)
    }
}
