use crate::planning::TargetView;
use crate::scoring::{EngineState, ScoringRule};

/// Uses the selected exposure's moon avoidance score when the project opts
/// into smart exposure ordering.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmartExposureOrderRule;

impl SmartExposureOrderRule {
    pub const NAME: &'static str = "Smart Exposure Order";
}

impl ScoringRule for SmartExposureOrderRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_weight(&self) -> i32 {
        75
    }

    fn score(&self, _state: &EngineState, target: &dyn TargetView) -> f64 {
        if !target.project().smart_exposure_order() {
            return 0.0;
        }
        target
            .selected_exposure()
            .map_or(0.0, |exposure| exposure.moon_avoidance_score())
    }
}
