use crate::planning::TargetView;
use crate::scoring::{EngineState, ScoringRule};

/// Finish what has been started.
#[derive(Debug, Default, Clone, Copy)]
pub struct PercentCompleteRule;

impl PercentCompleteRule {
    pub const NAME: &'static str = "Percent Complete";
}

impl ScoringRule for PercentCompleteRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_weight(&self) -> i32 {
        50
    }

    fn score(&self, _state: &EngineState, target: &dyn TargetView) -> f64 {
        target.completion_fraction()
    }
}

/// Within a mosaic, favor the least complete panel so the panels fill evenly.
#[derive(Debug, Default, Clone, Copy)]
pub struct MosaicCompletionRule;

impl MosaicCompletionRule {
    pub const NAME: &'static str = "Mosaic Completion";
}

impl ScoringRule for MosaicCompletionRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_weight(&self) -> i32 {
        50
    }

    fn score(&self, _state: &EngineState, target: &dyn TargetView) -> f64 {
        if !target.project().is_mosaic() {
            return 0.0;
        }
        1.0 - target.completion_fraction()
    }
}
