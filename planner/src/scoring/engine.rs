use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::registry::ScoringRuleRegistry;
use super::rule::{EngineState, ScoringRule};
use crate::planning::TargetView;

/// Weight and raw score of one rule for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub name: String,
    pub weight: i32,
    pub score: f64,
}

impl RuleResult {
    /// Contribution of this rule to the total.
    pub fn weighted_score(&self) -> f64 {
        self.score * f64::from(self.weight) / 100.0
    }
}

/// Per-target scoring breakdown kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringResults {
    pub total_score: f64,
    pub rule_results: Vec<RuleResult>,
}

impl ScoringResults {
    pub fn rule(&self, name: &str) -> Option<&RuleResult> {
        self.rule_results.iter().find(|r| r.name == name)
    }
}

pub struct ScoringEngine {
    state: EngineState,
    rules: Vec<Arc<dyn ScoringRule>>,
}

impl ScoringEngine {
    /// Engine running every registered rule.
    pub fn new(state: EngineState) -> Self {
        let rules: Vec<Arc<dyn ScoringRule>> =
            ScoringRuleRegistry::all().into_iter().map(Arc::from).collect();
        Self::with_rules(state, rules)
    }

    pub fn with_rules(state: EngineState, rules: Vec<Arc<dyn ScoringRule>>) -> Self {
        Self { state, rules }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn rules(&self) -> &[Arc<dyn ScoringRule>] {
        &self.rules
    }

    /// Score `target` and attach the breakdown to it.
    ///
    /// Each rule with a positive weight contributes `score * weight / 100`.
    /// The weight comes from the target's project; a rule the project has no
    /// weight for uses its default weight. Raw scores outside [0, 1] are
    /// clamped, NaN counts as 0.
    pub fn score_target(&self, target: &mut dyn TargetView) -> f64 {
        let mut results = ScoringResults::default();
        {
            let weights = target.project().rule_weights();
            for rule in &self.rules {
                let weight = weights
                    .get(rule.name())
                    .unwrap_or_else(|| rule.default_weight());
                if weight <= 0 {
                    continue;
                }
                let raw = rule.score(&self.state, &*target);
                let score = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
                let result = RuleResult {
                    name: rule.name().to_string(),
                    weight,
                    score,
                };
                results.total_score += result.weighted_score();
                results.rule_results.push(result);
            }
        }

        let total = results.total_score;
        target.set_scoring_results(results);
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::fakes::{FakeProject, FakeTarget};
    use crate::scoring::rules::{MeridianWindowPriorityRule, ProjectPriorityRule};
    use crate::models::{ProjectPriority, RuleWeights};
    use crate::config::ProfilePreferences;
    use chrono::{TimeZone, Utc};

    struct ConstantRule(&'static str, f64);

    impl ScoringRule for ConstantRule {
        fn name(&self) -> &'static str {
            self.0
        }

        fn default_weight(&self) -> i32 {
            50
        }

        fn score(&self, _state: &EngineState, _target: &dyn TargetView) -> f64 {
            self.1
        }
    }

    fn state() -> EngineState {
        EngineState::new(
            ProfilePreferences::default(),
            Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap(),
        )
    }

    fn target_with_weights(weights: RuleWeights) -> FakeTarget {
        FakeTarget::new(FakeProject {
            rule_weights: weights,
            ..FakeProject::default()
        })
    }

    #[test]
    fn test_total_is_weighted_sum() {
        let weights = RuleWeights::new().with("A", 100).unwrap().with("B", 50).unwrap();
        let mut target = target_with_weights(weights);
        let engine = ScoringEngine::with_rules(
            state(),
            vec![Arc::new(ConstantRule("A", 0.5)), Arc::new(ConstantRule("B", 1.0))],
        );
        let total = engine.score_target(&mut target);
        assert!((total - 1.0).abs() < 1e-12);
        let results = target.scoring_results.unwrap();
        assert_eq!(results.rule_results.len(), 2);
        assert_eq!(results.rule("B").unwrap().weight, 50);
    }

    #[test]
    fn test_zero_weight_rule_is_skipped() {
        let weights = RuleWeights::new().with("A", 100).unwrap().with("B", 0).unwrap();
        let mut target = target_with_weights(weights);
        let engine = ScoringEngine::with_rules(
            state(),
            vec![Arc::new(ConstantRule("A", 0.25)), Arc::new(ConstantRule("B", 1.0))],
        );
        assert!((engine.score_target(&mut target) - 0.25).abs() < 1e-12);
        assert!(target.scoring_results.unwrap().rule("B").is_none());
    }

    #[test]
    fn test_removed_rule_drops_out_of_total() {
        let weights = RuleWeights::new()
            .with("A", 80)
            .unwrap()
            .with("B", 60)
            .unwrap()
            .with("C", 40)
            .unwrap();
        let mut target = target_with_weights(weights);
        let a: Arc<dyn ScoringRule> = Arc::new(ConstantRule("A", 0.5));
        let b: Arc<dyn ScoringRule> = Arc::new(ConstantRule("B", 0.7));
        let c: Arc<dyn ScoringRule> = Arc::new(ConstantRule("C", 0.3));

        let full = ScoringEngine::with_rules(state(), vec![a.clone(), b, c.clone()]);
        let full_total = full.score_target(&mut target);
        let full_results = target.scoring_results.clone().unwrap();
        assert!((full_total - 0.94).abs() < 1e-12);
        let expected = full_results.rule("A").unwrap().weighted_score()
            + full_results.rule("C").unwrap().weighted_score();

        let reduced = ScoringEngine::with_rules(state(), vec![a, c]);
        let reduced_total = reduced.score_target(&mut target);
        assert!((reduced_total - expected).abs() < 1e-12);
        assert!((reduced_total - 0.52).abs() < 1e-12);
        let results = target.scoring_results.unwrap();
        assert!(results.rule("B").is_none());
        assert_eq!(results.rule_results.len(), 2);
        assert!((results.total_score - reduced_total).abs() < 1e-12);
    }

    #[test]
    fn test_missing_weight_uses_rule_default() {
        let mut target = target_with_weights(RuleWeights::new());
        let engine = ScoringEngine::with_rules(state(), vec![Arc::new(ConstantRule("A", 1.0))]);
        assert!((engine.score_target(&mut target) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_raw_scores_are_clamped() {
        let weights = RuleWeights::new()
            .with("High", 100)
            .unwrap()
            .with("Low", 100)
            .unwrap()
            .with("Nan", 100)
            .unwrap();
        let mut target = target_with_weights(weights);
        let engine = ScoringEngine::with_rules(
            state(),
            vec![
                Arc::new(ConstantRule("High", 3.0)),
                Arc::new(ConstantRule("Low", -2.0)),
                Arc::new(ConstantRule("Nan", f64::NAN)),
            ],
        );
        assert!((engine.score_target(&mut target) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_registered_rules_score_project() {
        let weights = RuleWeights::new()
            .with(ProjectPriorityRule::NAME, 100)
            .unwrap()
            .with(MeridianWindowPriorityRule::NAME, 100)
            .unwrap();
        let mut target = FakeTarget::new(FakeProject {
            priority: ProjectPriority::High,
            meridian_window_minutes: 60,
            rule_weights: weights,
            ..FakeProject::default()
        });
        let engine = ScoringEngine::with_rules(
            state(),
            vec![
                Arc::new(ProjectPriorityRule),
                Arc::new(MeridianWindowPriorityRule),
            ],
        );
        assert!((engine.score_target(&mut target) - 2.0).abs() < 1e-12);
    }
}
