//! Compile-time table of the built-in scoring rules.

use super::rule::ScoringRule;
use super::rules::{
    CreationDateRule, MeridianWindowPriorityRule, MosaicCompletionRule, PercentCompleteRule,
    ProjectPriorityRule, SettingSoonestRule, SmartExposureOrderRule, TargetSwitchPenaltyRule,
};
use crate::models::RuleWeights;

type RuleConstructor = fn() -> Box<dyn ScoringRule>;

fn construct<R: ScoringRule + Default + 'static>() -> Box<dyn ScoringRule> {
    Box::new(R::default())
}

static RULES: &[(&str, RuleConstructor)] = &[
    (ProjectPriorityRule::NAME, construct::<ProjectPriorityRule> as RuleConstructor),
    (CreationDateRule::NAME, construct::<CreationDateRule> as RuleConstructor),
    (PercentCompleteRule::NAME, construct::<PercentCompleteRule> as RuleConstructor),
    (MosaicCompletionRule::NAME, construct::<MosaicCompletionRule> as RuleConstructor),
    (SettingSoonestRule::NAME, construct::<SettingSoonestRule> as RuleConstructor),
    (TargetSwitchPenaltyRule::NAME, construct::<TargetSwitchPenaltyRule> as RuleConstructor),
    (MeridianWindowPriorityRule::NAME, construct::<MeridianWindowPriorityRule> as RuleConstructor),
    (SmartExposureOrderRule::NAME, construct::<SmartExposureOrderRule> as RuleConstructor),
];

pub struct ScoringRuleRegistry;

impl ScoringRuleRegistry {
    /// One instance of every registered rule, in registration order.
    pub fn all() -> Vec<Box<dyn ScoringRule>> {
        RULES.iter().map(|(_, construct)| construct()).collect()
    }

    pub fn names() -> Vec<&'static str> {
        RULES.iter().map(|(name, _)| *name).collect()
    }

    pub fn contains(name: &str) -> bool {
        RULES.iter().any(|(registered, _)| *registered == name)
    }

    /// Every registered rule's default weight.
    pub fn default_weights() -> RuleWeights {
        let mut weights = RuleWeights::new();
        for rule in Self::all() {
            if let Err(e) = weights.set(rule.name(), rule.default_weight()) {
                log::warn!("Ignoring default weight of rule '{}': {}", rule.name(), e);
            }
        }
        weights
    }

    /// Default weights with configured overrides applied. Overrides naming an
    /// unregistered rule are ignored.
    pub fn default_weights_with_overrides(overrides: &RuleWeights) -> RuleWeights {
        let mut weights = Self::default_weights();
        for (name, weight) in overrides.iter() {
            if !Self::contains(name) {
                log::warn!("Ignoring weight override for unknown scoring rule '{}'", name);
                continue;
            }
            if let Err(e) = weights.set(name, weight) {
                log::warn!("Ignoring weight override for rule '{}': {}", name, e);
            }
        }
        weights
    }
}
