use chrono::{DateTime, Utc};

use crate::config::ProfilePreferences;
use crate::models::TargetId;
use crate::planning::TargetView;

/// Read-only state shared by every rule during one planning cycle.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub profile_id: String,
    pub preferences: ProfilePreferences,
    pub planning_time: DateTime<Utc>,
    /// Target imaged by the previous plan, if any.
    pub previous_target: Option<TargetId>,
}

impl EngineState {
    pub fn new(preferences: ProfilePreferences, planning_time: DateTime<Utc>) -> Self {
        Self {
            profile_id: preferences.profile_id.clone(),
            preferences,
            planning_time,
            previous_target: None,
        }
    }

    pub fn with_previous_target(mut self, previous_target: Option<TargetId>) -> Self {
        self.previous_target = previous_target;
        self
    }
}

/// A pluggable scoring rule.
pub trait ScoringRule: Send + Sync {
    /// Unique name, used as the key in a project's rule weights.
    fn name(&self) -> &'static str;

    /// Weight copied into new projects.
    fn default_weight(&self) -> i32;

    /// Raw score in [0, 1].
    fn score(&self, state: &EngineState, target: &dyn TargetView) -> f64;
}
