use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProjectId, Target};
use crate::error::{ErrorContext, PlannerError, PlannerResult};
use crate::scoring::ScoringRuleRegistry;

/// Lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectState {
    Draft,
    Active,
    Inactive,
    Completed,
}

/// User-assigned project priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProjectPriority {
    Low,
    Normal,
    High,
}

/// When flat frames should be scheduled for a project's light sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "days")]
pub enum FlatsHandling {
    /// Flats are never scheduled.
    Off,
    /// Flats for a target are scheduled once all of its exposure plans complete.
    TargetCompletion,
    /// Flats are scheduled for every uncovered light session right away.
    Immediate,
    /// Flats are scheduled when the last flats run is at least this many days old.
    Periodic(u32),
}

impl Default for FlatsHandling {
    fn default() -> Self {
        FlatsHandling::Off
    }
}

pub const MIN_RULE_WEIGHT: i32 = 0;
pub const MAX_RULE_WEIGHT: i32 = 100;

/// Per-project mapping of scoring rule name to weight (0..=100).
///
/// Out-of-range weights are rejected, never clamped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, i32>", into = "BTreeMap<String, i32>")]
pub struct RuleWeights(BTreeMap<String, i32>);

impl RuleWeights {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Set the weight for a rule.
    pub fn set(&mut self, rule_name: impl Into<String>, weight: i32) -> PlannerResult<()> {
        let rule_name = rule_name.into();
        validate_weight(&rule_name, weight)?;
        self.0.insert(rule_name, weight);
        Ok(())
    }

    /// Builder form of [`RuleWeights::set`].
    pub fn with(mut self, rule_name: impl Into<String>, weight: i32) -> PlannerResult<Self> {
        self.set(rule_name, weight)?;
        Ok(self)
    }

    pub fn get(&self, rule_name: &str) -> Option<i32> {
        self.0.get(rule_name).copied()
    }

    pub fn remove(&mut self, rule_name: &str) -> Option<i32> {
        self.0.remove(rule_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn validate_weight(rule_name: &str, weight: i32) -> PlannerResult<()> {
    if (MIN_RULE_WEIGHT..=MAX_RULE_WEIGHT).contains(&weight) {
        return Ok(());
    }
    Err(PlannerError::configuration_with_context(
        format!(
            "rule weight {} is outside {}..={}",
            weight, MIN_RULE_WEIGHT, MAX_RULE_WEIGHT
        ),
        ErrorContext::new("set_rule_weight")
            .with_entity("scoring_rule")
            .with_entity_id(rule_name),
    ))
}

impl TryFrom<BTreeMap<String, i32>> for RuleWeights {
    type Error = PlannerError;

    fn try_from(map: BTreeMap<String, i32>) -> Result<Self, Self::Error> {
        for (name, weight) in &map {
            validate_weight(name, *weight)?;
        }
        Ok(Self(map))
    }
}

impl From<RuleWeights> for BTreeMap<String, i32> {
    fn from(weights: RuleWeights) -> Self {
        weights.0
    }
}

/// A user-defined imaging campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub profile_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub state: ProjectState,
    pub priority: ProjectPriority,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub active_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inactive_at: Option<DateTime<Utc>>,

    /// Minimum imaging time per session, in minutes.
    pub minimum_time_minutes: u32,
    pub minimum_altitude: f64,
    pub maximum_altitude: f64,
    #[serde(default)]
    pub use_custom_horizon: bool,
    #[serde(default)]
    pub horizon_offset: f64,
    /// Minutes either side of culmination; 0 disables the meridian window.
    #[serde(default)]
    pub meridian_window_minutes: u32,
    #[serde(default)]
    pub filter_switch_frequency: u32,
    /// Dither after this many exposures; 0 or less disables dithering.
    #[serde(default)]
    pub dither_every: i32,
    #[serde(default)]
    pub is_mosaic: bool,
    #[serde(default)]
    pub enable_grader: bool,
    #[serde(default)]
    pub smart_exposure_order: bool,
    #[serde(default)]
    pub flats_handling: FlatsHandling,

    pub rule_weights: RuleWeights,
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Project {
    /// Create a draft project, seeding its rule weights from the registered
    /// rules' default weights.
    ///
    /// Changing a rule's default weight later never alters existing projects.
    pub fn new(
        id: ProjectId,
        profile_id: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            profile_id: profile_id.into(),
            name: name.into(),
            description: String::new(),
            state: ProjectState::Draft,
            priority: ProjectPriority::Normal,
            created_at,
            active_at: None,
            inactive_at: None,
            minimum_time_minutes: 30,
            minimum_altitude: 0.0,
            maximum_altitude: 90.0,
            use_custom_horizon: false,
            horizon_offset: 0.0,
            meridian_window_minutes: 0,
            filter_switch_frequency: 0,
            dither_every: 0,
            is_mosaic: false,
            enable_grader: true,
            smart_exposure_order: false,
            flats_handling: FlatsHandling::Off,
            rule_weights: ScoringRuleRegistry::default_weights(),
            targets: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ProjectState::Active
    }

    /// Move the project to a new lifecycle state, stamping the activation or
    /// deactivation time.
    pub fn set_state(&mut self, state: ProjectState, at: DateTime<Utc>) {
        if self.state == state {
            return;
        }
        match state {
            ProjectState::Active => self.active_at = Some(at),
            ProjectState::Inactive | ProjectState::Completed => self.inactive_at = Some(at),
            ProjectState::Draft => {}
        }
        self.state = state;
    }

    pub fn target(&self, target_id: super::TargetId) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == target_id)
    }

    pub fn target_mut(&mut self, target_id: super::TargetId) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.id == target_id)
    }
}
