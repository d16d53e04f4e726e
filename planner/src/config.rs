//! Planner configuration file support.
//!
//! Configuration is read from a TOML file and may be overridden by
//! environment variables:
//!
//! - `PLANNER_PROFILE_ID`: profile whose projects are planned
//! - `PLANNER_THROTTLE_PERCENT`: exposure throttle applied when grading is on
//! - `PLANNER_ROLLOVER_HOUR`: local hour at which a new session date begins
//! - `PLANNER_UTC_OFFSET_HOURS`: fixed local offset used for session dates

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PlannerError, PlannerResult};
use crate::models::RuleWeights;

/// Planner configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub profile: ProfilePreferences,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
}

/// Profile-wide planning preferences, visible to every scoring rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePreferences {
    #[serde(default = "default_profile_id")]
    pub profile_id: String,
    /// Percent by which desired counts are inflated when grading is enabled.
    #[serde(default)]
    pub exposure_throttle_percent: f64,
    #[serde(default)]
    pub park_on_wait: bool,
    /// Wait plans never resume sooner than this many seconds from now.
    #[serde(default = "default_minimum_wait_secs")]
    pub minimum_wait_secs: u32,
}

/// How acquisition timestamps are bucketed into session dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_rollover_hour")]
    pub rollover_hour: u32,
    #[serde(default)]
    pub utc_offset_hours: i32,
}

/// Global overrides of the registered rules' default weights, applied to
/// newly created projects only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub default_weights: RuleWeights,
}

fn default_profile_id() -> String {
    "default".to_string()
}

fn default_minimum_wait_secs() -> u32 {
    60
}

fn default_rollover_hour() -> u32 {
    12
}

impl Default for ProfilePreferences {
    fn default() -> Self {
        Self {
            profile_id: default_profile_id(),
            exposure_throttle_percent: 0.0,
            park_on_wait: false,
            minimum_wait_secs: default_minimum_wait_secs(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            rollover_hour: default_rollover_hour(),
            utc_offset_hours: 0,
        }
    }
}

impl SessionSettings {
    /// The fixed offset used to turn UTC timestamps into local session dates.
    pub fn utc_offset(&self) -> PlannerResult<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                PlannerError::configuration_with_context(
                    format!("UTC offset {}h is out of range", self.utc_offset_hours),
                    ErrorContext::new("session_utc_offset"),
                )
            })
    }
}

impl PlannerConfig {
    /// Load planner configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PlannerError::configuration_with_context(
                format!("Failed to read config file: {}", e),
                ErrorContext::new("load_config").with_details(path.as_ref().display().to_string()),
            )
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> PlannerResult<Self> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load planner configuration from the default location.
    ///
    /// Searches for `planner.toml` in:
    /// 1. Current directory
    /// 2. `planner/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> PlannerResult<Self> {
        let search_paths = [
            PathBuf::from("planner.toml"),
            PathBuf::from("planner/planner.toml"),
            PathBuf::from("../planner.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(PlannerError::configuration(
            "No planner.toml found in standard locations",
        ))
    }

    /// Apply `PLANNER_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) -> PlannerResult<()> {
        if let Ok(profile_id) = env::var("PLANNER_PROFILE_ID") {
            self.profile.profile_id = profile_id;
        }
        if let Some(throttle) = parse_env::<f64>("PLANNER_THROTTLE_PERCENT")? {
            self.profile.exposure_throttle_percent = throttle;
        }
        if let Some(hour) = parse_env::<u32>("PLANNER_ROLLOVER_HOUR")? {
            self.sessions.rollover_hour = hour;
        }
        if let Some(offset) = parse_env::<i32>("PLANNER_UTC_OFFSET_HOURS")? {
            self.sessions.utc_offset_hours = offset;
        }
        self.validate()
    }

    pub fn validate(&self) -> PlannerResult<()> {
        if self.profile.exposure_throttle_percent < 0.0
            || !self.profile.exposure_throttle_percent.is_finite()
        {
            return Err(PlannerError::configuration(format!(
                "exposure_throttle_percent must be a non-negative number, got {}",
                self.profile.exposure_throttle_percent
            )));
        }
        if self.sessions.rollover_hour > 23 {
            return Err(PlannerError::configuration(format!(
                "rollover_hour must be between 0 and 23, got {}",
                self.sessions.rollover_hour
            )));
        }
        self.sessions.utc_offset()?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> PlannerResult<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            PlannerError::configuration_with_context(
                format!("{} has an invalid value '{}'", key, raw),
                ErrorContext::new("apply_env_overrides"),
            )
        }),
        Err(_) => Ok(None),
    }
}
