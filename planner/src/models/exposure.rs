use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ExposurePlanId, TargetId};
use crate::error::{ErrorContext, PlannerError, PlannerResult};

/// Sky brightness, ordered from darkest to brightest. Used both for the
/// current sky state reported by the astrometry collaborator and for the
/// brightest sky an exposure plan still accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TwilightLevel {
    Nighttime,
    Astronomical,
    Nautical,
    Civil,
}

impl Default for TwilightLevel {
    fn default() -> Self {
        TwilightLevel::Nighttime
    }
}

/// Camera binning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinningMode {
    pub x: u16,
    pub y: u16,
}

impl BinningMode {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

impl Default for BinningMode {
    fn default() -> Self {
        Self { x: 1, y: 1 }
    }
}

impl fmt::Display for BinningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Moon avoidance parameters (Lorentzian avoidance curve).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoonAvoidance {
    pub enabled: bool,
    /// Separation angle at full moon, degrees.
    pub separation_degrees: f64,
    /// Width of the avoidance curve, days.
    pub width_days: i32,
    #[serde(default)]
    pub relax_scale: f64,
    #[serde(default = "default_relax_max_altitude")]
    pub relax_max_altitude: f64,
    #[serde(default = "default_relax_min_altitude")]
    pub relax_min_altitude: f64,
}

fn default_relax_max_altitude() -> f64 {
    5.0
}

fn default_relax_min_altitude() -> f64 {
    -15.0
}

impl Default for MoonAvoidance {
    fn default() -> Self {
        Self {
            enabled: false,
            separation_degrees: 60.0,
            width_days: 7,
            relax_scale: 0.0,
            relax_max_altitude: default_relax_max_altitude(),
            relax_min_altitude: default_relax_min_altitude(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Desired/accepted/acquired counters for one filter configuration on a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposurePlan {
    pub id: ExposurePlanId,
    pub target_id: TargetId,
    pub filter_name: String,
    /// Nominal exposure length in seconds.
    pub exposure_secs: f64,
    /// `None` means "use camera default" for each of these.
    #[serde(default)]
    pub gain: Option<i32>,
    #[serde(default)]
    pub offset: Option<i32>,
    #[serde(default)]
    pub binning: Option<BinningMode>,
    #[serde(default)]
    pub readout_mode: Option<i32>,

    pub desired: i32,
    #[serde(default)]
    pub accepted: u32,
    #[serde(default)]
    pub acquired: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub twilight_level: TwilightLevel,
    #[serde(default)]
    pub moon_avoidance: MoonAvoidance,
    #[serde(default)]
    pub moon_down_enabled: bool,
    /// Maximum relative humidity in percent; 0 disables the check.
    #[serde(default)]
    pub max_humidity: f64,
}

impl ExposurePlan {
    pub fn new(
        id: ExposurePlanId,
        target_id: TargetId,
        filter_name: impl Into<String>,
        exposure_secs: f64,
        desired: i32,
    ) -> Self {
        Self {
            id,
            target_id,
            filter_name: filter_name.into(),
            exposure_secs,
            gain: None,
            offset: None,
            binning: None,
            readout_mode: None,
            desired,
            accepted: 0,
            acquired: 0,
            enabled: true,
            twilight_level: TwilightLevel::Nighttime,
            moon_avoidance: MoonAvoidance::default(),
            moon_down_enabled: false,
            max_humidity: 0.0,
        }
    }

    /// Check the counter invariants.
    pub fn validate(&self) -> PlannerResult<()> {
        if self.accepted > self.acquired {
            return Err(PlannerError::validation_with_context(
                format!(
                    "accepted count {} exceeds acquired count {}",
                    self.accepted, self.acquired
                ),
                ErrorContext::new("validate_exposure_plan")
                    .with_entity("exposure_plan")
                    .with_entity_id(self.id),
            ));
        }
        if self.exposure_secs <= 0.0 || !self.exposure_secs.is_finite() {
            return Err(PlannerError::validation_with_context(
                format!("exposure length {} must be positive", self.exposure_secs),
                ErrorContext::new("validate_exposure_plan")
                    .with_entity("exposure_plan")
                    .with_entity_id(self.id),
            ));
        }
        Ok(())
    }
}
