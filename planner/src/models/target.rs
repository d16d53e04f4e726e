use serde::{Deserialize, Serialize};

use super::{CadenceItem, ExposurePlan, ExposurePlanId, OverrideExposureOrder, ProjectId, TargetId};

/// Coordinate epoch of a target's equatorial coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Epoch {
    J2000,
    JNow,
    B1950,
    J2050,
}

/// Equatorial coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Right ascension in hours (0..24)
    pub ra_hours: f64,
    /// Declination in degrees (-90..90)
    pub dec_degrees: f64,
    pub epoch: Epoch,
}

impl Coordinates {
    pub fn new(ra_hours: f64, dec_degrees: f64, epoch: Epoch) -> Self {
        Self {
            ra_hours,
            dec_degrees,
            epoch,
        }
    }
}

fn default_roi() -> f64 {
    100.0
}

fn default_enabled() -> bool {
    true
}

/// A celestial object owned by a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    /// Back-reference to the owning project.
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub coordinates: Coordinates,
    /// Rotation angle in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Region of interest as a percentage of the full frame.
    #[serde(default = "default_roi")]
    pub roi: f64,
    #[serde(default)]
    pub exposure_plans: Vec<ExposurePlan>,
    #[serde(default)]
    pub override_exposure_order: Option<OverrideExposureOrder>,
    /// Cadence persisted after the last planning cycle that touched this target.
    #[serde(default)]
    pub filter_cadence: Vec<CadenceItem>,
}

impl Target {
    pub fn new(
        id: TargetId,
        project_id: ProjectId,
        name: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            id,
            project_id,
            name: name.into(),
            enabled: true,
            coordinates,
            rotation: 0.0,
            roi: default_roi(),
            exposure_plans: Vec::new(),
            override_exposure_order: None,
            filter_cadence: Vec::new(),
        }
    }

    pub fn exposure_plan(&self, plan_id: ExposurePlanId) -> Option<&ExposurePlan> {
        self.exposure_plans.iter().find(|p| p.id == plan_id)
    }

    pub fn exposure_plan_mut(&mut self, plan_id: ExposurePlanId) -> Option<&mut ExposurePlan> {
        self.exposure_plans.iter_mut().find(|p| p.id == plan_id)
    }
}
