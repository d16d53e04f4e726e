use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AcquiredImageId, BinningMode, ExposurePlanId, ProjectId, TargetId};

/// Rotator position reported when no rotator is connected.
pub const NO_ROTATOR_ANGLE: f64 = f64::MIN;

/// Grading status of an acquired image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradingStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Capture metadata embedded in an acquired image row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(default)]
    pub file_name: String,
    /// Imaging session counter; distinguishes independent runs on the same night.
    pub session_id: i32,
    pub exposure_duration: f64,
    #[serde(default)]
    pub gain: Option<i32>,
    #[serde(default)]
    pub offset: Option<i32>,
    #[serde(default)]
    pub binning: BinningMode,
    #[serde(default)]
    pub readout_mode: Option<i32>,
    /// `None`, NaN or [`NO_ROTATOR_ANGLE`] when no rotator is in use.
    #[serde(default)]
    pub rotator_position: Option<f64>,
    pub roi: f64,
    #[serde(default)]
    pub hfr: Option<f64>,
    #[serde(default)]
    pub star_count: Option<u32>,
}

impl ImageMetadata {
    pub fn new(session_id: i32, exposure_duration: f64) -> Self {
        Self {
            file_name: String::new(),
            session_id,
            exposure_duration,
            gain: None,
            offset: None,
            binning: BinningMode::default(),
            readout_mode: None,
            rotator_position: None,
            roi: 100.0,
            hfr: None,
            star_count: None,
        }
    }
}

/// A persisted record of one acquired light frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquiredImage {
    #[serde(default)]
    pub id: Option<AcquiredImageId>,
    pub project_id: ProjectId,
    pub target_id: TargetId,
    pub exposure_plan_id: ExposurePlanId,
    pub acquired_at: DateTime<Utc>,
    pub filter_name: String,
    pub grading_status: GradingStatus,
    #[serde(default)]
    pub reject_reason: Option<String>,
    pub metadata: ImageMetadata,
}

impl AcquiredImage {
    /// Accepted and pending frames count as light frames needing calibration.
    pub fn is_light_candidate(&self) -> bool {
        self.grading_status != GradingStatus::Rejected
    }
}
