use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::models::{AcquiredImage, BinningMode, TargetId, NO_ROTATOR_ANGLE};

/// Calibration signature of a light frame.
///
/// Equality depends on target identity: when either rotation is 0 (no
/// rotator) or both specs belong to the same target, only [`FlatSpec::key`]
/// is compared. Otherwise the rotations must match as well. Hashing uses the
/// key alone, so equal specs always hash alike.
///
/// Because of the target rule the relation is only transitive among specs of
/// a single target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "FlatSpecFields")]
pub struct FlatSpec {
    pub target_id: TargetId,
    pub filter: String,
    pub gain: Option<i32>,
    pub offset: Option<i32>,
    pub binning: BinningMode,
    pub readout_mode: Option<i32>,
    /// Normalized rotation in degrees; 0 means no rotator.
    pub rotation: f64,
    pub roi: f64,
    key: String,
}

#[derive(Deserialize)]
struct FlatSpecFields {
    target_id: TargetId,
    filter: String,
    gain: Option<i32>,
    offset: Option<i32>,
    binning: BinningMode,
    readout_mode: Option<i32>,
    rotation: f64,
    roi: f64,
}

impl From<FlatSpecFields> for FlatSpec {
    fn from(f: FlatSpecFields) -> Self {
        FlatSpec::new(
            f.target_id,
            f.filter,
            f.gain,
            f.offset,
            f.binning,
            f.readout_mode,
            Some(f.rotation),
            f.roi,
        )
    }
}

/// Collapse "no rotator" readings to 0 and round to a tenth of a degree.
pub fn normalize_rotation(rotation: Option<f64>) -> f64 {
    match rotation {
        Some(r) if r.is_finite() && r != NO_ROTATOR_ANGLE => (r * 10.0).round() / 10.0 + 0.0,
        _ => 0.0,
    }
}

fn key_part(value: Option<i32>) -> i32 {
    value.unwrap_or(-1)
}

impl FlatSpec {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target_id: TargetId,
        filter: impl Into<String>,
        gain: Option<i32>,
        offset: Option<i32>,
        binning: BinningMode,
        readout_mode: Option<i32>,
        rotation: Option<f64>,
        roi: f64,
    ) -> Self {
        let filter = filter.into();
        let key = format!(
            "{}_{}_{}_{}_{}_{}",
            filter,
            key_part(gain),
            key_part(offset),
            binning,
            key_part(readout_mode),
            roi
        );
        Self {
            target_id,
            filter,
            gain,
            offset,
            binning,
            readout_mode,
            rotation: normalize_rotation(rotation),
            roi,
            key,
        }
    }

    /// Spec of an acquired light frame, from its embedded capture metadata.
    pub fn from_image(target_id: TargetId, image: &AcquiredImage) -> Self {
        let meta = &image.metadata;
        Self::new(
            target_id,
            image.filter_name.clone(),
            meta.gain,
            meta.offset,
            meta.binning,
            meta.readout_mode,
            meta.rotator_position,
            meta.roi,
        )
    }

    /// `"{filter}_{gain}_{offset}_{binning}_{readout}_{roi}"`, with `-1` for
    /// camera defaults.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_rotator(&self) -> bool {
        self.rotation != 0.0
    }
}

impl PartialEq for FlatSpec {
    fn eq(&self, other: &Self) -> bool {
        if self.key != other.key {
            return false;
        }
        !self.has_rotator() || !other.has_rotator() || self.target_id == other.target_id
            || self.rotation == other.rotation
    }
}

impl Eq for FlatSpec {}

impl Hash for FlatSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for FlatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}°", self.key, self.rotation)
    }
}
