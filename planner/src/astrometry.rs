//! Astrometry collaborator interface.
//!
//! Rise/transit/set computation is not done here. The planner asks an
//! [`Astrometry`] implementation for each target's visibility window, the
//! current twilight level and moon state, and each exposure's moon avoidance
//! score. [`StaticAstrometry`] answers from precomputed data and backs the
//! command line runner and the tests.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Coordinates, ExposurePlan, ExposurePlanId, TargetId};
pub use crate::models::TwilightLevel;

/// When a target is observable during the current night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityWindow {
    pub is_visible: bool,
    pub start: DateTime<Utc>,
    pub culmination: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl VisibilityWindow {
    pub fn new(start: DateTime<Utc>, culmination: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            is_visible: start < end,
            start,
            culmination,
            end,
        }
    }

    pub fn not_visible(at: DateTime<Utc>) -> Self {
        Self {
            is_visible: false,
            start: at,
            culmination: at,
            end: at,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.is_visible && self.start <= at && at < self.end
    }

    /// Minutes of visibility left from `from` (or from the window start if
    /// that is later).
    pub fn remaining_minutes(&self, from: DateTime<Utc>) -> i64 {
        if !self.is_visible {
            return 0;
        }
        let begin = self.start.max(from);
        (self.end - begin).num_minutes().max(0)
    }

    /// Intersect with `culmination ± window_minutes`. A zero window leaves the
    /// window untouched.
    pub fn clip_to_meridian(&self, window_minutes: u32) -> Self {
        if window_minutes == 0 || !self.is_visible {
            return *self;
        }
        let half = Duration::minutes(i64::from(window_minutes));
        let start = self.start.max(self.culmination - half);
        let end = self.end.min(self.culmination + half);
        Self {
            is_visible: start < end,
            start,
            culmination: self.culmination,
            end: end.max(start),
        }
    }
}

/// Horizon parameters the visibility computation must honor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonParams {
    pub minimum_altitude: f64,
    pub maximum_altitude: f64,
    pub use_custom_horizon: bool,
    pub horizon_offset: f64,
}

/// One visibility question for one target.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityRequest<'a> {
    pub target_id: TargetId,
    pub coordinates: &'a Coordinates,
    pub horizon: HorizonParams,
    pub at: DateTime<Utc>,
}

pub trait Astrometry: Send + Sync {
    /// Visibility window for the night containing `request.at`.
    fn visibility(&self, request: &VisibilityRequest<'_>) -> VisibilityWindow;

    /// Moon avoidance score for an exposure in [0, 1]; 0 means the moon is too
    /// close for this exposure right now.
    fn moon_avoidance_score(
        &self,
        coordinates: &Coordinates,
        exposure: &ExposurePlan,
        at: DateTime<Utc>,
    ) -> f64;

    fn twilight_level(&self, at: DateTime<Utc>) -> TwilightLevel;

    fn moon_is_up(&self, at: DateTime<Utc>) -> bool;
}

/// Precomputed astrometry answers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticAstrometry {
    #[serde(default)]
    pub windows: HashMap<TargetId, VisibilityWindow>,
    #[serde(default)]
    pub moon_scores: HashMap<ExposurePlanId, f64>,
    #[serde(default)]
    pub twilight: TwilightLevel,
    #[serde(default)]
    pub moon_up: bool,
}

impl StaticAstrometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, target_id: TargetId, window: VisibilityWindow) -> Self {
        self.windows.insert(target_id, window);
        self
    }

    pub fn with_moon_score(mut self, plan_id: ExposurePlanId, score: f64) -> Self {
        self.moon_scores.insert(plan_id, score);
        self
    }
}

impl Astrometry for StaticAstrometry {
    fn visibility(&self, request: &VisibilityRequest<'_>) -> VisibilityWindow {
        self.windows
            .get(&request.target_id)
            .copied()
            .unwrap_or_else(|| VisibilityWindow::not_visible(request.at))
    }

    fn moon_avoidance_score(
        &self,
        _coordinates: &Coordinates,
        exposure: &ExposurePlan,
        _at: DateTime<Utc>,
    ) -> f64 {
        self.moon_scores.get(&exposure.id).copied().unwrap_or(1.0)
    }

    fn twilight_level(&self, _at: DateTime<Utc>) -> TwilightLevel {
        self.twilight
    }

    fn moon_is_up(&self, _at: DateTime<Utc>) -> bool {
        self.moon_up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 5, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_window_contains_and_remaining() {
        let window = VisibilityWindow::new(at(20, 0), at(23, 0), at(23, 59));
        assert!(window.contains(at(21, 0)));
        assert!(!window.contains(at(19, 59)));
        assert_eq!(window.remaining_minutes(at(23, 0)), 59);
        assert_eq!(window.remaining_minutes(at(18, 0)), 239);
    }

    #[test]
    fn test_clip_to_meridian() {
        let window = VisibilityWindow::new(at(20, 0), at(22, 0), at(23, 30));
        let clipped = window.clip_to_meridian(60);
        assert_eq!(clipped.start, at(21, 0));
        assert_eq!(clipped.end, at(23, 0));
        assert!(clipped.is_visible);
        assert_eq!(window.clip_to_meridian(0), window);
    }

    #[test]
    fn test_static_astrometry_defaults() {
        let astrometry = StaticAstrometry::new();
        let coords = Coordinates::new(0.0, 0.0, crate::models::Epoch::J2000);
        let request = VisibilityRequest {
            target_id: TargetId(9),
            coordinates: &coords,
            horizon: HorizonParams {
                minimum_altitude: 0.0,
                maximum_altitude: 90.0,
                use_custom_horizon: false,
                horizon_offset: 0.0,
            },
            at: at(21, 0),
        };
        assert!(!astrometry.visibility(&request).is_visible);
        assert_eq!(astrometry.twilight_level(at(21, 0)), TwilightLevel::Nighttime);
    }
}
