use crate::planning::TargetView;
use crate::scoring::{EngineState, ScoringRule};

/// Favors projects that time-box imaging around transit.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeridianWindowPriorityRule;

impl MeridianWindowPriorityRule {
    pub const NAME: &'static str = "Meridian Window Priority";
}

impl ScoringRule for MeridianWindowPriorityRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_weight(&self) -> i32 {
        75
    }

    fn score(&self, _state: &EngineState, target: &dyn TargetView) -> f64 {
        if target.project().meridian_window_minutes() > 0 {
            1.0
        } else {
            0.0
        }
    }
}

/// Targets about to set first.
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingSoonestRule;

impl SettingSoonestRule {
    pub const NAME: &'static str = "Setting Soonest";

    /// Targets setting later than this score 0.
    const HORIZON_MINUTES: f64 = 720.0;
}

impl ScoringRule for SettingSoonestRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_weight(&self) -> i32 {
        50
    }

    fn score(&self, state: &EngineState, target: &dyn TargetView) -> f64 {
        let Some(window) = target.visibility() else {
            return 0.0;
        };
        if !window.is_visible {
            return 0.0;
        }
        let minutes = (window.end - state.planning_time).num_minutes().max(0) as f64;
        1.0 - (minutes / Self::HORIZON_MINUTES).min(1.0)
    }
}

/// Stay on the previously imaged target rather than paying for a slew.
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetSwitchPenaltyRule;

impl TargetSwitchPenaltyRule {
    pub const NAME: &'static str = "Target Switch Penalty";
}

impl ScoringRule for TargetSwitchPenaltyRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn default_weight(&self) -> i32 {
        67
    }

    fn score(&self, state: &EngineState, target: &dyn TargetView) -> f64 {
        match state.previous_target {
            Some(previous) if previous == target.target_id() => 1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astrometry::VisibilityWindow;
    use crate::config::ProfilePreferences;
    use crate::models::TargetId;
    use crate::scoring::fakes::{FakeProject, FakeTarget};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 22, 0, 0).unwrap()
    }

    fn state() -> EngineState {
        EngineState::new(ProfilePreferences::default(), now())
    }

    #[test]
    fn test_meridian_window_priority() {
        let mut target = FakeTarget::new(FakeProject::default());
        assert_eq!(MeridianWindowPriorityRule.score(&state(), &target), 0.0);
        target.project.meridian_window_minutes = 120;
        assert_eq!(MeridianWindowPriorityRule.score(&state(), &target), 1.0);
    }

    #[test]
    fn test_setting_soonest() {
        let mut target = FakeTarget::new(FakeProject::default());
        assert_eq!(SettingSoonestRule.score(&state(), &target), 0.0);

        target.visibility = Some(VisibilityWindow::new(
            now() - Duration::hours(1),
            now(),
            now() + Duration::minutes(180),
        ));
        assert!((SettingSoonestRule.score(&state(), &target) - 0.75).abs() < 1e-12);

        target.visibility = Some(VisibilityWindow::new(
            now() - Duration::hours(1),
            now(),
            now() + Duration::hours(14),
        ));
        assert_eq!(SettingSoonestRule.score(&state(), &target), 0.0);
    }

    #[test]
    fn test_target_switch_penalty_favors_previous_target() {
        let target = FakeTarget::new(FakeProject::default());
        assert_eq!(TargetSwitchPenaltyRule.score(&state(), &target), 0.0);

        let same = state().with_previous_target(Some(target.id));
        assert_eq!(TargetSwitchPenaltyRule.score(&same, &target), 1.0);

        let other = state().with_previous_target(Some(TargetId(99)));
        assert_eq!(TargetSwitchPenaltyRule.score(&other, &target), 0.0);
    }
}
