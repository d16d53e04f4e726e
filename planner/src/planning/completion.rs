//! Exposure completion policy.
//!
//! Decides how many more frames an exposure plan needs. With grading off,
//! every acquired frame counts. With grading on, only accepted frames count,
//! and the desired total is inflated by the throttle percentage to make room
//! for expected rejections.

use serde::{Deserialize, Serialize};

use crate::models::ExposurePlan;

/// Frames still needed for `plan`.
pub fn remaining(plan: &ExposurePlan, grader_enabled: bool, throttle_percent: f64) -> u32 {
    if plan.desired <= 0 {
        return 0;
    }

    if !grader_enabled {
        return (i64::from(plan.desired) - i64::from(plan.acquired)).max(0) as u32;
    }

    let effective_desired = f64::from(plan.desired) * (1.0 + throttle_percent / 100.0);
    let target = effective_desired.ceil().max(0.0) as i64;
    (target - i64::from(plan.accepted)).max(0) as u32
}

/// Completion policy bound to one project's grading setting and the
/// profile's throttle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureCompletion {
    pub grader_enabled: bool,
    pub throttle_percent: f64,
}

impl ExposureCompletion {
    pub fn new(grader_enabled: bool, throttle_percent: f64) -> Self {
        Self {
            grader_enabled,
            throttle_percent,
        }
    }

    pub fn remaining(&self, plan: &ExposurePlan) -> u32 {
        remaining(plan, self.grader_enabled, self.throttle_percent)
    }

    /// A plan with nothing desired or nothing remaining is complete.
    pub fn is_complete(&self, plan: &ExposurePlan) -> bool {
        plan.desired <= 0 || self.remaining(plan) == 0
    }

    /// Frames that count toward completion under this policy.
    pub fn counted(&self, plan: &ExposurePlan) -> u32 {
        if self.grader_enabled {
            plan.accepted
        } else {
            plan.acquired
        }
    }

    /// Completion of a single plan in percent, capped at 100.
    pub fn percent_complete(&self, plan: &ExposurePlan) -> f64 {
        if plan.desired <= 0 {
            return 100.0;
        }
        let desired = f64::from(plan.desired);
        (f64::from(self.counted(plan)).min(desired) / desired) * 100.0
    }

    /// Overall completion fraction (0..=1) of a set of plans, weighting each
    /// plan by its desired count. Plans desiring nothing are ignored; an empty
    /// set is complete.
    pub fn completion_fraction<'a, I>(&self, plans: I) -> f64
    where
        I: IntoIterator<Item = &'a ExposurePlan>,
    {
        let (done, wanted) = plans
            .into_iter()
            .filter(|plan| plan.enabled && plan.desired > 0)
            .fold((0.0, 0.0), |(done, wanted), plan| {
                let desired = f64::from(plan.desired);
                (
                    done + f64::from(self.counted(plan)).min(desired),
                    wanted + desired,
                )
            });

        if wanted <= 0.0 {
            1.0
        } else {
            done / wanted
        }
    }
}
