//! Image grading collaborator interface.
//!
//! Judging image quality happens elsewhere; the planner only stores the
//! verdict and counts it toward exposure completion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PlannerResult;
use crate::models::{AcquiredImage, GradingStatus};

/// Verdict returned by a grader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingOutcome {
    pub status: GradingStatus,
    pub reject_reason: Option<String>,
}

impl GradingOutcome {
    pub fn accepted() -> Self {
        Self {
            status: GradingStatus::Accepted,
            reject_reason: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            status: GradingStatus::Pending,
            reject_reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            status: GradingStatus::Rejected,
            reject_reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait ImageGrader: Send + Sync {
    async fn grade(&self, image: &AcquiredImage) -> PlannerResult<GradingOutcome>;
}

/// Grader that always answers with the same verdict.
#[derive(Debug, Clone)]
pub struct FixedGrader {
    outcome: GradingOutcome,
}

impl FixedGrader {
    pub fn new(outcome: GradingOutcome) -> Self {
        Self { outcome }
    }

    pub fn accept_all() -> Self {
        Self::new(GradingOutcome::accepted())
    }
}

#[async_trait]
impl ImageGrader for FixedGrader {
    async fn grade(&self, _image: &AcquiredImage) -> PlannerResult<GradingOutcome> {
        Ok(self.outcome.clone())
    }
}
