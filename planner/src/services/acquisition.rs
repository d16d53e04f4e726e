//! Recording acquired images.
//!
//! Acquisition events arrive asynchronously. Updating the exposure counters
//! of a target is a read-modify-write against the repository, so every
//! update for one target runs inside that target's critical section.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::db::{ExposureCounts, PlanningRepository};
use crate::error::{ErrorContext, PlannerError, PlannerResult};
use crate::grading::{GradingOutcome, ImageGrader};
use crate::models::{
    AcquiredImage, AcquiredImageId, ExposurePlan, GradingStatus, Project, TargetId,
};

/// What recording one image changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedAcquisition {
    pub image_id: AcquiredImageId,
    pub status: GradingStatus,
    pub accepted: u32,
    pub acquired: u32,
}

/// Serializes acquisition updates per target.
///
/// The lock table only keeps entries that are held or awaited, so it stays
/// bounded by the number of targets with updates in flight.
#[derive(Clone, Default)]
pub struct AcquisitionRecorder {
    locks: Arc<Mutex<HashMap<TargetId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AcquisitionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn target_lock(&self, target_id: TargetId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(target_id).or_default())
    }

    /// Grade `image`, store it and bump its exposure plan's counters.
    ///
    /// With grading disabled on the project every frame is stored as
    /// accepted. The image and the new counters are written together, so a
    /// grader or repository failure stores neither.
    pub async fn record(
        &self,
        repository: &dyn PlanningRepository,
        grader: &dyn ImageGrader,
        mut image: AcquiredImage,
    ) -> PlannerResult<RecordedAcquisition> {
        let lock = self.target_lock(image.target_id);
        let _guard = lock.lock().await;

        let project = repository.get_project(image.project_id).await?;
        let plan = find_plan(&project, &image)?.clone();

        let outcome = if project.enable_grader {
            grader.grade(&image).await?
        } else {
            GradingOutcome::accepted()
        };
        image.grading_status = outcome.status;
        image.reject_reason = outcome.reject_reason;

        let acquired = plan.acquired + 1;
        let accepted = plan.accepted + u32::from(outcome.status == GradingStatus::Accepted);
        let image_id = repository
            .record_acquisition(image, ExposureCounts::new(plan.id, accepted, acquired))
            .await?;

        log::info!(
            "Recorded image {} for exposure plan {} ({:?}): {}/{} accepted/acquired",
            image_id,
            plan.id,
            outcome.status,
            accepted,
            acquired
        );

        Ok(RecordedAcquisition {
            image_id,
            status: outcome.status,
            accepted,
            acquired,
        })
    }

    /// Apply a late verdict to an image stored as pending. An accepted
    /// verdict counts toward its plan; anything else only updates the image.
    pub async fn resolve_pending(
        &self,
        repository: &dyn PlanningRepository,
        image: &AcquiredImage,
        outcome: GradingOutcome,
    ) -> PlannerResult<()> {
        let image_id = image.id.ok_or_else(|| {
            PlannerError::validation_with_context(
                "image has not been stored",
                ErrorContext::new("resolve_pending").with_entity("acquired_image"),
            )
        })?;

        let lock = self.target_lock(image.target_id);
        let _guard = lock.lock().await;

        let stored = repository
            .get_acquired_images(image.target_id)
            .await?
            .into_iter()
            .find(|candidate| candidate.id == Some(image_id))
            .ok_or_else(|| {
                PlannerError::not_found_with_context(
                    format!("acquired image {} does not exist", image_id),
                    ErrorContext::new("resolve_pending")
                        .with_entity("acquired_image")
                        .with_entity_id(image_id),
                )
            })?;
        if stored.grading_status != GradingStatus::Pending {
            log::debug!("Image {} already graded, ignoring verdict", image_id);
            return Ok(());
        }

        let counts = if outcome.status == GradingStatus::Accepted {
            let project = repository.get_project(stored.project_id).await?;
            let plan = find_plan(&project, &stored)?;
            Some(ExposureCounts::new(plan.id, plan.accepted + 1, plan.acquired))
        } else {
            None
        };
        repository
            .update_grading_status(image_id, outcome.status, outcome.reject_reason, counts)
            .await
    }
}

fn find_plan<'p>(project: &'p Project, image: &AcquiredImage) -> PlannerResult<&'p ExposurePlan> {
    project
        .target(image.target_id)
        .and_then(|target| target.exposure_plan(image.exposure_plan_id))
        .ok_or_else(|| {
            PlannerError::not_found_with_context(
                format!(
                    "exposure plan {} of target {} does not exist",
                    image.exposure_plan_id, image.target_id
                ),
                ErrorContext::new("record_acquisition")
                    .with_entity("exposure_plan")
                    .with_entity_id(image.exposure_plan_id),
            )
        })
}

/// Frame counts and integration time of one filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub accepted: u32,
    pub rejected: u32,
    pub pending: u32,
    pub total_exposure_secs: f64,
    pub accepted_exposure_secs: f64,
}

impl FilterSummary {
    pub fn total(&self) -> u32 {
        self.accepted + self.rejected + self.pending
    }
}

/// Per-filter acquisition totals of a target, filters in order of first
/// acquisition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionSummary {
    pub filters: IndexMap<String, FilterSummary>,
}

impl AcquisitionSummary {
    pub fn from_images<'a, I>(images: I) -> Self
    where
        I: IntoIterator<Item = &'a AcquiredImage>,
    {
        let mut filters: IndexMap<String, FilterSummary> = IndexMap::new();
        for image in images {
            let summary = filters.entry(image.filter_name.clone()).or_default();
            let secs = image.metadata.exposure_duration;
            summary.total_exposure_secs += secs;
            match image.grading_status {
                GradingStatus::Accepted => {
                    summary.accepted += 1;
                    summary.accepted_exposure_secs += secs;
                }
                GradingStatus::Rejected => summary.rejected += 1,
                GradingStatus::Pending => summary.pending += 1,
            }
        }
        Self { filters }
    }

    pub fn filter(&self, name: &str) -> Option<&FilterSummary> {
        self.filters.get(name)
    }

    pub fn total_images(&self) -> u32 {
        self.filters.values().map(FilterSummary::total).sum()
    }
}
