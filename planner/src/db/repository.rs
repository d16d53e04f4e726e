//! Persistence collaborator interface.
//!
//! The planner never talks to storage directly. Everything it reads or
//! writes goes through [`PlanningRepository`], so an in-memory store, a SQL
//! store or a host application's own database can be swapped in.

use async_trait::async_trait;

use crate::error::PlannerResult;
use crate::flats::FlatHistoryRecord;
use crate::models::{
    AcquiredImage, AcquiredImageId, CadenceItem, ExposurePlanId, GradingStatus, Project,
    ProjectId, TargetId,
};

/// New accepted/acquired counter values for one exposure plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureCounts {
    pub plan_id: ExposurePlanId,
    pub accepted: u32,
    pub acquired: u32,
}

impl ExposureCounts {
    pub fn new(plan_id: ExposurePlanId, accepted: u32, acquired: u32) -> Self {
        Self {
            plan_id,
            accepted,
            acquired,
        }
    }
}

/// Repository trait for planner persistence.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so one repository can be shared by
/// the planning session and the acquisition recorder.
///
/// # Error Handling
/// Failures are reported as [`PlannerError::Repository`](crate::error::PlannerError::Repository)
/// or [`PlannerError::NotFound`](crate::error::PlannerError::NotFound); callers propagate
/// them unchanged.
#[async_trait]
pub trait PlanningRepository: Send + Sync {
    // ==================== Health ====================

    async fn health_check(&self) -> PlannerResult<bool>;

    // ==================== Projects ====================

    /// Active projects of a profile, with their targets and exposure plans.
    async fn get_active_projects(&self, profile_id: &str) -> PlannerResult<Vec<Project>>;

    /// A project by id, regardless of state.
    ///
    /// # Returns
    /// * `Err(PlannerError::NotFound)` - If the project doesn't exist
    async fn get_project(&self, project_id: ProjectId) -> PlannerResult<Project>;

    /// Replace the persisted filter cadence of a target.
    async fn save_filter_cadence(
        &self,
        target_id: TargetId,
        items: Vec<CadenceItem>,
    ) -> PlannerResult<()>;

    // ==================== Acquired images ====================

    /// Store an acquired image and return its assigned id.
    async fn add_acquired_image(&self, image: AcquiredImage) -> PlannerResult<AcquiredImageId>;

    /// Store an acquired image and overwrite its plan's counters as one
    /// write. On error neither the image nor the counters are changed.
    async fn record_acquisition(
        &self,
        image: AcquiredImage,
        counts: ExposureCounts,
    ) -> PlannerResult<AcquiredImageId>;

    /// Set an image's grading status and, when `counts` is given, its plan's
    /// counters as one write.
    async fn update_grading_status(
        &self,
        image_id: AcquiredImageId,
        status: GradingStatus,
        reject_reason: Option<String>,
        counts: Option<ExposureCounts>,
    ) -> PlannerResult<()>;

    /// Acquired images of a target, oldest first.
    async fn get_acquired_images(&self, target_id: TargetId) -> PlannerResult<Vec<AcquiredImage>>;

    // ==================== Flat history ====================

    async fn get_flat_history(&self, target_id: TargetId) -> PlannerResult<Vec<FlatHistoryRecord>>;

    async fn add_flat_history(&self, record: FlatHistoryRecord) -> PlannerResult<()>;
}
