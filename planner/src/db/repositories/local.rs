//! In-memory repository implementation.
//!
//! Stores every record in memory behind a single lock, giving fast,
//! deterministic and isolated behavior for tests and for the command line
//! runner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::repository::{ExposureCounts, PlanningRepository};
use crate::error::{ErrorContext, PlannerError, PlannerResult};
use crate::flats::FlatHistoryRecord;
use crate::models::{
    AcquiredImage, AcquiredImageId, CadenceItem, ExposurePlan, ExposurePlanId, GradingStatus,
    Project, ProjectId, ProjectState, TargetId,
};

/// In-memory planner repository.
///
/// # Example
/// ```
/// use target_planner::db::repositories::LocalRepository;
/// use target_planner::db::PlanningRepository;
///
/// # tokio_test_block(async {
/// let repo = LocalRepository::new();
/// assert!(repo.health_check().await.unwrap());
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    projects: HashMap<ProjectId, Project>,
    /// Project insertion order, so listings are deterministic.
    project_order: Vec<ProjectId>,
    images: Vec<AcquiredImage>,
    flat_history: Vec<FlatHistoryRecord>,
    next_image_id: i64,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            projects: HashMap::new(),
            project_order: Vec::new(),
            images: Vec::new(),
            flat_history: Vec::new(),
            next_image_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn exposure_plan_mut(&mut self, plan_id: ExposurePlanId) -> Option<&mut ExposurePlan> {
        self.projects
            .values_mut()
            .flat_map(|p| p.targets.iter_mut())
            .find_map(|t| t.exposure_plan_mut(plan_id))
    }

    /// Validate and write plan counters. Nothing changes on error.
    fn apply_counts(&mut self, counts: ExposureCounts, operation: &str) -> PlannerResult<()> {
        let plan = self.exposure_plan_mut(counts.plan_id).ok_or_else(|| {
            PlannerError::not_found_with_context(
                format!("exposure plan {} does not exist", counts.plan_id),
                ErrorContext::new(operation)
                    .with_entity("exposure_plan")
                    .with_entity_id(counts.plan_id),
            )
        })?;
        let mut updated = plan.clone();
        updated.accepted = counts.accepted;
        updated.acquired = counts.acquired;
        updated.validate()?;
        *plan = updated;
        Ok(())
    }

    fn store_image(&mut self, mut image: AcquiredImage) -> AcquiredImageId {
        let id = AcquiredImageId(self.next_image_id);
        self.next_image_id += 1;
        image.id = Some(id);
        self.images.push(image);
        id
    }

    fn ensure_healthy(&self, operation: &str) -> PlannerResult<()> {
        if self.is_healthy {
            Ok(())
        } else {
            Err(PlannerError::Repository {
                message: "repository unavailable".to_string(),
                context: ErrorContext::new(operation),
            })
        }
    }
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a project.
    pub fn store_project(&self, project: Project) {
        let mut data = self.data.write();
        if !data.projects.contains_key(&project.id) {
            data.project_order.push(project.id);
        }
        data.projects.insert(project.id, project);
    }

    /// Simulate a storage outage.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    pub fn project_count(&self) -> usize {
        self.data.read().projects.len()
    }

    pub fn image_count(&self) -> usize {
        self.data.read().images.len()
    }
}

#[async_trait]
impl PlanningRepository for LocalRepository {
    async fn health_check(&self) -> PlannerResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn get_active_projects(&self, profile_id: &str) -> PlannerResult<Vec<Project>> {
        let data = self.data.read();
        data.ensure_healthy("get_active_projects")?;
        Ok(data
            .project_order
            .iter()
            .filter_map(|id| data.projects.get(id))
            .filter(|p| p.profile_id == profile_id && p.state == ProjectState::Active)
            .cloned()
            .collect())
    }

    async fn get_project(&self, project_id: ProjectId) -> PlannerResult<Project> {
        let data = self.data.read();
        data.ensure_healthy("get_project")?;
        data.projects.get(&project_id).cloned().ok_or_else(|| {
            PlannerError::not_found_with_context(
                format!("project {} does not exist", project_id),
                ErrorContext::new("get_project")
                    .with_entity("project")
                    .with_entity_id(project_id),
            )
        })
    }

    async fn save_filter_cadence(
        &self,
        target_id: TargetId,
        items: Vec<CadenceItem>,
    ) -> PlannerResult<()> {
        let mut data = self.data.write();
        data.ensure_healthy("save_filter_cadence")?;
        let target = data
            .projects
            .values_mut()
            .find_map(|p| p.target_mut(target_id))
            .ok_or_else(|| {
                PlannerError::not_found_with_context(
                    format!("target {} does not exist", target_id),
                    ErrorContext::new("save_filter_cadence")
                        .with_entity("target")
                        .with_entity_id(target_id),
                )
            })?;
        target.filter_cadence = items;
        Ok(())
    }

    async fn add_acquired_image(&self, image: AcquiredImage) -> PlannerResult<AcquiredImageId> {
        let mut data = self.data.write();
        data.ensure_healthy("add_acquired_image")?;
        Ok(data.store_image(image))
    }

    async fn record_acquisition(
        &self,
        image: AcquiredImage,
        counts: ExposureCounts,
    ) -> PlannerResult<AcquiredImageId> {
        let mut data = self.data.write();
        data.ensure_healthy("record_acquisition")?;
        data.apply_counts(counts, "record_acquisition")?;
        Ok(data.store_image(image))
    }

    async fn update_grading_status(
        &self,
        image_id: AcquiredImageId,
        status: GradingStatus,
        reject_reason: Option<String>,
        counts: Option<ExposureCounts>,
    ) -> PlannerResult<()> {
        let mut data = self.data.write();
        data.ensure_healthy("update_grading_status")?;
        let index = data
            .images
            .iter()
            .position(|image| image.id == Some(image_id))
            .ok_or_else(|| {
                PlannerError::not_found_with_context(
                    format!("acquired image {} does not exist", image_id),
                    ErrorContext::new("update_grading_status")
                        .with_entity("acquired_image")
                        .with_entity_id(image_id),
                )
            })?;
        if let Some(counts) = counts {
            data.apply_counts(counts, "update_grading_status")?;
        }
        let image = &mut data.images[index];
        image.grading_status = status;
        image.reject_reason = reject_reason;
        Ok(())
    }

    async fn get_acquired_images(&self, target_id: TargetId) -> PlannerResult<Vec<AcquiredImage>> {
        let data = self.data.read();
        data.ensure_healthy("get_acquired_images")?;
        let mut images: Vec<AcquiredImage> = data
            .images
            .iter()
            .filter(|image| image.target_id == target_id)
            .cloned()
            .collect();
        images.sort_by_key(|image| image.acquired_at);
        Ok(images)
    }

    async fn get_flat_history(&self, target_id: TargetId) -> PlannerResult<Vec<FlatHistoryRecord>> {
        let data = self.data.read();
        data.ensure_healthy("get_flat_history")?;
        Ok(data
            .flat_history
            .iter()
            .filter(|record| record.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn add_flat_history(&self, record: FlatHistoryRecord) -> PlannerResult<()> {
        let mut data = self.data.write();
        data.ensure_healthy("add_flat_history")?;
        data.flat_history.push(record);
        Ok(())
    }
}
