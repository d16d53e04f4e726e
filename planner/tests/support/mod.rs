#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use target_planner::astrometry::VisibilityWindow;
use target_planner::db::{ExposureCounts, LocalRepository, PlanningRepository};
use target_planner::flats::FlatHistoryRecord;
use target_planner::models::{
    AcquiredImage, AcquiredImageId, CadenceItem, Coordinates, Epoch, ExposurePlan,
    ExposurePlanId, GradingStatus, ImageMetadata, Project, ProjectId, ProjectState, Target,
    TargetId,
};
use target_planner::{PlannerError, PlannerResult};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process environment across parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// 23:00 UTC on a November night.
pub fn tonight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 2, 23, 0, 0).unwrap()
}

/// Rose two hours ago, culminates now, sets in four hours.
pub fn open_window() -> VisibilityWindow {
    VisibilityWindow::new(
        tonight() - Duration::hours(2),
        tonight(),
        tonight() + Duration::hours(4),
    )
}

pub fn exposure_plan(id: i64, target: i64, filter: &str, desired: i32) -> ExposurePlan {
    ExposurePlan::new(ExposurePlanId(id), TargetId(target), filter, 120.0, desired)
}

pub fn create_target(id: i64, project: i64, plans: Vec<ExposurePlan>) -> Target {
    let mut target = Target::new(
        TargetId(id),
        ProjectId(project),
        format!("Target {}", id),
        Coordinates::new(0.71, 41.27, Epoch::J2000),
    );
    target.exposure_plans = plans;
    target
}

/// An active project of the default profile with grading disabled.
pub fn create_project(id: i64, targets: Vec<Target>) -> Project {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut project = Project::new(ProjectId(id), "default", format!("Project {}", id), created);
    project.state = ProjectState::Active;
    project.enable_grader = false;
    project.targets = targets;
    project
}

pub fn light_frame(
    project: i64,
    target: i64,
    plan: i64,
    filter: &str,
    acquired_at: DateTime<Utc>,
) -> AcquiredImage {
    let mut metadata = ImageMetadata::new(1, 120.0);
    metadata.gain = Some(100);
    metadata.offset = Some(10);
    AcquiredImage {
        id: None,
        project_id: ProjectId(project),
        target_id: TargetId(target),
        exposure_plan_id: ExposurePlanId(plan),
        acquired_at,
        filter_name: filter.to_string(),
        grading_status: GradingStatus::Pending,
        reject_reason: None,
        metadata,
    }
}

/// A local repository whose writes can be switched to fail.
pub struct FlakyRepository {
    pub inner: LocalRepository,
    fail_writes: AtomicBool,
}

impl FlakyRepository {
    pub fn new(inner: LocalRepository) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> PlannerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(PlannerError::repository("write failed"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PlanningRepository for FlakyRepository {
    async fn health_check(&self) -> PlannerResult<bool> {
        self.inner.health_check().await
    }

    async fn get_active_projects(&self, profile_id: &str) -> PlannerResult<Vec<Project>> {
        self.inner.get_active_projects(profile_id).await
    }

    async fn get_project(&self, project_id: ProjectId) -> PlannerResult<Project> {
        self.inner.get_project(project_id).await
    }

    async fn save_filter_cadence(
        &self,
        target_id: TargetId,
        items: Vec<CadenceItem>,
    ) -> PlannerResult<()> {
        self.check_write()?;
        self.inner.save_filter_cadence(target_id, items).await
    }

    async fn add_acquired_image(&self, image: AcquiredImage) -> PlannerResult<AcquiredImageId> {
        self.check_write()?;
        self.inner.add_acquired_image(image).await
    }

    async fn record_acquisition(
        &self,
        image: AcquiredImage,
        counts: ExposureCounts,
    ) -> PlannerResult<AcquiredImageId> {
        self.check_write()?;
        self.inner.record_acquisition(image, counts).await
    }

    async fn update_grading_status(
        &self,
        image_id: AcquiredImageId,
        status: GradingStatus,
        reject_reason: Option<String>,
        counts: Option<ExposureCounts>,
    ) -> PlannerResult<()> {
        self.check_write()?;
        self.inner
            .update_grading_status(image_id, status, reject_reason, counts)
            .await
    }

    async fn get_acquired_images(&self, target_id: TargetId) -> PlannerResult<Vec<AcquiredImage>> {
        self.inner.get_acquired_images(target_id).await
    }

    async fn get_flat_history(&self, target_id: TargetId) -> PlannerResult<Vec<FlatHistoryRecord>> {
        self.inner.get_flat_history(target_id).await
    }

    async fn add_flat_history(&self, record: FlatHistoryRecord) -> PlannerResult<()> {
        self.check_write()?;
        self.inner.add_flat_history(record).await
    }
}
