//! A scheduling session: load the profile's active projects, run one
//! planning cycle, persist the advanced cadence.
//!
//! Cycles take `&mut self`, so no two cycles of one session can be in flight
//! at the same time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::astrometry::Astrometry;
use crate::config::PlannerConfig;
use crate::db::PlanningRepository;
use crate::error::{ErrorContext, PlannerError, PlannerResult};
use crate::flats::{
    group_into_light_sessions, sessions_needing_flats, FlatHistoryRecord, LightSession,
    SessionClock,
};
use crate::models::{Project, ProjectId, TargetId};
use crate::planning::{
    Environment, ExposureCompletion, PlanExecutionHistory, PlanOutcome, Planner, PlanningContext,
    PlanningProject,
};
use crate::scoring::ScoringRuleRegistry;

pub struct PlanningSession {
    repository: Arc<dyn PlanningRepository>,
    astrometry: Arc<dyn Astrometry>,
    config: PlannerConfig,
    history: PlanExecutionHistory,
    environment: Environment,
}

impl PlanningSession {
    pub fn new(
        repository: Arc<dyn PlanningRepository>,
        astrometry: Arc<dyn Astrometry>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            repository,
            astrometry,
            config,
            history: PlanExecutionHistory::new(),
            environment: Environment::default(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn history(&self) -> &PlanExecutionHistory {
        &self.history
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    /// A draft project for this session's profile, with rule weights taken
    /// from the registered defaults and the configured overrides.
    pub fn new_project(
        &self,
        id: ProjectId,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Project {
        let mut project = Project::new(id, self.config.profile.profile_id.clone(), name, created_at);
        project.rule_weights =
            ScoringRuleRegistry::default_weights_with_overrides(&self.config.scoring.default_weights);
        project
    }

    /// Plan what to do at `now`.
    ///
    /// Repository failures are returned unchanged and leave the session
    /// history as it was. When a target plan is produced, the selected
    /// target's cadence is saved before returning.
    pub async fn next_plan(
        &mut self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> PlannerResult<PlanOutcome> {
        let profile_id = self.config.profile.profile_id.clone();
        let throttle = self.config.profile.exposure_throttle_percent;
        let records = self.repository.get_active_projects(&profile_id).await?;
        log::debug!(
            "Loaded {} active project(s) for profile '{}'",
            records.len(),
            profile_id
        );

        let mut projects: Vec<PlanningProject> = records
            .into_iter()
            .map(|project| PlanningProject::from_record(project, throttle))
            .collect();

        let ctx = PlanningContext {
            now,
            preferences: self.config.profile.clone(),
            environment: self.environment,
        };
        // The new history entry is kept only once the cadence is stored.
        let mut history = self.history.clone();
        let outcome = Planner::new(self.astrometry.as_ref()).plan(
            &ctx,
            &mut projects,
            &mut history,
            cancel,
        );

        if let PlanOutcome::Target(plan) = &outcome {
            self.repository
                .save_filter_cadence(plan.target_id, plan.filter_cadence.clone())
                .await?;
        }
        self.history = history;
        Ok(outcome)
    }

    /// Light sessions of a target that its project's flats handling says
    /// need flats now.
    pub async fn pending_flats(
        &self,
        project_id: ProjectId,
        target_id: TargetId,
        now: DateTime<Utc>,
    ) -> PlannerResult<Vec<LightSession>> {
        let project = self.repository.get_project(project_id).await?;
        let target = project.target(target_id).ok_or_else(|| {
            PlannerError::not_found_with_context(
                format!("target {} is not part of project {}", target_id, project_id),
                ErrorContext::new("pending_flats")
                    .with_entity("target")
                    .with_entity_id(target_id),
            )
        })?;

        let completion = ExposureCompletion::new(
            project.enable_grader,
            self.config.profile.exposure_throttle_percent,
        );
        let target_complete = target
            .exposure_plans
            .iter()
            .filter(|plan| plan.enabled)
            .all(|plan| completion.is_complete(plan));

        let clock = SessionClock::from_settings(&self.config.sessions)?;
        let images = self.repository.get_acquired_images(target_id).await?;
        let sessions = group_into_light_sessions(&images, &clock);
        let history = self.repository.get_flat_history(target_id).await?;

        Ok(sessions_needing_flats(
            project.flats_handling,
            &sessions,
            &history,
            target_complete,
            now,
        ))
    }

    /// Record that flats were taken for `sessions`.
    pub async fn record_flats_taken(
        &self,
        sessions: &[LightSession],
        taken_at: DateTime<Utc>,
    ) -> PlannerResult<()> {
        for session in sessions {
            self.repository
                .add_flat_history(FlatHistoryRecord::for_session(session, taken_at))
                .await?;
        }
        Ok(())
    }
}
