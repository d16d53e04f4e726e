//! Integration tests for planning sessions backed by the in-memory repository.

mod support;

use std::sync::Arc;

use chrono::Duration;
use target_planner::astrometry::{StaticAstrometry, VisibilityWindow};
use target_planner::db::{LocalRepository, PlanningRepository};
use target_planner::grading::{FixedGrader, GradingOutcome};
use target_planner::models::{
    CadenceAction, ExposurePlanId, GradingStatus, ProjectId, ProjectState, TargetId,
};
use target_planner::planning::{NoPlanReason, PlanInstruction};
use target_planner::services::{AcquisitionRecorder, PlanningSession};
use target_planner::PlannerConfig;
use tokio_util::sync::CancellationToken;

use support::{
    create_project, create_target, exposure_plan, light_frame, open_window, tonight,
    FlakyRepository,
};

fn session_with(repo: &LocalRepository, astrometry: StaticAstrometry) -> PlanningSession {
    PlanningSession::new(
        Arc::new(repo.clone()),
        Arc::new(astrometry),
        PlannerConfig::default(),
    )
}

fn visible_target_one() -> StaticAstrometry {
    StaticAstrometry::new().with_window(TargetId(1), open_window())
}

#[tokio::test]
async fn test_single_luminance_exposure_end_to_end() {
    let repo = LocalRepository::new();
    repo.store_project(create_project(
        1,
        vec![create_target(1, 1, vec![exposure_plan(1, 1, "Lum", 1)])],
    ));
    let mut session = session_with(&repo, visible_target_one());
    let cancel = CancellationToken::new();

    let outcome = session.next_plan(tonight(), &cancel).await.unwrap();
    let plan = outcome.target_plan().expect("expected a target plan");
    assert_eq!(plan.target_id, TargetId(1));
    assert_eq!(plan.exposure_plan_id, ExposurePlanId(1));
    assert!(matches!(
        plan.instructions.first(),
        Some(PlanInstruction::SlewAndCenter { .. })
    ));
    assert!(plan.takes_exposure());
    assert_eq!(session.history().len(), 1);

    let recorder = AcquisitionRecorder::new();
    let recorded = recorder
        .record(
            &repo,
            &FixedGrader::accept_all(),
            light_frame(1, 1, 1, "Lum", tonight() + Duration::minutes(2)),
        )
        .await
        .unwrap();
    assert_eq!(recorded.status, GradingStatus::Accepted);
    assert_eq!((recorded.accepted, recorded.acquired), (1, 1));

    let outcome = session
        .next_plan(tonight() + Duration::minutes(3), &cancel)
        .await
        .unwrap();
    assert_eq!(
        outcome.no_plan_reason(),
        Some(NoPlanReason::NoIncompleteExposures)
    );
}

#[tokio::test]
async fn test_cadence_is_persisted_between_cycles() {
    let repo = LocalRepository::new();
    repo.store_project(create_project(
        1,
        vec![create_target(
            1,
            1,
            vec![exposure_plan(1, 1, "R", 10), exposure_plan(2, 1, "G", 10)],
        )],
    ));
    let mut session = session_with(&repo, visible_target_one());
    let cancel = CancellationToken::new();

    let first = session.next_plan(tonight(), &cancel).await.unwrap();
    assert_eq!(
        first.target_plan().unwrap().exposure_plan_id,
        ExposurePlanId(1)
    );

    let stored = repo.get_project(ProjectId(1)).await.unwrap();
    let cadence = &stored.target(TargetId(1)).unwrap().filter_cadence;
    assert_eq!(cadence.len(), 2);
    assert!(cadence.iter().all(|item| item.action == CadenceAction::Exposure));
    let cursor: Vec<bool> = cadence.iter().map(|item| item.next).collect();
    assert_eq!(cursor, vec![false, true]);

    let second = session
        .next_plan(tonight() + Duration::minutes(3), &cancel)
        .await
        .unwrap();
    let second = second.target_plan().unwrap();
    assert_eq!(second.exposure_plan_id, ExposurePlanId(2));
    assert!(
        !matches!(
            second.instructions.first(),
            Some(PlanInstruction::SlewAndCenter { .. })
        ),
        "same target as the previous plan must not slew again"
    );
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn test_graded_frames_honor_throttle() {
    let repo = LocalRepository::new();
    let mut project = create_project(
        1,
        vec![create_target(1, 1, vec![exposure_plan(1, 1, "Ha", 1)])],
    );
    project.enable_grader = true;
    repo.store_project(project);

    let mut config = PlannerConfig::default();
    config.profile.exposure_throttle_percent = 100.0;
    let mut session = PlanningSession::new(
        Arc::new(repo.clone()),
        Arc::new(visible_target_one()),
        config,
    );
    let cancel = CancellationToken::new();
    let recorder = AcquisitionRecorder::new();

    // Rejected frames count as acquired but never toward completion.
    let rejected = recorder
        .record(
            &repo,
            &FixedGrader::new(GradingOutcome::rejected("star count")),
            light_frame(1, 1, 1, "Ha", tonight()),
        )
        .await
        .unwrap();
    assert_eq!((rejected.accepted, rejected.acquired), (0, 1));

    for minute in [5, 10] {
        let outcome = session
            .next_plan(tonight() + Duration::minutes(minute), &cancel)
            .await
            .unwrap();
        assert!(outcome.target_plan().is_some(), "minute {}", minute);
        recorder
            .record(
                &repo,
                &FixedGrader::accept_all(),
                light_frame(1, 1, 1, "Ha", tonight() + Duration::minutes(minute + 1)),
            )
            .await
            .unwrap();
    }

    let outcome = session
        .next_plan(tonight() + Duration::minutes(15), &cancel)
        .await
        .unwrap();
    assert_eq!(
        outcome.no_plan_reason(),
        Some(NoPlanReason::NoIncompleteExposures)
    );
}

#[tokio::test]
async fn test_wait_plan_for_rising_target() {
    let repo = LocalRepository::new();
    repo.store_project(create_project(
        1,
        vec![create_target(1, 1, vec![exposure_plan(1, 1, "L", 5)])],
    ));
    let rises = tonight() + Duration::hours(1);
    let astrometry = StaticAstrometry::new().with_window(
        TargetId(1),
        VisibilityWindow::new(rises, rises + Duration::hours(2), rises + Duration::hours(5)),
    );
    let mut session = session_with(&repo, astrometry);

    let outcome = session
        .next_plan(tonight(), &CancellationToken::new())
        .await
        .unwrap();
    let wait = outcome.wait_plan().expect("expected a wait plan");
    assert_eq!(wait.wait_until, rises);
    assert_eq!(wait.next_target, Some(TargetId(1)));
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_other_profiles_are_ignored() {
    let repo = LocalRepository::new();
    let mut project = create_project(
        1,
        vec![create_target(1, 1, vec![exposure_plan(1, 1, "L", 5)])],
    );
    project.profile_id = "other-rig".to_string();
    repo.store_project(project);
    let mut session = session_with(&repo, visible_target_one());

    let outcome = session
        .next_plan(tonight(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.no_plan_reason(), Some(NoPlanReason::NoActiveProjects));
}

#[tokio::test]
async fn test_cancelled_cycle_leaves_cadence_untouched() {
    let repo = LocalRepository::new();
    repo.store_project(create_project(
        1,
        vec![create_target(1, 1, vec![exposure_plan(1, 1, "L", 5)])],
    ));
    let mut session = session_with(&repo, visible_target_one());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = session.next_plan(tonight(), &cancel).await.unwrap();
    assert_eq!(outcome.no_plan_reason(), Some(NoPlanReason::Cancelled));
    assert!(session.history().is_empty());

    let stored = repo.get_project(ProjectId(1)).await.unwrap();
    assert!(stored.target(TargetId(1)).unwrap().filter_cadence.is_empty());
}

#[tokio::test]
async fn test_repository_failure_is_propagated() {
    let repo = LocalRepository::new();
    repo.store_project(create_project(
        1,
        vec![create_target(1, 1, vec![exposure_plan(1, 1, "L", 5)])],
    ));
    repo.set_healthy(false);
    let mut session = session_with(&repo, visible_target_one());

    let err = session
        .next_plan(tonight(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("repository unavailable"));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_new_project_uses_configured_weights() {
    let mut config = PlannerConfig::default();
    config
        .scoring
        .default_weights
        .set("Project Priority", 90)
        .unwrap();
    let session = PlanningSession::new(
        Arc::new(LocalRepository::new()),
        Arc::new(StaticAstrometry::new()),
        config,
    );

    let project = session.new_project(ProjectId(5), "NGC 7000", tonight());
    assert_eq!(project.state, ProjectState::Draft);
    assert_eq!(project.profile_id, "default");
    assert_eq!(project.rule_weights.get("Project Priority"), Some(90));
    assert_eq!(project.rule_weights.get("Meridian Window Priority"), Some(75));
}

#[tokio::test]
async fn test_unsaved_cadence_is_not_recorded_in_history() {
    let repo = LocalRepository::new();
    repo.store_project(create_project(
        1,
        vec![create_target(1, 1, vec![exposure_plan(1, 1, "L", 5)])],
    ));
    let flaky = Arc::new(FlakyRepository::new(repo.clone()));
    let mut session = PlanningSession::new(
        flaky.clone(),
        Arc::new(visible_target_one()),
        PlannerConfig::default(),
    );
    let cancel = CancellationToken::new();

    flaky.set_fail_writes(true);
    let err = session.next_plan(tonight(), &cancel).await.unwrap_err();
    assert!(err.to_string().contains("write failed"));
    assert!(session.history().is_empty());

    flaky.set_fail_writes(false);
    let outcome = session
        .next_plan(tonight() + Duration::minutes(1), &cancel)
        .await
        .unwrap();
    assert!(matches!(
        outcome.target_plan().unwrap().instructions.first(),
        Some(PlanInstruction::SlewAndCenter { .. })
    ));
    assert_eq!(session.history().len(), 1);
    let stored = repo.get_project(ProjectId(1)).await.unwrap();
    assert!(!stored.target(TargetId(1)).unwrap().filter_cadence.is_empty());
}
