//! Integration tests for light-session grouping and flats scheduling.

mod support;

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use target_planner::astrometry::StaticAstrometry;
use target_planner::db::{LocalRepository, PlanningRepository};
use target_planner::grading::FixedGrader;
use target_planner::models::{FlatsHandling, ProjectId, TargetId};
use target_planner::services::{AcquisitionRecorder, AcquisitionSummary, PlanningSession};
use target_planner::{PlannerConfig, PlannerError};

use support::{create_project, create_target, exposure_plan, light_frame, tonight};

fn session(repo: &LocalRepository) -> PlanningSession {
    PlanningSession::new(
        Arc::new(repo.clone()),
        Arc::new(StaticAstrometry::new()),
        PlannerConfig::default(),
    )
}

fn seed(repo: &LocalRepository, handling: FlatsHandling, desired: i32) {
    let mut project = create_project(
        1,
        vec![create_target(1, 1, vec![exposure_plan(1, 1, "L", desired)])],
    );
    project.flats_handling = handling;
    repo.store_project(project);
}

#[tokio::test]
async fn test_flats_after_target_completion() {
    let repo = LocalRepository::new();
    seed(&repo, FlatsHandling::TargetCompletion, 2);
    let session = session(&repo);
    let recorder = AcquisitionRecorder::new();
    let grader = FixedGrader::accept_all();

    recorder
        .record(&repo, &grader, light_frame(1, 1, 1, "L", tonight()))
        .await
        .unwrap();
    let pending = session
        .pending_flats(ProjectId(1), TargetId(1), tonight())
        .await
        .unwrap();
    assert!(pending.is_empty(), "target is not complete yet");

    recorder
        .record(
            &repo,
            &grader,
            light_frame(1, 1, 1, "L", tonight() + Duration::minutes(3)),
        )
        .await
        .unwrap();
    let pending = session
        .pending_flats(ProjectId(1), TargetId(1), tonight())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0].session_date,
        NaiveDate::from_ymd_opt(2024, 11, 2).unwrap()
    );
    assert_eq!(pending[0].flat_spec.filter, "L");

    let taken_at = tonight() + Duration::hours(8);
    session.record_flats_taken(&pending, taken_at).await.unwrap();
    assert_eq!(repo.get_flat_history(TargetId(1)).await.unwrap().len(), 1);

    let pending = session
        .pending_flats(ProjectId(1), TargetId(1), taken_at)
        .await
        .unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_immediate_flats_group_by_night() {
    let repo = LocalRepository::new();
    seed(&repo, FlatsHandling::Immediate, 50);
    let session = session(&repo);

    let first_night = tonight();
    let after_midnight = Utc.with_ymd_and_hms(2024, 11, 3, 3, 0, 0).unwrap();
    let second_night = Utc.with_ymd_and_hms(2024, 11, 3, 22, 0, 0).unwrap();

    let mut rotated = light_frame(1, 1, 1, "L", first_night);
    rotated.metadata.rotator_position = Some(10.0);
    let mut rotated_again = light_frame(1, 1, 1, "L", after_midnight);
    rotated_again.metadata.rotator_position = Some(10.04);
    // Rotation is ignored between frames of the same target.
    let mut turned = light_frame(1, 1, 1, "L", after_midnight + Duration::minutes(5));
    turned.metadata.rotator_position = Some(20.0);
    let mut next_night = light_frame(1, 1, 1, "L", second_night);
    next_night.metadata.rotator_position = Some(10.0);

    for image in [rotated, rotated_again, turned, next_night] {
        repo.add_acquired_image(image).await.unwrap();
    }

    let pending = session
        .pending_flats(ProjectId(1), TargetId(1), second_night)
        .await
        .unwrap();
    let summary: Vec<(NaiveDate, f64)> = pending
        .iter()
        .map(|s| (s.session_date, s.flat_spec.rotation))
        .collect();
    assert_eq!(
        summary,
        vec![
            (NaiveDate::from_ymd_opt(2024, 11, 2).unwrap(), 10.0),
            (NaiveDate::from_ymd_opt(2024, 11, 3).unwrap(), 10.0),
        ]
    );
}

#[tokio::test]
async fn test_flats_off_never_schedules() {
    let repo = LocalRepository::new();
    seed(&repo, FlatsHandling::Off, 1);
    repo.add_acquired_image(light_frame(1, 1, 1, "L", tonight()))
        .await
        .unwrap();

    let pending = session(&repo)
        .pending_flats(ProjectId(1), TargetId(1), tonight())
        .await
        .unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_pending_flats_unknown_target() {
    let repo = LocalRepository::new();
    seed(&repo, FlatsHandling::Immediate, 1);

    let err = session(&repo)
        .pending_flats(ProjectId(1), TargetId(42), tonight())
        .await
        .unwrap_err();
    assert!(matches!(err, PlannerError::NotFound { .. }));
}

#[tokio::test]
async fn test_acquisition_summary_from_repository() {
    let repo = LocalRepository::new();
    let mut project = create_project(
        1,
        vec![create_target(
            1,
            1,
            vec![exposure_plan(1, 1, "Ha", 10), exposure_plan(2, 1, "OIII", 10)],
        )],
    );
    project.enable_grader = true;
    repo.store_project(project);

    let recorder = AcquisitionRecorder::new();
    let grader = FixedGrader::accept_all();
    for (plan, filter) in [(1, "Ha"), (2, "OIII"), (1, "Ha")] {
        recorder
            .record(&repo, &grader, light_frame(1, 1, plan, filter, tonight()))
            .await
            .unwrap();
    }

    let images = repo.get_acquired_images(TargetId(1)).await.unwrap();
    let summary = AcquisitionSummary::from_images(&images);
    assert_eq!(summary.total_images(), 3);
    let filters: Vec<&str> = summary.filters.keys().map(String::as_str).collect();
    assert_eq!(filters, vec!["Ha", "OIII"]);
    assert_eq!(summary.filter("Ha").unwrap().accepted, 2);
    assert_eq!(summary.filter("Ha").unwrap().accepted_exposure_secs, 240.0);
}
