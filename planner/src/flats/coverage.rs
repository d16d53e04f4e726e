//! Which light sessions still need flats.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::flat_spec::FlatSpec;
use super::light_session::LightSession;
use crate::models::{FlatsHandling, TargetId};

/// A flats run that covered one light session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatHistoryRecord {
    pub target_id: TargetId,
    pub light_session_date: NaiveDate,
    pub light_session_id: i32,
    pub flat_spec: FlatSpec,
    pub flats_taken_at: DateTime<Utc>,
}

impl FlatHistoryRecord {
    pub fn for_session(session: &LightSession, flats_taken_at: DateTime<Utc>) -> Self {
        Self {
            target_id: session.target_id,
            light_session_date: session.session_date,
            light_session_id: session.session_id,
            flat_spec: session.flat_spec.clone(),
            flats_taken_at,
        }
    }

    pub fn covers(&self, session: &LightSession) -> bool {
        self.target_id == session.target_id
            && self.light_session_date == session.session_date
            && self.light_session_id == session.session_id
            && self.flat_spec == session.flat_spec
    }
}

/// Sessions no history record covers, in their original order.
pub fn uncovered_sessions(
    sessions: &IndexSet<LightSession>,
    history: &[FlatHistoryRecord],
) -> Vec<LightSession> {
    sessions
        .iter()
        .filter(|session| !history.iter().any(|record| record.covers(session)))
        .cloned()
        .collect()
}

/// Apply a project's flats handling to a target's light sessions.
///
/// `target_complete` says whether every exposure plan of the target is done.
pub fn sessions_needing_flats(
    handling: FlatsHandling,
    sessions: &IndexSet<LightSession>,
    history: &[FlatHistoryRecord],
    target_complete: bool,
    now: DateTime<Utc>,
) -> Vec<LightSession> {
    let due = match handling {
        FlatsHandling::Off => false,
        FlatsHandling::Immediate => true,
        FlatsHandling::TargetCompletion => target_complete,
        FlatsHandling::Periodic(days) => {
            match history.iter().map(|record| record.flats_taken_at).max() {
                None => true,
                Some(last) => now - last >= Duration::days(i64::from(days)),
            }
        }
    };

    if due {
        uncovered_sessions(sessions, history)
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BinningMode;
    use chrono::TimeZone;

    fn session(target: i64, day: u32, rotation: f64) -> LightSession {
        LightSession {
            target_id: TargetId(target),
            session_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            session_id: 1,
            flat_spec: FlatSpec::new(
                TargetId(target),
                "L",
                Some(100),
                Some(10),
                BinningMode::default(),
                None,
                Some(rotation),
                100.0,
            ),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    fn sessions() -> IndexSet<LightSession> {
        [session(1, 3, 0.0), session(1, 4, 0.0)].into_iter().collect()
    }

    #[test]
    fn test_uncovered_sessions() {
        let history = vec![FlatHistoryRecord::for_session(&session(1, 3, 0.0), now())];
        let uncovered = uncovered_sessions(&sessions(), &history);
        assert_eq!(uncovered, vec![session(1, 4, 0.0)]);
    }

    #[test]
    fn test_history_covers_same_target_at_other_rotation() {
        let record = FlatHistoryRecord::for_session(&session(1, 3, 90.0), now());
        assert!(record.covers(&session(1, 3, 0.0)));
        assert!(record.covers(&session(1, 3, 45.0)));
        assert!(!record.covers(&session(2, 3, 45.0)));
    }

    #[test]
    fn test_handling_modes() {
        let history: Vec<FlatHistoryRecord> = Vec::new();
        let all = sessions();
        assert!(sessions_needing_flats(FlatsHandling::Off, &all, &history, true, now()).is_empty());
        assert_eq!(
            sessions_needing_flats(FlatsHandling::Immediate, &all, &history, false, now()).len(),
            2
        );
        assert!(
            sessions_needing_flats(FlatsHandling::TargetCompletion, &all, &history, false, now())
                .is_empty()
        );
        assert_eq!(
            sessions_needing_flats(FlatsHandling::TargetCompletion, &all, &history, true, now())
                .len(),
            2
        );
    }

    #[test]
    fn test_periodic_waits_for_interval() {
        let all: IndexSet<LightSession> =
            [session(1, 3, 0.0), session(1, 18, 0.0)].into_iter().collect();
        let taken = now() - Duration::days(3);
        let history = vec![FlatHistoryRecord::for_session(&session(1, 3, 0.0), taken)];

        assert!(
            sessions_needing_flats(FlatsHandling::Periodic(7), &all, &history, false, now())
                .is_empty()
        );
        let due = sessions_needing_flats(FlatsHandling::Periodic(3), &all, &history, false, now());
        assert_eq!(due, vec![session(1, 18, 0.0)]);
        assert_eq!(
            sessions_needing_flats(FlatsHandling::Periodic(7), &all, &[], false, now()).len(),
            2
        );
    }
}
