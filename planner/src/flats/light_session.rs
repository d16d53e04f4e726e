use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::flat_spec::FlatSpec;
use crate::config::SessionSettings;
use crate::error::PlannerResult;
use crate::models::{AcquiredImage, TargetId};

/// Maps acquisition timestamps to session dates.
///
/// A night belongs to the calendar date on which it started: local times
/// before the rollover hour count toward the previous date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    pub offset: FixedOffset,
    pub rollover_hour: u32,
}

impl SessionClock {
    pub fn new(offset: FixedOffset, rollover_hour: u32) -> Self {
        Self {
            offset,
            rollover_hour,
        }
    }

    pub fn from_settings(settings: &SessionSettings) -> PlannerResult<Self> {
        Ok(Self::new(settings.utc_offset()?, settings.rollover_hour))
    }

    pub fn session_date(&self, at: DateTime<Utc>) -> NaiveDate {
        session_date(at, self.offset, self.rollover_hour)
    }
}

pub fn session_date(at: DateTime<Utc>, offset: FixedOffset, rollover_hour: u32) -> NaiveDate {
    let local = at.with_timezone(&offset);
    let date = local.date_naive();
    if local.hour() < rollover_hour {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// One imaging session's calibration signature. Never persisted; rebuilt
/// from acquired images whenever needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightSession {
    pub target_id: TargetId,
    pub session_date: NaiveDate,
    pub session_id: i32,
    pub flat_spec: FlatSpec,
}

impl LightSession {
    pub fn from_image(image: &AcquiredImage, clock: &SessionClock) -> Self {
        Self {
            target_id: image.target_id,
            session_date: clock.session_date(image.acquired_at),
            session_id: image.metadata.session_id,
            flat_spec: FlatSpec::from_image(image.target_id, image),
        }
    }
}

/// Distinct light sessions of the accepted and pending images, in order of
/// first appearance. Rejected images are skipped.
pub fn group_into_light_sessions<'a, I>(images: I, clock: &SessionClock) -> IndexSet<LightSession>
where
    I: IntoIterator<Item = &'a AcquiredImage>,
{
    images
        .into_iter()
        .filter(|image| image.is_light_candidate())
        .map(|image| LightSession::from_image(image, clock))
        .collect()
}
