//! Services composing the planner with its collaborators.

pub mod acquisition;
pub mod planning_session;

pub use acquisition::{AcquisitionRecorder, AcquisitionSummary, FilterSummary, RecordedAcquisition};
pub use planning_session::PlanningSession;
