//! Per-cycle planning: completion policy, filter cadence, planning views,
//! plan execution history and the planner itself.

pub mod cadence;
pub mod completion;
pub mod entities;
pub mod history;
pub mod plan;
pub mod planner;

pub use cadence::{CadenceStep, FilterCadence};
pub use completion::{remaining, ExposureCompletion};
pub use entities::{
    ExposureRejection, ExposureView, PlanningExposure, PlanningProject, PlanningTarget,
    ProjectView, TargetRejection, TargetView,
};
pub use history::{ImmediateTargetExposures, PlanExecutionEntry, PlanExecutionHistory};
pub use plan::{NoPlanReason, PlanInstruction, PlanOutcome, TargetPlan, WaitPlan};
pub use planner::{Environment, Planner, PlanningContext};
