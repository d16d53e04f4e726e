//! Persistence layer: the repository trait the planner depends on and its
//! in-memory implementation.

pub mod repositories;
pub mod repository;

pub use repositories::LocalRepository;
pub use repository::{ExposureCounts, PlanningRepository};
