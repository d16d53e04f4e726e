//! Persisted records consumed by the planner.
//!
//! These mirror what the storage collaborator hands over: projects owning
//! targets, targets owning exposure plans, and the acquired-image rows written
//! after each exposure. Transient per-cycle state lives in
//! [`crate::planning`], never here.

pub mod acquired_image;
pub mod cadence;
pub mod exposure;
pub mod macros;
pub mod project;
pub mod target;

pub use acquired_image::*;
pub use cadence::*;
pub use exposure::*;
pub use project::*;
pub use target::*;

crate::define_id_type!(i64, ProjectId);
crate::define_id_type!(i64, TargetId);
crate::define_id_type!(i64, ExposurePlanId);
crate::define_id_type!(i64, AcquiredImageId);
