//! # Target Planner
//!
//! Decides which imaging target and filtered exposure a telescope session
//! should run next.
//!
//! Given the visibility of every target (from an astrometry collaborator)
//! and each project's scoring-rule weights, one planning cycle:
//!
//! 1. rejects disabled, complete, invisible or otherwise unusable targets,
//! 2. ranks the remaining candidates with the weighted [`scoring`] engine,
//! 3. advances the winner's filter cadence and emits a plan of instructions,
//! 4. appends the plan to the session's execution history.
//!
//! After acquisition, images are graded, counted toward their exposure plan
//! and grouped into light sessions for flat-frame matching.
//!
//! ## Architecture
//!
//! - [`models`]: persisted records (projects, targets, exposure plans, images)
//! - [`planning`]: completion policy, filter cadence, planning views, planner
//! - [`scoring`]: scoring engine, rule trait and built-in rules
//! - [`flats`]: flat specs, light sessions and flats coverage
//! - [`db`]: repository trait and in-memory repository
//! - [`services`]: planning session and acquisition recording
//! - [`astrometry`] / [`grading`]: collaborator interfaces
//! - [`config`]: TOML configuration with environment overrides

// PlannerError carries structured context
#![allow(clippy::result_large_err)]

pub mod astrometry;
pub mod config;
pub mod db;
pub mod error;
pub mod flats;
pub mod grading;
pub mod models;
pub mod planning;
pub mod scoring;
pub mod services;

pub use config::PlannerConfig;
pub use error::{ErrorContext, PlannerError, PlannerResult};
