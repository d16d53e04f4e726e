//! Weighted target scoring.
//!
//! Each [`ScoringRule`] maps a candidate target to a raw score in [0, 1]. The
//! [`ScoringEngine`] scales every raw score by the owning project's weight for
//! that rule (`weight / 100`) and sums the results. The total is not bounded;
//! weights need not add up to 100.
//!
//! Rules are registered at compile time in [`ScoringRuleRegistry`].

pub mod engine;
pub mod registry;
pub mod rule;
pub mod rules;

pub use engine::{RuleResult, ScoringEngine, ScoringResults};
pub use registry::ScoringRuleRegistry;
pub use rule::{EngineState, ScoringRule};
