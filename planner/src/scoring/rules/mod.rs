//! Built-in scoring rules.

mod exposure;
mod progress;
mod project;
mod timing;

pub use exposure::SmartExposureOrderRule;
pub use progress::{MosaicCompletionRule, PercentCompleteRule};
pub use project::{CreationDateRule, ProjectPriorityRule};
pub use timing::{MeridianWindowPriorityRule, SettingSoonestRule, TargetSwitchPenaltyRule};
