//! Flat-frame matching.
//!
//! Acquired light frames are grouped into [`LightSession`]s keyed by target,
//! session date, session id and [`FlatSpec`]. Sessions not yet covered by a
//! flats run are reported according to the project's
//! [`FlatsHandling`](crate::models::FlatsHandling).

pub mod coverage;
pub mod flat_spec;
pub mod light_session;

pub use coverage::{sessions_needing_flats, uncovered_sessions, FlatHistoryRecord};
pub use flat_spec::{normalize_rotation, FlatSpec};
pub use light_session::{group_into_light_sessions, session_date, LightSession, SessionClock};
