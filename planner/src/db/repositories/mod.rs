//! Repository implementations.
//!
//! - `local`: in-memory implementation for tests and the command line runner

pub mod local;

pub use local::LocalRepository;
