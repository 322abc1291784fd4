//! Application layer for Kiln.
//!
//! [`BuilderSession`] ties the project store to the generation client, the
//! build orchestrator and the auto-fixer, and is what front ends talk to.

pub mod builder_session;

pub use builder_session::{BuilderSession, ChatOutcome};
