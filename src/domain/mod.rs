//! Domain layer types and invariants.

pub mod deploy;
pub mod submission;
