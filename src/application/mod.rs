//! Application services: archive packaging, upload classification and the
//! deployment pipeline.

pub mod archive;
pub mod deploy;
pub mod error;
pub mod platform;
