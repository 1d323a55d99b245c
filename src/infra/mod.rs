//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod http;
pub mod input;
pub mod platform;
pub mod telemetry;
