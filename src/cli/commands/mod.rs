//! CLI command implementations

pub mod create;
pub mod deploy;
pub mod display;
pub mod revision;
