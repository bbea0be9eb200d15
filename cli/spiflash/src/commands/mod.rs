//! Subcommand implementations.

pub mod image;
pub mod platform;
