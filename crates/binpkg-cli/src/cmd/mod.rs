//! Subcommand implementations.

pub mod check;
pub mod hash;
pub mod install;
