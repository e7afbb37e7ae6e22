//! IO modules - side effects (network, filesystem)

pub mod download;
pub mod install;
pub mod verify;
