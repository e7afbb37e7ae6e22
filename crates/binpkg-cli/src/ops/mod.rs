//! Install pipeline: error taxonomy, shared context and the typestate flow.

pub mod context;
pub mod error;
pub mod flow;
pub mod install;

pub use context::Context;
pub use error::InstallError;
pub use install::{InstallRequest, install_package};
