//! Mock toolchain for tests
//!
//! Implements [`native_toolchain::Toolchain`] without spawning processes, so
//! targets and the dependency cache can be exercised end to end on any
//! host. Supports failure injection for testing error paths.

mod failure;
mod toolchain;

pub use failure::{FailureConfig, FailureInjector, Operation};
pub use toolchain::{MockState, MockToolchain};
