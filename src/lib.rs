//! Native Build - incremental C/C++ targets
//!
//! This crate implements the native-compilation layer of a build tool:
//! compile, link and archive steps modelled as incrementally rebuildable
//! targets, with compiler-driven, cached discovery of header dependencies.
//!
//! The build graph and scheduler live elsewhere; they construct targets,
//! thread a [`BuildContext`] through them and ask each [`Target`] for its
//! prerequisites and implicit inputs.

pub mod config;
pub mod context;
pub mod depcache;
pub mod error;
pub mod mock;
pub mod naming;
pub mod pathset;
pub mod target;

pub use config::{BuildConfig, ConfigError, NativeOptions, OptionLayer};
pub use context::{BuildContext, BuildContextBuilder};
pub use depcache::{CacheStatus, DependencyCache, IdentitySignature, InvalidReason};
pub use error::{NativeError, NativeResult};
pub use naming::{exename, libname, objectname, staticlibname, NamingConventions, Platform};
pub use pathset::{Dependency, SourceSet};
pub use target::{check_staleness, Archive, CompileUnit, Link, StaleReason, Staleness, Target};

pub use native_props::{Expr, Properties, PropertyValue};
pub use native_toolchain::{Language, Toolchain, ToolchainCommand, ToolchainFamily};
