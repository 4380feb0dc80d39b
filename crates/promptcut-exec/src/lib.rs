//! Execution layer for promptcut
//!
//! The lowest layer of the pipeline:
//! - [`Executor`] runs a fully-formed script in a working directory and
//!   converts failures into structured errors
//! - [`sandbox`] synthesizes stand-in assets so candidate scripts can be
//!   exercised without touching real session data
//! - [`probe`] extracts media metadata and checks output integrity
//! - [`syntax`] statically parses candidate scripts before anything runs

pub mod error;
pub mod executor;
pub mod probe;
pub mod sandbox;
pub mod syntax;

pub use error::{ExecutionError, SandboxSetupError};
pub use executor::{Executor, ScriptOutput};
pub use probe::MediaMetadata;
pub use syntax::SyntaxIssue;
