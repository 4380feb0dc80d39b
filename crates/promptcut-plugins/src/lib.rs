//! Tool plugins - capability contract and sandbox certification
//!
//! A plugin describes one way of producing media edits (a command-line
//! encoder, a scripting library, a probe, generative video, animation,
//! music, or voiceover) and owns the
//! judgment of whether a synthesized script is fit to run:
//! - a descriptor surface the planner and synthesizer read (name,
//!   description, generation instructions, prerequisites)
//! - a sandbox budget and output integrity check
//! - `validate`: certify a candidate script against synthetic stand-ins
//!   before it is allowed anywhere near real session files
//!
//! Plugins are registered in an explicit [`PluginRegistry`]; there is no
//! discovery mechanism.

#![warn(unreachable_pub)]

pub mod base;
pub mod registry;
pub mod validator;
pub mod variants;

pub use base::{IoMap, SandboxFailure, ToolPlugin, Verdict};
pub use registry::PluginRegistry;
pub use validator::{inject_io_bindings, validate_in_sandbox, OutputCheck};
pub use variants::{
    full_instructions, AnimationPlugin, GenerativeMediaPlugin, MediaCommandLinePlugin,
    MetadataProbePlugin, MusicPlugin, ScriptingLibraryPlugin, VoiceoverPlugin,
};
