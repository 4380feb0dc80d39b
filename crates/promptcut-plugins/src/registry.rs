//! Explicit plugin registry
//!
//! Plugins are registered by hand at composition time; lookup is by the
//! name plans use to select a tool.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::base::ToolPlugin;
use crate::variants::{
    AnimationPlugin, GenerativeMediaPlugin, MediaCommandLinePlugin, MetadataProbePlugin,
    MusicPlugin, ScriptingLibraryPlugin, VoiceoverPlugin,
};

/// Name-keyed table of the tools the pipeline may plan with.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn ToolPlugin>>,
}

impl PluginRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the full standard toolset.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MediaCommandLinePlugin::new()));
        registry.register(Arc::new(ScriptingLibraryPlugin::new()));
        registry.register(Arc::new(MetadataProbePlugin::new()));
        registry.register(Arc::new(GenerativeMediaPlugin::new()));
        registry.register(Arc::new(AnimationPlugin::new()));
        registry.register(Arc::new(MusicPlugin::new()));
        registry.register(Arc::new(VoiceoverPlugin::new()));
        registry
    }

    /// Register a plugin under its own name. A later registration with the
    /// same name replaces the earlier one.
    pub fn register(&mut self, plugin: Arc<dyn ToolPlugin>) {
        debug!(tool = plugin.name(), "registering plugin");
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Look up a plugin by the name a plan step uses.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolPlugin>> {
        self.plugins.get(name).cloned()
    }

    /// Registered tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// One `name: description` line per tool, for planner prompts.
    #[must_use]
    pub fn describe_all(&self) -> String {
        self.plugins
            .values()
            .map(|p| format!("- {}: {}", p.name(), p.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_registry_holds_every_tool() {
        let registry = PluginRegistry::standard();
        assert_eq!(registry.len(), 7);
        assert_eq!(
            registry.names(),
            ["ffmpeg", "generative", "manim", "moviepy", "music", "probe", "voiceover"]
        );
        assert!(registry.get("ffmpeg").is_some());
        assert!(registry.get("imagemagick").is_none());
    }

    #[test]
    fn descriptions_carry_every_tool_name() {
        let registry = PluginRegistry::standard();
        let listing = registry.describe_all();
        for name in registry.names() {
            assert!(listing.contains(&format!("- {name}:")));
        }
    }

    #[test]
    fn re_registration_replaces() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(MetadataProbePlugin::new()));
        registry.register(Arc::new(MetadataProbePlugin::with_interpreter("/usr/bin/python3")));
        assert_eq!(registry.len(), 1);
    }
}
