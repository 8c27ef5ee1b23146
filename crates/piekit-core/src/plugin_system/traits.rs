use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::kernel::error::Result;
use crate::plugin_system::context::PluginContext;

/// Lifecycle state of a registered plugin.
///
/// `Registered -> Initializing -> Ready -> ShutDown`, with `Failed` reachable
/// from `Initializing` when `init` returns an error or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Registered,
    Initializing,
    Ready,
    Failed,
    ShutDown,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PluginState::Registered => "registered",
            PluginState::Initializing => "initializing",
            PluginState::Ready => "ready",
            PluginState::Failed => "failed",
            PluginState::ShutDown => "shutdown",
        };
        f.write_str(label)
    }
}

/// Core trait that all plugins must implement
pub trait Plugin: 'static {
    /// The name of the plugin, unique per process
    fn name(&self) -> &'static str;

    /// Semantic version of the plugin
    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Plugins that must be `Ready` before this one is
    fn requires(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Folder holding the plugin's configs, locales and assets.
    /// Defaults to `<plugins_root>/<name>`.
    fn folder(&self) -> Option<PathBuf> {
        None
    }

    /// Called once when the plugin is loaded. Register contributions and
    /// subscribe to other plugins' events through `ctx`.
    fn init(&mut self, ctx: &PluginContext<'_>) -> Result<()>;

    /// Called during teardown, after this plugin's teardown subscribers ran.
    fn shutdown(&mut self, _ctx: &PluginContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("requires", &self.requires())
            .finish()
    }
}
