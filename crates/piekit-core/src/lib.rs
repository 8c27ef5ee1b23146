pub mod kernel;
pub mod plugin_system;
pub mod registry;
pub mod storage;
pub mod utils;

// Re-export key public types for the binary and for plugins
pub use kernel::{Application, AppPaths, Manager, ManagerDirectory};
pub use kernel::error::Error as KernelError;
pub use plugin_system::{Plugin, PluginContext, PluginEvent, PluginManager, PluginState};
pub use registry::KeyedRegistry;
pub use storage::{ConfigStore, Section};

#[cfg(test)]
mod tests;
