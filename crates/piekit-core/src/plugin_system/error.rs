//! # Plugin System Errors
//!
//! [`PluginSystemError`] covers registration, dependency and lifecycle
//! failures. Dependency graph problems are reported through the narrower
//! [`DependencyError`] and wrapped on the way out.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginSystemError {
    #[error("Plugin '{plugin}' is already registered")]
    DuplicatePlugin { plugin: String },

    #[error("Plugin not found: '{plugin}'")]
    PluginNotFound { plugin: String },

    #[error("Plugin '{plugin}' was already loaded (state: {state})")]
    AlreadyLoaded { plugin: String, state: String },

    #[error("Invalid version '{version}' for plugin '{plugin}': {source}")]
    InvalidVersion {
        plugin: String,
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Dependency resolution failed: {0}")]
    DependencyResolution(#[from] DependencyError),

    #[error("Plugin initialization error for '{plugin}': {message}")]
    InitializationError { plugin: String, message: String },

    #[error("Plugin shutdown error for '{plugin}': {message}")]
    ShutdownError { plugin: String, message: String },

    #[error("Event callback of '{subscriber}' on '{target}' failed: {message}")]
    CallbackError {
        subscriber: String,
        target: String,
        message: String,
    },
}

/// Errors raised while maintaining the `requires` graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// The listed path closes a cycle; the first and last names are equal.
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
}
