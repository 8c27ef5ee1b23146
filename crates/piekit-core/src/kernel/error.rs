//! # Piekit Kernel Errors
//!
//! Defines the crate-wide [`Error`] type. Every subsystem owns a typed error
//! enum ([`RegistryError`], [`StorageSystemError`], [`PluginSystemError`]) and
//! the kernel error wraps each of them, so callers can match on the precise
//! failure or just bubble it up with `?`.
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::plugin_system::error::PluginSystemError;
use crate::registry::error::RegistryError;
use crate::storage::error::StorageSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Keyed registry failure (duplicate or missing key)
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration and file storage failure
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Plugin registration, dependency or lifecycle failure
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Lookup of a manager name that was never registered
    #[error("Manager not found: '{name}'")]
    ManagerNotFound { name: String },

    /// A manager name can only be registered once per process
    #[error("Manager '{name}' is already registered")]
    DuplicateManager { name: String },

    /// The manager is borrowed further up the call stack (re-entrant access)
    #[error("Manager '{name}' is busy; re-entrant access is not supported")]
    ManagerBusy { name: String },

    /// The manager exists but is not of the requested concrete type
    #[error("Manager '{name}' is not a {expected}")]
    ManagerTypeMismatch { name: String, expected: &'static str },

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Bootstrap")]
    Bootstrap,
    #[error("Initialize")]
    Initialize,
    #[error("Start")]
    Start,
    #[error("Shutdown")]
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// Wraps an I/O failure with the operation and path that caused it.
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::StorageSystem(StorageSystemError::io(source, operation, path))
    }

    pub(crate) fn lifecycle(phase: KernelLifecyclePhase, component: &str, source: Error) -> Self {
        Error::KernelLifecycleError {
            phase,
            component_name: Some(component.to_string()),
            message: format!("'{}' failed", component),
            source: Some(Box::new(source)),
        }
    }
}
