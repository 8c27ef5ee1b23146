//! Errors raised by [`KeyedRegistry`](super::KeyedRegistry) and the managers
//! built on top of it.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Item '{key}' is already added to '{registry}'")]
    DuplicateKey { registry: String, key: String },

    #[error("Item '{key}' was not found in '{registry}'")]
    KeyNotFound { registry: String, key: String },

    #[error("Item '{key}' in '{registry}' clashes with '{other}'")]
    KeyConflict { registry: String, key: String, other: String },
}
