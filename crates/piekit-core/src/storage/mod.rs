//! # Piekit Storage
//!
//! Configuration storage for the application and its plugins.
//!
//! - [`config`]: file formats ([`ConfigFormat`]), the in-memory document
//!   ([`ConfigData`]), [`Section`] and [`ConfigPath`] addressing.
//! - [`store`]: the [`ConfigStore`] manager with committed tables, the draft
//!   overlay, and `save`/`restore`/`commit`/`persist`.
//! - [`observer`]: [`FolderObserver`], which flags tables whose folders
//!   changed on disk (feature `watch`).
//! - [`error`]: [`StorageSystemError`](error::StorageSystemError).
pub mod config;
pub mod error;
pub mod observer;
pub mod store;

pub use config::{ConfigData, ConfigFormat, ConfigPath, Section};
pub use observer::FolderObserver;
pub use store::ConfigStore;

#[cfg(test)]
mod tests;
