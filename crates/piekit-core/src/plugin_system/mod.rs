//! # Plugin System
//!
//! Plugins are statically linked types implementing [`Plugin`]. The
//! [`PluginManager`] accepts them with their declared `requires`, rejects
//! registrations that would close a dependency cycle, loads them in an order
//! where dependencies come first and fans out lifecycle events.
//!
//! - **[`traits`]**: the [`Plugin`] contract and [`PluginState`].
//! - **[`graph`]**: the `requires` graph, cycle checks and load order.
//! - **[`events`]**: the flat subscription table and [`PluginEvent`].
//! - **[`context`]**: [`PluginContext`], the accessor facade every plugin
//!   receives instead of reaching for global managers.
//! - **[`manager`]**: [`PluginManager`], which drives loading and teardown.
//! - **[`error`]**: [`PluginSystemError`](error::PluginSystemError) and
//!   [`DependencyError`](error::DependencyError).
//!
//! A plugin's `init` runs as soon as its turn in the load order comes; it is
//! not blocked on dependencies. It becomes `Ready` once `init` returned and
//! every plugin it requires is `Ready`. Subscriptions for
//! [`PluginEvent::Available`] fire exactly once, when the target becomes
//! `Ready`, or immediately if it already is.
pub mod context;
pub mod error;
pub mod events;
pub mod graph;
pub mod manager;
pub mod traits;

pub use context::PluginContext;
pub use error::{DependencyError, PluginSystemError};
pub use events::{EventCallback, EventTable, PendingSubscription, PluginEvent, SubscriptionId};
pub use graph::DependencyGraph;
pub use manager::{MissingDependency, PluginInfo, PluginManager, TeardownReport};
pub use traits::{Plugin, PluginState};

#[cfg(test)]
mod tests;
