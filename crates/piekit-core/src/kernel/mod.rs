//! # Piekit Kernel
//!
//! The `kernel` module owns the process-level plumbing every other subsystem
//! leans on:
//!
//! - **Manager directory**: [`ManagerDirectory`](directory::ManagerDirectory) maps
//!   a manager name to its single instance and drives `init`/`shutdown` in the
//!   order managers were registered. The [`Manager`](directory::Manager) trait is
//!   the contract every manager implements.
//! - **Bootstrap**: [`Application`](bootstrap::Application) is the context object
//!   constructed once at startup. It consumes an ordered bootstrap list of
//!   [`ManagerConfig`](bootstrap::ManagerConfig) entries and owns the directory.
//! - **Mailbox**: [`Mailbox`](mailbox::Mailbox) carries deferred mutations from
//!   worker tasks back to the owning thread.
//! - **Constants** and **errors** shared across the crate.
//!
//! None of the kernel types synchronize internally. They are owned by a single
//! thread; workers talk to them only through the mailbox.
pub mod bootstrap;
pub mod constants;
pub mod directory;
pub mod error;
pub mod mailbox;

pub use bootstrap::{Application, AppPaths, ManagerConfig};
pub use directory::{Manager, ManagerDirectory};
pub use error::{Error, Result};
pub use mailbox::{Deferred, Mailbox, MailboxSender};

#[cfg(test)]
mod tests;
