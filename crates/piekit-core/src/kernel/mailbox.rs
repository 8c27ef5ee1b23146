use std::fmt;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::mpsc::error::TryRecvError;

use crate::kernel::directory::ManagerDirectory;
use crate::kernel::error::{Error, Result};

/// A mutation produced off-thread and applied by the owning thread.
pub type Deferred = Box<dyn FnOnce(&ManagerDirectory) -> Result<()> + Send>;

/// Owner side of the worker channel.
///
/// Worker threads and tasks never touch registries, the config store or the
/// plugin graph directly. They post [`Deferred`] closures through a
/// [`MailboxSender`], and the owning thread applies them with
/// [`drain`](Mailbox::drain).
pub struct Mailbox {
    sender: UnboundedSender<Deferred>,
    receiver: UnboundedReceiver<Deferred>,
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

/// Cloneable, `Send` handle for workers.
#[derive(Clone)]
pub struct MailboxSender {
    sender: UnboundedSender<Deferred>,
}

impl fmt::Debug for MailboxSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxSender").finish_non_exhaustive()
    }
}

impl MailboxSender {
    /// Queues `job` for the owning thread. Fails once the mailbox is gone.
    pub fn post<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&ManagerDirectory) -> Result<()> + Send + 'static,
    {
        self.sender
            .send(Box::new(job))
            .map_err(|_| Error::Other("mailbox closed".to_string()))
    }
}

impl Mailbox {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> MailboxSender {
        MailboxSender { sender: self.sender.clone() }
    }

    /// Number of jobs waiting to be applied.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Applies every queued job, in posting order, without waiting.
    ///
    /// A failing job is logged and does not stop the rest. Returns how many
    /// jobs ran.
    pub fn drain(&mut self, managers: &ManagerDirectory) -> usize {
        let mut applied = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(job) => {
                    if let Err(e) = job(managers) {
                        log::error!("Deferred job failed: {}", e);
                    }
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Waits for the next job and applies it.
    pub async fn apply_next(&mut self, managers: &ManagerDirectory) -> Result<()> {
        match self.receiver.recv().await {
            Some(job) => job(managers),
            None => Ok(()),
        }
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
