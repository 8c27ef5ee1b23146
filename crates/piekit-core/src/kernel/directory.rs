use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::kernel::error::{Error, KernelLifecyclePhase, Result};

/// Lifecycle contract shared by every named manager.
///
/// `init` and `shutdown` receive the directory so a manager can read from the
/// managers registered before it (the locale manager reads the configured
/// language from the config store, for example). A manager must not try to
/// reach itself through the directory: it is borrowed for the duration of
/// the call and the lookup fails with [`Error::ManagerBusy`].
pub trait Manager: 'static {
    /// The name the manager is registered under.
    fn name(&self) -> &'static str;

    /// Populate containers. Called once by the directory.
    fn init(&mut self, managers: &ManagerDirectory) -> Result<()>;

    /// Reset containers without releasing the manager itself.
    fn shutdown(&mut self, managers: &ManagerDirectory) -> Result<()>;

    fn reload(&mut self, managers: &ManagerDirectory) -> Result<()> {
        self.shutdown(managers)?;
        self.init(managers)
    }

    /// Called before a plugin's `init()` with the plugin's folder.
    fn init_plugin(&mut self, _plugin: &str, _folder: &Path) -> Result<()> {
        Ok(())
    }

    /// Called after a plugin shut down; drops everything the plugin owned.
    fn shutdown_plugin(&mut self, _plugin: &str) -> Result<()> {
        Ok(())
    }
}

struct Slot {
    manager: Rc<RefCell<dyn Manager>>,
    any: Rc<dyn Any>,
    initialized: Cell<bool>,
}

/// Write-once directory of named manager singletons.
///
/// The directory owns every manager for the lifetime of the process. Names
/// are registered once; `init`/`shutdown` follow registration order (and its
/// reverse). Access goes through [`with`](Self::with) and
/// [`with_mut`](Self::with_mut), which report re-entrant use as
/// [`Error::ManagerBusy`] rather than panicking.
#[derive(Default)]
pub struct ManagerDirectory {
    slots: HashMap<&'static str, Slot>,
    order: Vec<&'static str>,
}

impl fmt::Debug for ManagerDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerDirectory")
            .field("managers", &self.order)
            .finish()
    }
}

impl ManagerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a manager under its own name. Fails if the name is taken.
    pub fn register<M: Manager>(&mut self, manager: M) -> Result<Rc<RefCell<M>>> {
        let name = manager.name();
        if self.slots.contains_key(name) {
            return Err(Error::DuplicateManager { name: name.to_string() });
        }

        let cell = Rc::new(RefCell::new(manager));
        let erased: Rc<RefCell<dyn Manager>> = cell.clone();
        let any: Rc<dyn Any> = cell.clone();
        self.slots.insert(name, Slot { manager: erased, any, initialized: Cell::new(false) });
        self.order.push(name);
        log::debug!("Registered manager '{}'", name);
        Ok(cell)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Manager names in registration order.
    pub fn names(&self) -> &[&'static str] {
        &self.order
    }

    pub fn is_initialized(&self, name: &str) -> Result<bool> {
        Ok(self.slot(name)?.initialized.get())
    }

    /// Returns a shared handle to the manager registered under `name`.
    pub fn get<M: Manager>(&self, name: &str) -> Result<Rc<RefCell<M>>> {
        let slot = self.slot(name)?;
        slot.any
            .clone()
            .downcast::<RefCell<M>>()
            .map_err(|_| Error::ManagerTypeMismatch {
                name: name.to_string(),
                expected: type_name::<M>(),
            })
    }

    /// Runs `f` against a shared borrow of the manager.
    pub fn with<M: Manager, R>(&self, name: &str, f: impl FnOnce(&M) -> Result<R>) -> Result<R> {
        let cell = self.get::<M>(name)?;
        let manager = cell
            .try_borrow()
            .map_err(|_| Error::ManagerBusy { name: name.to_string() })?;
        f(&manager)
    }

    /// Runs `f` against an exclusive borrow of the manager.
    pub fn with_mut<M: Manager, R>(&self, name: &str, f: impl FnOnce(&mut M) -> Result<R>) -> Result<R> {
        let cell = self.get::<M>(name)?;
        let mut manager = cell
            .try_borrow_mut()
            .map_err(|_| Error::ManagerBusy { name: name.to_string() })?;
        f(&mut manager)
    }

    /// Initializes a single manager. A second call is a no-op.
    pub fn init(&self, name: &str) -> Result<()> {
        let slot = self.slot(name)?;
        if slot.initialized.get() {
            return Ok(());
        }
        let mut manager = slot
            .manager
            .try_borrow_mut()
            .map_err(|_| Error::ManagerBusy { name: name.to_string() })?;

        log::info!("Initializing manager: {}", name);
        manager
            .init(self)
            .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Initialize, name, e))?;
        slot.initialized.set(true);
        Ok(())
    }

    /// Shuts a single manager down. Managers that were never initialized are skipped.
    pub fn shutdown(&self, name: &str) -> Result<()> {
        let slot = self.slot(name)?;
        if !slot.initialized.get() {
            return Ok(());
        }
        let mut manager = slot
            .manager
            .try_borrow_mut()
            .map_err(|_| Error::ManagerBusy { name: name.to_string() })?;

        log::info!("Shutting down manager: {}", name);
        slot.initialized.set(false);
        manager
            .shutdown(self)
            .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Shutdown, name, e))
    }

    /// `shutdown` followed by `init`, for an initialized manager.
    pub fn reload(&self, name: &str) -> Result<()> {
        self.shutdown(name)?;
        self.init(name)
    }

    /// Shuts every initialized manager down in reverse registration order.
    /// Keeps going after a failure and returns the first error.
    pub fn shutdown_all(&self) -> Result<()> {
        let mut first_error = None;
        for name in self.order.iter().rev() {
            if let Err(e) = self.shutdown(name) {
                log::error!("Error stopping manager {}: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Hands a freshly loading plugin's folder to every initialized manager.
    ///
    /// Managers that are currently borrowed (the plugin manager driving the
    /// load) are skipped.
    pub fn init_plugin(&self, plugin: &str, folder: &Path) -> Result<()> {
        for name in &self.order {
            let slot = &self.slots[name];
            if !slot.initialized.get() {
                continue;
            }
            let Ok(mut manager) = slot.manager.try_borrow_mut() else {
                log::trace!("Skipping busy manager '{}' for plugin '{}'", name, plugin);
                continue;
            };
            manager.init_plugin(plugin, folder)?;
        }
        Ok(())
    }

    /// Drops a plugin's contributions from every initialized manager, in
    /// reverse registration order. Returns the first error.
    pub fn shutdown_plugin(&self, plugin: &str) -> Result<()> {
        let mut first_error = None;
        for name in self.order.iter().rev() {
            let slot = &self.slots[name];
            if !slot.initialized.get() {
                continue;
            }
            let Ok(mut manager) = slot.manager.try_borrow_mut() else {
                continue;
            };
            if let Err(e) = manager.shutdown_plugin(plugin) {
                log::warn!("Manager '{}' failed to drop plugin '{}': {}", name, plugin, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn slot(&self, name: &str) -> Result<&Slot> {
        self.slots
            .get(name)
            .ok_or_else(|| Error::ManagerNotFound { name: name.to_string() })
    }
}
