use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Serialize;

use crate::kernel::constants::managers;
use crate::kernel::directory::{Manager, ManagerDirectory};
use crate::kernel::error::Result;
use crate::kernel::mailbox::MailboxSender;
use crate::plugin_system::context::{PluginContext, dispatch};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::events::{EventTable, PendingSubscription, PluginEvent};
use crate::plugin_system::graph::DependencyGraph;
use crate::plugin_system::traits::{Plugin, PluginState};

struct PluginEntry {
    plugin: Box<dyn Plugin>,
    version: Version,
    folder: PathBuf,
    /// `init` returned successfully
    initialized: bool,
}

/// Summary of a registered plugin, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub requires: Vec<String>,
    pub state: PluginState,
}

/// A declared dependency that never registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingDependency {
    pub plugin: String,
    pub requires: String,
}

/// Diagnostics collected while tearing plugins down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub missing_dependencies: Vec<MissingDependency>,
    /// Plugins whose `init` succeeded but never reached `Ready`
    pub never_ready: Vec<String>,
    pub failed: Vec<String>,
    /// Subscriptions whose target event never happened
    pub unfired: Vec<PendingSubscription>,
    pub errors: Vec<String>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.missing_dependencies.is_empty()
            && self.never_ready.is_empty()
            && self.failed.is_empty()
            && self.unfired.is_empty()
            && self.errors.is_empty()
    }

    fn log(&self) {
        for missing in &self.missing_dependencies {
            log::warn!("Plugin '{}' requires '{}', which never registered", missing.plugin, missing.requires);
        }
        for name in &self.never_ready {
            log::warn!("Plugin '{}' never became ready", name);
        }
        for name in &self.failed {
            log::warn!("Plugin '{}' failed to initialize", name);
        }
        for pending in &self.unfired {
            log::warn!(
                "{} callback of '{}' on '{}' never fired",
                pending.event,
                pending.subscriber,
                pending.target
            );
        }
        for error in &self.errors {
            log::warn!("Teardown error: {}", error);
        }
    }
}

/// Owns registered plugins, their dependency graph and the event table.
///
/// Registered in the manager directory under `plugins`; its `init` loads
/// every registered plugin in dependency order and its `shutdown` tears them
/// down in reverse. A plugin registered after loading started is loaded
/// immediately.
pub struct PluginManager {
    plugins_root: PathBuf,
    entries: HashMap<String, PluginEntry>,
    graph: DependencyGraph,
    events: RefCell<EventTable>,
    loaded: Vec<String>,
    started: bool,
    mailbox: Option<MailboxSender>,
    report: Option<TeardownReport>,
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins_root", &self.plugins_root)
            .field("plugins", &self.graph.names())
            .field("loaded", &self.loaded)
            .field("started", &self.started)
            .finish()
    }
}

impl PluginManager {
    pub fn new(plugins_root: impl Into<PathBuf>) -> Self {
        Self {
            plugins_root: plugins_root.into(),
            entries: HashMap::new(),
            graph: DependencyGraph::new(),
            events: RefCell::new(EventTable::new()),
            loaded: Vec::new(),
            started: false,
            mailbox: None,
            report: None,
        }
    }

    /// Hands `sender` to every plugin context.
    pub fn with_mailbox(mut self, sender: MailboxSender) -> Self {
        self.mailbox = Some(sender);
        self
    }

    /// Registers a plugin. Fails on a duplicate name, an unparsable version
    /// or a `requires` edge closing a cycle; on failure nothing is recorded.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<String> {
        let name = plugin.name().to_string();
        if self.entries.contains_key(&name) {
            return Err(PluginSystemError::DuplicatePlugin { plugin: name }.into());
        }

        let version = Version::parse(plugin.version()).map_err(|source| PluginSystemError::InvalidVersion {
            plugin: name.clone(),
            version: plugin.version().to_string(),
            source,
        })?;

        let requires = plugin.requires();
        self.graph
            .add(&name, &requires)
            .map_err(PluginSystemError::from)?;

        let folder = plugin.folder().unwrap_or_else(|| self.plugins_root.join(&name));
        {
            let mut events = self.events.borrow_mut();
            events.set_folder(&name, folder.clone());
            events.set_state(&name, PluginState::Registered);
        }
        log::info!("Registered plugin {} v{}", name, version);

        self.entries.insert(
            name.clone(),
            PluginEntry {
                plugin,
                version,
                folder,
                initialized: false,
            },
        );
        Ok(name)
    }

    /// Whether [`load_all`](Self::load_all) ran and teardown hasn't.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Loads every registered plugin in dependency order. A plugin failing
    /// to initialize is marked `Failed`; the others still load.
    pub fn load_all(&mut self, managers: &ManagerDirectory) -> Result<()> {
        let order = self.graph.load_order().map_err(PluginSystemError::from)?;

        self.events.borrow_mut().reset();
        self.loaded.clear();
        self.report = None;
        for (name, entry) in self.entries.iter_mut() {
            entry.initialized = false;
            self.events.borrow_mut().set_state(name, PluginState::Registered);
        }
        self.started = true;

        log::info!("Loading {} plugins", order.len());
        for name in &order {
            if let Err(e) = self.load(name, managers) {
                log::error!("{}", e);
            }
        }

        let ready = order
            .iter()
            .filter(|name| self.state(name) == Some(PluginState::Ready))
            .count();
        log::info!("{} of {} plugins ready", ready, order.len());
        Ok(())
    }

    /// Loads one registered plugin: hands its folder to the other managers,
    /// runs `init` and promotes whatever became ready.
    pub fn load(&mut self, name: &str, managers: &ManagerDirectory) -> Result<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| PluginSystemError::PluginNotFound { plugin: name.to_string() })?;
        let folder = entry.folder.clone();

        match self.events.borrow().state(name) {
            None | Some(PluginState::Registered) => {}
            Some(state) => {
                return Err(PluginSystemError::AlreadyLoaded {
                    plugin: name.to_string(),
                    state: state.to_string(),
                }
                .into());
            }
        }

        self.events.borrow_mut().set_state(name, PluginState::Initializing);
        self.loaded.push(name.to_string());
        log::debug!("Initializing plugin '{}' from {}", name, folder.display());

        let outcome = match managers.init_plugin(name, &folder) {
            Ok(()) => {
                let ctx = PluginContext::new(name, &folder, managers, &self.events, self.mailbox.as_ref());
                match panic::catch_unwind(AssertUnwindSafe(|| entry.plugin.init(&ctx))) {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(payload) => Err(panic_message(payload.as_ref())),
                }
            }
            Err(e) => Err(e.to_string()),
        };

        if let Err(message) = outcome {
            let mut events = self.events.borrow_mut();
            events.set_state(name, PluginState::Failed);
            events.drop_subscriber(name);
            return Err(PluginSystemError::InitializationError {
                plugin: name.to_string(),
                message,
            }
            .into());
        }

        entry.initialized = true;
        self.promote(managers);
        Ok(())
    }

    /// Marks every initialized plugin whose dependencies are all `Ready` as
    /// `Ready` and fires its availability callbacks, until nothing changes.
    fn promote(&self, managers: &ManagerDirectory) {
        loop {
            let next = {
                let events = self.events.borrow();
                self.loaded
                    .iter()
                    .find(|name| {
                        self.entries.get(name.as_str()).is_some_and(|e| e.initialized)
                            && events.state(name) == Some(PluginState::Initializing)
                            && self
                                .graph
                                .requires(name)
                                .iter()
                                .all(|d| events.state(d) == Some(PluginState::Ready))
                    })
                    .cloned()
            };
            let Some(name) = next else {
                break;
            };

            self.events.borrow_mut().set_state(&name, PluginState::Ready);
            log::info!("Plugin '{}' is ready", name);
            dispatch(&name, PluginEvent::Available, managers, &self.events, self.mailbox.as_ref());
        }
    }

    /// Tears loaded plugins down in reverse load order.
    ///
    /// Every plugin's teardown subscribers are notified first, while all
    /// plugins are still alive. Then each plugin's `shutdown` runs and the
    /// other managers drop what it contributed.
    pub fn teardown(&mut self, managers: &ManagerDirectory) -> TeardownReport {
        let order: Vec<String> = self.loaded.iter().rev().cloned().collect();
        let mut report = TeardownReport {
            missing_dependencies: self
                .graph
                .missing()
                .into_iter()
                .map(|(plugin, requires)| MissingDependency { plugin, requires })
                .collect(),
            ..TeardownReport::default()
        };

        for name in order.iter().rev() {
            match self.state(name) {
                Some(PluginState::Failed) => report.failed.push(name.clone()),
                Some(PluginState::Initializing) => report.never_ready.push(name.clone()),
                _ => {}
            }
        }

        for name in &order {
            if self.state(name) != Some(PluginState::Failed) {
                dispatch(name, PluginEvent::Teardown, managers, &self.events, self.mailbox.as_ref());
            }
        }
        report.unfired = self.events.borrow().pending();

        for name in &order {
            let failed = self.state(name) == Some(PluginState::Failed);
            if let Some(entry) = self.entries.get_mut(name) {
                if entry.initialized {
                    let ctx = PluginContext::new(name, &entry.folder, managers, &self.events, self.mailbox.as_ref());
                    if let Err(e) = entry.plugin.shutdown(&ctx) {
                        report.errors.push(
                            PluginSystemError::ShutdownError {
                                plugin: name.clone(),
                                message: e.to_string(),
                            }
                            .to_string(),
                        );
                    }
                }
                entry.initialized = false;
            }
            if let Err(e) = managers.shutdown_plugin(name) {
                report.errors.push(e.to_string());
            }

            let mut events = self.events.borrow_mut();
            events.drop_subscriber(name);
            if !failed {
                events.set_state(name, PluginState::ShutDown);
            }
        }

        self.started = false;
        report.log();
        report
    }

    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.events.borrow().state(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn version(&self, name: &str) -> Option<&Version> {
        self.entries.get(name).map(|e| &e.version)
    }

    pub fn folder(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(|e| e.folder.as_path())
    }

    /// The order `load_all` would use.
    pub fn load_order(&self) -> Result<Vec<String>> {
        Ok(self.graph.load_order().map_err(PluginSystemError::from)?)
    }

    /// Plugins in the order their load was attempted.
    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    /// Registered plugins in registration order.
    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.graph
            .names()
            .iter()
            .filter_map(|name| {
                let entry = self.entries.get(name)?;
                Some(PluginInfo {
                    name: name.clone(),
                    version: entry.version.to_string(),
                    requires: self.graph.requires(name).to_vec(),
                    state: self.state(name).unwrap_or(PluginState::Registered),
                })
            })
            .collect()
    }

    pub fn pending_subscriptions(&self) -> Vec<PendingSubscription> {
        self.events.borrow().pending()
    }

    /// Report of the last teardown, if one ran.
    pub fn last_report(&self) -> Option<&TeardownReport> {
        self.report.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Manager for PluginManager {
    fn name(&self) -> &'static str {
        managers::PLUGINS
    }

    fn init(&mut self, managers: &ManagerDirectory) -> Result<()> {
        self.load_all(managers)
    }

    fn shutdown(&mut self, managers: &ManagerDirectory) -> Result<()> {
        let report = self.teardown(managers);
        self.report = Some(report);
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked with a non-string payload".to_string()
    }
}
