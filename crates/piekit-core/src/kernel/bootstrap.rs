use std::fmt;
use std::path::{Path, PathBuf};

use crate::kernel::constants::{self, APP_NAME, CONFIGS_FOLDER, DEFAULT_PLUGINS_DIR, managers};
use crate::kernel::directory::{Manager, ManagerDirectory};
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::mailbox::{Mailbox, MailboxSender};
use crate::plugin_system::{Plugin, PluginManager, TeardownReport};
use crate::registry::reference::ReferenceManager;
use crate::registry::{LocaleManager, ThemeManager};
use crate::storage::ConfigStore;

/// Folders the application reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Shipped files: `configs/`, `locales/`, `assets/`
    pub app_root: PathBuf,
    /// Per-user overrides
    pub user_root: PathBuf,
    pub plugins_root: PathBuf,
}

impl AppPaths {
    /// Plugins default to `<app_root>/plugins`.
    pub fn new(app_root: impl Into<PathBuf>, user_root: impl Into<PathBuf>) -> Self {
        let app_root = app_root.into();
        Self {
            plugins_root: app_root.join(DEFAULT_PLUGINS_DIR),
            user_root: user_root.into(),
            app_root,
        }
    }

    pub fn with_plugins_root(mut self, plugins_root: impl Into<PathBuf>) -> Self {
        self.plugins_root = plugins_root.into();
        self
    }

    /// The working directory as app root and the platform config directory
    /// (`~/.config/piekit` on Linux) as user root.
    pub fn from_env() -> Result<Self> {
        let app_root =
            std::env::current_dir().map_err(|e| Error::io(e, "current_dir", PathBuf::from(".")))?;
        let user_root = dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or_else(|| Error::Other("Could not determine the user config directory".to_string()))?;
        Ok(Self::new(app_root, user_root))
    }

    pub fn app_configs(&self) -> PathBuf {
        self.app_root.join(CONFIGS_FOLDER)
    }

    pub fn user_configs(&self) -> PathBuf {
        self.user_root.join(CONFIGS_FOLDER)
    }

    pub fn plugin_folder(&self, plugin: &str) -> PathBuf {
        self.plugins_root.join(plugin)
    }
}

type Installer = Box<dyn FnOnce(&mut ManagerDirectory, &AppPaths) -> Result<&'static str>>;

/// One bootstrap list entry: how to build a manager and whether to
/// initialize it right after registration.
pub struct ManagerConfig {
    install: Installer,
    auto_init: bool,
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig").field("auto_init", &self.auto_init).finish()
    }
}

impl ManagerConfig {
    pub fn new<M, F>(factory: F, auto_init: bool) -> Self
    where
        M: Manager,
        F: FnOnce(&AppPaths) -> M + 'static,
    {
        Self {
            install: Box::new(move |directory, paths| {
                let manager = factory(paths);
                let name = manager.name();
                directory.register(manager)?;
                Ok(name)
            }),
            auto_init,
        }
    }

    pub fn auto_init(&self) -> bool {
        self.auto_init
    }
}

/// The context object built once at startup.
///
/// Owns the paths, the manager directory and the mailbox. Managers and
/// plugins reach each other through it rather than through global state.
pub struct Application {
    paths: AppPaths,
    managers: ManagerDirectory,
    mailbox: Mailbox,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("paths", &self.paths)
            .field("managers", &self.managers)
            .finish()
    }
}

impl Application {
    /// An application with an empty directory; see [`bootstrap`](Self::bootstrap).
    pub fn new(paths: AppPaths) -> Self {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);
        Self {
            paths,
            managers: ManagerDirectory::new(),
            mailbox: Mailbox::new(),
        }
    }

    /// Builds an application and bootstraps [`default_managers`](Self::default_managers).
    pub fn with_defaults(paths: AppPaths) -> Result<Self> {
        let mut app = Self::new(paths);
        let list = app.default_managers();
        app.bootstrap(list)?;
        Ok(app)
    }

    /// Configs, locales and assets first, then the reference registries, all
    /// initialized immediately. The plugin manager comes last and waits for
    /// [`start`](Self::start).
    pub fn default_managers(&self) -> Vec<ManagerConfig> {
        let sender = self.mailbox.sender();
        vec![
            ManagerConfig::new(ConfigStore::from_paths, true),
            ManagerConfig::new(|paths: &AppPaths| LocaleManager::new(&paths.app_root), true),
            ManagerConfig::new(|paths: &AppPaths| ThemeManager::new(&paths.app_root), true),
            ManagerConfig::new(|_: &AppPaths| ReferenceManager::menus(), true),
            ManagerConfig::new(|_: &AppPaths| ReferenceManager::toolbars(), true),
            ManagerConfig::new(|_: &AppPaths| ReferenceManager::toolbuttons(), true),
            ManagerConfig::new(|_: &AppPaths| ReferenceManager::actions(), true),
            ManagerConfig::new(|_: &AppPaths| ReferenceManager::config_pages(), true),
            ManagerConfig::new(
                move |paths: &AppPaths| PluginManager::new(&paths.plugins_root).with_mailbox(sender),
                false,
            ),
        ]
    }

    /// Registers each entry, initializing it right away when asked, strictly
    /// in list order.
    pub fn bootstrap(&mut self, list: Vec<ManagerConfig>) -> Result<()> {
        for config in list {
            let name = (config.install)(&mut self.managers, &self.paths)
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Bootstrap, "bootstrap", e))?;
            log::debug!("Registered manager: {}", name);
            if config.auto_init {
                self.managers.init(name)?;
            }
        }
        Ok(())
    }

    /// Registers a plugin. Once plugins are loading, the plugin is loaded
    /// right away and its init error is returned.
    pub fn register_plugin(&self, plugin: impl Plugin) -> Result<()> {
        let directory = &self.managers;
        directory.with_mut::<PluginManager, _>(managers::PLUGINS, |plugins| {
            let name = plugins.register(Box::new(plugin))?;
            if plugins.is_started() {
                plugins.load(&name, directory)?;
            }
            Ok(())
        })
    }

    /// Initializes every manager not initialized yet, the plugin manager
    /// included, in registration order.
    pub fn start(&self) -> Result<()> {
        for name in self.managers.names() {
            self.managers
                .init(name)
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Start, name, e))?;
        }
        log::info!("Application started");
        Ok(())
    }

    /// Tears plugins down, then shuts the remaining managers down in reverse
    /// registration order. Returns the plugin teardown diagnostics.
    pub fn shutdown(&mut self) -> Result<TeardownReport> {
        let drained = self.drain_mailbox();
        if drained > 0 {
            log::debug!("Applied {} pending jobs before shutdown", drained);
        }

        let mut report = TeardownReport::default();
        if self.managers.contains(managers::PLUGINS) {
            self.managers.shutdown(managers::PLUGINS)?;
            report = self.managers.with::<PluginManager, _>(managers::PLUGINS, |plugins| {
                Ok(plugins.last_report().cloned().unwrap_or_default())
            })?;
        }
        self.managers.shutdown_all()?;
        log::info!("Application shut down");
        Ok(report)
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn managers(&self) -> &ManagerDirectory {
        &self.managers
    }

    /// Sender handed to worker tasks.
    pub fn mailbox_sender(&self) -> MailboxSender {
        self.mailbox.sender()
    }

    /// Applies every job posted so far. Returns how many ran.
    pub fn drain_mailbox(&mut self) -> usize {
        self.mailbox.drain(&self.managers)
    }

    /// Waits for the next posted job and applies it.
    pub async fn apply_next(&mut self) -> Result<()> {
        self.mailbox.apply_next(&self.managers).await
    }

    pub fn config<R>(&self, f: impl FnOnce(&ConfigStore) -> Result<R>) -> Result<R> {
        self.managers.with(managers::CONFIGS, f)
    }

    pub fn config_mut<R>(&self, f: impl FnOnce(&mut ConfigStore) -> Result<R>) -> Result<R> {
        self.managers.with_mut(managers::CONFIGS, f)
    }

    pub fn plugins<R>(&self, f: impl FnOnce(&PluginManager) -> Result<R>) -> Result<R> {
        self.managers.with(managers::PLUGINS, f)
    }

    pub fn locales<R>(&self, f: impl FnOnce(&LocaleManager) -> Result<R>) -> Result<R> {
        self.managers.with(managers::LOCALES, f)
    }

    pub fn themes<R>(&self, f: impl FnOnce(&ThemeManager) -> Result<R>) -> Result<R> {
        self.managers.with(managers::THEMES, f)
    }

    pub fn app_root(&self) -> &Path {
        &self.paths.app_root
    }
}
