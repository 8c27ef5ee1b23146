use std::cell::RefCell;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::kernel::constants::{ROOT_SCOPE, managers};
use crate::kernel::directory::ManagerDirectory;
use crate::kernel::error::Result;
use crate::kernel::mailbox::MailboxSender;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::events::{EventTable, PluginEvent, Subscription, SubscriptionId};
use crate::plugin_system::traits::PluginState;
use crate::registry::items::{Action, ConfigPage, Menu, MenuItem, ToolBar, ToolButton};
use crate::registry::reference::{ActionManager, ConfigPageManager, MenuManager, ToolBarManager, ToolButtonManager};
use crate::registry::{LocaleManager, ThemeManager};
use crate::storage::{ConfigStore, Section};

/// Facade handed to a plugin's `init`, `shutdown` and event callbacks.
///
/// Configuration calls are scoped to the plugin's own namespace, registry
/// contributions are recorded as owned by the plugin and dropped when it
/// shuts down. The plugin manager itself is borrowed while a context is
/// alive, so reaching it through [`managers`](Self::managers) yields
/// `ManagerBusy`.
pub struct PluginContext<'a> {
    plugin: &'a str,
    folder: &'a Path,
    managers: &'a ManagerDirectory,
    events: &'a RefCell<EventTable>,
    mailbox: Option<&'a MailboxSender>,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(
        plugin: &'a str,
        folder: &'a Path,
        managers: &'a ManagerDirectory,
        events: &'a RefCell<EventTable>,
        mailbox: Option<&'a MailboxSender>,
    ) -> Self {
        Self {
            plugin,
            folder,
            managers,
            events,
            mailbox,
        }
    }

    /// Name of the plugin this context belongs to
    pub fn name(&self) -> &str {
        self.plugin
    }

    pub fn folder(&self) -> &Path {
        self.folder
    }

    pub fn managers(&self) -> &ManagerDirectory {
        self.managers
    }

    /// Sender for work finished off the owning thread.
    pub fn mailbox(&self) -> Option<&MailboxSender> {
        self.mailbox
    }

    pub fn state_of(&self, plugin: &str) -> Option<PluginState> {
        self.events.borrow().state(plugin)
    }

    // Configuration

    pub fn get_config<T: DeserializeOwned>(&self, section: Section, key: &str, default: T, temp: bool) -> Result<T> {
        self.managers
            .with::<ConfigStore, _>(managers::CONFIGS, |config| config.get(self.plugin, section, key, default, temp))
    }

    pub fn set_config<T: Serialize>(&self, section: Section, key: &str, value: T, temp: bool) -> Result<()> {
        self.managers
            .with_mut::<ConfigStore, _>(managers::CONFIGS, |config| config.set(self.plugin, section, key, value, temp))
    }

    pub fn delete_config(&self, section: Section, key: &str) -> Result<()> {
        self.managers
            .with_mut::<ConfigStore, _>(managers::CONFIGS, |config| config.delete(self.plugin, section, key))
    }

    pub fn save_config(&self, section: Section, temp: bool, create: bool) -> Result<PathBuf> {
        self.managers
            .with_mut::<ConfigStore, _>(managers::CONFIGS, |config| config.save(self.plugin, section, temp, create))
    }

    pub fn restore_config(&self, section: Section, key: Option<&str>) -> Result<()> {
        self.managers
            .with_mut::<ConfigStore, _>(managers::CONFIGS, |config| config.restore(self.plugin, section, key))
    }

    /// Reads an application-wide value from the `root` scope.
    pub fn get_app_config<T: DeserializeOwned>(&self, section: Section, key: &str, default: T) -> Result<T> {
        self.managers
            .with::<ConfigStore, _>(managers::CONFIGS, |config| config.get(ROOT_SCOPE, section, key, default, false))
    }

    // Locales

    /// Translates `key` from this plugin's strings, or returns it unchanged.
    pub fn translate(&self, key: &str) -> String {
        self.translate_in(self.plugin, key)
    }

    pub fn translate_in(&self, section: &str, key: &str) -> String {
        self.managers
            .with::<LocaleManager, _>(managers::LOCALES, |locales| Ok(locales.translate(section, key)))
            .unwrap_or_else(|_| key.to_string())
    }

    // Assets

    /// Resolves an asset from the plugin's own assets, then the theme's.
    pub fn get_asset(&self, name: &str) -> Result<PathBuf> {
        self.managers.with::<ThemeManager, _>(managers::THEMES, |theme| {
            match theme.get_asset(name, Some(self.plugin)) {
                Ok(path) => Ok(path.to_path_buf()),
                Err(_) => Ok(theme.get_asset(name, None)?.to_path_buf()),
            }
        })
    }

    // Registries

    pub fn add_menu(&self, section: Option<&str>, menu: Menu) -> Result<()> {
        self.managers.with_mut::<MenuManager, _>(managers::MENUS, |menus| {
            menus.add_menu(Some(self.plugin), section, menu)?;
            Ok(())
        })
    }

    pub fn add_menu_item(&self, section: Option<&str>, menu: &str, item: MenuItem) -> Result<()> {
        self.managers.with_mut::<MenuManager, _>(managers::MENUS, |menus| {
            menus.add_menu_item(Some(self.plugin), section, menu, item)?;
            Ok(())
        })
    }

    pub fn add_toolbar(&self, toolbar: ToolBar) -> Result<()> {
        self.managers.with_mut::<ToolBarManager, _>(managers::TOOLBARS, |toolbars| {
            let name = toolbar.name.clone();
            toolbars.add_owned(self.plugin, &name, toolbar, None)?;
            Ok(())
        })
    }

    pub fn add_toolbutton(&self, toolbar: &str, button: ToolButton) -> Result<()> {
        self.managers.with::<ToolBarManager, _>(managers::TOOLBARS, |toolbars| {
            toolbars.get(toolbar, None)?;
            Ok(())
        })?;
        self.managers.with_mut::<ToolButtonManager, _>(managers::TOOLBUTTONS, |buttons| {
            let name = button.name.clone();
            buttons.add_owned(self.plugin, &name, button, Some(toolbar))?;
            Ok(())
        })
    }

    /// Registers an action under this plugin's name.
    pub fn add_action(&self, action: Action) -> Result<()> {
        self.managers.with_mut::<ActionManager, _>(managers::ACTIONS, |actions| {
            let name = action.name.clone();
            actions.add_owned(self.plugin, &name, action, Some(self.plugin))?;
            Ok(())
        })
    }

    pub fn add_config_page(&self, page: ConfigPage) -> Result<()> {
        self.managers.with_mut::<ConfigPageManager, _>(managers::CONFIG_PAGES, |pages| {
            let name = page.name.clone();
            pages.add_owned(self.plugin, &name, page, None)?;
            Ok(())
        })
    }

    // Events

    /// Runs `callback` once when `event` happens on `target`.
    ///
    /// If it already happened (the target is `Ready` for
    /// [`PluginEvent::Available`], its teardown was announced for
    /// [`PluginEvent::Teardown`]) the callback runs before this returns and
    /// its error is returned.
    pub fn subscribe<F>(&self, target: &str, event: PluginEvent, callback: F) -> Result<SubscriptionId>
    where
        F: FnOnce(&PluginContext<'_>) -> Result<()> + 'static,
    {
        let fired = self.events.borrow().has_fired(target, event);
        if !fired {
            let id = self.events.borrow_mut().push(self.plugin, target, event, Box::new(callback));
            return Ok(id);
        }

        let id = self.events.borrow_mut().reserve_id();
        log::debug!("'{}' subscribed to {} of '{}' after the fact", self.plugin, event, target);
        callback(self).map_err(|e| PluginSystemError::CallbackError {
            subscriber: self.plugin.to_string(),
            target: target.to_string(),
            message: e.to_string(),
        })?;
        Ok(id)
    }

    pub fn on_plugin_available<F>(&self, target: &str, callback: F) -> Result<SubscriptionId>
    where
        F: FnOnce(&PluginContext<'_>) -> Result<()> + 'static,
    {
        self.subscribe(target, PluginEvent::Available, callback)
    }

    pub fn on_teardown<F>(&self, target: &str, callback: F) -> Result<SubscriptionId>
    where
        F: FnOnce(&PluginContext<'_>) -> Result<()> + 'static,
    {
        self.subscribe(target, PluginEvent::Teardown, callback)
    }

    /// Returns false when the subscription already fired or was revoked.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.borrow_mut().remove(id)
    }
}

/// Fires and consumes every subscription for `event` on `target`.
/// Callback errors are logged; they never stop the remaining callbacks.
pub(crate) fn dispatch(
    target: &str,
    event: PluginEvent,
    managers: &ManagerDirectory,
    events: &RefCell<EventTable>,
    mailbox: Option<&MailboxSender>,
) -> usize {
    let subscriptions = {
        let mut table = events.borrow_mut();
        if event == PluginEvent::Teardown {
            table.announce_teardown(target);
        }
        table.take(target, event)
    };
    let fired = subscriptions.len();
    for Subscription {
        subscriber, callback, ..
    } in subscriptions
    {
        let folder = events
            .borrow()
            .folder(&subscriber)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let ctx = PluginContext::new(&subscriber, &folder, managers, events, mailbox);
        if let Err(e) = callback(&ctx) {
            log::error!("{} callback of '{}' on '{}' failed: {}", event, subscriber, target, e);
        }
    }
    fired
}
