//! # Registries
//!
//! [`KeyedRegistry`] is the namespaced container every subsystem stores its
//! named resources in. The managers in this module wrap it:
//!
//! - [`ReferenceManager`] for menus, toolbars, toolbuttons, actions and
//!   configuration pages
//! - [`LocaleManager`] for translated strings
//! - [`ThemeManager`] for asset file paths
pub mod error;
pub mod items;
pub mod keyed;
pub mod locale;
pub mod reference;
pub mod theme;

pub use error::RegistryError;
pub use items::{Action, ConfigPage, Menu, MenuEntry, MenuItem, ToolBar, ToolButton};
pub use keyed::{CompositeKey, KeyedRegistry};
pub use locale::LocaleManager;
pub use reference::{
    ActionManager, ConfigPageManager, MenuManager, ReferenceManager, ToolBarManager, ToolButtonManager,
};
pub use theme::ThemeManager;

use crate::kernel::constants::{ROOT_SCOPE, managers};
use crate::kernel::directory::ManagerDirectory;
use crate::storage::{ConfigStore, Section};

/// Reads a `(root, user)` setting, falling back to `default` when the config
/// manager is missing or the value can't be read.
pub(crate) fn user_setting(directory: &ManagerDirectory, key: &str, default: &str) -> String {
    if !directory.contains(managers::CONFIGS) {
        return default.to_string();
    }
    directory
        .with::<ConfigStore, _>(managers::CONFIGS, |config| {
            config.get(ROOT_SCOPE, Section::User, key, default.to_string(), false)
        })
        .unwrap_or_else(|e| {
            log::warn!("Could not read setting '{}', using '{}': {}", key, default, e);
            default.to_string()
        })
}
