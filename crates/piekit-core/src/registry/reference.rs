use std::collections::HashMap;
use std::fmt;

use crate::kernel::constants::managers;
use crate::kernel::directory::{Manager, ManagerDirectory};
use crate::kernel::error::Result;
use crate::registry::error::RegistryError;
use crate::registry::items::{Action, ConfigPage, Menu, MenuEntry, MenuItem, ToolBar, ToolButton};
use crate::registry::keyed::{CompositeKey, KeyedRegistry};
use crate::storage::config::Section;

/// A named manager wrapping a [`KeyedRegistry`].
///
/// Entries added through [`add_owned`](Self::add_owned) remember the plugin
/// that contributed them and are dropped when that plugin shuts down.
pub struct ReferenceManager<T> {
    name: &'static str,
    registry: KeyedRegistry<T>,
    owners: HashMap<CompositeKey, String>,
}

impl<T> fmt::Debug for ReferenceManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceManager")
            .field("name", &self.name)
            .field("entries", &self.registry.len())
            .finish()
    }
}

impl<T> ReferenceManager<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: KeyedRegistry::new(name),
            owners: HashMap::new(),
        }
    }

    pub fn add(&mut self, name: &str, item: T, parent: Option<&str>) -> std::result::Result<&mut T, RegistryError> {
        self.registry.add(name, item, parent)
    }

    /// Like [`add`](Self::add), recording `owner` as the contributing plugin.
    pub fn add_owned(
        &mut self,
        owner: &str,
        name: &str,
        item: T,
        parent: Option<&str>,
    ) -> std::result::Result<&mut T, RegistryError> {
        let key = CompositeKey::new(name, parent);
        let stored = self.registry.add(name, item, parent)?;
        self.owners.insert(key, owner.to_string());
        Ok(stored)
    }

    pub fn get(&self, name: &str, parent: Option<&str>) -> std::result::Result<&T, RegistryError> {
        self.registry.get(name, parent)
    }

    pub fn get_mut(&mut self, name: &str, parent: Option<&str>) -> std::result::Result<&mut T, RegistryError> {
        self.registry.get_mut(name, parent)
    }

    pub fn get_many(&self, names: &[&str], parent: Option<&str>) -> Vec<&T> {
        self.registry.get_many(names, parent)
    }

    pub fn delete(&mut self, name: &str, parent: Option<&str>) -> std::result::Result<T, RegistryError> {
        let item = self.registry.delete(name, parent)?;
        self.owners.remove(&CompositeKey::new(name, parent));
        Ok(item)
    }

    pub fn contains(&self, name: &str, parent: Option<&str>) -> bool {
        self.registry.contains(name, parent)
    }

    /// Name of the plugin that contributed the entry, if any.
    pub fn owner(&self, name: &str, parent: Option<&str>) -> Option<&str> {
        self.owners.get(&CompositeKey::new(name, parent)).map(String::as_str)
    }

    /// Drops every entry contributed by `owner`. Returns how many went away.
    pub fn drop_owner(&mut self, owner: &str) -> usize {
        let keys: Vec<CompositeKey> = self
            .owners
            .iter()
            .filter(|(_, o)| o.as_str() == owner)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.owners.remove(key);
            // The entry may already have been deleted by hand.
            let _ = self.registry.delete(key.name(), key.parent());
        }
        keys.len()
    }

    pub fn registry(&self) -> &KeyedRegistry<T> {
        &self.registry
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.owners.clear();
    }
}

impl<T: 'static> Manager for ReferenceManager<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&mut self, _managers: &ManagerDirectory) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self, _managers: &ManagerDirectory) -> Result<()> {
        self.clear();
        Ok(())
    }

    fn shutdown_plugin(&mut self, plugin: &str) -> Result<()> {
        let dropped = self.drop_owner(plugin);
        if dropped > 0 {
            log::debug!("[{}] dropped {} entries of plugin '{}'", self.name, dropped, plugin);
        }
        Ok(())
    }
}

pub type MenuManager = ReferenceManager<MenuEntry>;
pub type ToolBarManager = ReferenceManager<ToolBar>;
pub type ToolButtonManager = ReferenceManager<ToolButton>;
pub type ActionManager = ReferenceManager<Action>;
pub type ConfigPageManager = ReferenceManager<ConfigPage>;

impl ReferenceManager<MenuEntry> {
    pub fn menus() -> Self {
        Self::new(managers::MENUS)
    }

    /// Registers a menu under `section`, defaulting to the shared section.
    pub fn add_menu(&mut self, owner: Option<&str>, section: Option<&str>, menu: Menu) -> std::result::Result<&Menu, RegistryError> {
        let section = section.unwrap_or(Section::Shared.as_str());
        let name = menu.name.clone();
        self.check_menu_namespace(section, &name)?;
        match owner {
            Some(owner) => self.add_owned(owner, &name, MenuEntry::Menu(menu), Some(section))?,
            None => self.add(&name, MenuEntry::Menu(menu), Some(section))?,
        };
        self.get_menu(Some(section), &name)
    }

    pub fn get_menu(&self, section: Option<&str>, name: &str) -> std::result::Result<&Menu, RegistryError> {
        let section = section.unwrap_or(Section::Shared.as_str());
        match self.get(name, Some(section))? {
            MenuEntry::Menu(menu) => Ok(menu),
            MenuEntry::Item(_) => Err(RegistryError::KeyNotFound {
                registry: self.name.to_string(),
                key: CompositeKey::new(name, Some(section)).to_string(),
            }),
        }
    }

    /// Adds an item to a menu that must already exist in `section`.
    pub fn add_menu_item(
        &mut self,
        owner: Option<&str>,
        section: Option<&str>,
        menu: &str,
        item: MenuItem,
    ) -> std::result::Result<&MenuItem, RegistryError> {
        self.get_menu(section, menu)?;
        let name = item.name.clone();
        match owner {
            Some(owner) => self.add_owned(owner, &name, MenuEntry::Item(item), Some(menu))?,
            None => self.add(&name, MenuEntry::Item(item), Some(menu))?,
        };
        self.get_menu_item(menu, &name)
    }

    pub fn get_menu_item(&self, menu: &str, name: &str) -> std::result::Result<&MenuItem, RegistryError> {
        match self.get(name, Some(menu))? {
            MenuEntry::Item(item) => Ok(item),
            MenuEntry::Menu(_) => Err(RegistryError::KeyNotFound {
                registry: self.name.to_string(),
                key: CompositeKey::new(name, Some(menu)).to_string(),
            }),
        }
    }

    /// Menus are keyed by section and items by menu, so a menu may not share
    /// its name with a section that holds menus.
    fn check_menu_namespace(&self, section: &str, name: &str) -> std::result::Result<(), RegistryError> {
        let clash = self.registry.iter().find_map(|(key, entry)| match entry {
            MenuEntry::Menu(_) if key.parent() == Some(name) => Some(format!("section '{}'", name)),
            MenuEntry::Menu(_) if key.name() == section => Some(format!("menu '{}'", key)),
            _ => None,
        });
        match clash {
            Some(other) => Err(RegistryError::KeyConflict {
                registry: self.name.to_string(),
                key: CompositeKey::new(name, Some(section)).to_string(),
                other,
            }),
            None => Ok(()),
        }
    }

    /// Items of `menu`, sorted by name.
    pub fn menu_items(&self, menu: &str) -> Vec<&MenuItem> {
        let mut items: Vec<&MenuItem> = self
            .registry
            .children(Some(menu))
            .filter_map(|(_, entry)| match entry {
                MenuEntry::Item(item) => Some(item),
                MenuEntry::Menu(_) => None,
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }
}

impl ReferenceManager<ToolBar> {
    pub fn toolbars() -> Self {
        Self::new(managers::TOOLBARS)
    }
}

impl ReferenceManager<ToolButton> {
    pub fn toolbuttons() -> Self {
        Self::new(managers::TOOLBUTTONS)
    }
}

impl ReferenceManager<Action> {
    pub fn actions() -> Self {
        Self::new(managers::ACTIONS)
    }
}

impl ReferenceManager<ConfigPage> {
    pub fn config_pages() -> Self {
        Self::new(managers::CONFIG_PAGES)
    }
}
