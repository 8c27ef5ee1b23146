use std::path::{Path, PathBuf};

use crate::kernel::constants::{ASSETS_FOLDER, DEFAULT_THEME, managers};
use crate::kernel::directory::{Manager, ManagerDirectory};
use crate::kernel::error::Result;
use crate::registry::error::RegistryError;
use crate::registry::keyed::KeyedRegistry;
use crate::registry::user_setting;
use crate::storage::error::StorageSystemError;
use crate::utils::fs::{find_files, relative_name};

/// Indexes asset files of the active theme by name.
///
/// Names are paths relative to the assets folder with `/` separators, e.g.
/// `icons/open.svg`. Application assets are registered globally and plugin
/// assets under the plugin name. Only paths are tracked; decoding belongs to
/// the UI layer.
#[derive(Debug)]
pub struct ThemeManager {
    app_root: PathBuf,
    theme: String,
    assets: KeyedRegistry<PathBuf>,
}

impl ThemeManager {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            theme: DEFAULT_THEME.to_string(),
            assets: KeyedRegistry::new(managers::THEMES),
        }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn theme_folder(&self) -> PathBuf {
        self.app_root.join(ASSETS_FOLDER).join(&self.theme)
    }

    /// Resolves an asset name to its file path.
    pub fn get_asset(&self, name: &str, plugin: Option<&str>) -> std::result::Result<&Path, RegistryError> {
        self.assets.get(name, plugin).map(PathBuf::as_path)
    }

    /// Asset names registered for `plugin` (or globally with `None`), sorted.
    pub fn asset_names(&self, plugin: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = self.assets.children(plugin).map(|(name, _)| name.to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn index(&mut self, folder: &Path, plugin: Option<&str>) -> Result<usize> {
        let files = find_files(folder, &|_: &Path| true)
            .map_err(|e| StorageSystemError::io(e, "read_dir", folder.to_path_buf()))?;

        let mut indexed = 0;
        for file in files {
            let Some(name) = relative_name(folder, &file) else {
                continue;
            };
            match self.assets.add(&name, file, plugin) {
                Ok(_) => indexed += 1,
                Err(e) => log::warn!("Skipping asset: {}", e),
            }
        }
        Ok(indexed)
    }
}

impl Manager for ThemeManager {
    fn name(&self) -> &'static str {
        managers::THEMES
    }

    fn init(&mut self, managers: &ManagerDirectory) -> Result<()> {
        self.theme = user_setting(managers, "theme", DEFAULT_THEME);
        let folder = self.theme_folder();
        let indexed = self.index(&folder, None)?;
        log::debug!("Indexed {} assets for theme '{}'", indexed, self.theme);
        Ok(())
    }

    fn shutdown(&mut self, _managers: &ManagerDirectory) -> Result<()> {
        self.assets.clear();
        Ok(())
    }

    fn init_plugin(&mut self, plugin: &str, folder: &Path) -> Result<()> {
        self.index(&folder.join(ASSETS_FOLDER), Some(plugin))?;
        Ok(())
    }

    fn shutdown_plugin(&mut self, plugin: &str) -> Result<()> {
        self.assets.remove_parent(plugin);
        Ok(())
    }
}
