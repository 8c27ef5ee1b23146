use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::kernel::constants::{DEFAULT_LOCALE, LOCALES_FOLDER, managers};
use crate::kernel::directory::{Manager, ManagerDirectory};
use crate::kernel::error::Result;
use crate::registry::keyed::KeyedRegistry;
use crate::registry::user_setting;
use crate::storage::error::StorageSystemError;

/// Translated strings, keyed by `(section, key)`.
///
/// Application files under `<app_root>/locales/<lang>/` are loaded with the
/// file stem as section. Plugin files are loaded with the plugin name as
/// section, so a plugin's strings are dropped with it.
#[derive(Debug)]
pub struct LocaleManager {
    app_root: PathBuf,
    language: String,
    strings: KeyedRegistry<String>,
}

impl LocaleManager {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            language: DEFAULT_LOCALE.to_string(),
            strings: KeyedRegistry::new(managers::LOCALES),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Looks up `key` in `section`, returning the key itself when untranslated.
    pub fn translate(&self, section: &str, key: &str) -> String {
        match self.strings.get(key, Some(section)) {
            Ok(text) => text.clone(),
            Err(_) => key.to_string(),
        }
    }

    /// All strings of one section, sorted by key.
    pub fn section(&self, section: &str) -> BTreeMap<String, String> {
        self.strings
            .children(Some(section))
            .map(|(key, text)| (key.to_string(), text.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    fn language_folder(&self, base: &Path) -> PathBuf {
        base.join(LOCALES_FOLDER).join(&self.language)
    }

    /// Reads every `*.json` file of `folder`. With `section` set all files
    /// share it, otherwise each file's stem is its section.
    fn load_folder(&mut self, folder: &Path, section: Option<&str>) -> Result<usize> {
        let files = crate::utils::fs::find_files_with_extension(folder, "json")
            .map_err(|e| StorageSystemError::io(e, "read_dir", folder.to_path_buf()))?;

        let mut loaded = 0;
        for file in files {
            let stem = match file.file_stem() {
                Some(stem) => stem.to_string_lossy().into_owned(),
                None => continue,
            };
            let section = section.unwrap_or(&stem).to_string();

            let content =
                fs::read_to_string(&file).map_err(|e| StorageSystemError::io(e, "read_locale", file.clone()))?;
            let table: BTreeMap<String, String> =
                serde_json::from_str(&content).map_err(|e| StorageSystemError::deserialization("json", e))?;

            for (key, text) in table {
                match self.strings.add(&key, text, Some(&section)) {
                    Ok(_) => loaded += 1,
                    Err(e) => log::warn!("Skipping string from {}: {}", file.display(), e),
                }
            }
        }
        Ok(loaded)
    }
}

impl Manager for LocaleManager {
    fn name(&self) -> &'static str {
        managers::LOCALES
    }

    fn init(&mut self, managers: &ManagerDirectory) -> Result<()> {
        self.language = user_setting(managers, "locale", DEFAULT_LOCALE);
        let folder = self.language_folder(&self.app_root);
        let loaded = self.load_folder(&folder, None)?;
        log::debug!("Loaded {} strings for locale '{}'", loaded, self.language);
        Ok(())
    }

    fn shutdown(&mut self, _managers: &ManagerDirectory) -> Result<()> {
        self.strings.clear();
        Ok(())
    }

    fn init_plugin(&mut self, plugin: &str, folder: &Path) -> Result<()> {
        let folder = self.language_folder(folder);
        self.load_folder(&folder, Some(plugin))?;
        Ok(())
    }

    fn shutdown_plugin(&mut self, plugin: &str) -> Result<()> {
        self.strings.remove_parent(plugin);
        Ok(())
    }
}
