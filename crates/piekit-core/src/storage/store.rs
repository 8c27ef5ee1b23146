use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::kernel::bootstrap::AppPaths;
use crate::kernel::constants::{FOLDER_KEY, ROOT_SCOPE, managers};
use crate::kernel::directory::{Manager, ManagerDirectory};
use crate::kernel::error::Result;
use crate::storage::config::{ConfigData, ConfigFormat, ConfigPath, Section};
use crate::storage::error::StorageSystemError;
use crate::storage::observer::FolderObserver;

type TableKey = (String, Section);

/// One `(scope, section)` table together with the folder backing it.
#[derive(Debug, Clone, PartialEq)]
struct ConfigTable {
    folder: PathBuf,
    data: ConfigData,
}

/// Scoped, sectioned configuration with a draft overlay.
///
/// Committed tables hold the values everyone reads. A draft table is created
/// the first time a `temp` write touches a `(scope, section)`, as a copy of
/// the committed table at that moment; `temp` reads prefer it. Drafts are
/// promoted by [`save`](Self::save) with `temp = true` (or by
/// [`commit`](Self::commit)) and discarded key by key with
/// [`restore`](Self::restore).
///
/// Every table remembers its backing folder under the reserved
/// `__FOLDER__` key, which can never be read, written, or deleted through
/// this API and is never written to disk.
pub struct ConfigStore {
    app_folder: PathBuf,
    user_folder: PathBuf,
    format: ConfigFormat,
    committed: HashMap<TableKey, ConfigTable>,
    draft: HashMap<TableKey, ConfigTable>,
    plugin_folders: BTreeMap<String, PathBuf>,
    observer: FolderObserver,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tables: Vec<String> = self
            .committed
            .keys()
            .map(|(scope, section)| format!("{}.{}", scope, section))
            .collect();
        tables.sort();
        f.debug_struct("ConfigStore")
            .field("format", &self.format)
            .field("tables", &tables)
            .field("drafts", &self.draft.len())
            .finish()
    }
}

impl ConfigStore {
    /// `app_folder` holds the shipped root config, `user_folder` the user's.
    /// Per-plugin user config lives in `user_folder/<plugin>`.
    pub fn new(app_folder: PathBuf, user_folder: PathBuf, format: ConfigFormat) -> Self {
        Self {
            app_folder,
            user_folder,
            format,
            committed: HashMap::new(),
            draft: HashMap::new(),
            plugin_folders: BTreeMap::new(),
            observer: FolderObserver::new(),
        }
    }

    pub fn from_paths(paths: &AppPaths) -> Self {
        Self::new(paths.app_configs(), paths.user_configs(), ConfigFormat::default())
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    /// Reads one table from `folder`, replacing whatever was loaded before.
    /// A missing folder or file yields an empty table.
    pub fn init_section(&mut self, scope: &str, section: Section, folder: &Path) -> Result<()> {
        let file = folder.join(self.format.file_name());
        let mut data = if file.is_file() {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| StorageSystemError::io(e, "read_config", file.clone()))?;
            ConfigData::deserialize(&content, self.format)?
        } else {
            ConfigData::new()
        };
        data.remove(FOLDER_KEY);

        if folder.is_dir() {
            self.observer.watch(folder, scope, section);
        }
        self.observer.remember(&file);
        self.observer.unmark(scope, section);
        log::debug!("Loaded config {}.{} ({} keys) from {}", scope, section, data.len(), folder.display());
        self.committed.insert(
            (scope.to_string(), section),
            ConfigTable { folder: folder.to_path_buf(), data },
        );
        self.draft.remove(&(scope.to_string(), section));
        Ok(())
    }

    pub fn is_initialized(&self, scope: &str, section: Section) -> bool {
        self.committed.contains_key(&(scope.to_string(), section))
    }

    pub fn has_draft(&self, scope: &str, section: Section) -> bool {
        self.draft.contains_key(&(scope.to_string(), section))
    }

    /// Backing folder of an initialized table.
    pub fn folder(&self, scope: &str, section: Section) -> Result<&Path> {
        Ok(&self.table(scope, section)?.folder)
    }

    /// Initialized `(scope, section)` pairs, sorted.
    pub fn sections(&self) -> Vec<(String, Section)> {
        let mut keys: Vec<TableKey> = self.committed.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Keys of a table, sorted. Reads the draft when `temp` and one exists.
    pub fn keys(&self, scope: &str, section: Section, temp: bool) -> Result<Vec<String>> {
        let committed = self.table(scope, section)?;
        let table = match (temp, self.draft.get(&(scope.to_string(), section))) {
            (true, Some(draft)) => draft,
            _ => committed,
        };
        Ok(table.data.keys())
    }

    /// Reads `key`, returning `default` when it is absent.
    ///
    /// With `temp`, the draft value wins when present and the committed value
    /// is the fallback.
    pub fn get<T: DeserializeOwned>(
        &self,
        scope: &str,
        section: Section,
        key: &str,
        default: T,
        temp: bool,
    ) -> Result<T> {
        match self.get_value(scope, section, key, temp)? {
            Some(value) => serde_json::from_value(value.clone()).map_err(|source| {
                StorageSystemError::ValueType {
                    path: ConfigPath::new(scope, section, Some(key)).to_string(),
                    source,
                }
                .into()
            }),
            None => Ok(default),
        }
    }

    /// Raw value lookup; `None` when the key is absent.
    pub fn get_value(&self, scope: &str, section: Section, key: &str, temp: bool) -> Result<Option<&Value>> {
        check_key(key)?;
        let committed = self.table(scope, section)?;
        if temp {
            if let Some(value) = self
                .draft
                .get(&(scope.to_string(), section))
                .and_then(|draft| draft.data.get_value(key))
            {
                return Ok(Some(value));
            }
        }
        Ok(committed.data.get_value(key))
    }

    /// Writes `key`. A `temp` write goes to the draft, snapshotting the
    /// committed table first if this `(scope, section)` has no draft yet.
    pub fn set<T: Serialize>(&mut self, scope: &str, section: Section, key: &str, value: T, temp: bool) -> Result<()> {
        check_key(key)?;
        let value = serde_json::to_value(value)
            .map_err(|e| StorageSystemError::serialization("json", e))?;
        let table_key = (scope.to_string(), section);
        let committed = self
            .committed
            .get_mut(&table_key)
            .ok_or_else(|| path_error(scope, section, None))?;

        if temp {
            let draft = self
                .draft
                .entry(table_key)
                .or_insert_with(|| committed.clone());
            draft.data.insert(key, value);
        } else {
            committed.data.insert(key, value);
        }
        log::debug!("Set {}.{}.{} (temp: {})", scope, section, key, temp);
        Ok(())
    }

    /// Removes `key` from committed storage. The draft is left alone.
    pub fn delete(&mut self, scope: &str, section: Section, key: &str) -> Result<()> {
        check_key(key)?;
        let table = self
            .committed
            .get_mut(&(scope.to_string(), section))
            .ok_or_else(|| path_error(scope, section, None))?;
        table
            .data
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| path_error(scope, section, Some(key)).into())
    }

    /// Discards uncommitted edits.
    ///
    /// With a key, the draft value is overwritten with the committed one (or
    /// dropped if the committed table lacks it). Without a key, the whole
    /// draft for this `(scope, section)` is discarded. Nothing touches disk.
    pub fn restore(&mut self, scope: &str, section: Section, key: Option<&str>) -> Result<()> {
        if let Some(key) = key {
            check_key(key)?;
        }
        let table_key = (scope.to_string(), section);
        let committed = self
            .committed
            .get(&table_key)
            .ok_or_else(|| path_error(scope, section, None))?;

        log::debug!("Restoring {}", ConfigPath::new(scope, section, key));
        match key {
            None => {
                self.draft.remove(&table_key);
            }
            Some(key) => {
                if let Some(draft) = self.draft.get_mut(&table_key) {
                    match committed.data.get_value(key) {
                        Some(value) => draft.data.insert(key, value.clone()),
                        None => draft.data.remove(key),
                    };
                }
            }
        }
        Ok(())
    }

    /// Promotes the draft (if any) to committed storage without touching disk.
    pub fn commit(&mut self, scope: &str, section: Section) -> Result<()> {
        let table_key = (scope.to_string(), section);
        if !self.committed.contains_key(&table_key) {
            return Err(path_error(scope, section, None).into());
        }
        if let Some(draft) = self.draft.remove(&table_key) {
            self.committed.insert(table_key, draft);
        }
        Ok(())
    }

    /// Writes the committed table to its backing file.
    pub fn persist(&mut self, scope: &str, section: Section, create: bool) -> Result<PathBuf> {
        let path = self.write_table(self.table(scope, section)?, create)?;
        self.settle(scope, section, &path);
        Ok(path)
    }

    /// Persists a table and makes it the committed baseline.
    ///
    /// With `temp` and an existing draft, the draft is written and then
    /// promoted; otherwise the committed table is written. The backing file
    /// must exist unless `create` is set. Returns the file path.
    pub fn save(&mut self, scope: &str, section: Section, temp: bool, create: bool) -> Result<PathBuf> {
        let table_key = (scope.to_string(), section);
        let committed = self.table(scope, section)?;
        let resolved = match (temp, self.draft.get(&table_key)) {
            (true, Some(draft)) => draft,
            _ => committed,
        };
        let path = self.write_table(resolved, create)?;
        self.settle(scope, section, &path);

        if temp {
            self.commit(scope, section)?;
        }
        log::info!("Saved {}.{} to {}", scope, section, path.display());
        Ok(path)
    }

    /// Tables whose folders changed on disk since they were read.
    pub fn stale_sections(&mut self) -> Vec<(String, Section)> {
        self.observer.poll();
        self.observer
            .stale()
            .map(|(scope, section)| (scope.to_string(), section))
            .collect()
    }

    /// Marks the tables backed by `folder` as changed.
    pub fn invalidate_folder(&mut self, folder: &Path) {
        self.observer.mark_folder(folder);
    }

    /// Forgets the events caused by our own write of `file`.
    fn settle(&mut self, scope: &str, section: Section, file: &Path) {
        self.observer.remember(file);
        self.observer.poll();
        self.observer.unmark(scope, section);
    }

        fn table(&self, scope: &str, section: Section) -> Result<&ConfigTable> {
        self.committed
            .get(&(scope.to_string(), section))
            .ok_or_else(|| path_error(scope, section, None).into())
    }

    fn write_table(&self, table: &ConfigTable, create: bool) -> Result<PathBuf> {
        let path = table.folder.join(self.format.file_name());
        if !path.exists() {
            if !create {
                return Err(StorageSystemError::FileNotFound(path).into());
            }
            std::fs::create_dir_all(&table.folder)
                .map_err(|e| StorageSystemError::io(e, "create_dir_all", table.folder.clone()))?;
        }

        let content = table.data.serialize(self.format)?;
        let mut staged = tempfile::NamedTempFile::new_in(&table.folder)
            .map_err(|e| StorageSystemError::io(e, "create_temp", table.folder.clone()))?;
        staged
            .write_all(content.as_bytes())
            .map_err(|e| StorageSystemError::io(e, "write_config", path.clone()))?;
        staged
            .persist(&path)
            .map_err(|e| StorageSystemError::io(e.error, "persist_config", path.clone()))?;
        Ok(path)
    }

    fn load_root(&mut self) -> Result<()> {
        let app_folder = self.app_folder.clone();
        let user_folder = self.user_folder.clone();
        self.init_section(ROOT_SCOPE, Section::Inner, &app_folder)?;
        self.init_section(ROOT_SCOPE, Section::User, &user_folder)
    }

    fn load_plugin(&mut self, plugin: &str, folder: &Path) -> Result<()> {
        let user_folder = self.user_folder.join(plugin);
        self.init_section(plugin, Section::Inner, folder)?;
        self.init_section(plugin, Section::User, &user_folder)
    }
}

impl Manager for ConfigStore {
    fn name(&self) -> &'static str {
        managers::CONFIGS
    }

    fn init(&mut self, _managers: &ManagerDirectory) -> Result<()> {
        self.load_root()?;
        let plugins: Vec<(String, PathBuf)> = self
            .plugin_folders
            .iter()
            .map(|(name, folder)| (name.clone(), folder.clone()))
            .collect();
        for (plugin, folder) in plugins {
            self.load_plugin(&plugin, &folder)?;
        }
        Ok(())
    }

    /// Drops every table and draft. Plugin folders are remembered so a
    /// following `init` (a `reload`) reads them again.
    fn shutdown(&mut self, _managers: &ManagerDirectory) -> Result<()> {
        self.committed.clear();
        self.draft.clear();
        self.observer.clear();
        Ok(())
    }

    fn init_plugin(&mut self, plugin: &str, folder: &Path) -> Result<()> {
        self.plugin_folders.insert(plugin.to_string(), folder.to_path_buf());
        self.load_plugin(plugin, folder)
    }

    fn shutdown_plugin(&mut self, plugin: &str) -> Result<()> {
        self.plugin_folders.remove(plugin);
        self.committed.retain(|(scope, _), _| scope != plugin);
        self.draft.retain(|(scope, _), _| scope != plugin);
        self.observer.unwatch_scope(plugin);
        Ok(())
    }
}

fn check_key(key: &str) -> std::result::Result<(), StorageSystemError> {
    if key == FOLDER_KEY {
        return Err(StorageSystemError::ProtectedKey { key: key.to_string() });
    }
    Ok(())
}

fn path_error(scope: &str, section: Section, key: Option<&str>) -> StorageSystemError {
    StorageSystemError::ConfigPath {
        path: ConfigPath::new(scope, section, key).to_string(),
    }
}
