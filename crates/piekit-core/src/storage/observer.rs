use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::storage::config::Section;

type TableKey = (String, Section);

/// Watches configuration folders and records which `(scope, section)` tables
/// went stale on disk.
///
/// Nothing is reloaded automatically; the store only reports staleness and a
/// caller decides when to `reload()`. File system events arrive on the
/// watcher's own thread and are queued on a channel that the owning thread
/// drains in [`poll`](Self::poll).
///
/// Files the store itself read or wrote are stamped with their modification
/// time; events that leave a stamped file unchanged are not changes.
pub struct FolderObserver {
    folders: HashMap<PathBuf, Vec<TableKey>>,
    stale: BTreeSet<TableKey>,
    stamps: HashMap<PathBuf, Option<SystemTime>>,
    #[cfg(feature = "watch")]
    backend: Option<watch::Backend>,
}

impl fmt::Debug for FolderObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderObserver")
            .field("folders", &self.folders.keys().collect::<Vec<_>>())
            .field("stale", &self.stale)
            .finish()
    }
}

impl FolderObserver {
    pub fn new() -> Self {
        Self {
            folders: HashMap::new(),
            stale: BTreeSet::new(),
            stamps: HashMap::new(),
            #[cfg(feature = "watch")]
            backend: None,
        }
    }

    /// Starts watching `folder` on behalf of `(scope, section)`.
    pub fn watch(&mut self, folder: &Path, scope: &str, section: Section) {
        let owners = self.folders.entry(folder.to_path_buf()).or_default();
        let key = (scope.to_string(), section);
        if owners.contains(&key) {
            return;
        }
        owners.push(key);

        #[cfg(feature = "watch")]
        {
            if owners.len() == 1 {
                if let Some(backend) = self.backend_mut() {
                    backend.watch(folder);
                }
            }
        }
    }

    /// Stops watching every folder owned by `scope`.
    pub fn unwatch_scope(&mut self, scope: &str) {
        let mut released = Vec::new();
        self.folders.retain(|folder, owners| {
            owners.retain(|(owner, _)| owner != scope);
            if owners.is_empty() {
                released.push(folder.clone());
                false
            } else {
                true
            }
        });
        self.stale.retain(|(owner, _)| owner != scope);
        self.stamps.retain(|file, _| file.parent().is_some_and(|parent| self.folders.contains_key(parent)));

        #[cfg(feature = "watch")]
        {
            if let Some(backend) = self.backend.as_mut() {
                for folder in &released {
                    backend.unwatch(folder);
                }
            }
        }
    }

    /// Drops every watch and every stale mark.
    pub fn clear(&mut self) {
        self.folders.clear();
        self.stale.clear();
        self.stamps.clear();
        #[cfg(feature = "watch")]
        {
            self.backend = None;
        }
    }

    /// Marks the tables owned by `folder` as stale.
    pub fn mark_folder(&mut self, folder: &Path) {
        if let Some(owners) = self.folders.get(folder) {
            for key in owners {
                log::debug!("Config folder changed: {} ({}.{})", folder.display(), key.0, key.1);
                self.stale.insert(key.clone());
            }
        }
    }

    /// Drains pending file system events into the stale set.
    pub fn poll(&mut self) {
        #[cfg(feature = "watch")]
        {
            let changed = match self.backend.as_ref() {
                Some(backend) => backend.drain(),
                None => Vec::new(),
            };
            for path in changed {
                self.note_changed(&path);
            }
        }
    }

    /// Records the current modification time of `file` as known content.
    pub fn remember(&mut self, file: &Path) {
        self.stamps.insert(file.to_path_buf(), modified(file));
    }

    /// Clears the stale mark of one table.
    pub fn unmark(&mut self, scope: &str, section: Section) {
        self.stale.remove(&(scope.to_string(), section));
    }

    /// Handles one changed path reported by the file system.
    ///
    /// A stamped file only counts when its modification time moved. Other
    /// paths count unless they are already gone again, like the staging
    /// file of an atomic write.
    #[cfg_attr(not(feature = "watch"), allow(dead_code))]
    pub(crate) fn note_changed(&mut self, path: &Path) {
        let folder = if self.folders.contains_key(path) {
            path.to_path_buf()
        } else {
            match path.parent() {
                Some(parent) => parent.to_path_buf(),
                None => return,
            }
        };
        let changed = match self.stamps.get(path) {
            Some(stamp) => modified(path) != *stamp,
            None => path.exists(),
        };
        if changed {
            self.mark_folder(&folder);
        }
    }

    pub fn is_stale(&self, scope: &str, section: Section) -> bool {
        self.stale.contains(&(scope.to_string(), section))
    }

    /// Stale tables in sorted order.
    pub fn stale(&self) -> impl Iterator<Item = (&str, Section)> {
        self.stale.iter().map(|(scope, section)| (scope.as_str(), *section))
    }

    pub fn watched_folders(&self) -> usize {
        self.folders.len()
    }

    #[cfg(feature = "watch")]
    fn backend_mut(&mut self) -> Option<&mut watch::Backend> {
        if self.backend.is_none() {
            self.backend = watch::Backend::new();
        }
        self.backend.as_mut()
    }
}

fn modified(file: &Path) -> Option<SystemTime> {
    std::fs::metadata(file).and_then(|meta| meta.modified()).ok()
}

impl Default for FolderObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "watch")]
mod watch {
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::{self, Receiver};

    use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

    pub(super) struct Backend {
        watcher: RecommendedWatcher,
        events: Receiver<notify::Result<Event>>,
    }

    impl Backend {
        pub(super) fn new() -> Option<Self> {
            let (sender, events) = mpsc::channel();
            match notify::recommended_watcher(sender) {
                Ok(watcher) => Some(Self { watcher, events }),
                Err(e) => {
                    log::warn!("Config folder watching disabled: {}", e);
                    None
                }
            }
        }

        pub(super) fn watch(&mut self, folder: &Path) {
            if let Err(e) = self.watcher.watch(folder, RecursiveMode::NonRecursive) {
                log::warn!("Failed to watch config folder {}: {}", folder.display(), e);
            }
        }

        pub(super) fn unwatch(&mut self, folder: &Path) {
            // The folder may already be gone; nothing to do then.
            let _ = self.watcher.unwatch(folder);
        }

        /// Paths touched since the last drain.
        pub(super) fn drain(&self) -> Vec<PathBuf> {
            let mut paths = Vec::new();
            for event in self.events.try_iter() {
                match event {
                    Ok(event) if !event.kind.is_access() => paths.extend(event.paths),
                    Ok(_) => {}
                    Err(e) => log::warn!("Config folder watch error: {}", e),
                }
            }
            paths
        }
    }
}
