use std::collections::HashMap;
use std::fmt;

use crate::registry::error::RegistryError;

/// Two-level key addressing an entry: an optional parent plus a name.
///
/// An empty parent is the same as no parent (a global key). The dotted form
/// `parent.name` is only produced for display and is never parsed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    parent: Option<String>,
    name: String,
}

impl CompositeKey {
    pub fn new(name: &str, parent: Option<&str>) -> Self {
        Self {
            parent: parent.filter(|p| !p.is_empty()).map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn global(name: &str) -> Self {
        Self::new(name, None)
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}.{}", parent, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Generic container mapping a [`CompositeKey`] to an owned value.
///
/// Single lookups are strict (`get` and `delete` fail on a missing key) while
/// bulk lookups through [`get_many`](Self::get_many) are best-effort.
/// Entries sharing a parent have no defined order.
pub struct KeyedRegistry<T> {
    name: &'static str,
    entries: HashMap<CompositeKey, T>,
}

impl<T> fmt::Debug for KeyedRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.entries.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("KeyedRegistry")
            .field("name", &self.name)
            .field("keys", &keys)
            .finish()
    }
}

impl<T> KeyedRegistry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stores `value` under `parent.name` and hands it back for chaining.
    pub fn add(&mut self, name: &str, value: T, parent: Option<&str>) -> Result<&mut T, RegistryError> {
        let key = CompositeKey::new(name, parent);
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateKey {
                registry: self.name.to_string(),
                key: key.to_string(),
            });
        }
        log::debug!("[{}] add {}", self.name, key);
        Ok(self.entries.entry(key).or_insert(value))
    }

    pub fn get(&self, name: &str, parent: Option<&str>) -> Result<&T, RegistryError> {
        let key = CompositeKey::new(name, parent);
        self.entries.get(&key).ok_or_else(|| self.not_found(&key))
    }

    pub fn get_mut(&mut self, name: &str, parent: Option<&str>) -> Result<&mut T, RegistryError> {
        let key = CompositeKey::new(name, parent);
        let registry = self.name;
        self.entries
            .get_mut(&key)
            .ok_or_else(|| RegistryError::KeyNotFound {
                registry: registry.to_string(),
                key: key.to_string(),
            })
    }

    /// Values for `names` in request order; names that are absent are skipped.
    pub fn get_many(&self, names: &[&str], parent: Option<&str>) -> Vec<&T> {
        names
            .iter()
            .filter_map(|name| self.entries.get(&CompositeKey::new(name, parent)))
            .collect()
    }

    /// Removes and returns the entry.
    pub fn delete(&mut self, name: &str, parent: Option<&str>) -> Result<T, RegistryError> {
        let key = CompositeKey::new(name, parent);
        match self.entries.remove(&key) {
            Some(value) => {
                log::debug!("[{}] delete {}", self.name, key);
                Ok(value)
            }
            None => Err(self.not_found(&key)),
        }
    }

    pub fn contains(&self, name: &str, parent: Option<&str>) -> bool {
        self.entries.contains_key(&CompositeKey::new(name, parent))
    }

    /// Entries directly under `parent` (`None` for global entries).
    pub fn children<'a>(&'a self, parent: Option<&str>) -> impl Iterator<Item = (&'a str, &'a T)> + 'a {
        let parent = parent.filter(|p| !p.is_empty()).map(str::to_string);
        self.entries
            .iter()
            .filter(move |(key, _)| key.parent() == parent.as_deref())
            .map(|(key, value)| (key.name(), value))
    }

    /// Drops every entry under `parent`. Returns how many were removed.
    pub fn remove_parent(&mut self, parent: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.parent() != Some(parent));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompositeKey, &T)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the container; the registry itself stays usable.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn not_found(&self, key: &CompositeKey) -> RegistryError {
        RegistryError::KeyNotFound {
            registry: self.name.to_string(),
            key: key.to_string(),
        }
    }
}
