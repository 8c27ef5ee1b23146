#![cfg(test)]

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::{TempDir, tempdir};

use crate::kernel::directory::{Manager, ManagerDirectory};
use crate::kernel::error::Error;
use crate::storage::config::{ConfigFormat, Section};
use crate::storage::error::StorageSystemError;
use crate::storage::store::ConfigStore;

const ROOT: &str = "root";

fn write_config(folder: &Path, content: &str) {
    fs::create_dir_all(folder).unwrap();
    fs::write(folder.join("config.json"), content).unwrap();
}

fn read_config(folder: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(folder.join("config.json")).unwrap()).unwrap()
}

/// A store with `(root, user)` holding `a = 1` on disk, already initialized.
fn store() -> (TempDir, ConfigStore) {
    let dir = tempdir().unwrap();
    write_config(&dir.path().join("user"), r#"{"a": 1}"#);
    let mut store = ConfigStore::new(dir.path().join("app"), dir.path().join("user"), ConfigFormat::Json);
    store.init(&ManagerDirectory::new()).unwrap();
    (dir, store)
}

fn is_protected(err: &Error) -> bool {
    matches!(err, Error::StorageSystem(StorageSystemError::ProtectedKey { .. }))
}

fn is_path_error(err: &Error) -> bool {
    matches!(err, Error::StorageSystem(StorageSystemError::ConfigPath { .. }))
}

#[test]
fn test_init_loads_root_tables() {
    let (_dir, store) = store();
    assert!(store.is_initialized(ROOT, Section::User));
    assert!(store.is_initialized(ROOT, Section::Inner));
    assert_eq!(store.get(ROOT, Section::User, "a", 0, false).unwrap(), 1);
    assert_eq!(store.get(ROOT, Section::User, "missing", 42, false).unwrap(), 42);
}

#[test]
fn test_folder_key_is_protected() {
    let (dir, mut store) = store();
    for section in [Section::User, Section::Inner] {
        assert!(is_protected(&store.get(ROOT, section, "__FOLDER__", String::new(), false).unwrap_err()));
        assert!(is_protected(&store.set(ROOT, section, "__FOLDER__", "x", false).unwrap_err()));
        assert!(is_protected(&store.set(ROOT, section, "__FOLDER__", "x", true).unwrap_err()));
        assert!(is_protected(&store.delete(ROOT, section, "__FOLDER__").unwrap_err()));
    }
    assert_eq!(store.folder(ROOT, Section::User).unwrap(), dir.path().join("user"));
}

#[test]
fn test_folder_key_in_file_is_ignored() {
    let dir = tempdir().unwrap();
    write_config(&dir.path().join("user"), r#"{"__FOLDER__": "/elsewhere", "a": 1}"#);
    let mut store = ConfigStore::new(dir.path().join("app"), dir.path().join("user"), ConfigFormat::Json);
    store.init(&ManagerDirectory::new()).unwrap();

    assert_eq!(store.keys(ROOT, Section::User, false).unwrap(), vec!["a"]);
    assert_eq!(store.folder(ROOT, Section::User).unwrap(), dir.path().join("user"));
}

#[test]
fn test_uninitialized_section_is_a_path_error() {
    let (_dir, mut store) = store();
    assert!(is_path_error(&store.set("about", Section::User, "a", 1, false).unwrap_err()));
    assert!(is_path_error(&store.get("about", Section::User, "a", 0, false).unwrap_err()));
    assert!(is_path_error(&store.save("about", Section::User, false, true).unwrap_err()));
    assert!(is_path_error(&store.restore("about", Section::User, None).unwrap_err()));
}

#[test]
fn test_draft_isolation() {
    let (_dir, mut store) = store();
    store.set(ROOT, Section::User, "a", 2, true).unwrap();

    assert_eq!(store.get(ROOT, Section::User, "a", 0, false).unwrap(), 1);
    assert_eq!(store.get(ROOT, Section::User, "a", 0, true).unwrap(), 2);
    assert!(store.has_draft(ROOT, Section::User));
}

#[test]
fn test_draft_starts_as_snapshot_of_committed() {
    let (_dir, mut store) = store();
    store.set(ROOT, Section::User, "b", "draft", true).unwrap();

    // Committed values are visible through the draft
    assert_eq!(store.get(ROOT, Section::User, "a", 0, true).unwrap(), 1);
    assert_eq!(store.keys(ROOT, Section::User, true).unwrap(), vec!["a", "b"]);
    assert_eq!(store.keys(ROOT, Section::User, false).unwrap(), vec!["a"]);
}

#[test]
fn test_temp_read_without_draft_reads_committed() {
    let (_dir, store) = store();
    assert!(!store.has_draft(ROOT, Section::User));
    assert_eq!(store.get(ROOT, Section::User, "a", 0, true).unwrap(), 1);
}

#[test]
fn test_save_promotes_and_persists_draft() {
    let (dir, mut store) = store();
    store.set(ROOT, Section::User, "a", 2, true).unwrap();

    let path = store.save(ROOT, Section::User, true, false).unwrap();
    assert_eq!(path, dir.path().join("user/config.json"));
    assert_eq!(store.get(ROOT, Section::User, "a", 0, false).unwrap(), 2);
    assert!(!store.has_draft(ROOT, Section::User));
    assert_eq!(read_config(&dir.path().join("user")), json!({"a": 2}));
}

#[test]
fn test_save_without_temp_writes_committed_and_keeps_draft() {
    let (dir, mut store) = store();
    store.set(ROOT, Section::User, "a", 5, false).unwrap();
    store.set(ROOT, Section::User, "a", 9, true).unwrap();

    store.save(ROOT, Section::User, false, false).unwrap();
    assert_eq!(read_config(&dir.path().join("user")), json!({"a": 5}));
    assert_eq!(store.get(ROOT, Section::User, "a", 0, true).unwrap(), 9);
}

#[test]
fn test_restore_single_key() {
    let (_dir, mut store) = store();
    store.set(ROOT, Section::User, "a", 2, true).unwrap();
    store.set(ROOT, Section::User, "b", 3, true).unwrap();

    store.restore(ROOT, Section::User, Some("a")).unwrap();
    assert_eq!(
        store.get(ROOT, Section::User, "a", 0, true).unwrap(),
        store.get(ROOT, Section::User, "a", 0, false).unwrap()
    );
    // Other draft edits survive
    assert_eq!(store.get(ROOT, Section::User, "b", 0, true).unwrap(), 3);

    // A key missing from committed storage disappears from the draft
    store.restore(ROOT, Section::User, Some("b")).unwrap();
    assert_eq!(store.get(ROOT, Section::User, "b", 0, true).unwrap(), 0);
}

#[test]
fn test_restore_whole_draft_touches_no_file() {
    let (dir, mut store) = store();
    store.set(ROOT, Section::User, "a", 2, true).unwrap();
    store.restore(ROOT, Section::User, None).unwrap();

    assert!(!store.has_draft(ROOT, Section::User));
    assert_eq!(store.get(ROOT, Section::User, "a", 0, true).unwrap(), 1);
    assert_eq!(read_config(&dir.path().join("user")), json!({"a": 1}));
}

#[test]
fn test_delete_only_touches_committed() {
    let (_dir, mut store) = store();
    store.set(ROOT, Section::User, "a", 2, true).unwrap();
    store.delete(ROOT, Section::User, "a").unwrap();

    assert_eq!(store.get(ROOT, Section::User, "a", 0, false).unwrap(), 0);
    assert_eq!(store.get(ROOT, Section::User, "a", 0, true).unwrap(), 2);
    assert!(is_path_error(&store.delete(ROOT, Section::User, "a").unwrap_err()));
}

#[test]
fn test_save_requires_file_unless_create() {
    let (dir, mut store) = store();
    store.set(ROOT, Section::Inner, "volume", 7, false).unwrap();

    let err = store.save(ROOT, Section::Inner, false, false).unwrap_err();
    assert!(matches!(err, Error::StorageSystem(StorageSystemError::FileNotFound(_))));

    let path = store.save(ROOT, Section::Inner, false, true).unwrap();
    assert_eq!(path, dir.path().join("app/config.json"));
    assert_eq!(read_config(&dir.path().join("app")), json!({"volume": 7}));
}

#[test]
fn test_commit_and_persist_are_separate_steps() {
    let (dir, mut store) = store();
    store.set(ROOT, Section::User, "a", 3, true).unwrap();

    store.commit(ROOT, Section::User).unwrap();
    assert_eq!(store.get(ROOT, Section::User, "a", 0, false).unwrap(), 3);
    assert_eq!(read_config(&dir.path().join("user")), json!({"a": 1}));

    store.persist(ROOT, Section::User, false).unwrap();
    assert_eq!(read_config(&dir.path().join("user")), json!({"a": 3}));
}

#[test]
fn test_plugin_scope_lifecycle() {
    let (dir, mut store) = store();
    let plugin = dir.path().join("plugins/about");
    write_config(&plugin, r#"{"title": "About"}"#);

    store.init_plugin("about", &plugin).unwrap();
    assert_eq!(store.get("about", Section::Inner, "title", String::new(), false).unwrap(), "About");
    assert!(store.is_initialized("about", Section::User));

    store.set("about", Section::User, "shown", true, false).unwrap();
    store.save("about", Section::User, false, true).unwrap();
    assert_eq!(read_config(&dir.path().join("user/about")), json!({"shown": true}));

    store.shutdown_plugin("about").unwrap();
    assert!(!store.is_initialized("about", Section::Inner));
}

#[test]
fn test_reload_rereads_disk_and_plugins() {
    let (dir, mut store) = store();
    let directory = ManagerDirectory::new();
    let plugin = dir.path().join("plugins/about");
    write_config(&plugin, r#"{"title": "About"}"#);
    store.init_plugin("about", &plugin).unwrap();

    store.set(ROOT, Section::User, "a", 2, true).unwrap();
    write_config(&dir.path().join("user"), r#"{"a": 10}"#);
    store.reload(&directory).unwrap();

    assert_eq!(store.get(ROOT, Section::User, "a", 0, true).unwrap(), 10);
    assert!(!store.has_draft(ROOT, Section::User));
    assert!(store.is_initialized("about", Section::Inner));
}

#[test]
fn test_invalidate_folder_marks_tables_stale() {
    let (dir, mut store) = store();
    assert!(store.stale_sections().is_empty());

    store.invalidate_folder(&dir.path().join("user"));
    assert_eq!(store.stale_sections(), vec![(ROOT.to_string(), Section::User)]);
}

#[test]
fn test_own_save_does_not_mark_stale() {
    let (dir, mut store) = store();
    store.set(ROOT, Section::User, "a", 2, true).unwrap();
    store.save(ROOT, Section::User, true, false).unwrap();
    assert!(store.stale_sections().is_empty());

    store.set(ROOT, Section::User, "a", 3, false).unwrap();
    store.persist(ROOT, Section::User, false).unwrap();
    assert!(store.stale_sections().is_empty());
    assert_eq!(read_config(&dir.path().join("user")), json!({"a": 3}));
}

#[test]
fn test_rereading_a_section_clears_stale_mark() {
    let (dir, mut store) = store();
    let user = dir.path().join("user");
    store.invalidate_folder(&user);
    assert_eq!(store.stale_sections(), vec![(ROOT.to_string(), Section::User)]);

    store.init_section(ROOT, Section::User, &user).unwrap();
    assert!(store.stale_sections().is_empty());
}
