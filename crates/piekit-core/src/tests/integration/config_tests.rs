#![cfg(test)]

use std::fs;

use tempfile::tempdir;

use super::common::{AboutPlugin, Journal, MainMenuPlugin, setup_app, write_file};
use crate::kernel::constants::managers;
use crate::storage::Section;

fn opened_count(root: &std::path::Path) -> u32 {
    let app = setup_app(root);
    let journal = Journal::default();
    app.register_plugin(MainMenuPlugin { journal: journal.clone() }).unwrap();
    app.register_plugin(AboutPlugin { journal }).unwrap();
    app.start().unwrap();
    app.config(|config| config.get("about", Section::User, "opened", 0, false))
        .unwrap()
}

#[test]
fn test_plugin_settings_survive_restart() {
    let root = tempdir().unwrap();

    assert_eq!(opened_count(root.path()), 1);
    assert_eq!(opened_count(root.path()), 2);

    let saved = fs::read_to_string(root.path().join("user/configs/about/config.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(value["opened"].as_u64(), Some(2));
}

#[test]
fn test_root_draft_edit_and_restore() {
    let root = tempdir().unwrap();
    write_file(root.path().join("user/configs/config.json"), r#"{"theme": "dark"}"#);
    let app = setup_app(root.path());

    app.config_mut(|config| config.set("root", Section::User, "theme", "light", true))
        .unwrap();
    let (committed, draft): (String, String) = app
        .config(|config| {
            Ok((
                config.get("root", Section::User, "theme", String::new(), false)?,
                config.get("root", Section::User, "theme", String::new(), true)?,
            ))
        })
        .unwrap();
    assert_eq!((committed.as_str(), draft.as_str()), ("dark", "light"));

    app.config_mut(|config| config.restore("root", Section::User, None))
        .unwrap();
    let has_draft = app.config(|config| Ok(config.has_draft("root", Section::User))).unwrap();
    assert!(!has_draft);

    let on_disk = fs::read_to_string(root.path().join("user/configs/config.json")).unwrap();
    assert!(on_disk.contains("dark"));
}

#[test]
fn test_reload_picks_up_external_edits() {
    let root = tempdir().unwrap();
    let config_file = root.path().join("app/configs/config.json");
    write_file(config_file.clone(), r#"{"title": "Piekit"}"#);
    let app = setup_app(root.path());

    write_file(config_file, r#"{"title": "Piekit Studio"}"#);
    let before: String = app
        .config(|config| config.get("root", Section::Inner, "title", String::new(), false))
        .unwrap();
    assert_eq!(before, "Piekit");

    app.managers().reload(managers::CONFIGS).unwrap();
    let after: String = app
        .config(|config| config.get("root", Section::Inner, "title", String::new(), false))
        .unwrap();
    assert_eq!(after, "Piekit Studio");
}
