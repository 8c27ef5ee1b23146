#![cfg(test)]

use tempfile::tempdir;

use super::common::{AboutPlugin, Journal, MainMenuPlugin, entries, setup_app, write_file};
use crate::kernel::constants::managers;
use crate::plugin_system::{PluginEvent, PluginState};
use crate::registry::reference::{ActionManager, MenuManager};

#[test]
fn test_full_lifecycle_in_dependency_order() {
    let root = tempdir().unwrap();
    let mut app = setup_app(root.path());
    let journal = Journal::default();

    // Registered before the plugin it needs
    app.register_plugin(AboutPlugin { journal: journal.clone() }).unwrap();
    app.register_plugin(MainMenuPlugin { journal: journal.clone() }).unwrap();
    app.start().unwrap();

    assert_eq!(
        entries(&journal),
        vec!["main-menu ready to fill", "about added its entry"]
    );
    let states = app
        .plugins(|plugins| Ok((plugins.state("main-menu"), plugins.state("about"))))
        .unwrap();
    assert_eq!(states, (Some(PluginState::Ready), Some(PluginState::Ready)));

    app.managers()
        .with::<MenuManager, _>(managers::MENUS, |menus| {
            let items = menus.menu_items("file");
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].action.as_deref(), Some("show-about"));
            assert_eq!(menus.owner("about", Some("file")), Some("about"));
            assert_eq!(menus.owner("file", Some("shared")), Some("main-menu"));
            Ok(())
        })
        .unwrap();

    journal.borrow_mut().clear();
    let report = app.shutdown().unwrap();
    assert!(report.is_clean(), "unexpected report: {report:?}");
    assert_eq!(
        entries(&journal),
        vec!["about saw main-menu leave", "about gone", "main-menu gone"]
    );
}

#[test]
fn test_plugin_contributions_removed_on_teardown() {
    let root = tempdir().unwrap();
    let app = setup_app(root.path());
    let journal = Journal::default();

    app.register_plugin(MainMenuPlugin { journal: journal.clone() }).unwrap();
    app.register_plugin(AboutPlugin { journal: journal.clone() }).unwrap();
    app.start().unwrap();
    app.managers().shutdown(managers::PLUGINS).unwrap();

    app.managers()
        .with::<MenuManager, _>(managers::MENUS, |menus| {
            assert!(menus.registry().is_empty());
            Ok(())
        })
        .unwrap();
    app.managers()
        .with::<ActionManager, _>(managers::ACTIONS, |actions| {
            assert!(!actions.contains("show-about", Some("about")));
            Ok(())
        })
        .unwrap();
    let state = app.plugins(|plugins| Ok(plugins.state("about"))).unwrap();
    assert_eq!(state, Some(PluginState::ShutDown));
}

#[test]
fn test_missing_dependency_leaves_plugin_waiting() {
    let root = tempdir().unwrap();
    let mut app = setup_app(root.path());
    let journal = Journal::default();

    app.register_plugin(AboutPlugin { journal: journal.clone() }).unwrap();
    app.start().unwrap();

    assert!(entries(&journal).is_empty());
    let state = app.plugins(|plugins| Ok(plugins.state("about"))).unwrap();
    assert_eq!(state, Some(PluginState::Initializing));

    let report = app.shutdown().unwrap();
    assert_eq!(report.never_ready, vec!["about"]);
    assert_eq!(report.missing_dependencies.len(), 1);
    assert_eq!(report.missing_dependencies[0].requires, "main-menu");
    let events: Vec<PluginEvent> = report.unfired.iter().map(|p| p.event).collect();
    assert_eq!(events, vec![PluginEvent::Available, PluginEvent::Teardown]);
}

#[test]
fn test_late_registration_completes_waiting_plugin() {
    let root = tempdir().unwrap();
    let app = setup_app(root.path());
    let journal = Journal::default();

    app.register_plugin(AboutPlugin { journal: journal.clone() }).unwrap();
    app.start().unwrap();
    app.register_plugin(MainMenuPlugin { journal: journal.clone() }).unwrap();

    assert_eq!(
        entries(&journal),
        vec!["main-menu ready to fill", "about added its entry"]
    );
    let state = app.plugins(|plugins| Ok(plugins.state("about"))).unwrap();
    assert_eq!(state, Some(PluginState::Ready));
}

#[test]
fn test_plugin_locale_used_for_menu_text() {
    let root = tempdir().unwrap();
    write_file(
        root.path().join("user/configs/config.json"),
        r#"{"locale": "fr"}"#,
    );
    write_file(
        root.path().join("app/plugins/main-menu/locales/fr/menus.json"),
        r#"{"file": "Fichier"}"#,
    );
    let app = setup_app(root.path());
    let journal = Journal::default();

    app.register_plugin(MainMenuPlugin { journal }).unwrap();
    app.start().unwrap();

    let language = app.locales(|locales| Ok(locales.language().to_string())).unwrap();
    assert_eq!(language, "fr");
    app.managers()
        .with::<MenuManager, _>(managers::MENUS, |menus| {
            assert_eq!(menus.get_menu(None, "file")?.text, "Fichier");
            Ok(())
        })
        .unwrap();
}
