#![cfg(test)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::kernel::bootstrap::{AppPaths, Application};
use crate::kernel::error::Result;
use crate::plugin_system::{Plugin, PluginContext};
use crate::registry::items::{Action, Menu, MenuItem};
use crate::storage::Section;

pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

/// An application over `root/app` and `root/user` with the default managers
/// bootstrapped.
pub fn setup_app(root: &Path) -> Application {
    Application::with_defaults(AppPaths::new(root.join("app"), root.join("user"))).unwrap()
}

pub fn write_file(path: PathBuf, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Owns the `file` menu other plugins add entries to.
pub struct MainMenuPlugin {
    pub journal: Journal,
}

impl Plugin for MainMenuPlugin {
    fn name(&self) -> &'static str {
        "main-menu"
    }

    fn version(&self) -> &str {
        "1.2.0"
    }

    fn init(&mut self, ctx: &PluginContext<'_>) -> Result<()> {
        ctx.add_menu(
            None,
            Menu {
                name: "file".to_string(),
                text: ctx.translate("file"),
                icon: None,
            },
        )?;
        self.journal.borrow_mut().push("main-menu ready to fill".to_string());
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &PluginContext<'_>) -> Result<()> {
        self.journal.borrow_mut().push("main-menu gone".to_string());
        Ok(())
    }
}

/// Adds an `about` entry to the main menu once it is available and counts
/// how many times it was opened in its user config.
pub struct AboutPlugin {
    pub journal: Journal,
}

impl Plugin for AboutPlugin {
    fn name(&self) -> &'static str {
        "about"
    }

    fn requires(&self) -> Vec<&'static str> {
        vec!["main-menu"]
    }

    fn init(&mut self, ctx: &PluginContext<'_>) -> Result<()> {
        ctx.add_action(Action {
            name: "show-about".to_string(),
            text: "About".to_string(),
            shortcut: None,
        })?;

        let opened: u32 = ctx.get_config(Section::User, "opened", 0, false)?;
        ctx.set_config(Section::User, "opened", opened + 1, true)?;
        ctx.save_config(Section::User, true, true)?;

        let journal = self.journal.clone();
        ctx.on_plugin_available("main-menu", move |ctx| {
            ctx.add_menu_item(
                None,
                "file",
                MenuItem {
                    name: "about".to_string(),
                    text: "About".to_string(),
                    icon: None,
                    action: Some("show-about".to_string()),
                    before: None,
                },
            )?;
            journal.borrow_mut().push("about added its entry".to_string());
            Ok(())
        })?;

        let journal = self.journal.clone();
        ctx.on_teardown("main-menu", move |_| {
            journal.borrow_mut().push("about saw main-menu leave".to_string());
            Ok(())
        })?;
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &PluginContext<'_>) -> Result<()> {
        self.journal.borrow_mut().push("about gone".to_string());
        Ok(())
    }
}
