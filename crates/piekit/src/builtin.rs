//! Plugins compiled into the `piekit` binary.
use piekit_core::kernel::bootstrap::Application;
use piekit_core::kernel::error::Result;
use piekit_core::plugin_system::{Plugin, PluginContext};
use piekit_core::registry::{Action, Menu, MenuItem};
use piekit_core::storage::Section;

use core_logging::LoggingPlugin;

pub const MAIN_MENU: &str = "main-menu";
pub const FILE_MENU: &str = "file";

/// Registers every statically linked plugin.
pub fn register_all(app: &Application) -> Result<()> {
    app.register_plugin(LoggingPlugin)?;
    app.register_plugin(MainMenuPlugin)?;
    app.register_plugin(AboutPlugin)?;
    Ok(())
}

/// Owns the `file` menu.
#[derive(Debug, Default)]
pub struct MainMenuPlugin;

impl Plugin for MainMenuPlugin {
    fn name(&self) -> &'static str {
        MAIN_MENU
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, ctx: &PluginContext<'_>) -> Result<()> {
        ctx.add_menu(
            None,
            Menu {
                name: FILE_MENU.to_string(),
                text: ctx.translate("File"),
                icon: None,
            },
        )?;
        ctx.add_action(Action {
            name: "quit".to_string(),
            text: ctx.translate("Quit"),
            shortcut: Some("Ctrl+Q".to_string()),
        })?;
        ctx.add_menu_item(
            None,
            FILE_MENU,
            MenuItem {
                name: "quit".to_string(),
                text: ctx.translate("Quit"),
                icon: None,
                action: Some("quit".to_string()),
                before: None,
            },
        )
    }
}

/// Adds an `About` entry to the file menu and counts launches in its user
/// configuration.
#[derive(Debug, Default)]
pub struct AboutPlugin;

impl Plugin for AboutPlugin {
    fn name(&self) -> &'static str {
        "about"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn requires(&self) -> Vec<&'static str> {
        vec![MAIN_MENU]
    }

    fn init(&mut self, ctx: &PluginContext<'_>) -> Result<()> {
        let launches: u64 = ctx.get_config(Section::User, "launches", 0, false)?;
        ctx.set_config(Section::User, "launches", launches + 1, true)?;
        ctx.save_config(Section::User, true, true)?;

        ctx.on_plugin_available(MAIN_MENU, |ctx| {
            ctx.add_menu_item(
                None,
                FILE_MENU,
                MenuItem {
                    name: "about".to_string(),
                    text: ctx.translate("About"),
                    icon: None,
                    action: None,
                    before: Some("quit".to_string()),
                },
            )
        })?;
        Ok(())
    }
}
