/// Application name
pub const APP_NAME: &str = "piekit";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scope addressing application-wide configuration
pub const ROOT_SCOPE: &str = "root";

/// Reserved key holding the backing folder of a `(scope, section)` table
pub const FOLDER_KEY: &str = "__FOLDER__";

/// Configuration folder name under the app and user roots
pub const CONFIGS_FOLDER: &str = "configs";

/// Base name of a configuration file; the extension follows the format
pub const CONFIG_FILE_STEM: &str = "config";

/// Locale folder name under the app root and under each plugin folder
pub const LOCALES_FOLDER: &str = "locales";

/// Asset folder name under the app root and under each plugin folder
pub const ASSETS_FOLDER: &str = "assets";

/// Default plugins directory under the app root
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Language used when the user never picked one
pub const DEFAULT_LOCALE: &str = "en";

/// Theme used when the user never picked one
pub const DEFAULT_THEME: &str = "dark";

/// Names of the built-in managers.
pub mod managers {
    pub const CONFIGS: &str = "configs";
    pub const LOCALES: &str = "locales";
    pub const THEMES: &str = "assets";
    pub const PLUGINS: &str = "plugins";
    pub const MENUS: &str = "menus";
    pub const TOOLBARS: &str = "toolbars";
    pub const TOOLBUTTONS: &str = "toolbuttons";
    pub const ACTIONS: &str = "actions";
    pub const CONFIG_PAGES: &str = "configpages";
}
