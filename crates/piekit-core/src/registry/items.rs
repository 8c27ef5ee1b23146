//! Plain descriptors stored by the reference managers. Widgets are built by
//! the UI layer from these; the registry only keeps names and metadata.
use serde::{Deserialize, Serialize};

/// A top-level menu, registered under a section (usually `shared`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub name: String,
    pub text: String,
    pub icon: Option<String>,
}

/// An entry inside a menu, registered with the menu name as parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub text: String,
    pub icon: Option<String>,
    /// Action triggered by the item
    pub action: Option<String>,
    /// Place the item before this sibling when rendering
    pub before: Option<String>,
}

/// The menu manager stores menus and their items in one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Menu(Menu),
    Item(MenuItem),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolBar {
    pub name: String,
    pub text: String,
}

/// Registered with the toolbar name as parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolButton {
    pub name: String,
    pub text: String,
    pub icon: Option<String>,
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub text: String,
    pub shortcut: Option<String>,
}

/// A settings page editing one configuration scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPage {
    pub name: String,
    pub title: String,
    /// Config scope the page edits (a plugin name or `root`)
    pub scope: String,
}
