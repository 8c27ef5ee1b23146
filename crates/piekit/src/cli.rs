use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::warn;
use piekit_core::kernel::bootstrap::{AppPaths, Application};
use piekit_core::kernel::constants::managers;
use piekit_core::kernel::error::{Error, Result};
use piekit_core::plugin_system::{PluginInfo, PluginManager, TeardownReport};
use piekit_core::registry::MenuManager;
use piekit_core::storage::{ConfigPath, Section};
use serde_json::Value;

use crate::builtin::{self, FILE_MENU};

/// Piekit: a plugin-driven application kit
#[derive(Parser, Debug)]
#[command(name = "piekit", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Simple ping command for testing
    #[arg(long)]
    pub ping: bool,

    /// Application root holding shipped configs, locales and assets
    #[arg(long, global = true, value_name = "DIR")]
    pub app_root: Option<PathBuf>,

    /// User root holding user configuration overrides
    #[arg(long, global = true, value_name = "DIR")]
    pub user_root: Option<PathBuf>,

    /// Folder holding one sub-folder per plugin
    #[arg(long, global = true, value_name = "DIR")]
    pub plugins_root: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the application, then tear it down and report
    Run,
    /// List registered plugins and their states
    Plugins,
    /// Read or write configuration values
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print a value as JSON
    Get {
        /// `root` or a plugin name
        scope: String,
        /// One of root, inner, user, shared
        section: Section,
        key: String,
    },
    /// Set a value; VALUE is parsed as JSON, falling back to a plain string
    Set {
        scope: String,
        section: Section,
        key: String,
        value: String,
        /// Write the section to disk, creating the file if needed
        #[arg(long)]
        save: bool,
    },
    /// List the keys of a section
    Keys { scope: String, section: Section },
}

impl CliArgs {
    fn paths(&self) -> Result<AppPaths> {
        let paths = match (&self.app_root, &self.user_root) {
            (Some(app_root), Some(user_root)) => AppPaths::new(app_root, user_root),
            _ => {
                let defaults = AppPaths::from_env()?;
                AppPaths::new(
                    self.app_root.clone().unwrap_or(defaults.app_root),
                    self.user_root.clone().unwrap_or(defaults.user_root),
                )
            }
        };
        Ok(match &self.plugins_root {
            Some(root) => paths.with_plugins_root(root),
            None => paths,
        })
    }
}

/// Bootstraps the application, runs the command and shuts down.
pub async fn execute(args: CliArgs) -> Result<()> {
    let command = args.command.as_ref().unwrap_or(&Commands::Run);
    if matches!(command, Commands::Run) && !args.json {
        println!("Initializing application...");
    }

    let mut app = Application::with_defaults(args.paths()?)?;
    builtin::register_all(&app)?;
    app.start()?;

    let outcome = match command {
        Commands::Run => run(&mut app, args.json).await,
        Commands::Plugins => list_plugins(&app, args.json),
        Commands::Config { command } => config(&app, command, args.json),
    };

    if matches!(command, Commands::Run) && !args.json {
        println!("Shutting down application...");
    }
    let report = app.shutdown()?;
    outcome?;

    if matches!(command, Commands::Run) {
        print_report(&report, args.json)?;
    }
    Ok(())
}

async fn run(app: &mut Application, json: bool) -> Result<()> {
    // Scan the plugins root off the owning thread; the owner checks the
    // result against the registered plugins.
    let sender = app.mailbox_sender();
    let plugins_root = app.paths().plugins_root.clone();
    let scan = tokio::task::spawn_blocking(move || {
        let folders = plugin_folders(&plugins_root);
        sender.post(move |directory| {
            directory.with::<PluginManager, _>(managers::PLUGINS, |plugins| {
                for folder in folders.iter().filter(|f| !plugins.contains(f)) {
                    warn!("No plugin registered for folder '{}'", folder);
                }
                Ok(())
            })
        })
    });
    app.apply_next().await?;
    scan.await
        .map_err(|e| Error::Other(format!("Plugin folder scan failed: {}", e)))??;

    if json {
        return Ok(());
    }

    let infos = app.plugins(|plugins| Ok(plugins.plugins()))?;
    let ready = infos
        .iter()
        .filter(|info| info.state == piekit_core::PluginState::Ready)
        .count();
    println!("Loaded {} plugins ({} ready)", infos.len(), ready);

    app.managers().with::<MenuManager, _>(managers::MENUS, |menus| {
        let menu = menus.get_menu(None, FILE_MENU)?;
        let items: Vec<&str> = menus
            .menu_items(FILE_MENU)
            .iter()
            .map(|item| item.text.as_str())
            .collect();
        println!("Menu '{}': {}", menu.text, items.join(", "));
        Ok(())
    })
}

fn list_plugins(app: &Application, json: bool) -> Result<()> {
    let infos: Vec<PluginInfo> = app.plugins(|plugins| Ok(plugins.plugins()))?;
    if json {
        println!("{}", to_json(&infos)?);
        return Ok(());
    }

    if infos.is_empty() {
        println!("No plugins registered.");
        return Ok(());
    }
    println!("Registered plugins:");
    for info in &infos {
        let mut line = format!("  - {} {} [{}]", info.name, info.version, info.state);
        if !info.requires.is_empty() {
            line.push_str(&format!(" requires: {}", info.requires.join(", ")));
        }
        println!("{}", line);
    }
    Ok(())
}

fn config(app: &Application, command: &ConfigCommand, json: bool) -> Result<()> {
    match command {
        ConfigCommand::Get { scope, section, key } => {
            let value = app.config(|config| Ok(config.get_value(scope, *section, key, false)?.cloned()))?;
            match value {
                Some(value) => {
                    println!("{}", to_json(&value)?);
                    Ok(())
                }
                None => Err(Error::Other(format!(
                    "{} is not set",
                    ConfigPath::new(scope, *section, Some(key))
                ))),
            }
        }
        ConfigCommand::Set {
            scope,
            section,
            key,
            value,
            save,
        } => {
            let value = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.clone()));
            let saved = app.config_mut(|config| {
                config.set(scope, *section, key, &value, false)?;
                if *save {
                    return config.save(scope, *section, false, true).map(Some);
                }
                Ok(None)
            })?;
            let path = ConfigPath::new(scope, *section, Some(key));
            match saved {
                Some(file) => println!("Set {} and saved {}", path, file.display()),
                None => println!("Set {} (not saved)", path),
            }
            Ok(())
        }
        ConfigCommand::Keys { scope, section } => {
            let keys = app.config(|config| config.keys(scope, *section, false))?;
            if json {
                println!("{}", to_json(&keys)?);
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
            Ok(())
        }
    }
}

fn print_report(report: &TeardownReport, json: bool) -> Result<()> {
    if json {
        println!("{}", to_json(report)?);
    } else if report.is_clean() {
        println!("Teardown clean");
    } else {
        println!(
            "Teardown finished with {} failed, {} never ready, {} unfired callbacks",
            report.failed.len(),
            report.never_ready.len(),
            report.unfired.len()
        );
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Other(format!("Failed to encode JSON: {}", e)))
}

/// Names of the sub-folders of `root`, sorted. Unreadable roots yield none.
fn plugin_folders(root: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
