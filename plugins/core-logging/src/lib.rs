//! # Core Logging Plugin
//!
//! Installs the process-wide `tracing` subscriber and routes records emitted
//! through the `log` facade into it. Level and output format come from the
//! plugin's own configuration scope: `level` and `format` keys, with the
//! user section overriding the shipped one. `RUST_LOG` wins over both.
use std::fmt;
use std::str::FromStr;

use log::{info, warn};
use piekit_core::kernel::constants::managers;
use piekit_core::kernel::error::{Error, Result as KernelResult};
use piekit_core::plugin_system::{Plugin, PluginContext};
use piekit_core::storage::{ConfigStore, Section};
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt as subscriber_fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const PLUGIN_NAME: &str = "core-logging";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::Other(format!("Unknown log format '{}'", other))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive such as `info` or `piekit_core=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingSettings {
    /// Reads the settings of `scope`. Sections that were never initialized
    /// are skipped.
    pub fn from_store(config: &ConfigStore, scope: &str) -> KernelResult<Self> {
        let mut settings = Self::default();
        for section in [Section::Inner, Section::User] {
            if !config.is_initialized(scope, section) {
                continue;
            }
            settings.level = config.get(scope, section, "level", settings.level, false)?;
            let format: String = config.get(scope, section, "format", settings.format.to_string(), false)?;
            settings.format = format.parse()?;
        }
        Ok(settings)
    }

    fn filter(&self) -> KernelResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| Error::Other(format!("Invalid log level '{}': {}", self.level, e))),
        }
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(settings: &LoggingSettings) -> KernelResult<()> {
    let registry = tracing_subscriber::registry().with(settings.filter()?);
    let installed = match settings.format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(subscriber_fmt::layer().with_writer(std::io::stderr)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(subscriber_fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };
    installed.map_err(|e| Error::Other(format!("Failed to install log subscriber: {}", e)))?;

    tracing_log::LogTracer::init().map_err(|e| Error::Other(format!("Failed to bridge log records: {}", e)))?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, ctx: &PluginContext<'_>) -> KernelResult<()> {
        let settings = ctx
            .managers()
            .with::<ConfigStore, _>(managers::CONFIGS, |config| LoggingSettings::from_store(config, ctx.name()))?;

        // A subscriber installed by the embedding process stays in charge
        if let Err(e) = init_logging(&settings) {
            warn!("{}", e);
            return Ok(());
        }
        info!("Logging at '{}' as {}", settings.level, settings.format);
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &PluginContext<'_>) -> KernelResult<()> {
        info!("Shutting down Core Logging Plugin");
        Ok(())
    }
}
