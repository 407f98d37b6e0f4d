//! Site configuration management for AutoGauss.
//!
//! This module lets users customise program behaviour through INI-format
//! configuration files. Files are layered with the following precedence:
//!
//! 1. Local configuration (`./autogauss_config.cfg`)
//! 2. User configuration (`~/.config/autogauss/autogauss_config.cfg`)
//! 3. System configuration (`/etc/autogauss/autogauss_config.cfg`)
//! 4. Built-in defaults
//!
//! # Configuration File Format
//!
//! ```ini
//! [extensions]
//! input = com
//! output = log
//!
//! [general]
//! gaussian_command = g16
//! default_memory = 16GB
//! default_nprocs = 16
//! print_level = 1
//!
//! [workflow]
//! poll_interval = 60
//! max_concurrent = 2
//!
//! [logging]
//! level = info
//! file_logging = false
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use autogauss::settings::SettingsManager;
//!
//! let settings = SettingsManager::load()?;
//! println!("Gaussian command: {}", settings.general().gaussian_command);
//! # Ok::<(), autogauss::settings::ConfigError>(())
//! ```

use configparser::ini::Ini;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for in every configuration location.
pub const SETTINGS_FILE_NAME: &str = "autogauss_config.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

type IniSection = HashMap<String, Option<String>>;

/// Main configuration structure containing all program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// File extensions for Gaussian input and output files
    pub extensions: ExtensionSettings,
    /// General program settings
    pub general: GeneralSettings,
    /// Pipeline scheduling settings
    pub workflow: WorkflowSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// File extensions used for generated Gaussian files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionSettings {
    /// Gaussian input file extension (default: "com")
    pub input: String,
    /// Gaussian log file extension (default: "log")
    pub output: String,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            input: "com".to_string(),
            output: "log".to_string(),
        }
    }
}

/// General program settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Gaussian executable (default: "g16")
    pub gaussian_command: String,
    /// Memory for each calculation (default: "16GB")
    pub default_memory: String,
    /// Processors for each calculation (default: 16)
    pub default_nprocs: u32,
    /// 0 = quiet, 1 = normal, 2 = verbose (default: 1)
    pub print_level: u32,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            gaussian_command: "g16".to_string(),
            default_memory: "16GB".to_string(),
            default_nprocs: 16,
            print_level: 1,
        }
    }
}

/// Scheduling settings for the molecule pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Seconds between two looks at a running calculation's log (default: 60)
    pub poll_interval: u64,
    /// Molecules processed at the same time (default: 2)
    pub max_concurrent: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            poll_interval: 60,
            max_concurrent: 2,
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
    /// Send log records to `autogauss_debug.log` instead of the console (default: false)
    pub file_logging: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
        }
    }
}

/// Configuration manager that handles loading and accessing program settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from the available configuration files.
    ///
    /// A file that exists but fails to parse is reported with `warn!` and
    /// skipped; lower-precedence layers still apply.
    pub fn load() -> Result<Self, ConfigError> {
        let (settings, source) = Self::load_from_files()?;
        info!("Configuration loaded from: {}", source);
        Ok(Self {
            settings,
            config_source: source,
        })
    }

    /// Loads configuration from a single file layered over the built-in defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        Self::apply_config(path, &mut settings)?;
        Ok(Self {
            settings,
            config_source: format!("file ({})", path.display()),
        })
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the extension settings.
    pub fn extensions(&self) -> &ExtensionSettings {
        &self.settings.extensions
    }

    /// Gets the general settings.
    pub fn general(&self) -> &GeneralSettings {
        &self.settings.general
    }

    /// Gets the workflow settings.
    pub fn workflow(&self) -> &WorkflowSettings {
        &self.settings.workflow
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    fn load_from_files() -> Result<(Settings, String), ConfigError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        let candidates = [
            ("system", Self::get_system_config_path()),
            ("user", Self::get_user_config_path()),
            ("local", Some(PathBuf::from(SETTINGS_FILE_NAME))),
        ];

        for (layer, path) in candidates {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let mut layered = settings.clone();
            match Self::apply_config(&path, &mut layered) {
                Ok(()) => {
                    settings = layered;
                    config_source = format!("{} config ({})", layer, path.display());
                    debug!("Loaded {} configuration from: {}", layer, path.display());
                }
                Err(e) => {
                    warn!(
                        "Failed to load {} config from {}: {}",
                        layer,
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok((settings, config_source))
    }

    /// Applies the keys present in a single INI file on top of `settings`.
    ///
    /// Keys the file does not mention leave the lower layers in place.
    fn apply_config(path: &Path, settings: &mut Settings) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut ini = Ini::new();
        ini.read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let map = ini.get_map_ref();

        if let Some(section) = map.get("extensions") {
            Self::parse_extensions(section, &mut settings.extensions);
        }
        if let Some(section) = map.get("general") {
            Self::parse_general(section, &mut settings.general)?;
        }
        if let Some(section) = map.get("workflow") {
            Self::parse_workflow(section, &mut settings.workflow)?;
        }
        if let Some(section) = map.get("logging") {
            Self::parse_logging(section, &mut settings.logging)?;
        }

        Ok(())
    }

    fn parse_extensions(section: &IniSection, extensions: &mut ExtensionSettings) {
        if let Some(input) = string_value(section, "input") {
            extensions.input = input;
        }
        if let Some(output) = string_value(section, "output") {
            extensions.output = output;
        }
    }

    fn parse_general(section: &IniSection, general: &mut GeneralSettings) -> Result<(), ConfigError> {
        if let Some(command) = string_value(section, "gaussian_command") {
            general.gaussian_command = command;
        }
        if let Some(memory) = string_value(section, "default_memory") {
            general.default_memory = memory;
        }
        if let Some(nprocs) = parsed_value(section, "default_nprocs")? {
            general.default_nprocs = nprocs;
        }
        if let Some(print_level) = parsed_value(section, "print_level")? {
            general.print_level = print_level;
        }
        Ok(())
    }

    fn parse_workflow(section: &IniSection, workflow: &mut WorkflowSettings) -> Result<(), ConfigError> {
        if let Some(interval) = parsed_value(section, "poll_interval")? {
            workflow.poll_interval = interval;
        }
        if let Some(max_concurrent) = parsed_value(section, "max_concurrent")? {
            workflow.max_concurrent = max_concurrent;
        }
        Ok(())
    }

    fn parse_logging(section: &IniSection, logging: &mut LoggingSettings) -> Result<(), ConfigError> {
        if let Some(level) = string_value(section, "level") {
            logging.level = level;
        }
        if let Some(file_logging) = parsed_value(section, "file_logging")? {
            logging.file_logging = file_logging;
        }
        Ok(())
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/autogauss").join(SETTINGS_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("autogauss").join(SETTINGS_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("autogauss")
                    .join(SETTINGS_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("autogauss").join(SETTINGS_FILE_NAME))
        }
    }
}

fn string_value(section: &IniSection, key: &str) -> Option<String> {
    section
        .get(key)
        .cloned()
        .flatten()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_value<T: std::str::FromStr>(
    section: &IniSection,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match section.get(key) {
        Some(Some(raw)) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(format!("Invalid {}: {}", key, raw))),
        _ => Ok(None),
    }
}

impl SettingsManager {
    /// Creates a commented `autogauss_config.cfg` template at `path`.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let extensions = ExtensionSettings::default();
        let general = GeneralSettings::default();
        let workflow = WorkflowSettings::default();
        let logging = LoggingSettings::default();

        format!(
            r#"# AutoGauss Configuration File
#
# Configuration files are loaded in hierarchical order with local settings taking precedence:
#
# 1. Current working directory (./autogauss_config.cfg) - highest priority
# 2. User config directory (~/.config/autogauss/autogauss_config.cfg)
# 3. System config directory (/etc/autogauss/autogauss_config.cfg)
# 4. Built-in defaults (fallback)
#
# Values given in a workflow file always win over the values below.

[extensions]
# Extension of generated Gaussian input files (default: com)
input = {}

# Extension of Gaussian log files (default: log)
output = {}

[general]
# Gaussian executable; extra arguments are allowed (default: g16)
gaussian_command = {}

# %Mem for each calculation (default: 16GB)
default_memory = {}

# %NProcShared for each calculation (default: 16)
default_nprocs = {}

# 0 = quiet, 1 = normal, 2 = verbose (default: 1)
print_level = {}

[workflow]
# Seconds between two looks at a running calculation's log (default: 60)
poll_interval = {}

# Molecules processed at the same time (default: 2)
max_concurrent = {}

[logging]
# Log level: debug, info, warn, error (default: info)
level = {}

# Write log records to autogauss_debug.log instead of the console (default: false)
file_logging = {}
"#,
            extensions.input,
            extensions.output,
            general.gaussian_command,
            general.default_memory,
            general.default_nprocs,
            general.print_level,
            workflow.poll_interval,
            workflow.max_concurrent,
            logging.level,
            logging.file_logging,
        )
    }
}
