//! Configuration management for Threadloom.
//!
//! Loads configuration from ${THREADLOOM_HOME}/config.toml with sensible defaults.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::normalize::{DEFAULT_ID_FIELDS, Normalizer};

/// Output format for rendered forests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented outline, one visible comment per line (default)
    #[default]
    Text,
    /// The full forest as pretty-printed JSON
    Json,
}

impl OutputFormat {
    pub fn display_name(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unknown output format '{other}' (expected text or json)"),
        }
    }
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub expand_all: bool,
    pub show_timestamps: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            expand_all: false,
            show_timestamps: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// tracing filter directive
    pub filter: String,
    /// Optional log file; stderr when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: Config::DEFAULT_LOG_FILTER.to_string(),
            file: None,
        }
    }
}

/// The commented `default_config.toml`, baked in at compile time.
///
/// Regenerate it with `cargo run -p xtask -- update-default-config` after
/// changing any `Default` impl in this module.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Writes the values of `generated` into `template`.
///
/// Sections present on both sides are visited key by key so the template's
/// section headers and their comments survive.
fn overlay_generated(template: &mut toml_edit::Table, generated: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, item) in generated {
        if item.is_none() {
            continue;
        }
        if let (Item::Table(incoming), Some(Item::Table(section))) = (item, template.get_mut(key)) {
            overlay_generated(section, incoming);
            continue;
        }
        template[key] = item.clone();
    }
}

pub mod paths {
    //! Path resolution for Threadloom configuration.
    //!
    //! THREADLOOM_HOME resolution order:
    //! 1. THREADLOOM_HOME environment variable (if set)
    //! 2. ~/.config/threadloom (default)
    //! 3. ./.threadloom when no home directory can be determined

    use std::path::PathBuf;

    pub fn threadloom_home() -> PathBuf {
        if let Ok(home) = std::env::var("THREADLOOM_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".threadloom"),
            |h| h.join(".config").join("threadloom"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        threadloom_home().join("config.toml")
    }
}

fn default_id_fields() -> Vec<String> {
    DEFAULT_ID_FIELDS.iter().map(ToString::to_string).collect()
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Field names that carry a comment id in nested or stringified parents
    #[serde(default = "default_id_fields")]
    pub id_fields: Vec<String>,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    const DEFAULT_LOG_FILTER: &str = "warn";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("parse config {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Builds the parent reference normalizer for the configured id fields.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.id_fields.iter().cloned())
    }

    /// Writes the commented default config to `path`.
    /// Refuses to overwrite an existing file.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("{} already exists; edit it or remove it first", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Renders `Config::default()` as TOML laid over the commented template.
    ///
    /// `threadloom config generate` prints this; xtask stores it as
    /// `default_config.toml`.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let defaults = toml::to_string(&Config::default()).context("serialize default config")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("parse embedded default_config.toml")?;
        let defaults: DocumentMut = defaults.parse().context("re-parse default config")?;
        overlay_generated(doc.as_table_mut(), defaults.as_table());

        Ok(doc.to_string())
    }

    /// Stages `content` beside `path`, then renames it into place.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create config directory {}", dir.display()))?;
        }

        let staged = path.with_extension("toml.tmp");
        fs::write(&staged, content).with_context(|| format!("write {}", staged.display()))?;
        fs::rename(&staged, path)
            .with_context(|| format!("move {} into place at {}", staged.display(), path.display()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_fields: default_id_fields(),
            render: RenderConfig::default(),
            log: LogConfig::default(),
        }
    }
}
