//! Runtime settings, layered: built-in defaults, then an optional TOML file,
//! then `SCRIPTLINK_*` environment variables (`__` separates nested keys, e.g.
//! `SCRIPTLINK_DISPLAY__MAX_DISPLAY_ROWS=20`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::alias::default_concepts;
use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "scriptlink.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct DisplaySettings {
    /// Rows shown before the rest is summarized as "+N more".
    pub max_display_rows: usize,
    /// A single-column list longer than this renders as a table.
    pub plain_text_max_rows: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { max_display_rows: 50, plain_text_max_rows: 1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind: String,
    pub dataset_path: PathBuf,
    #[serde(default)]
    pub display: DisplaySettings,
    /// Conceptual field name -> header spellings to look for.
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        let defaults = DisplaySettings::default();
        let mut settings: Settings = Config::builder()
            .set_default("bind", "0.0.0.0:8080")?
            .set_default("dataset_path", "scriptlink.json")?
            .set_default("display.max_display_rows", defaults.max_display_rows as i64)?
            .set_default("display.plain_text_max_rows", defaults.plain_text_max_rows as i64)?
            .add_source(File::from(file).required(false))
            .add_source(Environment::with_prefix("SCRIPTLINK").prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()?;
        if settings.aliases.is_empty() {
            settings.aliases = default_concepts();
        }
        Ok(settings)
    }
}
