//! Configuration loading
//!
//! Sources, later ones winning: built-in defaults, `config.json` in the
//! config directory, then `MOCKCHAT__<SECTION>__<FIELD>` environment
//! variables. Every section is a flat table, so both layers are applied one
//! field at a time.

use super::schema::Config;
use super::validate::validate_config;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ENV_PREFIX: &str = "MOCKCHAT__";
const CONFIG_FILE: &str = "config.json";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".mockchat"))
            .unwrap_or_else(|| PathBuf::from(".mockchat"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and the process environment
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_vars(std::env::vars())
    }

    fn load_with_vars<I>(&self, vars: I) -> crate::Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = serde_json::to_value(Config::default())?;

        let config_path = self.config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            debug!("Loading config from {}", config_path.display());
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)
                .map_err(|e| crate::Error::Config(format!("{}: {}", config_path.display(), e)))?;
            overlay_sections(&mut merged, file_value)?;
        }

        for (key, raw) in vars {
            let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match suffix.split_once("__") {
                Some((section, field)) if !section.is_empty() && !field.is_empty() => {
                    let section = section.to_ascii_lowercase();
                    let field = field.to_ascii_lowercase();
                    if !set_field(&mut merged, &section, &field, parse_env_value(&raw)) {
                        warn!("Ignoring {}: no config section '{}'", key, section);
                    }
                }
                _ => warn!("Ignoring {}: expected {}SECTION__FIELD", key, ENV_PREFIX),
            }
        }

        let config: Config = serde_json::from_value(merged)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy every `section.field` of `file` over `base`
fn overlay_sections(base: &mut Value, file: Value) -> crate::Result<()> {
    let Value::Object(sections) = file else {
        return Err(not_an_object(CONFIG_FILE));
    };

    for (section, fields) in sections {
        let Value::Object(fields) = fields else {
            return Err(not_an_object(&format!("section '{}'", section)));
        };
        for (field, value) in fields {
            if !set_field(base, &section, &field, value) {
                warn!("Ignoring unknown config section '{}'", section);
                break;
            }
        }
    }
    Ok(())
}

fn not_an_object(what: &str) -> crate::Error {
    crate::Error::Config(format!("{} must be a JSON object", what))
}

/// Returns false when `section` is not part of the schema
fn set_field(base: &mut Value, section: &str, field: &str, value: Value) -> bool {
    match base.get_mut(section).and_then(Value::as_object_mut) {
        Some(table) => {
            table.insert(field.to_string(), value);
            true
        }
        None => false,
    }
}

/// Numbers, booleans and arrays parse as JSON; anything else is a string
fn parse_env_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
