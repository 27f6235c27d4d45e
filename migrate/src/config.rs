//! Run configuration.
//!
//! Values come from the environment (a `.env` file is loaded by the binary
//! through `dotenvy`), and CLI flags override them.
//!
//! | Variable             | Default | Meaning                              |
//! |----------------------|---------|--------------------------------------|
//! | `MIGRATE_INPUT_DIR`  | `rows`  | Directory holding the row dumps      |
//! | `MIGRATE_OUTPUT_DIR` | `data`  | Directory receiving the JSON exports |
//! | `MIGRATE_PRETTY`     | `true`  | Pretty-print exported JSON           |
//! | `MIGRATE_VALIDATE`   | `true`  | Schema-check documents before export |

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default directory of row dumps.
pub const DEFAULT_INPUT_DIR: &str = "rows";

/// Default directory of exported collections.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

pub const ENV_INPUT_DIR: &str = "MIGRATE_INPUT_DIR";
pub const ENV_OUTPUT_DIR: &str = "MIGRATE_OUTPUT_DIR";
pub const ENV_PRETTY: &str = "MIGRATE_PRETTY";
pub const ENV_VALIDATE: &str = "MIGRATE_VALIDATE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub pretty: bool,
    pub validate: bool,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            pretty: true,
            validate: true,
        }
    }
}

impl MigrateConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            input_dir: get(ENV_INPUT_DIR).map(PathBuf::from).unwrap_or(defaults.input_dir),
            output_dir: get(ENV_OUTPUT_DIR).map(PathBuf::from).unwrap_or(defaults.output_dir),
            pretty: match get(ENV_PRETTY) {
                Some(v) => parse_bool(ENV_PRETTY, &v)?,
                None => defaults.pretty,
            },
            validate: match get(ENV_VALIDATE) {
                Some(v) => parse_bool(ENV_VALIDATE, &v)?,
                None => defaults.validate,
            },
        })
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}
