//! Configuration for the dbscheme tool
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (dbscheme.toml)
//! - Environment variables (DBSCHEME__*)
//!
//! ## Example config file (dbscheme.toml):
//! ```toml
//! [emit]
//! output = "go.dbscheme"
//! manifest = "go.dbscheme.manifest.json"
//! varchar_length = 900
//!
//! [release]
//! version = "1.3.0"
//!
//! [compatibility]
//! strict = false
//! fail_on_breaking = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::schema::{SchemaOptions, DEFAULT_VARCHAR_LENGTH};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbschemeConfig {
    #[serde(default)]
    pub emit: EmitConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub compatibility: CompatibilityConfig,
}

/// Where and how the schema text is written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitConfig {
    /// Schema text output; stdout when unset
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Manifest output; no manifest when unset
    #[serde(default)]
    pub manifest: Option<PathBuf>,

    #[serde(default = "default_varchar_length")]
    pub varchar_length: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Version recorded in new manifests
    #[serde(default = "default_version")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityConfig {
    /// Treat any change as incompatible
    #[serde(default)]
    pub strict: bool,

    /// Exit non-zero on breaking changes
    #[serde(default = "default_true")]
    pub fail_on_breaking: bool,
}

fn default_varchar_length() -> u32 {
    DEFAULT_VARCHAR_LENGTH
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            output: None,
            manifest: None,
            varchar_length: default_varchar_length(),
        }
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
        }
    }
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            strict: false,
            fail_on_breaking: true,
        }
    }
}

impl DbschemeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in ["dbscheme.toml", ".dbscheme.toml", "config/dbscheme.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "dbscheme", "dbscheme") {
            let xdg_config = dirs.config_dir().join("dbscheme.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // DBSCHEME__EMIT__VARCHAR_LENGTH=255
        builder = builder.add_source(
            Environment::with_prefix("DBSCHEME")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            varchar_length: self.emit.varchar_length,
        }
    }
}
