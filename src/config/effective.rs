//! Build configuration with provenance
//!
//! A `BuildConfig` carries the property environment and the global option
//! layer a [`crate::BuildContext`] is built from, together with where each
//! part came from.
//!
//! File format (TOML):
//!
//! ```toml
//! [properties]
//! OUTPUT_DIR = "build"
//! EXTRA_LIBS = ["ssl", "crypto"]
//!
//! [options]
//! "native.cxx.flags" = ["-O2", "-Wall"]
//! "native.include" = ["${OUTPUT_DIR}/include"]
//! ```

use std::fs;
use std::path::Path;

use native_props::Properties;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::merge::{merge_layers, OptionLayer};
use super::options::keys;
use super::ConfigError;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Api,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/api)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/api)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Properties and global option overrides for one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildConfig {
    pub properties: Properties,

    /// Global option values layered over the built-in defaults
    pub options: OptionLayer,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    options: toml::Table,
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML build configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes =
            fs::read(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::Parse(format!("Invalid UTF-8: {}", e)))?;

        let mut config = Self::from_toml_str(&contents)?;
        config.sources = vec![ConfigSource {
            origin: ConfigOrigin::File,
            path: Some(path.to_string_lossy().to_string()),
            digest: Some(digest),
        }];
        Ok(config)
    }

    /// Parse TOML text without recording a file source.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))?;

        let options: OptionLayer = file
            .options
            .into_iter()
            .map(|(k, v)| (k, toml_to_json(v)))
            .collect();
        Self::validate_keys(&options)?;

        Ok(Self {
            properties: file.properties,
            options,
            sources: Vec::new(),
        })
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.set(name, value);
        self
    }

    /// Set one global option; unknown names are rejected.
    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Result<Self, ConfigError> {
        if !keys::is_known(key) {
            return Err(ConfigError::UnknownOption(key.to_string()));
        }
        self.options.insert(key.to_string(), value.into());
        if !self.sources.iter().any(|s| s.origin == ConfigOrigin::Api) {
            self.sources.push(ConfigSource {
                origin: ConfigOrigin::Api,
                path: None,
                digest: None,
            });
        }
        Ok(self)
    }

    /// Overlay `other` on top of this config.
    pub fn merged_with(mut self, other: BuildConfig) -> Self {
        self.properties.extend(other.properties);
        self.options = merge_layers([&self.options, &other.options]);
        self.sources.extend(other.sources);
        self
    }

    fn validate_keys(options: &OptionLayer) -> Result<(), ConfigError> {
        match options.keys().find(|k| !keys::is_known(k)) {
            Some(unknown) => Err(ConfigError::UnknownOption(unknown.clone())),
            None => Ok(()),
        }
    }
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}
