//! Sifter configuration loaded from TOML.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parse::DEFAULT_MAX_DEPTH;

/// Default record identifier field.
pub const DEFAULT_ID_KEY: &str = "id";

/// Example configuration file.
pub const CONFIG_TEMPLATE: &str = r#"# Sifter configuration

# Field holding each record's unique identifier
id_key = "id"

# Maximum nesting of lists and item indices
max_depth = 128

# Substitutions for $NAME symbols and {NAME} in quoted strings
[params]
# owner = "alice"
"#;

/// Compilation and evaluation settings for a [`Sifter`](crate::Sifter).
///
/// # Example
///
/// ```
/// use sifty_rs::SifterConfig;
///
/// let config = SifterConfig::from_toml_str(r#"
/// id_key = "build_id"
///
/// [params]
/// owner = "alice"
/// "#).unwrap();
///
/// assert_eq!(config.id_key, "build_id");
/// assert_eq!(config.params["owner"], "alice");
/// assert_eq!(config.max_depth, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SifterConfig {
    /// Record field holding the unique identifier.
    #[serde(default = "default_id_key")]
    pub id_key: String,

    /// Parameter substitutions applied at compile time.
    #[serde(default)]
    pub params: HashMap<String, String>,

    /// Maximum expression nesting depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_id_key() -> String {
    DEFAULT_ID_KEY.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for SifterConfig {
    fn default() -> Self {
        Self {
            id_key: default_id_key(),
            params: HashMap::new(),
            max_depth: default_max_depth(),
        }
    }
}

impl SifterConfig {
    /// Parses a configuration from TOML text. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Toml` if the text is not valid for the schema.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Toml` if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Sets the identifier field.
    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }

    /// Adds a parameter substitution.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SifterConfig::default();
        assert_eq!(config.id_key, "id");
        assert!(config.params.is_empty());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_config_deserialization_empty() {
        let config = SifterConfig::from_toml_str("").unwrap();
        assert_eq!(config, SifterConfig::default());
    }

    #[test]
    fn test_config_deserialization_partial() {
        let config = SifterConfig::from_toml_str("max_depth = 4\n").unwrap();
        assert_eq!(config.id_key, "id");
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn test_config_template_parses() {
        let config = SifterConfig::from_toml_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, SifterConfig::default());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = SifterConfig::default()
            .with_id_key("nvr")
            .with_param("tag", "f40-build")
            .with_max_depth(16);

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("id_key = \"nvr\""));
        assert!(toml_str.contains("[params]"));

        let parsed = SifterConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_invalid_type() {
        let err = SifterConfig::from_toml_str("max_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_config_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id_key = \"build_id\"\n[params]\nowner = \"alice\"").unwrap();

        let config = SifterConfig::load(file.path()).unwrap();
        assert_eq!(config.id_key, "build_id");
        assert_eq!(config.params.get("owner").map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_config_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SifterConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("missing.toml"));
    }
}
