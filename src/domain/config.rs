use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::option::OptionType;

/// Configuration for an option catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Label of the "no category" entry offered alongside the top-level
    /// options when choosing a parent.
    sentinel_label: String,

    /// The catalogue edited when none is given explicitly.
    pub default_option_type: OptionType,

    /// Whether data files are written as indented JSON.
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sentinel_label: default_sentinel_label(),
            default_option_type: OptionType::default(),
            pretty: true,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads the configuration, falling back to the default if it is missing
    /// or invalid.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::debug!("Failed to load config: {e}");
            Self::default()
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The label of the "no category" entry.
    #[must_use]
    pub fn sentinel_label(&self) -> &str {
        &self.sentinel_label
    }

    /// Sets the label of the "no category" entry.
    ///
    /// Blank labels are ignored. Returns whether the label was changed.
    pub fn set_sentinel_label(&mut self, label: String) -> bool {
        if label.trim().is_empty() || label == self.sentinel_label {
            false
        } else {
            self.sentinel_label = label;
            true
        }
    }
}

fn default_sentinel_label() -> String {
    "(Top-level category)".to_string()
}

const fn default_pretty() -> bool {
    true
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_sentinel_label")]
        sentinel_label: String,

        #[serde(default)]
        default_option_type: OptionType,

        #[serde(default = "default_pretty")]
        pretty: bool,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                sentinel_label,
                default_option_type,
                pretty,
            } => Self {
                sentinel_label,
                default_option_type,
                pretty,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            sentinel_label: config.sentinel_label,
            default_option_type: config.default_option_type,
            pretty: config.pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nsentinel_label = \"(none)\"\ndefault_option_type = \"districts\"\npretty = false\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.sentinel_label(), "(none)");
        assert_eq!(config.default_option_type, OptionType::Districts);
        assert!(!config.pretty);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
        assert_eq!(Config::load_or_default(&missing), Config::default());
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\ndefault_option_type = \"tags\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        // Tests that deserialising an empty file returns the default configuration.
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut config = Config::default();
        assert!(config.set_sentinel_label("(Übergeordnete Kategorie)".to_string()));
        assert!(!config.set_sentinel_label("  ".to_string()));

        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
