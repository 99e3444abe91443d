use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for the analysis model.
///
/// These are the user preferences the model reads its defaults from. They are
/// stored as TOML, normally next to the project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Whether scenario based causal analysis fields are active by default
    /// in new projects.
    pub use_scenarios: bool,

    /// How many deleted components (and, separately, connections) are kept
    /// around for recovery.
    ///
    /// When the trash is full the oldest entry is purged permanently.
    trash_capacity: usize,

    /// How many levels of "link to a link" are followed when the links of a
    /// deleted component are removed.
    ///
    /// `1` removes only links touching the component itself, `2` also removes
    /// links attached to those links, and so on.
    cascade_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_scenarios: false,
            trash_capacity: default_trash_capacity(),
            cascade_depth: default_cascade_depth(),
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

    /// Loads the configuration at `path`, falling back to the defaults when
    /// the file does not exist or cannot be parsed.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("{e}; using default configuration");
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

    /// Returns the capacity of the component and connection trash.
    #[must_use]
    pub const fn trash_capacity(&self) -> usize {
        self.trash_capacity
    }

    /// Sets the trash capacity. A capacity of zero is raised to one.
    pub fn set_trash_capacity(&mut self, capacity: usize) {
        self.trash_capacity = capacity.max(1);
    }

    /// Returns the link cascade depth used when components are removed.
    #[must_use]
    pub const fn cascade_depth(&self) -> usize {
        self.cascade_depth
    }

    /// Sets the link cascade depth.
    pub const fn set_cascade_depth(&mut self, depth: usize) {
        self.cascade_depth = depth;
    }
}

const fn default_trash_capacity() -> usize {
    25
}

const fn default_cascade_depth() -> usize {
    2
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        use_scenarios: bool,

        #[serde(default = "default_trash_capacity")]
        trash_capacity: usize,

        #[serde(default = "default_cascade_depth")]
        cascade_depth: usize,
    },
}

impl From<Versions> for super::Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                use_scenarios,
                trash_capacity,
                cascade_depth,
            } => Self {
                use_scenarios,
                trash_capacity: trash_capacity.max(1),
                cascade_depth,
            },
        }
    }
}

impl From<super::Config> for Versions {
    fn from(config: super::Config) -> Self {
        Self::V1 {
            use_scenarios: config.use_scenarios,
            trash_capacity: config.trash_capacity,
            cascade_depth: config.cascade_depth,
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
            b"_version = \"1\"\nuse_scenarios = true\ntrash_capacity = 4\ncascade_depth = 1\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert!(config.use_scenarios);
        assert_eq!(config.trash_capacity(), 4);
        assert_eq!(config.cascade_depth(), 1);
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
        file.write_all(b"_version = \"1\"\ntrash_capacity = \"many\"\n")
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
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.use_scenarios = true;
        config.set_trash_capacity(0);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.trash_capacity(), 1);
        assert!(loaded.use_scenarios);
    }
}
