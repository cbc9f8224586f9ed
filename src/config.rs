use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Runtime settings, read from a YAML file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub log_level: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`
    pub path: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "statemachine.db".to_string(),
            max_connections: 20,
            min_connections: 1,
            connect_timeout_secs: 5,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_yaml(&content)
                    .with_context(|| format!("Invalid config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply command line overrides on top of file values
    pub fn with_overrides(mut self, database: Option<String>, log_level: Option<String>) -> Self {
        if let Some(database) = database {
            self.database.path = database;
        }
        if let Some(log_level) = log_level {
            self.log_level = log_level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.database.path, "statemachine.db");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml(
            r#"
database:
  path: machines.db
"#,
        )
        .unwrap();

        assert_eq!(settings.database.path, "machines.db");
        assert_eq!(settings.database.max_connections, 20);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_load_from_file_and_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level: debug\ndatabase:\n  max_connections: 4").unwrap();

        let settings = Settings::load(Some(file.path()))
            .unwrap()
            .with_overrides(Some(":memory:".to_string()), None);

        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.database.max_connections, 4);
        assert_eq!(settings.database.path, ":memory:");
    }

    #[test]
    fn test_invalid_yaml_is_rejected() {
        assert!(Settings::from_yaml("database: [1, 2").is_err());
    }
}
