//! Configuration management for noted.
//!
//! The configuration lives in a JSON file at a well-known location:
//! `$NOTED_CONFIG` when set, otherwise `<config dir>/noted/noted.json`.
//! It is loaded once at startup into a [`Config`] value which is then
//! handed to each component. Any problem with it is fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NotedError, NotedResult};

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "NOTED_CONFIG";

/// File name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "noted.json";

fn default_server_port() -> u16 {
    5823
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Raw configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigData {
    /// Directory holding the Markdown note files
    pub notes_path: String,
    /// Path to the SQLite revision database
    pub database_path: String,
    /// Backup directory (accepted, not used by request handling)
    #[serde(default)]
    pub backup_path: String,
    /// Editor autosave flag (read by the front end only)
    #[serde(default = "default_true")]
    pub autosave: bool,
    #[serde(default)]
    pub autostore: bool,
    #[serde(default)]
    pub use_gui: bool,
    #[serde(default = "default_version")]
    pub version: String,
    /// Port the HTTP server listens on (localhost only)
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Directory served under /static
    #[serde(default)]
    pub static_path: Option<String>,
    /// Filename prefixes skipped by the database sync
    #[serde(default)]
    pub exclude_prefixes: Vec<String>,
    /// Verbose logging
    #[serde(default)]
    pub debug: bool,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            notes_path: String::new(),
            database_path: String::new(),
            backup_path: String::new(),
            autosave: true,
            autostore: false,
            use_gui: false,
            version: default_version(),
            server_port: default_server_port(),
            static_path: None,
            exclude_prefixes: Vec::new(),
            debug: false,
        }
    }
}

/// Validated application configuration
#[derive(Debug, Clone)]
pub struct Config {
    config_file: PathBuf,
    data: ConfigData,
}

impl Config {
    /// Resolve the configuration file location.
    ///
    /// An explicit path wins, then `$NOTED_CONFIG`, then the platform
    /// config directory.
    pub fn locate(explicit: Option<PathBuf>) -> NotedResult<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        #[cfg(feature = "desktop")]
        {
            let dir = dirs::config_dir()
                .ok_or_else(|| NotedError::config("unable to determine the user config directory"))?;
            Ok(dir.join("noted").join(CONFIG_FILE_NAME))
        }
        #[cfg(not(feature = "desktop"))]
        {
            Err(NotedError::config(format!(
                "{} must be set when built without the desktop feature",
                CONFIG_ENV_VAR
            )))
        }
    }

    /// Load and validate the configuration file
    pub fn load<P: AsRef<Path>>(config_file: P) -> NotedResult<Self> {
        let config_file = config_file.as_ref().to_path_buf();
        if !config_file.exists() {
            return Err(NotedError::config(format!(
                "configuration file {} does not exist",
                config_file.display()
            )));
        }
        let content = fs::read_to_string(&config_file)?;
        let data: ConfigData = serde_json::from_str(&content).map_err(|e| {
            NotedError::config(format!("invalid configuration in {}: {}", config_file.display(), e))
        })?;
        Self::from_data(config_file, data)
    }

    /// Build a configuration from already parsed data, validating it
    pub fn from_data(config_file: PathBuf, data: ConfigData) -> NotedResult<Self> {
        if data.notes_path.trim().is_empty() {
            return Err(NotedError::config("notes_path is required"));
        }
        if data.database_path.trim().is_empty() {
            return Err(NotedError::config("database_path is required"));
        }
        if !Path::new(&data.notes_path).is_dir() {
            return Err(NotedError::config(format!(
                "notes_path {} is not a directory",
                data.notes_path
            )));
        }
        Ok(Self { config_file, data })
    }

    /// Write a template configuration to `config_file`, creating parent directories.
    ///
    /// The template has empty required paths, so loading it fails until it is edited.
    pub fn write_template<P: AsRef<Path>>(config_file: P) -> NotedResult<()> {
        let config_file = config_file.as_ref();
        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&ConfigData::default())?;
        fs::write(config_file, content)?;
        Ok(())
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn notes_path(&self) -> &Path {
        Path::new(&self.data.notes_path)
    }

    pub fn database_path(&self) -> &Path {
        Path::new(&self.data.database_path)
    }

    pub fn backup_path(&self) -> Option<&Path> {
        if self.data.backup_path.is_empty() {
            None
        } else {
            Some(Path::new(&self.data.backup_path))
        }
    }

    pub fn server_port(&self) -> u16 {
        self.data.server_port
    }

    pub fn static_path(&self) -> Option<&Path> {
        self.data.static_path.as_deref().map(Path::new)
    }

    pub fn exclude_prefixes(&self) -> &[String] {
        &self.data.exclude_prefixes
    }

    pub fn autosave(&self) -> bool {
        self.data.autosave
    }

    pub fn debug(&self) -> bool {
        self.data.debug
    }

    pub fn version(&self) -> &str {
        &self.data.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let notes = temp_dir.path().join("notes");
        fs::create_dir(&notes).unwrap();
        let json = serde_json::json!({
            "notes_path": notes.to_str().unwrap(),
            "database_path": temp_dir.path().join("noted.db").to_str().unwrap(),
        })
        .to_string();
        let path = write_config(&temp_dir, &json);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.notes_path(), notes.as_path());
        assert_eq!(config.server_port(), 5823);
        assert!(config.autosave());
        assert!(config.exclude_prefixes().is_empty());
        assert!(config.backup_path().is_none());
        assert!(config.static_path().is_none());
    }

    #[test]
    fn test_unused_keys_are_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let json = serde_json::json!({
            "notes_path": temp_dir.path().to_str().unwrap(),
            "database_path": "noted.db",
            "backup_path": "/tmp/backup",
            "autosave": false,
            "use_gui": true,
        })
        .to_string();
        let path = write_config(&temp_dir, &json);

        let config = Config::load(&path).unwrap();
        assert!(!config.autosave());
        assert_eq!(config.backup_path(), Some(Path::new("/tmp/backup")));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(NotedError::Config(_))));
    }

    #[test]
    fn test_missing_required_key_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, r#"{"notes_path": "/tmp"}"#);
        assert!(matches!(Config::load(&path), Err(NotedError::Config(_))));
    }

    #[test]
    fn test_notes_path_must_be_directory() {
        let temp_dir = TempDir::new().unwrap();
        let json = serde_json::json!({
            "notes_path": temp_dir.path().join("nowhere").to_str().unwrap(),
            "database_path": "noted.db",
        })
        .to_string();
        let path = write_config(&temp_dir, &json);
        assert!(matches!(Config::load(&path), Err(NotedError::Config(_))));
    }

    #[test]
    fn test_template_does_not_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);
        Config::write_template(&path).unwrap();

        assert!(path.exists());
        assert!(matches!(Config::load(&path), Err(NotedError::Config(_))));
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/somewhere/noted.json");
        assert_eq!(Config::locate(Some(explicit.clone())).unwrap(), explicit);
    }
}
