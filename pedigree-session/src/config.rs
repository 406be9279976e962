use crate::error::{Result, SessionError};
use pedigree_core::DEFAULT_HISTORY_LIMIT;
use pedigree_store::{DocumentStore, RedbStore, SqliteStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Session configuration loaded from YAML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub storage: StorageSettings,
    pub log: LogSettings,
    pub engine: EngineSettings,
    pub defaults: DefaultSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Redb,
}

impl FromStr for StorageBackend {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "redb" => Ok(StorageBackend::Redb),
            other => Err(SessionError::InvalidConfig(format!(
                "unknown storage backend '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub sqlite_db: String,
    pub redb_db: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub history_limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    /// Stamped into `metadata.recorder` of new documents.
    pub recorder: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            data_dir: PathBuf::from("data"),
            sqlite_db: "pedigrees.sqlite".to_string(),
            redb_db: "pedigrees.redb".to_string(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `PEDIGREE_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(data_dir) = lookup("PEDIGREE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Some(backend) = lookup("PEDIGREE_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }

        if let Some(level) = lookup("PEDIGREE_LOG_LEVEL")
            && !level.trim().is_empty()
        {
            self.log.level = level;
        }

        Ok(())
    }

    /// Full path of the document database for the configured backend
    pub fn documents_db_path(&self) -> PathBuf {
        let file = match self.storage.backend {
            StorageBackend::Sqlite => &self.storage.sqlite_db,
            StorageBackend::Redb => &self.storage.redb_db,
        };
        self.storage.data_dir.join(file)
    }

    /// Create the data directory and open the configured backend.
    pub fn open_store(&self) -> Result<Arc<dyn DocumentStore>> {
        std::fs::create_dir_all(&self.storage.data_dir)?;
        let path = self.documents_db_path();
        let store: Arc<dyn DocumentStore> = match self.storage.backend {
            StorageBackend::Sqlite => Arc::new(SqliteStore::open(&path)?),
            StorageBackend::Redb => Arc::new(RedbStore::open(&path)?),
        };
        tracing::info!(
            backend = ?self.storage.backend,
            path = %path.display(),
            "opened document store"
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.engine.history_limit, 50);
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
        assert!(config.defaults.recorder.is_empty());
    }

    #[test]
    fn test_db_paths() {
        let mut config = SessionConfig::default();
        assert_eq!(config.documents_db_path(), PathBuf::from("data/pedigrees.sqlite"));
        config.storage.backend = StorageBackend::Redb;
        assert_eq!(config.documents_db_path(), PathBuf::from("data/pedigrees.redb"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = SessionConfig::from_yaml(
            "storage:\n  backend: redb\nengine:\n  history_limit: 10\ndefaults:\n  recorder: CENAGEM\n",
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Redb);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.engine.history_limit, 10);
        assert_eq!(config.defaults.recorder, "CENAGEM");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            SessionConfig::from_yaml("storage: [1, 2"),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            ("PEDIGREE_DATA_DIR", "/var/lib/pedigree"),
            ("PEDIGREE_STORAGE_BACKEND", "ReDB"),
            ("PEDIGREE_LOG_LEVEL", "debug"),
        ]);
        let mut config = SessionConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/pedigree"));
        assert_eq!(config.storage.backend, StorageBackend::Redb);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = SessionConfig::default();
        let result = config.apply_env(|name| {
            (name == "PEDIGREE_STORAGE_BACKEND").then(|| "postgres".to_string())
        });
        assert!(matches!(result, Err(SessionError::InvalidConfig(_))));
    }
}
