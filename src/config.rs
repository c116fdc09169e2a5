use std::sync::Arc;

use thiserror::Error;

use crate::coach::client::DEFAULT_MODEL;
use crate::store::{RestStore, SqliteStore, StoreError, TradeStore};

pub const DEFAULT_DB_PATH: &str = "trading_journal.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be set when JOURNAL_BACKEND={backend}")]
    MissingField {
        field: &'static str,
        backend: &'static str,
    },

    #[error("JOURNAL_BACKEND must be sqlite or rest (value: {0})")]
    InvalidBackend(String),

    #[error("Failed to open store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Sqlite,
    Rest,
}

impl Backend {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "sqlite" => Ok(Self::Sqlite),
            "rest" | "supabase" => Ok(Self::Rest),
            other => Err(ConfigError::InvalidBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub backend: Backend,
    pub db_path: String,
    pub store_url: Option<String>,
    pub store_key: Option<String>,
    /// Default key for the AI coach; a per-run key overrides it.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl AppConfig {
    /// Reads the process environment after loading a `.env` file, if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match lookup("JOURNAL_BACKEND") {
            Some(raw) => Backend::parse(&raw)?,
            None => Backend::default(),
        };

        let config = Self {
            backend,
            db_path: non_empty("JOURNAL_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            store_url: non_empty("JOURNAL_STORE_URL"),
            store_key: non_empty("JOURNAL_STORE_KEY"),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        if config.backend == Backend::Rest {
            if config.store_url.is_none() {
                return Err(ConfigError::MissingField {
                    field: "JOURNAL_STORE_URL",
                    backend: "rest",
                });
            }
            if config.store_key.is_none() {
                return Err(ConfigError::MissingField {
                    field: "JOURNAL_STORE_KEY",
                    backend: "rest",
                });
            }
        }

        Ok(config)
    }

    /// The coach key for this run: the override when given, else the default.
    pub fn coach_key(&self, override_key: Option<&str>) -> Option<String> {
        override_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| self.gemini_api_key.clone())
    }

    pub fn open_store(&self) -> Result<Arc<dyn TradeStore>, ConfigError> {
        match self.backend {
            Backend::Sqlite => {
                log::info!("Database path: {}", self.db_path);
                Ok(Arc::new(SqliteStore::open(&self.db_path)?))
            }
            Backend::Rest => {
                let (Some(url), Some(key)) = (&self.store_url, &self.store_key) else {
                    return Err(ConfigError::MissingField {
                        field: "JOURNAL_STORE_URL",
                        backend: "rest",
                    });
                };
                log::info!("Using hosted store at {}", url);
                Ok(Arc::new(RestStore::new(url.clone(), key.clone())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.backend, Backend::Sqlite);
        assert_eq!(cfg.db_path, DEFAULT_DB_PATH);
        assert_eq!(cfg.gemini_model, DEFAULT_MODEL);
        assert!(cfg.gemini_api_key.is_none());
    }

    #[test]
    fn test_rest_requires_url_and_key() {
        let err = config(&[("JOURNAL_BACKEND", "rest")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "JOURNAL_STORE_URL", .. }));

        let err = config(&[
            ("JOURNAL_BACKEND", "rest"),
            ("JOURNAL_STORE_URL", "https://x.supabase.co"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "JOURNAL_STORE_KEY", .. }));

        let cfg = config(&[
            ("JOURNAL_BACKEND", "REST"),
            ("JOURNAL_STORE_URL", "https://x.supabase.co"),
            ("JOURNAL_STORE_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(cfg.backend, Backend::Rest);
        assert!(cfg.open_store().is_ok());
    }

    #[test]
    fn test_invalid_backend() {
        assert!(matches!(
            config(&[("JOURNAL_BACKEND", "mongo")]),
            Err(ConfigError::InvalidBackend(_))
        ));
    }

    #[test]
    fn test_coach_key_override() {
        let cfg = config(&[("GEMINI_API_KEY", "default-key")]).unwrap();
        assert_eq!(cfg.coach_key(None).as_deref(), Some("default-key"));
        assert_eq!(cfg.coach_key(Some("session-key")).as_deref(), Some("session-key"));
        assert_eq!(cfg.coach_key(Some("  ")).as_deref(), Some("default-key"));
    }

    #[test]
    fn test_open_sqlite_store_in_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");
        let cfg = config(&[("JOURNAL_DB_PATH", path.to_str().unwrap())]).unwrap();
        let store = cfg.open_store().unwrap();
        assert_eq!(store.backend_name(), "sqlite");
    }
}
