//! Server configuration.
//!
//! Loaded from TOML. Every section has defaults, so an empty file (or no
//! file at all) yields a runnable in-memory server.
//!
//! ```toml
//! bind = "0.0.0.0:8080"
//!
//! [storage]
//! backend = "file"
//! data_dir = "/var/lib/warbook"
//!
//! [auth]
//! admin_emails = ["editor@example.com"]
//!
//! [diagnostic]
//! collection = "systems"
//! id = "health-check"
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use warbook_mentions::{CounterConfig, PolicyConfig};
use warbook_store::collections;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid reference policy: {0}")]
    Policy(#[from] warbook_mentions::MentionError),

    #[error("failed to open store: {0}")]
    Store(#[from] warbook_store::StoreError),
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind: SocketAddr,

    pub storage: StorageConfig,

    pub auth: AuthConfig,

    pub diagnostic: DiagnosticConfig,

    /// Which collections may reference which.
    pub policy: PolicyConfig,

    /// Mention-count cache.
    pub mentions: CounterConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            diagnostic: DiagnosticConfig::default(),
            policy: PolicyConfig::default(),
            mentions: CounterConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Default config file location: `<config dir>/warbook/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("warbook").join("config.toml"))
    }

    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse config from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load `path` if given, else the default path if it exists, else
    /// defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Persist to `data_dir` with the file backend.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.storage.backend = StorageBackend::File;
        self.storage.data_dir = data_dir.into();
        self
    }

    pub fn with_admins<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth.admin_emails = emails.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_diagnostic(mut self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        self.diagnostic = DiagnosticConfig {
            collection: collection.into(),
            id: id.into(),
        };
        self
    }
}

/// Which document backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Root directory for the file backend.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: dirs::data_dir()
                .map(|dir| dir.join("warbook"))
                .unwrap_or_else(|| PathBuf::from("warbook-data")),
        }
    }
}

/// Trusted headers set by the upstream OAuth proxy, and the admin list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub email_header: String,
    pub user_header: String,

    /// Emails allowed to write. Matched case-insensitively.
    pub admin_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email_header: "x-auth-request-email".to_string(),
            user_header: "x-auth-request-user".to_string(),
            admin_emails: Vec::new(),
        }
    }
}

/// The fixed document served by `/api/diagnostic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    pub collection: String,
    pub id: String,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            collection: collections::SYSTEMS.to_string(),
            id: "diagnostic".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(ServerConfig::from_toml("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = ServerConfig::from_toml(
            r#"
            bind = "0.0.0.0:8080"

            [storage]
            backend = "file"
            data_dir = "/srv/warbook"

            [auth]
            admin_emails = ["Editor@Example.com"]

            [mentions]
            zero_confirmations = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/warbook"));
        assert_eq!(config.auth.email_header, "x-auth-request-email");
        assert_eq!(config.auth.admin_emails, vec!["Editor@Example.com"]);
        assert_eq!(config.mentions.zero_confirmations, Some(3));
        assert_eq!(config.mentions.max_entries, 1000);
        assert_eq!(config.policy, PolicyConfig::default());
    }

    #[test]
    fn test_custom_policy() {
        let config = ServerConfig::from_toml(
            r#"
            [policy.refers_to]
            profiles = ["sources"]
            "#,
        )
        .unwrap();
        let policy = config.policy.build().unwrap();
        assert_eq!(policy.can_be_mentioned_by("sources"), ["profiles"]);
        assert!(policy.can_be_mentioned_by("keywords").is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[diagnostic]\nid = \"health-check\"\n").unwrap();

        let config = ServerConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.diagnostic.id, "health-check");
        assert_eq!(config.diagnostic.collection, "systems");

        let missing = ServerConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn test_builders() {
        let config = ServerConfig::default()
            .with_data_dir("/tmp/wb")
            .with_admins(["a@b.c"])
            .with_diagnostic("sources", "s1");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.auth.admin_emails, vec!["a@b.c"]);
        assert_eq!(config.diagnostic.id, "s1");
    }
}
