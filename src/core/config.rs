//! Configuration management for the default content importer
//!
//! Settings come from an optional TOML file, then `DC_*` environment
//! variables, and are validated before use.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default configuration file looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "default-content.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Import run settings
    pub import: ImportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Entity types known to the importer, in import order
    pub entity_types: Vec<EntityTypeConfig>,
}

/// Import run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Directory holding one sub-directory per module
    pub modules_dir: PathBuf,

    /// Name of the content directory inside a module
    pub content_dir: String,

    /// Extension of exported content files
    pub file_extension: String,

    /// Domain prefix of `_links` hrefs in exported files
    pub link_domain: String,

    /// Update entities that already exist instead of skipping them
    pub update_existing: bool,

    /// Local id of the administrative account that performs the writes
    pub admin_account: u64,

    /// JSON snapshot backing the memory storage between CLI runs
    pub state_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact, json)
    pub format: String,
}

/// Declarative entity type entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeConfig {
    /// Entity type id, also the name of its content sub-directory
    pub id: String,

    /// Configuration entities are never imported
    #[serde(default)]
    pub config: bool,

    /// Name of the local id field
    pub id_key: String,

    /// Name of the UUID field
    #[serde(default = "default_uuid_key")]
    pub uuid_key: String,

    /// Name of the revision id field; revisionable types only
    #[serde(default)]
    pub revision_key: Option<String>,

    /// Name of the owner field; owned types only
    #[serde(default)]
    pub owner_key: Option<String>,
}

fn default_uuid_key() -> String {
    "uuid".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            import: ImportConfig::default(),
            logging: LoggingConfig::default(),
            entity_types: EntityTypeConfig::standard(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            modules_dir: PathBuf::from("./modules"),
            content_dir: "content".to_string(),
            file_extension: "json".to_string(),
            link_domain: "http://drupal.org".to_string(),
            update_existing: false,
            admin_account: 1,
            state_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl EntityTypeConfig {
    fn content(
        id: &str,
        id_key: &str,
        revision_key: Option<&str>,
        owner_key: Option<&str>,
    ) -> Self {
        Self {
            id: id.to_string(),
            config: false,
            id_key: id_key.to_string(),
            uuid_key: default_uuid_key(),
            revision_key: revision_key.map(str::to_string),
            owner_key: owner_key.map(str::to_string),
        }
    }

    /// The stock content model: users, nodes, terms, files, media, paragraphs,
    /// custom blocks, menu links and the `node_type` config entity
    pub fn standard() -> Vec<Self> {
        vec![
            Self::content("user", "uid", None, None),
            Self::content("file", "fid", None, Some("uid")),
            Self::content("taxonomy_term", "tid", Some("revision_id"), None),
            Self::content("media", "mid", Some("vid"), Some("uid")),
            Self::content("paragraph", "id", Some("revision_id"), None),
            Self::content("block_content", "id", Some("revision_id"), None),
            Self::content("node", "nid", Some("vid"), Some("uid")),
            Self::content("menu_link_content", "id", Some("revision_id"), None),
            Self {
                config: true,
                ..Self::content("node_type", "type", None, None)
            },
        ]
    }
}

impl Config {
    /// Load configuration from the default file (if present) and environment
    pub fn load() -> Result<Self> {
        let config = Self::read(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a file (or the default file, if present) and apply environment
    /// overrides without validating, so callers can layer further overrides
    pub fn read(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Config::default(),
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = var("DC_MODULES_DIR") {
            self.import.modules_dir = PathBuf::from(dir);
        }

        if let Some(domain) = var("DC_LINK_DOMAIN") {
            self.import.link_domain = domain;
        }

        if let Some(update) = var("DC_UPDATE_EXISTING") {
            self.import.update_existing = update.parse()
                .map_err(|e| Error::config(format!("Invalid DC_UPDATE_EXISTING: {}", e)))?;
        }

        if let Some(account) = var("DC_ADMIN_ACCOUNT") {
            self.import.admin_account = account.parse()
                .map_err(|e| Error::config(format!("Invalid DC_ADMIN_ACCOUNT: {}", e)))?;
        }

        if let Some(level) = var("DC_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = var("DC_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(Error::config(format!("Invalid log level: {}", other))),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            other => return Err(Error::config(format!("Invalid log format: {}", other))),
        }

        if self.import.content_dir.is_empty() {
            return Err(Error::config("content_dir must not be empty"));
        }

        if self.import.file_extension.is_empty() {
            return Err(Error::config("file_extension must not be empty"));
        }

        let mut seen = HashSet::new();
        for entity_type in &self.entity_types {
            if entity_type.id.is_empty() || entity_type.id_key.is_empty() {
                return Err(Error::config("Entity type id and id_key must not be empty"));
            }
            if !seen.insert(entity_type.id.as_str()) {
                return Err(Error::config(format!("Duplicate entity type: {}", entity_type.id)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.import.admin_account, 1);
        assert!(!config.import.update_existing);
        assert!(config.entity_types.iter().any(|t| t.id == "node_type" && t.config));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [import]
            modules_dir = "/srv/site/modules"
            update_existing = true

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.import.modules_dir, PathBuf::from("/srv/site/modules"));
        assert!(config.import.update_existing);
        assert_eq!(config.import.content_dir, "content");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.entity_types, EntityTypeConfig::standard());
    }

    #[test]
    fn test_custom_entity_types() {
        let config = Config::from_toml(
            r#"
            [[entity_types]]
            id = "article"
            id_key = "aid"
            revision_key = "rid"
            "#,
        )
        .unwrap();

        assert_eq!(config.entity_types.len(), 1);
        assert_eq!(config.entity_types[0].uuid_key, "uuid");
        assert_eq!(config.entity_types[0].revision_key.as_deref(), Some("rid"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DC_UPDATE_EXISTING", "true"),
            ("DC_ADMIN_ACCOUNT", "7"),
            ("DC_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert!(config.import.update_existing);
        assert_eq!(config.import.admin_account, 7);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = Config::default();
        let result =
            config.apply_overrides(|k| (k == "DC_ADMIN_ACCOUNT").then(|| "root".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_read_defers_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default-content.toml");
        std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

        let mut config = Config::read(Some(path.as_path())).unwrap();
        assert_eq!(config.logging.level, "loud");
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_duplicates_and_bad_level() {
        let mut config = Config::default();
        config.entity_types.push(EntityTypeConfig::standard().remove(0));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
