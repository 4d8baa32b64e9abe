//! YAML configuration for photosearch.
//!
//! Every section is optional and falls back to its defaults, so an empty
//! file is a valid configuration.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! store:
//!   backend: "redb"
//!   path: "photosearch.redb"
//!   compression: "zstd"
//!   compression_level: 3
//!
//! vocabulary:
//!   path: "known_words.json"
//!
//! tokenizer:
//!   max_tokens: 32
//!   pad_id: 0
//!   unknown_id: 1
//!
//! encoder:
//!   model_name: "stub-clip"
//!   model_version: "stub-1"
//!   dimension: 512
//!   normalize: true
//!
//! indexer:
//!   concurrency: 4
//!   reindex_stale: false
//!
//! search:
//!   default_top_k: 25
//!
//! library:
//!   root: "/home/me/Pictures"
//!   thumbnail_size: 500
//!
//! logging:
//!   level: "info"
//!   json: false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use encoder::EncoderConfig;
use indexer::IndexerConfig;
use search::SearchConfig;
use serde::{Deserialize, Serialize};
use store::{BackendConfig, CompressionCodec, CompressionConfig, StoreConfig};
use thiserror::Error;
use tokenize::TokenizerConfig;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub store: StoreYamlConfig,

    #[serde(default)]
    pub vocabulary: VocabularyYamlConfig,

    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub library: LibraryYamlConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl AppConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        // serde_yaml reads an empty document as unit, not as an empty map.
        let config: AppConfig = if yaml.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.store.validate()?;
        self.vocabulary.validate()?;
        self.tokenizer
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("tokenizer: {e}")))?;
        self.encoder
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("encoder: {e}")))?;
        self.indexer
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("indexer: {e}")))?;
        self.search
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("search: {e}")))?;
        self.library.validate()?;
        Ok(())
    }

    /// Store settings sized for the configured encoder.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.encoder.dimension)
            .with_model_version(self.encoder.model_version.clone())
            .with_backend(self.store.backend_config())
            .with_compression(self.store.compression_config())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            store: StoreYamlConfig::default(),
            vocabulary: VocabularyYamlConfig::default(),
            tokenizer: TokenizerConfig::default(),
            encoder: EncoderConfig::default(),
            indexer: IndexerConfig::default(),
            search: SearchConfig::default(),
            library: LibraryYamlConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

/// Embedding store YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreYamlConfig {
    /// `redb` or `in_memory`.
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default = "default_store_path")]
    pub path: String,

    /// `zstd` or `none`.
    #[serde(default = "default_compression")]
    pub compression: String,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["redb", "in_memory"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.backend must be one of: {valid_backends:?}"
            )));
        }
        if self.backend == "redb" && self.path.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "store.path is required for the redb backend".to_string(),
            ));
        }

        let valid_compression = ["zstd", "none"];
        if !valid_compression.contains(&self.compression.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.compression must be one of: {valid_compression:?}"
            )));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(ConfigLoadError::Validation(
                "store.compression_level must be between 1 and 22".to_string(),
            ));
        }
        Ok(())
    }

    pub fn backend_config(&self) -> BackendConfig {
        match self.backend.as_str() {
            "in_memory" => BackendConfig::in_memory(),
            _ => BackendConfig::redb(self.path.clone()),
        }
    }

    pub fn compression_config(&self) -> CompressionConfig {
        let codec = match self.compression.as_str() {
            "none" => CompressionCodec::None,
            _ => CompressionCodec::Zstd,
        };
        CompressionConfig::new(codec, self.compression_level)
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
            compression: default_compression(),
            compression_level: default_compression_level(),
        }
    }
}

/// Vocabulary YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyYamlConfig {
    /// JSON object mapping lowercase words to token ids.
    #[serde(default = "default_vocabulary_path")]
    pub path: PathBuf,
}

impl VocabularyYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "vocabulary.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for VocabularyYamlConfig {
    fn default() -> Self {
        Self {
            path: default_vocabulary_path(),
        }
    }
}

/// Photo library YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryYamlConfig {
    /// Directory scanned for images.
    #[serde(default = "default_library_root")]
    pub root: PathBuf,

    /// Longest side, in pixels, of fetched and displayed thumbnails.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

impl LibraryYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.thumbnail_size == 0 {
            return Err(ConfigLoadError::Validation(
                "library.thumbnail_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LibraryYamlConfig {
    fn default() -> Self {
        Self {
            root: default_library_root(),
            thumbnail_size: default_thumbnail_size(),
        }
    }
}

/// Logging YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingYamlConfig {
    /// Filter directive, e.g. `info` or `photosearch=debug,indexer=trace`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_store_backend() -> String {
    "redb".to_string()
}

fn default_store_path() -> String {
    "photosearch.redb".to_string()
}

fn default_compression() -> String {
    "zstd".to_string()
}

fn default_compression_level() -> i32 {
    3
}

fn default_vocabulary_path() -> PathBuf {
    PathBuf::from("known_words.json")
}

fn default_library_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_thumbnail_size() -> u32 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.store.backend, "redb");
        assert_eq!(config.tokenizer.max_tokens, 32);
        assert_eq!(config.search.default_top_k, 25);
        assert_eq!(config.library.thumbnail_size, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config.indexer.concurrency, 4);
        assert_eq!(config.encoder.dimension, 512);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
version: "1.0"
store:
  backend: "in_memory"
encoder:
  dimension: 64
  model_version: "clip-b32-v2"
indexer:
  concurrency: 2
search:
  default_top_k: 10
  min_score: 0.2
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.store.backend_config(), BackendConfig::InMemory);
        assert_eq!(config.encoder.dimension, 64);
        assert_eq!(config.indexer.concurrency, 2);
        assert_eq!(config.search.min_score, Some(0.2));
        // untouched fields keep their defaults
        assert!(config.encoder.normalize);
        assert_eq!(config.tokenizer.unknown_id, 1);

        let store = config.store_config();
        assert_eq!(store.dimension, 64);
        assert_eq!(store.model_version, "clip-b32-v2");
    }

    #[test]
    fn test_invalid_version() {
        let err = AppConfig::from_yaml("version: \"2.0\"").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn test_invalid_store_backend() {
        let err = AppConfig::from_yaml("store:\n  backend: \"rocksdb\"").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(msg) if msg.contains("store.backend")));
    }

    #[test]
    fn test_invalid_compression_level() {
        let err = AppConfig::from_yaml("store:\n  compression_level: 40").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(_)));
    }

    #[test]
    fn test_section_validation_is_prefixed() {
        let err = AppConfig::from_yaml("indexer:\n  concurrency: 0").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(msg) if msg.starts_with("indexer:")));

        let err = AppConfig::from_yaml("tokenizer:\n  max_tokens: 0").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(msg) if msg.starts_with("tokenizer:")));
    }

    #[test]
    fn test_compression_mapping() {
        let store = StoreYamlConfig {
            compression: "none".to_string(),
            ..Default::default()
        };
        assert_eq!(store.compression_config().codec, CompressionCodec::None);
        assert_eq!(
            StoreYamlConfig::default().compression_config(),
            CompressionConfig::default()
        );
    }

    #[test]
    fn test_malformed_yaml() {
        let err = AppConfig::from_yaml("store: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigLoadError::YamlParse(_)));
    }
}
