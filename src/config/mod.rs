//! Configuration system for reverie.

mod env_parser;
mod loader;
mod overrides;
mod paths;
mod validation;

#[cfg(test)]
mod tests_utils;
#[cfg(test)]
use tests_utils::ENV_MUTEX;

use crate::embedding::DEFAULT_HASHING_DIMS;
use crate::errors::Error;
use serde::Deserialize;
use std::path::PathBuf;

pub use loader::ConfigFile;

/// Which embedding provider the CLI builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence-transformers model through ONNX Runtime.
    Onnx,
    /// Feature hashing; no model download.
    Hashing,
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(EmbeddingBackend::Onnx),
            "hashing" => Ok(EmbeddingBackend::Hashing),
            other => Err(Error::Config(format!(
                "Unknown embedding backend '{other}' (expected 'onnx' or 'hashing')"
            ))),
        }
    }
}

/// Configuration values with priority: defaults < config file < env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the SQLite durable log.
    #[serde(default)]
    pub database_path: PathBuf,

    /// Whether stored memories are written to the durable log and replayed on start.
    #[serde(default)]
    pub persist: bool,

    /// Whether recall uses per-category flat indexes instead of a scan.
    #[serde(default)]
    pub use_index: bool,

    /// Embedding provider used by the CLI.
    #[serde(default = "default_backend")]
    pub embedding_backend: EmbeddingBackend,

    /// HuggingFace embedding model identifier.
    #[serde(default)]
    pub embedding_model: String,

    /// Directory for caching ONNX models.
    #[serde(default)]
    pub model_cache: PathBuf,

    /// Vector length for the hashing backend.
    #[serde(default)]
    pub hashing_dimensions: usize,
}

fn default_backend() -> EmbeddingBackend {
    EmbeddingBackend::Onnx
}

impl Default for Config {
    fn default() -> Self {
        // Use home directory with sensible fallback for systems without HOME
        let home = dirs::home_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        let reverie_dir = home.join(".reverie");

        Self {
            database_path: reverie_dir.join("memory.db"),
            persist: true,
            use_index: false,
            embedding_backend: EmbeddingBackend::Onnx,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            model_cache: reverie_dir.join("models"),
            hashing_dimensions: DEFAULT_HASHING_DIMS,
        }
    }
}

impl Config {
    /// Load configuration with defaults, file values, and environment overrides.
    pub fn load() -> Result<Self, Error> {
        let file_config = loader::load_from_file()?;

        let mut config = Config::default();

        if let Some(mut file) = file_config {
            paths::expand_tilde(&mut file.database_path);
            paths::expand_tilde(&mut file.model_cache);
            config.merge_from_file(file);
        }

        overrides::apply_env_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Merge configuration from a file into this config.
    fn merge_from_file(&mut self, file: ConfigFile) {
        if !file.database_path.as_os_str().is_empty() {
            self.database_path = file.database_path;
        }
        if let Some(persist) = file.persist {
            self.persist = persist;
        }
        if let Some(use_index) = file.use_index {
            self.use_index = use_index;
        }
        if let Some(backend) = file.embedding_backend {
            self.embedding_backend = backend;
        }
        if !file.embedding_model.is_empty() {
            self.embedding_model = file.embedding_model;
        }
        if !file.model_cache.as_os_str().is_empty() {
            self.model_cache = file.model_cache;
        }
        if let Some(dims) = file.hashing_dimensions {
            self.hashing_dimensions = dims;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), Error> {
        let validator = validation::ConfigValidator {
            database_path: self.database_path.clone(),
            persist: self.persist,
            embedding_backend: self.embedding_backend,
            embedding_model: self.embedding_model.clone(),
            hashing_dimensions: self.hashing_dimensions,
        };

        validator.validate()
    }

    /// Ensure parent directories for database and cache paths exist.
    pub fn ensure_directories(&self) -> Result<(), Error> {
        if self.persist {
            if let Some(parent) = self.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        Error::Config(format!(
                            "Failed to create database directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
        }

        if self.embedding_backend == EmbeddingBackend::Onnx
            && !self.model_cache.as_os_str().is_empty()
        {
            std::fs::create_dir_all(&self.model_cache).map_err(|e| {
                Error::Config(format!(
                    "Failed to create model cache directory {}: {e}",
                    self.model_cache.display()
                ))
            })?;
        }

        Ok(())
    }
}
