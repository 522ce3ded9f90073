//! Configuration validation logic.

use crate::errors::Error;
use std::path::PathBuf;

use super::EmbeddingBackend;

/// Upper bound for hashing embedder dimensions.
pub const MAX_HASHING_DIMENSIONS: usize = 8192;

/// Validates configuration values.
pub struct ConfigValidator {
    /// Path to the SQLite durable log.
    pub database_path: PathBuf,
    /// Whether persistence is enabled.
    pub persist: bool,
    /// Selected embedding provider.
    pub embedding_backend: EmbeddingBackend,
    /// HuggingFace embedding model identifier.
    pub embedding_model: String,
    /// Hashing embedder vector length.
    pub hashing_dimensions: usize,
}

impl ConfigValidator {
    /// Validate all configuration values for correctness and constraints.
    ///
    /// Checks that:
    /// - Database path is not empty when persistence is on
    /// - Embedding model is not empty for the ONNX backend
    /// - Hashing dimensions are within `1..=8192` for the hashing backend
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any validation check fails.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_database_path()?;
        self.validate_embedding_model()?;
        self.validate_hashing_dimensions()?;

        Ok(())
    }

    fn validate_database_path(&self) -> Result<(), Error> {
        if self.persist && self.database_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "Database path cannot be empty when persistence is enabled".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_embedding_model(&self) -> Result<(), Error> {
        if self.embedding_backend == EmbeddingBackend::Onnx
            && self.embedding_model.trim().is_empty()
        {
            return Err(Error::Config("Embedding model cannot be empty".to_string()));
        }

        Ok(())
    }

    fn validate_hashing_dimensions(&self) -> Result<(), Error> {
        if self.embedding_backend == EmbeddingBackend::Hashing
            && !(1..=MAX_HASHING_DIMENSIONS).contains(&self.hashing_dimensions)
        {
            return Err(Error::Config(format!(
                "Invalid hashing dimensions: {} (must be between 1 and {})",
                self.hashing_dimensions, MAX_HASHING_DIMENSIONS
            )));
        }

        Ok(())
    }
}
