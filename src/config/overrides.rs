//! Environment variable overrides for configuration.

use crate::errors::Error;

use super::Config;
use super::env_parser::{
    apply_override, parse_env_bool, parse_env_path, parse_env_string, parse_env_value,
};

pub const DATABASE_PATH_VAR: &str = "REVERIE_DATABASE_PATH";
pub const PERSIST_VAR: &str = "REVERIE_PERSIST";
pub const USE_INDEX_VAR: &str = "REVERIE_USE_INDEX";
pub const EMBEDDING_BACKEND_VAR: &str = "REVERIE_EMBEDDING_BACKEND";
pub const EMBEDDING_MODEL_VAR: &str = "REVERIE_EMBEDDING_MODEL";
pub const MODEL_CACHE_VAR: &str = "REVERIE_MODEL_CACHE";
pub const HASHING_DIMENSIONS_VAR: &str = "REVERIE_HASHING_DIMENSIONS";

/// Every environment variable the config reads.
#[allow(dead_code)] // Used by config tests to reset the environment
pub const ENV_VARS: [&str; 7] = [
    DATABASE_PATH_VAR,
    PERSIST_VAR,
    USE_INDEX_VAR,
    EMBEDDING_BACKEND_VAR,
    EMBEDDING_MODEL_VAR,
    MODEL_CACHE_VAR,
    HASHING_DIMENSIONS_VAR,
];

/// Apply environment variable overrides to configuration.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), Error> {
    apply_override(DATABASE_PATH_VAR, &mut config.database_path, parse_env_path)?;
    apply_override(PERSIST_VAR, &mut config.persist, parse_env_bool)?;
    apply_override(USE_INDEX_VAR, &mut config.use_index, parse_env_bool)?;
    apply_override(
        EMBEDDING_BACKEND_VAR,
        &mut config.embedding_backend,
        parse_env_value,
    )?;
    apply_override(
        EMBEDDING_MODEL_VAR,
        &mut config.embedding_model,
        parse_env_string,
    )?;
    apply_override(MODEL_CACHE_VAR, &mut config.model_cache, parse_env_path)?;
    apply_override(
        HASHING_DIMENSIONS_VAR,
        &mut config.hashing_dimensions,
        parse_env_value,
    )?;
    Ok(())
}
