//! Environment variable parsing utilities for configuration.

use crate::errors::Error;
use std::path::PathBuf;
use std::str::FromStr;

use super::paths;

/// Parse environment variable value or return error if empty/whitespace.
pub fn parse_env_string(name: &str, value: &str) -> Result<String, Error> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    Ok(value.to_string())
}

/// Parse environment variable as a path, expanding tilde.
pub fn parse_env_path(name: &str, value: &str) -> Result<PathBuf, Error> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    Ok(paths::expand_tilde_path(&PathBuf::from(value)))
}

/// Parse environment variable as a boolean flag.
///
/// Accepts `true/false`, `1/0` and `yes/no`, case-insensitively.
pub fn parse_env_bool(name: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Err(Error::Config(format!("{name} cannot be empty"))),
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::Config(format!(
            "Invalid {name} value: '{other}' is not a boolean"
        ))),
    }
}

/// Parse environment variable with `FromStr`; range checks happen in validation.
pub fn parse_env_value<T>(name: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {name} value: {e}")))
}

/// Apply `name` to `target` with `parse` when the variable is set.
pub fn apply_override<T>(
    name: &str,
    target: &mut T,
    parse: impl Fn(&str, &str) -> Result<T, Error>,
) -> Result<(), Error> {
    if let Ok(val) = std::env::var(name) {
        *target = parse(name, &val)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_string_empty() {
        let result = parse_env_string("TEST_VAR", "");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_string_whitespace() {
        let result = parse_env_string("TEST_VAR", "   ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_string_valid() {
        let result = parse_env_string("TEST_VAR", "valid");
        assert_eq!(result.unwrap(), "valid");
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("FLAG", "TRUE").unwrap());
        assert!(parse_env_bool("FLAG", "1").unwrap());
        assert!(!parse_env_bool("FLAG", "no").unwrap());
        assert!(matches!(parse_env_bool("FLAG", ""), Err(Error::Config(_))));
        assert!(matches!(
            parse_env_bool("FLAG", "maybe"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_parse_env_value_usize() {
        assert_eq!(parse_env_value::<usize>("DIMS", " 128 ").unwrap(), 128);
        assert!(matches!(
            parse_env_value::<usize>("DIMS", "-3"),
            Err(Error::Config(_))
        ));
    }
}
