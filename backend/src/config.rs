//! Runtime settings.
//!
//! Read from the environment after `dotenvy` has loaded any `.env` file.
//! Command-line flags take precedence over these values.
//!
//! | Variable                 | Default         |
//! |--------------------------|-----------------|
//! | `FEEDCHECK_PORT`         | `3000`          |
//! | `FEEDCHECK_SPEC_PATH`    | built-in table  |
//! | `FEEDCHECK_REPORT_LIMIT` | `100`           |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::report::DEFAULT_ENTRY_LIMIT;

pub const DEFAULT_PORT: u16 = 3000;

pub const PORT_VAR: &str = "FEEDCHECK_PORT";
pub const SPEC_PATH_VAR: &str = "FEEDCHECK_SPEC_PATH";
pub const REPORT_LIMIT_VAR: &str = "FEEDCHECK_REPORT_LIMIT";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// HTTP server port
    pub port: u16,
    /// Field specification table replacing the built-in one
    pub spec_path: Option<PathBuf>,
    /// Maximum error/warning entries per exported report
    pub report_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            spec_path: None,
            report_limit: DEFAULT_ENTRY_LIMIT,
        }
    }
}

impl Settings {
    /// Settings from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Settings from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            port: parse_var(PORT_VAR, get(PORT_VAR))?.unwrap_or(defaults.port),
            spec_path: get(SPEC_PATH_VAR).map(PathBuf::from),
            report_limit: parse_var(REPORT_LIMIT_VAR, get(REPORT_LIMIT_VAR))?
                .unwrap_or(defaults.report_limit),
        })
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> ConfigResult<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.report_limit, 100);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (PORT_VAR, "8080"),
            (SPEC_PATH_VAR, "/etc/feedcheck/fields.json"),
            (REPORT_LIMIT_VAR, " 25 "),
        ]))
        .unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.spec_path, Some(PathBuf::from("/etc/feedcheck/fields.json")));
        assert_eq!(settings.report_limit, 25);
    }

    #[test]
    fn test_empty_value_is_unset() {
        let settings = Settings::from_lookup(lookup(&[(PORT_VAR, ""), (SPEC_PATH_VAR, " ")])).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
        assert!(settings.spec_path.is_none());
    }

    #[test]
    fn test_invalid_value() {
        let err = Settings::from_lookup(lookup(&[(PORT_VAR, "http")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for FEEDCHECK_PORT: 'http'");
    }
}
