//! Search budget for the inference engine, persisted as TOML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bounds shared by the proof search and the finite model search.
///
/// Every bound is a resource limit, not a logical one: hitting it makes a
/// query inconclusive rather than false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Largest domain size tried by the model search.
    #[serde(default = "default_max_domain_size")]
    pub max_domain_size: usize,
    /// Maximum candidate interpretations examined across all domain sizes.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: u64,
    /// Maximum number of retained clauses in the proof search.
    #[serde(default = "default_max_clauses")]
    pub max_clauses: usize,
    /// Wall-clock limit for one race, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Given clauses picked by weight before one is picked by age.
    #[serde(default = "default_pick_given_ratio")]
    pub pick_given_ratio: usize,
}

fn default_max_domain_size() -> usize {
    8
}
fn default_max_candidates() -> u64 {
    200_000
}
fn default_max_clauses() -> usize {
    20_000
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_pick_given_ratio() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_domain_size: default_max_domain_size(),
            max_candidates: default_max_candidates(),
            max_clauses: default_max_clauses(),
            timeout_ms: default_timeout_ms(),
            pick_given_ratio: default_pick_given_ratio(),
        }
    }
}

impl EngineConfig {
    /// Reject bounds that would make every query inconclusive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("max_domain_size", self.max_domain_size == 0),
            ("max_candidates", self.max_candidates == 0),
            ("max_clauses", self.max_clauses == 0),
            ("timeout_ms", self.timeout_ms == 0),
            ("pick_given_ratio", self.pick_given_ratio == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(ConfigError::Invalid {
                message: format!("`{field}` must be greater than zero"),
            }),
            None => Ok(()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }
}

/// Partial budget, as given by a scenario's `[engine]` table or CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineOverrides {
    pub max_domain_size: Option<usize>,
    pub max_candidates: Option<u64>,
    pub max_clauses: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub pick_given_ratio: Option<usize>,
}

impl EngineConfig {
    /// Copy of this config with every set override applied, validated.
    pub fn with_overrides(&self, overrides: &EngineOverrides) -> Result<Self, ConfigError> {
        let config = EngineConfig {
            max_domain_size: overrides.max_domain_size.unwrap_or(self.max_domain_size),
            max_candidates: overrides.max_candidates.unwrap_or(self.max_candidates),
            max_clauses: overrides.max_clauses.unwrap_or(self.max_clauses),
            timeout_ms: overrides.timeout_ms.unwrap_or(self.timeout_ms),
            pick_given_ratio: overrides.pick_given_ratio.unwrap_or(self.pick_given_ratio),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_domain_size, 8);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = EngineConfig::from_toml("max_domain_size = 3\n", "inline").unwrap();
        assert_eq!(config.max_domain_size, 3);
        assert_eq!(config.max_clauses, 20_000);
    }

    #[test]
    fn zero_bound_is_rejected() {
        let err = EngineConfig::from_toml("timeout_ms = 0\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref message } if message.contains("timeout_ms")));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let err = EngineConfig::from_toml("max_domian_size = 3\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "max_candidates = 500\npick_given_ratio = 2\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.max_candidates, 500);
        assert_eq!(config.pick_given_ratio, 2);
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let overrides = EngineOverrides {
            timeout_ms: Some(500),
            ..EngineOverrides::default()
        };
        let config = EngineConfig::default().with_overrides(&overrides).unwrap();
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.max_domain_size, 8);

        let zero = EngineOverrides {
            max_clauses: Some(0),
            ..EngineOverrides::default()
        };
        assert!(EngineConfig::default().with_overrides(&zero).is_err());
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
