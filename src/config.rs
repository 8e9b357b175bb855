// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of SpaceBased.
//
// SpaceBased is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// SpaceBased is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with SpaceBased. If not, see <https://www.gnu.org/licenses/>.

//! SpaceBased configuration
//!
//! ## Configuration Hierarchy
//! 1. **CODE**: an explicit `SpaceBasedConfig { .. }` (highest priority)
//! 2. **ENV**: `SPACEBASED_*` variables, applied over a file or the defaults
//! 3. **FILE**: YAML/TOML file, detected by extension (`SPACEBASED_CONFIG` names it)
//! 4. **DEFAULT**: threshold 5, 90% payment success, 3 attempts, 3 nodes
//!
//! ## Environment Variables
//! | Variable | Field |
//! |----------|-------|
//! | `SPACEBASED_SPACE_NAME` | `space_name` |
//! | `SPACEBASED_LOW_STOCK_THRESHOLD` | `inventory.low_stock_threshold` |
//! | `SPACEBASED_PAYMENT_SUCCESS_RATE` | `payment.success_rate` |
//! | `SPACEBASED_PAYMENT_UNKNOWN_RATE` | `payment.unknown_rate` |
//! | `SPACEBASED_PAYMENT_MAX_ATTEMPTS` | `payment.max_attempts` |
//! | `SPACEBASED_PAYMENT_SEED` | `payment.seed` |
//! | `SPACEBASED_COMPENSATION` | `payment.compensation` (`accept` / `restock`) |
//! | `SPACEBASED_NODE_COUNT` | `cluster.node_count` |
//!
//! ## Example (TOML)
//! ```toml
//! space_name = "shop"
//!
//! [inventory]
//! low_stock_threshold = 10
//!
//! [payment]
//! success_rate = 0.75
//! seed = 42
//! compensation = "restock"
//!
//! [cluster]
//! node_count = 5
//! ```

use serde::{Deserialize, Serialize};
use spacebased_processing::{InventoryConfig, PaymentConfig};
use std::path::Path;
use std::str::FromStr;

/// Environment variable naming a config file for `from_env_or_default`
pub const CONFIG_FILE_VAR: &str = "SPACEBASED_CONFIG";

const ENV_PREFIX: &str = "SPACEBASED_";

/// Simulated cluster settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Nodes created as `node-0..node-{n-1}`
    pub node_count: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig { node_count: 3 }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceBasedConfig {
    /// Name of the shared space (used in logs)
    pub space_name: String,
    pub inventory: InventoryConfig,
    pub payment: PaymentConfig,
    pub cluster: ClusterConfig,
}

impl Default for SpaceBasedConfig {
    fn default() -> Self {
        SpaceBasedConfig {
            space_name: "spacebased".to_string(),
            inventory: InventoryConfig::default(),
            payment: PaymentConfig::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

impl SpaceBasedConfig {
    /// Defaults overridden by `SPACEBASED_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file
    ///
    /// Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let config: SpaceBasedConfig = match extension {
            "toml" => toml::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Failed to parse TOML config: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML config: {}", e)))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    /// File named by `SPACEBASED_CONFIG` (or defaults), then env overrides
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_FILE_VAR) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SPACEBASED_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(name) = var("SPACE_NAME") {
            self.space_name = name;
        }
        if let Some(value) = var("LOW_STOCK_THRESHOLD") {
            self.inventory.low_stock_threshold = parse("SPACEBASED_LOW_STOCK_THRESHOLD", &value)?;
        }
        if let Some(value) = var("PAYMENT_SUCCESS_RATE") {
            self.payment.success_rate = parse("SPACEBASED_PAYMENT_SUCCESS_RATE", &value)?;
        }
        if let Some(value) = var("PAYMENT_UNKNOWN_RATE") {
            self.payment.unknown_rate = parse("SPACEBASED_PAYMENT_UNKNOWN_RATE", &value)?;
        }
        if let Some(value) = var("PAYMENT_MAX_ATTEMPTS") {
            self.payment.max_attempts = parse("SPACEBASED_PAYMENT_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = var("PAYMENT_SEED") {
            self.payment.seed = Some(parse("SPACEBASED_PAYMENT_SEED", &value)?);
        }
        if let Some(value) = var("COMPENSATION") {
            self.payment.compensation = parse("SPACEBASED_COMPENSATION", &value)?;
        }
        if let Some(value) = var("NODE_COUNT") {
            self.cluster.node_count = parse("SPACEBASED_NODE_COUNT", &value)?;
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let payment = &self.payment;
        for (field, rate) in [
            ("payment.success_rate", payment.success_rate),
            ("payment.unknown_rate", payment.unknown_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!("{} must be within [0, 1], got {}", field, rate)));
            }
        }
        if payment.success_rate + payment.unknown_rate > 1.0 {
            return Err(ConfigError::Invalid(
                "payment.success_rate + payment.unknown_rate must not exceed 1".to_string(),
            ));
        }
        if payment.max_attempts == 0 {
            return Err(ConfigError::Invalid("payment.max_attempts must be at least 1".to_string()));
        }
        if self.cluster.node_count == 0 {
            return Err(ConfigError::Invalid("cluster.node_count must be at least 1".to_string()));
        }
        if self.space_name.trim().is_empty() {
            return Err(ConfigError::Invalid("space_name must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("Failed to read config file '{path}': {message}")]
    Io { path: String, message: String },

    /// Config file malformed
    #[error("{0}")]
    Parse(String),

    /// Extension other than .toml/.yaml/.yml
    #[error("Unsupported config file format: {0}. Use .yaml, .yml, or .toml")]
    UnsupportedFormat(String),

    /// Environment value did not parse
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    /// Value out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacebased_processing::CompensationPolicy;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SpaceBasedConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.inventory.low_stock_threshold, 5);
        assert_eq!(config.payment.success_rate, 0.9);
        assert_eq!(config.payment.max_attempts, 3);
        assert_eq!(config.cluster.node_count, 3);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SpaceBasedConfig::default();
        config
            .apply_overrides(lookup(&[
                ("SPACEBASED_LOW_STOCK_THRESHOLD", "12"),
                ("SPACEBASED_PAYMENT_SUCCESS_RATE", "0.5"),
                ("SPACEBASED_PAYMENT_SEED", "99"),
                ("SPACEBASED_COMPENSATION", "restock"),
                ("SPACEBASED_NODE_COUNT", " 7 "),
            ]))
            .unwrap();

        assert_eq!(config.inventory.low_stock_threshold, 12);
        assert_eq!(config.payment.success_rate, 0.5);
        assert_eq!(config.payment.seed, Some(99));
        assert_eq!(config.payment.compensation, CompensationPolicy::Restock);
        assert_eq!(config.cluster.node_count, 7);
        assert_eq!(config.payment.max_attempts, 3);
    }

    #[test]
    fn test_bad_env_value_names_variable() {
        let mut config = SpaceBasedConfig::default();
        let err = config
            .apply_overrides(lookup(&[("SPACEBASED_NODE_COUNT", "many")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "SPACEBASED_NODE_COUNT".to_string(),
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn test_validation_ranges() {
        let mut config = SpaceBasedConfig::default();
        config.payment.success_rate = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SpaceBasedConfig::default();
        config.payment.unknown_rate = 0.2;
        assert!(config.validate().is_err());

        let mut config = SpaceBasedConfig::default();
        config.payment.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = SpaceBasedConfig::default();
        config.cluster.node_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let file = write_config(
            ".toml",
            r#"
space_name = "shop"

[inventory]
low_stock_threshold = 10

[payment]
success_rate = 0.75
compensation = "restock"
"#,
        );
        let config = SpaceBasedConfig::from_file(file.path()).unwrap();
        assert_eq!(config.space_name, "shop");
        assert_eq!(config.inventory.low_stock_threshold, 10);
        assert_eq!(config.payment.success_rate, 0.75);
        assert_eq!(config.payment.compensation, CompensationPolicy::Restock);
        assert_eq!(config.payment.max_attempts, 3);
        assert_eq!(config.cluster, ClusterConfig::default());
    }

    #[test]
    fn test_from_yaml_file() {
        let file = write_config(
            ".yaml",
            "cluster:\n  node_count: 2\npayment:\n  seed: 7\n  max_attempts: 5\n",
        );
        let config = SpaceBasedConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cluster.node_count, 2);
        assert_eq!(config.payment.seed, Some(7));
        assert_eq!(config.payment.max_attempts, 5);
    }

    #[test]
    fn test_file_errors() {
        let file = write_config(".json", "{}");
        assert!(matches!(
            SpaceBasedConfig::from_file(file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        let file = write_config(".toml", "cluster = 3");
        assert!(matches!(SpaceBasedConfig::from_file(file.path()), Err(ConfigError::Parse(_))));

        let file = write_config(".yml", "cluster:\n  node_count: 0\n");
        assert!(matches!(SpaceBasedConfig::from_file(file.path()), Err(ConfigError::Invalid(_))));

        assert!(matches!(
            SpaceBasedConfig::from_file("/definitely/not/here.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
