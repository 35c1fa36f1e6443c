//! Configuration management module

use crate::error::{Result, TransferError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Credentials for one registry (or one registry namespace)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Secret {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub insecure: bool,
}

/// Transfer run configuration
///
/// Secrets are keyed by `registry` or `registry/namespace`; the
/// namespace-specific entry wins when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Worker count per pool
    pub routine_nums: usize,
    /// Maximum retry rounds for failed expansions and jobs
    pub retry_nums: usize,

    /// Enable the registry-migration preset
    pub ccr_to_tcr: bool,
    pub ccr_region: String,
    pub tcr_region: String,
    pub tcr_name: String,

    /// Fallback target registry when a rule has no target
    pub default_registry: String,
    /// Fallback target namespace when a rule has no target
    pub default_namespace: String,

    pub secrets: HashMap<String, Secret>,

    /// Seed rules: source reference to target reference
    pub image_list: HashMap<String, String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            routine_nums: 5,
            retry_nums: 2,
            ccr_to_tcr: false,
            ccr_region: String::new(),
            tcr_region: String::new(),
            tcr_name: String::new(),
            default_registry: String::new(),
            default_namespace: String::new(),
            secrets: HashMap::new(),
            image_list: HashMap::new(),
        }
    }
}

impl TransferConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TransferError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: TransferConfig = serde_json::from_str(&content).map_err(|e| {
            TransferError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("REGISTRY_TRANSFER_ROUTINES") {
            if let Ok(n) = val.parse() {
                self.routine_nums = n;
            }
        }
        if let Ok(val) = std::env::var("REGISTRY_TRANSFER_RETRIES") {
            if let Ok(n) = val.parse() {
                self.retry_nums = n;
            }
        }
        if let Ok(val) = std::env::var("REGISTRY_TRANSFER_DEFAULT_REGISTRY") {
            self.default_registry = val;
        }
        if let Ok(val) = std::env::var("REGISTRY_TRANSFER_DEFAULT_NAMESPACE") {
            self.default_namespace = val;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.routine_nums == 0 {
            return Err(TransferError::Config(
                "routine_nums must be greater than 0".to_string(),
            ));
        }
        if self.ccr_to_tcr {
            if self.ccr_region.is_empty() || self.tcr_region.is_empty() {
                return Err(TransferError::Config(
                    "ccr_region and tcr_region are required when ccr_to_tcr is set".to_string(),
                ));
            }
            if self.tcr_name.is_empty() {
                return Err(TransferError::Config(
                    "tcr_name is required when ccr_to_tcr is set".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Look up credentials for a registry and namespace.
    ///
    /// The `registry/namespace` entry takes precedence over the bare
    /// `registry` entry; absence means anonymous access.
    pub fn secret_for(&self, registry: &str, namespace: &str) -> Option<&Secret> {
        if !namespace.is_empty() {
            if let Some(secret) = self.secrets.get(&format!("{}/{}", registry, namespace)) {
                return Some(secret);
            }
        }
        self.secrets.get(registry)
    }

    /// Whether both target defaults are configured
    pub fn has_target_defaults(&self) -> bool {
        !self.default_registry.is_empty() && !self.default_namespace.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secrets() -> TransferConfig {
        let mut config = TransferConfig::default();
        config.secrets.insert(
            "registry.example.com".to_string(),
            Secret {
                username: "global".to_string(),
                password: "pw".to_string(),
                insecure: false,
            },
        );
        config.secrets.insert(
            "registry.example.com/team".to_string(),
            Secret {
                username: "team-user".to_string(),
                password: "pw".to_string(),
                insecure: true,
            },
        );
        config
    }

    #[test]
    fn test_namespace_secret_wins() {
        let config = config_with_secrets();
        let secret = config.secret_for("registry.example.com", "team").unwrap();
        assert_eq!(secret.username, "team-user");
        assert!(secret.insecure);
    }

    #[test]
    fn test_registry_secret_fallback() {
        let config = config_with_secrets();
        let secret = config.secret_for("registry.example.com", "other").unwrap();
        assert_eq!(secret.username, "global");
    }

    #[test]
    fn test_unknown_registry_is_anonymous() {
        let config = config_with_secrets();
        assert!(config.secret_for("ghcr.io", "team").is_none());
    }

    #[test]
    fn test_validate_rejects_zero_routines() {
        let config = TransferConfig {
            routine_nums: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_preset_parameters() {
        let config = TransferConfig {
            ccr_to_tcr: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TransferConfig {
            ccr_to_tcr: true,
            ccr_region: "ap-guangzhou".to_string(),
            tcr_region: "ap-guangzhou".to_string(),
            tcr_name: "my-instance".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_json() {
        let raw = r#"{
            "routine_nums": 8,
            "retry_nums": 1,
            "default_registry": "mirror.example.com",
            "default_namespace": "library",
            "secrets": {
                "mirror.example.com": {"username": "u", "password": "p"}
            },
            "image_list": {
                "registry.example.com/app/web:v1": "mirror.example.com/app/web:v1"
            }
        }"#;
        let config: TransferConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.routine_nums, 8);
        assert_eq!(config.retry_nums, 1);
        assert!(config.has_target_defaults());
        assert_eq!(config.image_list.len(), 1);
        assert!(!config.secrets["mirror.example.com"].insecure);
    }
}
